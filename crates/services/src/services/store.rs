use async_trait::async_trait;
use db::{
    DBService,
    models::project::{Project, ProjectError},
};
use uuid::Uuid;

/// The authoritative document store, scoped per owner.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Owner's documents, newest first.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Project>, ProjectError>;
    /// Persists a draft and returns the canonical record.
    async fn insert(&self, draft: &Project) -> Result<Project, ProjectError>;
    /// Full-document replace filtered by `{id, owner_id, version}`.
    async fn replace(&self, project: &Project) -> Result<Project, ProjectError>;
    async fn delete(&self, id: &str, owner_id: Uuid) -> Result<u64, ProjectError>;
}

#[derive(Clone)]
pub struct DbProjectStore {
    db: DBService,
}

impl DbProjectStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectStore for DbProjectStore {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Project>, ProjectError> {
        let projects = Project::find_by_owner(&self.db.pool, owner_id).await?;
        tracing::debug!("Loaded {} projects for {owner_id}", projects.len());
        Ok(projects)
    }

    async fn insert(&self, draft: &Project) -> Result<Project, ProjectError> {
        Project::create(&self.db.pool, draft).await
    }

    async fn replace(&self, project: &Project) -> Result<Project, ProjectError> {
        let stored = Project::replace(&self.db.pool, project).await?;
        tracing::debug!("Saved project {} at version {}", stored.id, stored.version);
        Ok(stored)
    }

    async fn delete(&self, id: &str, owner_id: Uuid) -> Result<u64, ProjectError> {
        let rows = Project::delete(&self.db.pool, id, owner_id).await?;
        tracing::debug!("Deleted project {id}");
        Ok(rows)
    }
}

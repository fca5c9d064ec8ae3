use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use db::models::project::{CreateProject, Project, ProjectError};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};

use super::{
    autosave::{AutosavePolicy, AutosaveQueue, Confirmed, SyncEvent},
    dashboard::DashboardStats,
    session::{Session, SessionError},
    store::ProjectStore,
};

pub const DELETE_PROMPT: &str = "Är du säker på att du vill ta bort detta projekt?";

#[derive(Debug, Error)]
pub enum ProjectSyncError {
    #[error("Failed to load projects: {0}")]
    Fetch(#[source] ProjectError),
    #[error("Failed to save project: {0}")]
    Write(#[source] ProjectError),
    #[error("Write to project {project_id} timed out after {timeout:?}")]
    Timeout {
        project_id: String,
        timeout: Duration,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Project {0} is not loaded")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(#[source] ProjectError),
}

impl ProjectSyncError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Write(ProjectError::Conflict { .. }))
    }
}

pub type Result<T> = std::result::Result<T, ProjectSyncError>;

/// Asks the user before a project is deleted.
#[async_trait]
pub trait ConfirmDeletion: Send + Sync {
    async fn confirm(&self, project: &Project) -> bool;
}

pub struct AlwaysConfirm;

#[async_trait]
impl ConfirmDeletion for AlwaysConfirm {
    async fn confirm(&self, _project: &Project) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct ClientState {
    projects: Vec<Project>,
    open: Option<String>,
}

impl ClientState {
    fn position(&self, project_id: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.id == project_id)
    }
}

/// In-memory view of the signed-in user's projects, kept in step with the
/// store.
///
/// Mutations are applied locally first. `create`, `update` and `delete`
/// write through and leave local state untouched on failure; `edit` hands
/// the result to the autosave queue.
pub struct ProjectSyncClient {
    store: Arc<dyn ProjectStore>,
    session: Session,
    autosave: AutosaveQueue,
    state: RwLock<ClientState>,
}

impl ProjectSyncClient {
    pub fn new(store: Arc<dyn ProjectStore>, session: Session, policy: AutosavePolicy) -> Self {
        Self {
            autosave: AutosaveQueue::new(store.clone(), policy),
            store,
            session,
            state: RwLock::new(ClientState::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.autosave.subscribe()
    }

    async fn bounded<T, F>(&self, project_id: &str, write: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ProjectError>>,
    {
        let timeout = self.autosave.policy().write_timeout;
        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result.map_err(ProjectSyncError::Write),
            Err(_) => Err(ProjectSyncError::Timeout {
                project_id: project_id.to_string(),
                timeout,
            }),
        }
    }

    /// Folds versions confirmed by the autosave queue into local copies.
    fn fold_confirmed(&self, state: &mut ClientState) {
        for project in &mut state.projects {
            if let Some(Confirmed {
                version,
                updated_at,
            }) = self.autosave.confirmed(&project.id)
                && version > project.version
            {
                project.version = version;
                project.updated_at = updated_at;
            }
        }
    }

    pub async fn projects(&self) -> Vec<Project> {
        let mut state = self.state.write().await;
        self.fold_confirmed(&mut state);
        state.projects.clone()
    }

    /// Re-reads the owner's projects. On failure the local list is kept.
    pub async fn refresh(&self) -> Result<Vec<Project>> {
        let owner_id = self.session.owner_id()?;
        let projects = self
            .store
            .list(owner_id)
            .await
            .map_err(ProjectSyncError::Fetch)?;

        for project in &projects {
            self.autosave.record_confirmed(
                &project.id,
                Confirmed {
                    version: project.version,
                    updated_at: project.updated_at,
                },
            );
        }

        let mut state = self.state.write().await;
        if let Some(open) = state.open.as_deref()
            && !projects.iter().any(|p| p.id == open)
        {
            state.open = None;
        }
        state.projects = projects.clone();
        Ok(projects)
    }

    pub async fn create(&self, data: &CreateProject) -> Result<Project> {
        let owner_id = self.session.owner_id()?;
        let draft = Project::draft(data, owner_id).map_err(ProjectSyncError::Validation)?;
        let stored = self.bounded(&draft.id, self.store.insert(&draft)).await?;

        tracing::info!("Created project {} ({})", stored.id, stored.name);
        self.state.write().await.projects.insert(0, stored.clone());
        Ok(stored)
    }

    /// Writes the whole document now. A stale version or a missing row is a
    /// `Write` error.
    ///
    /// Autosave writes of the same document wait until this one is done.
    pub async fn update(&self, mut project: Project) -> Result<Project> {
        project.owner_id = self.session.owner_id()?;
        self.autosave.flush(&project.id).await;

        let guard = self.autosave.lock_writes(&project.id).await;
        if let Some(confirmed) = self.autosave.confirmed(&project.id)
            && confirmed.version > project.version
        {
            project.version = confirmed.version;
        }

        let stored = self
            .bounded(&project.id, self.store.replace(&project))
            .await
            .inspect_err(|err| tracing::warn!("Update of project {} failed: {err}", project.id))?;

        self.autosave.record_confirmed(
            &stored.id,
            Confirmed {
                version: stored.version,
                updated_at: stored.updated_at,
            },
        );
        drop(guard);

        let mut state = self.state.write().await;
        if let Some(index) = state.position(&stored.id) {
            state.projects[index] = stored.clone();
        }
        Ok(stored)
    }

    /// Deletes after confirmation. Returns `false` when the user declined.
    pub async fn delete(&self, project_id: &str, confirm: &dyn ConfirmDeletion) -> Result<bool> {
        let owner_id = self.session.owner_id()?;
        let project = {
            let state = self.state.read().await;
            state
                .position(project_id)
                .map(|index| state.projects[index].clone())
                .ok_or_else(|| ProjectSyncError::NotFound(project_id.to_string()))?
        };
        if !confirm.confirm(&project).await {
            return Ok(false);
        }

        self.autosave.discard(project_id);
        self.autosave.flush(project_id).await;
        self.bounded(project_id, self.store.delete(project_id, owner_id))
            .await?;
        self.autosave.forget(project_id);

        tracing::info!("Deleted project {project_id}");
        let mut state = self.state.write().await;
        if let Some(index) = state.position(project_id) {
            state.projects.remove(index);
        }
        if state.open.as_deref() == Some(project_id) {
            state.open = None;
        }
        Ok(true)
    }

    pub async fn open(&self, project_id: &str) -> Result<Project> {
        let mut state = self.state.write().await;
        self.fold_confirmed(&mut state);
        let index = state
            .position(project_id)
            .ok_or_else(|| ProjectSyncError::NotFound(project_id.to_string()))?;
        state.open = Some(project_id.to_string());
        Ok(state.projects[index].clone())
    }

    pub async fn current(&self) -> Option<Project> {
        let mut state = self.state.write().await;
        self.fold_confirmed(&mut state);
        let open = state.open.clone()?;
        state.position(&open).map(|index| state.projects[index].clone())
    }

    /// Leaves the open project: waits for its pending writes, then reloads
    /// the list.
    pub async fn close(&self) -> Result<Vec<Project>> {
        let open = self.state.write().await.open.take();
        if let Some(project_id) = open {
            self.autosave.flush(&project_id).await;
        }
        self.refresh().await
    }

    /// Applies `mutate` to the open project and queues the result for
    /// autosave. A failed mutation leaves the project unchanged.
    pub async fn edit<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Project) -> std::result::Result<T, ProjectError>,
    {
        self.session.owner_id()?;
        let mut state = self.state.write().await;
        self.fold_confirmed(&mut state);
        let open = state
            .open
            .clone()
            .ok_or_else(|| ProjectSyncError::NotFound("(none open)".to_string()))?;
        let index = state
            .position(&open)
            .ok_or(ProjectSyncError::NotFound(open))?;

        let mut working = state.projects[index].clone();
        let output = mutate(&mut working).map_err(ProjectSyncError::Validation)?;
        state.projects[index] = working.clone();
        drop(state);

        self.autosave.schedule(working);
        Ok(output)
    }

    pub async fn flush(&self) {
        self.autosave.flush_all().await;
        let mut state = self.state.write().await;
        self.fold_confirmed(&mut state);
    }

    pub async fn stats(&self) -> DashboardStats {
        DashboardStats::from_projects(&self.projects().await)
    }

    /// Flushes pending writes, ends the session and forgets all local state.
    pub async fn sign_out(&self) -> Result<()> {
        self.autosave.flush_all().await;
        self.session.sign_out().await?;
        *self.state.write().await = ClientState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;
    use db::types::{RiskSeverity, TaskColumn};
    use db::models::risk::CreateRisk;
    use uuid::Uuid;

    use super::*;
    use crate::services::{
        autosave::WriteFailure,
        session::{ConfiguredIdentity, Principal},
        store::testing::FlakyStore,
    };

    struct Decline;

    #[async_trait]
    impl ConfirmDeletion for Decline {
        async fn confirm(&self, _project: &Project) -> bool {
            false
        }
    }

    fn form(name: &str) -> CreateProject {
        CreateProject {
            name: name.to_string(),
            client: "Acme".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 3),
            ..Default::default()
        }
    }

    async fn session_for(owner: Uuid) -> Session {
        let provider = Arc::new(ConfiguredIdentity::new(Principal {
            id: owner,
            email: None,
        }));
        Session::acquire(provider).await.unwrap()
    }

    async fn client_with(store: Arc<FlakyStore>) -> ProjectSyncClient {
        let policy = AutosavePolicy {
            debounce: Duration::from_millis(20),
            write_timeout: Duration::from_secs(5),
        };
        ProjectSyncClient::new(store, session_for(Uuid::new_v4()).await, policy)
    }

    #[tokio::test]
    async fn sommargala_scenario() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;

        let created = client.create(&form("Sommargala")).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.tasks.total(), 0);
        assert!(created.risks.is_empty() && created.work_orders.is_empty());
        assert!(created.notes.is_empty());
        assert!(created.brand.logos.is_empty() && created.brand.colors.is_empty());

        client.open(&created.id).await.unwrap();
        let task_id = client
            .edit(|p| Ok(p.add_task(TaskColumn::Todo, "Boka lokal").id.clone()))
            .await
            .unwrap();
        client
            .edit(|p| p.move_task(&task_id, TaskColumn::Todo, TaskColumn::InProgress))
            .await
            .unwrap();
        client
            .edit(|p| p.move_task(&task_id, TaskColumn::InProgress, TaskColumn::Done))
            .await
            .unwrap();

        let before = client.stats().await.critical_risks;
        client
            .edit(|p| {
                p.add_risk(CreateRisk {
                    description: "Regn".to_string(),
                    severity: RiskSeverity::High,
                    mitigation: None,
                });
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(client.stats().await.critical_risks, before + 1);

        let listed = client.close().await.unwrap();
        let stored = &listed[0];
        assert_eq!(stored.tasks.total(), 1);
        assert_eq!(stored.tasks.done.len(), 1);
        assert_eq!(stored.tasks.done[0].text, "Boka lokal");
        assert_eq!(stored.critical_risks(), 1);
        assert!(client.current().await.is_none());
    }

    #[tokio::test]
    async fn create_requires_all_fields_and_keeps_state_on_failure() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;

        let mut incomplete = form("Sommargala");
        incomplete.end_date = None;
        assert!(matches!(
            client.create(&incomplete).await,
            Err(ProjectSyncError::Validation(ProjectError::MissingFields(_)))
        ));

        store.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            client.create(&form("Mässa")).await,
            Err(ProjectSyncError::Write(_))
        ));
        assert!(client.projects().await.is_empty());
    }

    #[tokio::test]
    async fn created_projects_are_prepended() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store).await;

        let first = client.create(&form("Första")).await.unwrap();
        let second = client.create(&form("Andra")).await.unwrap();
        let ids: Vec<String> = client.projects().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        let refreshed = client.refresh().await.unwrap();
        assert_eq!(refreshed[0], second);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_local_list() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        client.create(&form("Sommargala")).await.unwrap();

        store.fail_reads.store(true, Ordering::SeqCst);
        assert!(matches!(
            client.refresh().await,
            Err(ProjectSyncError::Fetch(_))
        ));
        assert_eq!(client.projects().await.len(), 1);
    }

    #[tokio::test]
    async fn update_with_stale_version_is_a_conflict() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        let created = client.create(&form("Sommargala")).await.unwrap();

        let mut renamed = created.clone();
        renamed.name = "Vintergala".to_string();
        let saved = client.update(renamed).await.unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(client.projects().await[0].name, "Vintergala");

        // Someone else writes version 3.
        let mut external = saved.clone();
        external.next_step = "Extern".to_string();
        store.replace(&external).await.unwrap();

        let mut stale = saved.clone();
        stale.name = "Höstgala".to_string();
        let err = client.update(stale).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(client.projects().await[0].name, "Vintergala");
        assert_eq!(store.list(created.owner_id).await.unwrap()[0].name, "Vintergala");
    }

    async fn set_next_step(client: &ProjectSyncClient, step: &str) {
        client
            .edit(|p| {
                p.next_step = step.to_string();
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_recovers_autosave_after_conflict() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        let mut events = client.subscribe();
        let created = client.create(&form("Sommargala")).await.unwrap();
        client.open(&created.id).await.unwrap();

        set_next_step(&client, "Ring").await;
        client.flush().await;
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::Saved { version: 2, .. }
        ));

        let mut external = store.list(created.owner_id).await.unwrap().remove(0);
        external.name = "Vintergala".to_string();
        store.replace(&external).await.unwrap();

        set_next_step(&client, "Boka").await;
        client.flush().await;
        match events.recv().await.unwrap() {
            SyncEvent::Failed { failure, .. } => assert_eq!(failure, WriteFailure::Conflict),
            other => panic!("unexpected event {other:?}"),
        }

        client.refresh().await.unwrap();
        assert_eq!(client.current().await.unwrap().version, 3);
        set_next_step(&client, "Boka lokal").await;
        client.flush().await;
        match events.recv().await.unwrap() {
            SyncEvent::Saved { version, .. } => assert_eq!(version, 4),
            other => panic!("unexpected event {other:?}"),
        }

        let stored = store.list(created.owner_id).await.unwrap().remove(0);
        assert_eq!(stored.name, "Vintergala");
        assert_eq!(stored.next_step, "Boka lokal");
    }

    #[tokio::test]
    async fn edit_during_update_waits_for_it() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        let mut events = client.subscribe();
        let created = client.create(&form("Sommargala")).await.unwrap();
        client.open(&created.id).await.unwrap();
        store.set_replace_delay(Duration::from_millis(150));

        let mut renamed = created.clone();
        renamed.name = "Vintergala".to_string();
        let (updated, _) = tokio::join!(client.update(renamed), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            set_next_step(&client, "Ring").await;
        });
        assert_eq!(updated.unwrap().version, 2);
        client.flush().await;

        match events.recv().await.unwrap() {
            SyncEvent::Saved { version, .. } => assert_eq!(version, 3),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(store.replace_count(), 2);
        let stored = store.list(created.owner_id).await.unwrap().remove(0);
        assert_eq!(stored.next_step, "Ring");
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn update_cannot_touch_another_owners_project() {
        let store = Arc::new(FlakyStore::new().await);
        let owner_client = client_with(store.clone()).await;
        let intruder = client_with(store.clone()).await;
        let created = owner_client.create(&form("Sommargala")).await.unwrap();

        let mut hijacked = created.clone();
        hijacked.name = "Kapad".to_string();
        assert!(matches!(
            intruder.update(hijacked).await,
            Err(ProjectSyncError::Write(ProjectError::ProjectNotFound))
        ));
        assert_eq!(owner_client.refresh().await.unwrap()[0].name, "Sommargala");
    }

    #[tokio::test]
    async fn delete_honours_confirmation() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        let keep = client.create(&form("Behåll")).await.unwrap();
        let doomed = client.create(&form("Ta bort")).await.unwrap();
        client.open(&doomed.id).await.unwrap();

        assert!(!client.delete(&doomed.id, &Decline).await.unwrap());
        assert_eq!(client.projects().await.len(), 2);

        assert!(client.delete(&doomed.id, &AlwaysConfirm).await.unwrap());
        assert!(client.current().await.is_none());
        assert!(client.autosave.confirmed(&doomed.id).is_none());
        let remaining = client.refresh().await.unwrap();
        assert_eq!(remaining, vec![keep]);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_project_untouched() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        let created = client.create(&form("Sommargala")).await.unwrap();
        client.open(&created.id).await.unwrap();

        let result = client
            .edit(|p| {
                p.next_step = "halvfärdig".to_string();
                p.move_task("missing", TaskColumn::Todo, TaskColumn::Done)
            })
            .await;
        assert!(matches!(result, Err(ProjectSyncError::Validation(_))));
        assert_eq!(client.current().await.unwrap().next_step, "");
        client.flush().await;
        assert_eq!(store.replace_count(), 0);
    }

    #[tokio::test]
    async fn rapid_edits_write_once_and_fold_version() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store.clone()).await;
        let created = client.create(&form("Sommargala")).await.unwrap();
        client.open(&created.id).await.unwrap();

        for step in ["R", "Ri", "Ring"] {
            client
                .edit(|p| {
                    p.next_step = step.to_string();
                    Ok(())
                })
                .await
                .unwrap();
        }
        client.flush().await;

        assert_eq!(store.replace_count(), 1);
        assert_eq!(client.current().await.unwrap().version, 2);

        // A direct update after autosave builds on the folded version.
        let mut project = client.current().await.unwrap();
        project.name = "Sommargala 2026".to_string();
        assert_eq!(client.update(project).await.unwrap().version, 3);
    }

    #[tokio::test]
    async fn sign_out_clears_state_and_blocks_further_calls() {
        let store = Arc::new(FlakyStore::new().await);
        let client = client_with(store).await;
        client.create(&form("Sommargala")).await.unwrap();

        client.sign_out().await.unwrap();
        assert!(client.projects().await.is_empty());
        assert!(matches!(
            client.refresh().await,
            Err(ProjectSyncError::Session(SessionError::SignedOut))
        ));
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JsonValue, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    board::{Task, TaskBoard},
    brand::{Brand, ColorError, HexColor},
    ids::{self, next_entity_id},
    note::{Asset, Link, Note},
    risk::{self, CreateRisk, Risk},
    work_order::{CreateWorkOrder, WorkOrder},
};
use crate::{
    entities::project,
    types::{StatusMilestone, TaskColumn, WorkOrderStatus},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Project {id} was modified elsewhere (expected version {expected})")]
    Conflict { id: String, expected: i32 },
    #[error("Malformed {field} in project {id}: {source}")]
    Malformed {
        id: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("No {kind} with id {id}")]
    EntryNotFound { kind: &'static str, id: String },
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error(transparent)]
    Color(#[from] ColorError),
}

impl ProjectError {
    pub(crate) fn entry_not_found(kind: &'static str, id: &str) -> Self {
        Self::EntryNotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Milestone checkboxes. Any subset may be checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct StatusChecks {
    pub brief: bool,
    pub design: bool,
    pub produktion: bool,
    pub leverans: bool,
    pub klar: bool,
}

impl StatusChecks {
    pub fn get(&self, milestone: StatusMilestone) -> bool {
        match milestone {
            StatusMilestone::Brief => self.brief,
            StatusMilestone::Design => self.design,
            StatusMilestone::Produktion => self.produktion,
            StatusMilestone::Leverans => self.leverans,
            StatusMilestone::Klar => self.klar,
        }
    }

    pub fn set(&mut self, milestone: StatusMilestone, checked: bool) {
        let slot = match milestone {
            StatusMilestone::Brief => &mut self.brief,
            StatusMilestone::Design => &mut self.design,
            StatusMilestone::Produktion => &mut self.produktion,
            StatusMilestone::Leverans => &mut self.leverans,
            StatusMilestone::Klar => &mut self.klar,
        };
        *slot = checked;
    }

    /// Flips a milestone and returns its new value.
    pub fn toggle(&mut self, milestone: StatusMilestone) -> bool {
        let checked = !self.get(milestone);
        self.set(milestone, checked);
        checked
    }

    /// The furthest checked milestone, `Brief` when nothing is checked.
    pub fn stage(&self) -> StatusMilestone {
        [
            StatusMilestone::Klar,
            StatusMilestone::Leverans,
            StatusMilestone::Produktion,
            StatusMilestone::Design,
            StatusMilestone::Brief,
        ]
        .into_iter()
        .find(|milestone| self.get(*milestone))
        .unwrap_or(StatusMilestone::Brief)
    }
}

/// The project aggregate: the unit of ownership and of every store read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Project {
    pub id: String,
    #[serde(alias = "user_id")]
    pub owner_id: Uuid,
    pub name: String,
    pub client: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub next_step: String,
    #[serde(default)]
    pub status_checks: StatusChecks,
    #[serde(default)]
    pub tasks: TaskBoard,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub work_orders: Vec<WorkOrder>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub venues: Vec<Asset>,
    #[serde(default)]
    pub shared_images: Vec<Asset>,
    #[serde(default)]
    pub brand: Brand,
    /// Bumped by the store on every accepted update.
    pub version: i32,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// Form input for a new project.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(default)]
pub struct CreateProject {
    pub name: String,
    pub client: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status_checks: StatusChecks,
    pub next_step: String,
}

impl CreateProject {
    fn required_dates(&self) -> Result<(NaiveDate, NaiveDate), ProjectError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.client.trim().is_empty() {
            missing.push("client");
        }
        if self.start_date.is_none() {
            missing.push("start_date");
        }
        if self.end_date.is_none() {
            missing.push("end_date");
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if missing.is_empty() => Ok((start, end)),
            _ => Err(ProjectError::MissingFields(missing)),
        }
    }
}

/// Overview edits. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(default)]
pub struct UpdateOverview {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub next_step: Option<String>,
}

fn decode<T: DeserializeOwned + Default>(
    id: &str,
    field: &'static str,
    value: JsonValue,
) -> Result<T, ProjectError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|source| ProjectError::Malformed {
        id: id.to_string(),
        field,
        source,
    })
}

fn encode<T: Serialize>(value: &T) -> Result<JsonValue, DbErr> {
    serde_json::to_value(value).map_err(|err| DbErr::Custom(err.to_string()))
}

fn remove_entry<T>(
    items: &mut Vec<T>,
    kind: &'static str,
    id: &str,
    id_of: impl Fn(&T) -> &str,
) -> Result<T, ProjectError> {
    let index = items
        .iter()
        .position(|item| id_of(item) == id)
        .ok_or_else(|| ProjectError::entry_not_found(kind, id))?;
    Ok(items.remove(index))
}

fn remove_at(
    items: &mut Vec<String>,
    kind: &'static str,
    index: usize,
) -> Result<String, ProjectError> {
    if index >= items.len() {
        return Err(ProjectError::entry_not_found(kind, &index.to_string()));
    }
    Ok(items.remove(index))
}

impl Project {
    /// Builds a new document for `owner_id` with every nested collection empty.
    pub fn draft(data: &CreateProject, owner_id: Uuid) -> Result<Self, ProjectError> {
        let (start_date, end_date) = data.required_dates()?;
        let now = Utc::now();
        Ok(Self {
            id: next_entity_id(),
            owner_id,
            name: data.name.trim().to_string(),
            client: data.client.trim().to_string(),
            start_date,
            end_date,
            next_step: data.next_step.clone(),
            status_checks: data.status_checks,
            tasks: TaskBoard::default(),
            risks: Vec::new(),
            work_orders: Vec::new(),
            notes: Vec::new(),
            links: Vec::new(),
            venues: Vec::new(),
            shared_images: Vec::new(),
            brand: Brand::default(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    fn from_model(model: project::Model) -> Result<Self, ProjectError> {
        let id = model.doc_id;
        Ok(Self {
            status_checks: decode(&id, "status_checks", model.status_checks)?,
            tasks: decode(&id, "tasks", model.tasks)?,
            risks: decode(&id, "risks", model.risks)?,
            work_orders: decode(&id, "work_orders", model.work_orders)?,
            notes: decode(&id, "notes", model.notes)?,
            links: decode(&id, "links", model.links)?,
            venues: decode(&id, "venues", model.venues)?,
            shared_images: decode(&id, "shared_images", model.shared_images)?,
            brand: decode(&id, "brand", model.brand)?,
            owner_id: model.owner_id,
            name: model.name,
            client: model.client,
            start_date: model.start_date,
            end_date: model.end_date,
            next_step: model.next_step,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            id,
        })
    }

    /// Every column a full-document write carries, without keys or timestamps.
    fn document_columns(&self) -> Result<project::ActiveModel, DbErr> {
        Ok(project::ActiveModel {
            name: Set(self.name.clone()),
            client: Set(self.client.clone()),
            start_date: Set(self.start_date),
            end_date: Set(self.end_date),
            next_step: Set(self.next_step.clone()),
            status_checks: Set(encode(&self.status_checks)?),
            tasks: Set(encode(&self.tasks)?),
            risks: Set(encode(&self.risks)?),
            work_orders: Set(encode(&self.work_orders)?),
            notes: Set(encode(&self.notes)?),
            links: Set(encode(&self.links)?),
            venues: Set(encode(&self.venues)?),
            shared_images: Set(encode(&self.shared_images)?),
            brand: Set(encode(&self.brand)?),
            ..Default::default()
        })
    }

    /// All projects owned by `owner_id`, newest first. Rows that no longer
    /// decode are logged and left out.
    pub async fn find_by_owner<C: ConnectionTrait>(
        db: &C,
        owner_id: Uuid,
    ) -> Result<Vec<Self>, ProjectError> {
        let records = project::Entity::find()
            .filter(project::Column::OwnerId.eq(owner_id))
            .order_by_desc(project::Column::CreatedAt)
            .order_by_desc(project::Column::Id)
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .filter_map(|model| match Self::from_model(model) {
                Ok(project) => Some(project),
                Err(err) => {
                    tracing::warn!("Skipping unreadable project: {err}");
                    None
                }
            })
            .collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: &str,
        owner_id: Uuid,
    ) -> Result<Option<Self>, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::DocId.eq(id))
            .filter(project::Column::OwnerId.eq(owner_id))
            .one(db)
            .await?;
        record.map(Self::from_model).transpose()
    }

    /// Inserts `draft` and returns the record as stored.
    pub async fn create<C: ConnectionTrait>(db: &C, draft: &Self) -> Result<Self, ProjectError> {
        let now = Utc::now();
        let mut active = draft.document_columns()?;
        active.doc_id = Set(draft.id.clone());
        active.owner_id = Set(draft.owner_id);
        active.version = Set(1);
        active.created_at = Set(now);
        active.updated_at = Set(now);

        let model = active.insert(db).await?;
        tracing::debug!("Created project {} for {}", model.doc_id, model.owner_id);
        Self::from_model(model)
    }

    /// Replaces the whole document, guarded by `{id, owner_id, version}`.
    ///
    /// A write that matches no row is an error: `Conflict` when the document
    /// exists at another version, `ProjectNotFound` otherwise.
    pub async fn replace<C: ConnectionTrait>(db: &C, snapshot: &Self) -> Result<Self, ProjectError> {
        let now = Utc::now();
        let next_version = snapshot.version + 1;
        let mut active = snapshot.document_columns()?;
        active.version = Set(next_version);
        active.updated_at = Set(now);

        let result = project::Entity::update_many()
            .set(active)
            .filter(project::Column::DocId.eq(snapshot.id.as_str()))
            .filter(project::Column::OwnerId.eq(snapshot.owner_id))
            .filter(project::Column::Version.eq(snapshot.version))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(
                match ids::project_row_id(db, &snapshot.id, snapshot.owner_id).await? {
                    Some(_) => ProjectError::Conflict {
                        id: snapshot.id.clone(),
                        expected: snapshot.version,
                    },
                    None => ProjectError::ProjectNotFound,
                },
            );
        }

        let mut stored = snapshot.clone();
        stored.version = next_version;
        stored.updated_at = now;
        Ok(stored)
    }

    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        id: &str,
        owner_id: Uuid,
    ) -> Result<u64, ProjectError> {
        let result = project::Entity::delete_many()
            .filter(project::Column::DocId.eq(id))
            .filter(project::Column::OwnerId.eq(owner_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ProjectError::ProjectNotFound);
        }
        Ok(result.rows_affected)
    }

    pub fn add_task(&mut self, column: TaskColumn, text: impl Into<String>) -> &Task {
        self.tasks.add(column, text)
    }

    pub fn move_task(
        &mut self,
        task_id: &str,
        from: TaskColumn,
        to: TaskColumn,
    ) -> Result<(), ProjectError> {
        self.tasks.move_task(task_id, from, to)
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<Task, ProjectError> {
        self.tasks.remove(task_id)
    }

    pub fn add_risk(&mut self, data: CreateRisk) -> &Risk {
        self.risks.push(Risk::new(data));
        &self.risks[self.risks.len() - 1]
    }

    pub fn remove_risk(&mut self, risk_id: &str) -> Result<Risk, ProjectError> {
        remove_entry(&mut self.risks, "risk", risk_id, |risk| risk.id.as_str())
    }

    pub fn critical_risks(&self) -> usize {
        risk::critical_count(&self.risks)
    }

    pub fn add_work_order(&mut self, data: CreateWorkOrder) -> &WorkOrder {
        self.work_orders.push(WorkOrder::new(data));
        &self.work_orders[self.work_orders.len() - 1]
    }

    fn work_order_mut(&mut self, order_id: &str) -> Result<&mut WorkOrder, ProjectError> {
        self.work_orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or_else(|| ProjectError::entry_not_found("work order", order_id))
    }

    pub fn set_work_order_status(
        &mut self,
        order_id: &str,
        status: WorkOrderStatus,
    ) -> Result<(), ProjectError> {
        self.work_order_mut(order_id)?.status = status;
        Ok(())
    }

    pub fn set_work_order_image(
        &mut self,
        order_id: &str,
        image: Option<String>,
    ) -> Result<(), ProjectError> {
        self.work_order_mut(order_id)?.image = image;
        Ok(())
    }

    pub fn remove_work_order(&mut self, order_id: &str) -> Result<WorkOrder, ProjectError> {
        remove_entry(&mut self.work_orders, "work order", order_id, |order| order.id.as_str())
    }

    pub fn add_note(&mut self, text: impl Into<String>) -> &Note {
        self.notes.push(Note::new(text));
        &self.notes[self.notes.len() - 1]
    }

    pub fn remove_note(&mut self, note_id: &str) -> Result<Note, ProjectError> {
        remove_entry(&mut self.notes, "note", note_id, |note| note.id.as_str())
    }

    pub fn add_link(&mut self, title: impl Into<String>, url: impl Into<String>) -> &Link {
        self.links.push(Link::new(title, url));
        &self.links[self.links.len() - 1]
    }

    pub fn remove_link(&mut self, link_id: &str) -> Result<Link, ProjectError> {
        remove_entry(&mut self.links, "link", link_id, |link| link.id.as_str())
    }

    pub fn add_venue(&mut self, name: impl Into<String>, data: String) -> &Asset {
        self.venues.push(Asset::new(name, data));
        &self.venues[self.venues.len() - 1]
    }

    pub fn remove_venue(&mut self, asset_id: &str) -> Result<Asset, ProjectError> {
        remove_entry(&mut self.venues, "venue", asset_id, |asset| asset.id.as_str())
    }

    pub fn add_shared_image(&mut self, name: impl Into<String>, data: String) -> &Asset {
        self.shared_images.push(Asset::new(name, data));
        &self.shared_images[self.shared_images.len() - 1]
    }

    pub fn remove_shared_image(&mut self, asset_id: &str) -> Result<Asset, ProjectError> {
        remove_entry(&mut self.shared_images, "shared image", asset_id, |asset| asset.id.as_str())
    }

    pub fn add_brand_color(&mut self, input: &str) -> Result<&HexColor, ProjectError> {
        Ok(self.brand.add_color(input)?)
    }

    pub fn remove_brand_color(&mut self, input: &str) -> Result<bool, ProjectError> {
        Ok(self.brand.remove_color(input)?)
    }

    /// Appends a logo data URI and returns its position.
    pub fn add_brand_logo(&mut self, data: String) -> usize {
        self.brand.logos.push(data);
        self.brand.logos.len() - 1
    }

    pub fn remove_brand_logo(&mut self, index: usize) -> Result<String, ProjectError> {
        remove_at(&mut self.brand.logos, "logo", index)
    }

    /// Appends a reference image data URI and returns its position.
    pub fn add_reference_image(&mut self, data: String) -> usize {
        self.brand.reference_images.push(data);
        self.brand.reference_images.len() - 1
    }

    pub fn remove_reference_image(&mut self, index: usize) -> Result<String, ProjectError> {
        remove_at(&mut self.brand.reference_images, "reference image", index)
    }

    pub fn update_overview(&mut self, update: UpdateOverview) {
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
        if let Some(next_step) = update.next_step {
            self.next_step = next_step;
        }
    }

    pub fn toggle_status(&mut self, milestone: StatusMilestone) -> bool {
        self.status_checks.toggle(milestone)
    }

    pub fn is_completed(&self) -> bool {
        self.status_checks.klar
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::types::RiskSeverity;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn sommargala() -> CreateProject {
        CreateProject {
            name: "Sommargala".to_string(),
            client: "Acme".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 3),
            ..Default::default()
        }
    }

    #[test]
    fn draft_requires_all_form_fields() {
        let err = Project::draft(&CreateProject::default(), Uuid::new_v4()).unwrap_err();
        match err {
            ProjectError::MissingFields(fields) => {
                assert_eq!(fields, vec!["name", "client", "start_date", "end_date"])
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut data = sommargala();
        data.client = "   ".to_string();
        assert!(matches!(
            Project::draft(&data, Uuid::new_v4()),
            Err(ProjectError::MissingFields(fields)) if fields == vec!["client"]
        ));
    }

    #[test]
    fn draft_scaffolds_empty_collections() {
        let project = Project::draft(&sommargala(), Uuid::new_v4()).unwrap();
        assert!(!project.id.is_empty());
        assert_eq!(project.tasks.total(), 0);
        assert!(project.risks.is_empty());
        assert!(project.work_orders.is_empty());
        assert!(project.notes.is_empty());
        assert_eq!(project.brand, Brand::default());
        assert_eq!(project.version, 1);
    }

    #[test]
    fn stage_reports_furthest_checked_milestone() {
        let mut checks = StatusChecks::default();
        assert_eq!(checks.stage(), StatusMilestone::Brief);
        checks.toggle(StatusMilestone::Produktion);
        checks.toggle(StatusMilestone::Design);
        assert_eq!(checks.stage(), StatusMilestone::Produktion);
        assert!(!checks.toggle(StatusMilestone::Produktion));
        assert_eq!(checks.stage(), StatusMilestone::Design);
    }

    #[test]
    fn absent_collections_deserialize_as_empty() {
        let raw = serde_json::json!({
            "id": "1",
            "user_id": Uuid::nil(),
            "name": "Mässa",
            "client": "Beta AB",
            "start_date": "2026-09-01",
            "end_date": "2026-09-02",
            "version": 1,
            "created_at": "2026-08-01T08:00:00Z",
            "updated_at": "2026-08-01T08:00:00Z"
        });
        let project: Project = serde_json::from_value(raw).unwrap();
        assert_eq!(project.tasks.total(), 0);
        assert!(project.links.is_empty());
        assert!(project.brand.colors.is_empty());
        assert!(!project.status_checks.klar);
    }

    #[tokio::test]
    async fn sommargala_end_to_end() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();

        let draft = Project::draft(&sommargala(), owner).unwrap();
        let mut project = Project::create(&db, &draft).await.unwrap();
        assert_eq!(project.id, draft.id);
        assert_eq!(project.tasks.total(), 0);
        assert!(project.work_orders.is_empty());

        let task_id = project.add_task(TaskColumn::Todo, "Boka lokal").id.clone();
        project
            .move_task(&task_id, TaskColumn::Todo, TaskColumn::InProgress)
            .unwrap();
        project
            .move_task(&task_id, TaskColumn::InProgress, TaskColumn::Done)
            .unwrap();
        assert_eq!(project.critical_risks(), 0);
        project.add_risk(CreateRisk {
            description: "Regn".to_string(),
            severity: RiskSeverity::High,
            mitigation: Some("Tält".to_string()),
        });

        let stored = Project::replace(&db, &project).await.unwrap();
        assert_eq!(stored.version, 2);

        let loaded = Project::find_by_id(&db, &project.id, owner)
            .await
            .unwrap()
            .expect("project stored");
        assert_eq!(loaded.tasks.total(), 1);
        assert!(loaded.tasks.todo.is_empty());
        assert!(loaded.tasks.in_progress.is_empty());
        assert_eq!(loaded.tasks.done[0].text, "Boka lokal");
        assert_eq!(loaded.critical_risks(), 1);
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn find_by_owner_is_scoped_and_newest_first() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();
        let second = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();
        Project::create(&db, &Project::draft(&sommargala(), other).unwrap())
            .await
            .unwrap();

        let listed = Project::find_by_owner(&db, owner).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[tokio::test]
    async fn unreadable_row_does_not_hide_the_others() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let healthy = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();
        let broken = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();

        project::Entity::update_many()
            .set(project::ActiveModel {
                brand: Set(serde_json::json!({ "colors": ["nope"] })),
                ..Default::default()
            })
            .filter(project::Column::DocId.eq(broken.id.as_str()))
            .exec(&db)
            .await
            .unwrap();

        let listed = Project::find_by_owner(&db, owner).await.unwrap();
        assert_eq!(listed, vec![healthy]);
        assert!(matches!(
            Project::find_by_id(&db, &broken.id, owner).await,
            Err(ProjectError::Malformed { field: "brand", .. })
        ));
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_and_leaves_row_untouched() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let created = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();

        let mut first_edit = created.clone();
        first_edit.next_step = "Ring kunden".to_string();
        Project::replace(&db, &first_edit).await.unwrap();

        let mut stale_edit = created.clone();
        stale_edit.name = "Vintergala".to_string();
        let err = Project::replace(&db, &stale_edit).await.unwrap_err();
        assert!(matches!(err, ProjectError::Conflict { expected: 1, .. }));

        let loaded = Project::find_by_id(&db, &created.id, owner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "Sommargala");
        assert_eq!(loaded.next_step, "Ring kunden");
    }

    #[tokio::test]
    async fn writes_for_another_owner_match_nothing() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let created = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();

        let mut foreign = created.clone();
        foreign.owner_id = Uuid::new_v4();
        assert!(matches!(
            Project::replace(&db, &foreign).await,
            Err(ProjectError::ProjectNotFound)
        ));
        assert!(matches!(
            Project::delete(&db, &created.id, foreign.owner_id).await,
            Err(ProjectError::ProjectNotFound)
        ));
        assert!(Project::find_by_id(&db, &created.id, owner).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_document() {
        let db = setup_db().await;
        let owner = Uuid::new_v4();
        let keep = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();
        let drop = Project::create(&db, &Project::draft(&sommargala(), owner).unwrap())
            .await
            .unwrap();

        assert_eq!(Project::delete(&db, &drop.id, owner).await.unwrap(), 1);

        let listed = Project::find_by_owner(&db, owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], keep);
    }

    #[test]
    fn nested_entry_operations_report_missing_ids() {
        let mut project = Project::draft(&sommargala(), Uuid::new_v4()).unwrap();
        let order_id = project
            .add_work_order(CreateWorkOrder {
                title: "Scen".to_string(),
                material: None,
                description: None,
                image: None,
            })
            .id
            .clone();
        project
            .set_work_order_status(&order_id, WorkOrderStatus::Done)
            .unwrap();
        assert_eq!(project.work_orders[0].status, WorkOrderStatus::Done);

        assert!(matches!(
            project.remove_note("nope"),
            Err(ProjectError::EntryNotFound { kind: "note", .. })
        ));
        assert!(project.add_brand_color("xyz").is_err());
        assert_eq!(project.add_brand_color("fff").unwrap().as_str(), "#FFFFFF");
    }

    #[test]
    fn sub_collections_add_and_remove_by_id() {
        let mut project = Project::draft(&sommargala(), Uuid::new_v4()).unwrap();

        let note_id = project.add_note("Ring cateringen").id.clone();
        let link_id = project.add_link("Lokal", "https://example.com/lokal").id.clone();
        let venue_id = project
            .add_venue("plan.pdf", "data:application/pdf;base64,JVBERg==".to_string())
            .id
            .clone();
        let image_id = project
            .add_shared_image("scen.jpg", "data:image/jpeg;base64,/9j/".to_string())
            .id
            .clone();
        let risk_id = project
            .add_risk(CreateRisk {
                description: "Regn".to_string(),
                severity: RiskSeverity::High,
                mitigation: None,
            })
            .id
            .clone();

        assert_eq!(project.remove_note(&note_id).unwrap().text, "Ring cateringen");
        assert_eq!(project.remove_link(&link_id).unwrap().url, "https://example.com/lokal");
        assert_eq!(project.remove_venue(&venue_id).unwrap().name, "plan.pdf");
        assert_eq!(project.remove_shared_image(&image_id).unwrap().name, "scen.jpg");
        project.remove_risk(&risk_id).unwrap();
        assert_eq!(project.critical_risks(), 0);
        assert!(project.notes.is_empty() && project.links.is_empty());
        assert!(project.venues.is_empty() && project.shared_images.is_empty());

        assert!(matches!(
            project.remove_venue(&venue_id),
            Err(ProjectError::EntryNotFound { kind: "venue", .. })
        ));
    }

    #[test]
    fn work_order_image_and_removal() {
        let mut project = Project::draft(&sommargala(), Uuid::new_v4()).unwrap();
        let order_id = project
            .add_work_order(CreateWorkOrder {
                title: "Skylt".to_string(),
                material: Some("Aluminium".to_string()),
                description: None,
                image: None,
            })
            .id
            .clone();

        let image = "data:image/jpeg;base64,/9j/".to_string();
        project.set_work_order_image(&order_id, Some(image.clone())).unwrap();
        assert_eq!(project.work_orders[0].image, Some(image));
        project.set_work_order_image(&order_id, None).unwrap();
        assert!(project.work_orders[0].image.is_none());

        assert_eq!(project.remove_work_order(&order_id).unwrap().title, "Skylt");
        assert!(matches!(
            project.set_work_order_image(&order_id, None),
            Err(ProjectError::EntryNotFound { kind: "work order", .. })
        ));
    }

    #[test]
    fn brand_assets_are_addressed_by_position() {
        let mut project = Project::draft(&sommargala(), Uuid::new_v4()).unwrap();
        assert_eq!(project.add_brand_logo("data:image/png;base64,AA==".to_string()), 0);
        assert_eq!(project.add_brand_logo("data:image/png;base64,AQ==".to_string()), 1);
        assert_eq!(project.add_reference_image("data:image/jpeg;base64,/9j/".to_string()), 0);

        assert_eq!(project.remove_brand_logo(0).unwrap(), "data:image/png;base64,AA==");
        assert_eq!(project.brand.logos, vec!["data:image/png;base64,AQ==".to_string()]);
        assert!(matches!(
            project.remove_reference_image(3),
            Err(ProjectError::EntryNotFound { kind: "reference image", .. })
        ));
        project.remove_reference_image(0).unwrap();
        assert!(project.brand.reference_images.is_empty());

        project.add_brand_color("abc").unwrap();
        assert!(project.remove_brand_color("#AABBCC").unwrap());
        assert!(project.remove_brand_color("q").is_err());
    }

    #[test]
    fn overview_update_touches_only_given_fields() {
        let mut project = Project::draft(&sommargala(), Uuid::new_v4()).unwrap();
        project.update_overview(UpdateOverview {
            end_date: NaiveDate::from_ymd_opt(2026, 5, 4),
            next_step: Some("Skicka offert".to_string()),
            ..Default::default()
        });
        assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        assert_eq!(project.end_date, NaiveDate::from_ymd_opt(2026, 5, 4).unwrap());
        assert_eq!(project.next_step, "Skicka offert");
    }
}

use sea_orm::JsonValue;
use sea_orm::entity::prelude::*;

/// One project document. Nested collections are stored as JSON columns and
/// always replaced as a whole.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub doc_id: String,
    pub owner_id: Uuid,
    pub name: String,
    pub client: String,
    pub start_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "Text")]
    pub next_step: String,
    pub status_checks: JsonValue,
    pub tasks: JsonValue,
    pub risks: JsonValue,
    pub work_orders: JsonValue,
    pub notes: JsonValue,
    pub links: JsonValue,
    pub venues: JsonValue,
    pub shared_images: JsonValue,
    pub brand: JsonValue,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

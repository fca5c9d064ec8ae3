use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(ColumnDef::new(Projects::DocId).string().not_null())
                    .col(uuid_col(Projects::OwnerId))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Client).string().not_null())
                    .col(ColumnDef::new(Projects::StartDate).date().not_null())
                    .col(ColumnDef::new(Projects::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Projects::NextStep)
                            .text()
                            .not_null()
                            .default(Expr::val("")),
                    )
                    .col(json_col(Projects::StatusChecks, "{}"))
                    .col(json_col(Projects::Tasks, "{}"))
                    .col(json_col(Projects::Risks, "[]"))
                    .col(json_col(Projects::WorkOrders, "[]"))
                    .col(json_col(Projects::Notes, "[]"))
                    .col(json_col(Projects::Links, "[]"))
                    .col(json_col(Projects::Venues, "[]"))
                    .col(json_col(Projects::SharedImages, "[]"))
                    .col(json_col(Projects::Brand, "{}"))
                    .col(
                        ColumnDef::new(Projects::Version)
                            .integer()
                            .not_null()
                            .default(Expr::val(1)),
                    )
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_doc_id")
                    .table(Projects::Table)
                    .col(Projects::DocId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_owner_created_at")
                    .table(Projects::Table)
                    .col(Projects::OwnerId)
                    .col(Projects::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn json_col<T: Iden>(col: T, empty: &str) -> ColumnDef {
    ColumnDef::new(col)
        .json()
        .not_null()
        .default(Expr::val(empty))
        .to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    DocId,
    OwnerId,
    Name,
    Client,
    StartDate,
    EndDate,
    NextStep,
    StatusChecks,
    Tasks,
    Risks,
    WorkOrders,
    Notes,
    Links,
    Venues,
    SharedImages,
    Brand,
    Version,
    CreatedAt,
    UpdatedAt,
}

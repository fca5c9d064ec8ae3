use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::DbErr;

pub mod entities;
pub mod models;
pub mod types;

pub type DbPool = DatabaseConnection;

/// Handle on the authoritative project store.
#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connects to `database_url` (SQLite or Postgres) and brings the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .connect_timeout(Duration::from_secs(30))
            .sqlx_logging(false);
        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        tracing::debug!("Project store ready at {}", redact_url(database_url));
        Ok(DBService { pool })
    }
}

fn redact_url(url: &str) -> String {
    match url.split_once('@') {
        Some((_, host)) => match url.split_once("://") {
            Some((scheme, _)) => format!("{scheme}://***@{host}"),
            None => format!("***@{host}"),
        },
        None => url.to_string(),
    }
}

use sea_orm_migration::prelude::*;

mod m20260601000000_projects;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260601000000_projects::Migration)]
    }
}

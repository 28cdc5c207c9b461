pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260901_000001_organizations;
mod m20260901_000002_users;
mod m20260915_000001_registered_organizations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_organizations::Migration),
            Box::new(m20260901_000002_users::Migration),
            Box::new(m20260915_000001_registered_organizations::Migration),
        ]
    }
}

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use tracing::info;

use crate::error::AppResult;

pub async fn connect_source(url: &str) -> AppResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(url);
    opt.sqlx_logging(false);
    Ok(Database::connect(opt).await?)
}

pub async fn connect_destination(url: &str, schema: &str) -> AppResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(url);
    opt.sqlx_logging(true);
    if url.starts_with("postgres") {
        opt.set_schema_search_path(schema);
    }
    Ok(Database::connect(opt).await?)
}

pub async fn apply_schema(db: &DatabaseConnection, schema: &str) -> AppResult<()> {
    if db.get_database_backend() == DbBackend::Postgres {
        db.execute(Statement::from_string(
            DbBackend::Postgres,
            format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""),
        ))
        .await?;
    }
    Migrator::up(db, None).await?;
    info!(schema, "destination schema is up to date");
    Ok(())
}

pub mod entities;
pub mod enums;
pub mod import;
pub mod schema;
pub mod services;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Opens the connection pool and makes sure the schema exists.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);
    if database_url.starts_with("sqlite::memory:") {
        // Every in-memory SQLite connection is its own database.
        opt.max_connections(1).min_connections(1);
    }

    let db = Database::connect(opt).await?;
    schema::create_schema(&db).await?;
    info!(backend = ?db.get_database_backend(), "Database ready.");
    Ok(db)
}

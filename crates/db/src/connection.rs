use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use quotedesk_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

/// In-memory databases live per connection, so they are pinned to a single one.
pub async fn connect_with_config(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let max_connections = if config.url.contains(":memory:") { 1 } else { config.max_connections };
    connect_with_settings(&config.url, max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let url = normalize_url(database_url);
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
}

/// File URLs get `mode=rwc` so a fresh database file is created on first use.
fn normalize_url(database_url: &str) -> String {
    let url = database_url.trim();
    if url == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if url.starts_with("sqlite://") && !url.contains('?') && !url.contains(":memory:") {
        return format!("{url}?mode=rwc");
    }
    url.to_string()
}

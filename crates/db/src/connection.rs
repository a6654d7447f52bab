use std::time::Duration;

use oohquote_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Open the quote store described by the database configuration. SQLite
/// serializes writers, so the per-connection busy timeout mirrors the pool's
/// acquire timeout rather than carrying a second knob.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let timeout_secs = config.timeout_secs.max(1);
    let busy_timeout_ms = timeout_secs.saturating_mul(1000);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}

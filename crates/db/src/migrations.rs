use std::collections::BTreeSet;

use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply outstanding migrations and return the versions this run applied,
/// in order. An empty list means the schema was already current.
pub async fn run_pending(pool: &DbPool) -> Result<Vec<i64>, MigrateError> {
    let before = applied_versions(pool).await?;
    MIGRATOR.run(pool).await?;
    let after = applied_versions(pool).await?;
    Ok(after.into_iter().filter(|version| !before.contains(version)).collect())
}

/// Versions recorded in the sqlx migration ledger, if it exists yet.
async fn applied_versions(pool: &DbPool) -> Result<BTreeSet<i64>, MigrateError> {
    let ledger_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if ledger_exists == 0 {
        return Ok(BTreeSet::new());
    }

    let versions = sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations")
        .fetch_all(pool)
        .await?;
    Ok(versions.into_iter().collect())
}

use sqlx::Row;

use oohquote_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use oohquote_core::domain::session::QuoteOwner;

use super::{QuoteRepository, RepositoryError};
use crate::DbPool;

/// SQLite-backed quote store. The full quote is persisted as a JSON payload;
/// owner, status, and version are mirrored into columns for indexed lookup
/// and the optimistic-concurrency check.
pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_payload(payload: &str) -> Result<Quote, RepositoryError> {
    serde_json::from_str(payload).map_err(|err| RepositoryError::Decode(err.to_string()))
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM quotes WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode_payload(&row.get::<String, _>("payload"))).transpose()
    }

    async fn find_draft_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Option<Quote>, RepositoryError> {
        let (owner_kind, owner_key) = owner.as_parts();
        let row = sqlx::query(
            "SELECT payload FROM quotes
             WHERE owner_kind = ?1 AND owner_key = ?2 AND status = ?3
             ORDER BY updated_at DESC, id ASC
             LIMIT 1",
        )
        .bind(owner_kind)
        .bind(owner_key)
        .bind(QuoteStatus::Draft.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| decode_payload(&row.get::<String, _>("payload"))).transpose()
    }

    async fn list_drafts_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let (owner_kind, owner_key) = owner.as_parts();
        let rows = sqlx::query(
            "SELECT payload FROM quotes
             WHERE owner_kind = ?1 AND owner_key = ?2 AND status = ?3
             ORDER BY updated_at DESC, id ASC",
        )
        .bind(owner_kind)
        .bind(owner_key)
        .bind(QuoteStatus::Draft.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| decode_payload(&row.get::<String, _>("payload"))).collect()
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let payload =
            serde_json::to_string(&quote).map_err(|err| RepositoryError::Decode(err.to_string()))?;
        let (owner_kind, owner_key) = quote.owner.as_parts();

        let mut tx = self.pool.begin().await?;

        let stored_version = sqlx::query("SELECT version FROM quotes WHERE id = ?1")
            .bind(&quote.id.0)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get::<i64, _>("version") as u32);

        match stored_version {
            None => {
                sqlx::query(
                    "INSERT INTO quotes
                         (id, owner_kind, owner_key, status, version, payload, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .bind(&quote.id.0)
                .bind(owner_kind)
                .bind(owner_key)
                .bind(quote.status.as_str())
                .bind(quote.version as i64)
                .bind(&payload)
                .bind(quote.created_at.to_rfc3339())
                .bind(quote.updated_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            }
            Some(stored) => {
                if quote.version != stored + 1 {
                    return Err(RepositoryError::VersionConflict {
                        quote_id: quote.id.0.clone(),
                        expected: stored + 1,
                        found: quote.version,
                    });
                }
                sqlx::query(
                    "UPDATE quotes
                     SET owner_kind = ?2, owner_key = ?3, status = ?4, version = ?5,
                         payload = ?6, updated_at = ?7
                     WHERE id = ?1 AND version = ?8",
                )
                .bind(&quote.id.0)
                .bind(owner_kind)
                .bind(owner_key)
                .bind(quote.status.as_str())
                .bind(quote.version as i64)
                .bind(&payload)
                .bind(quote.updated_at.to_rfc3339())
                .bind(stored as i64)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM quotes WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use oohquote_core::config::DatabaseConfig;
    use oohquote_core::domain::quote::{Quote, QuoteId, QuoteStatus};
    use oohquote_core::domain::session::{QuoteOwner, SessionToken, UserId};

    use crate::migrations::run_pending;
    use crate::repositories::{QuoteRepository, RepositoryError, SqlQuoteRepository};
    use crate::{connect, DbPool};

    async fn test_pool() -> DbPool {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_owned(),
            max_connections: 1,
            timeout_secs: 30,
        };
        let pool = connect(&config).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn draft(id: &str, owner: QuoteOwner) -> Quote {
        Quote::new_draft(QuoteId(id.to_owned()), owner, Decimal::from(20))
    }

    #[tokio::test]
    async fn payload_round_trips_through_sqlite() {
        let repo = SqlQuoteRepository::new(test_pool().await);
        let owner = QuoteOwner::Session(SessionToken("sess-1".to_owned()));
        let quote = draft("QT-1", owner.clone());

        repo.save(quote.clone()).await.expect("save quote");

        let found = repo.find_by_id(&quote.id).await.expect("find quote");
        assert_eq!(found, Some(quote.clone()));

        let by_owner = repo.find_draft_for_owner(&owner).await.expect("find draft");
        assert_eq!(by_owner, Some(quote));
    }

    #[tokio::test]
    async fn draft_lookup_excludes_submitted_quotes() {
        let repo = SqlQuoteRepository::new(test_pool().await);
        let owner = QuoteOwner::User(UserId("U-1".to_owned()));

        let mut quote = draft("QT-1", owner.clone());
        repo.save(quote.clone()).await.expect("save draft");

        quote.status = QuoteStatus::Submitted;
        quote.version = 2;
        repo.save(quote).await.expect("save submitted");

        let found = repo.find_draft_for_owner(&owner).await.expect("lookup");
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn stale_writes_are_rejected() {
        let repo = SqlQuoteRepository::new(test_pool().await);
        let quote = draft("QT-1", QuoteOwner::User(UserId("U-1".to_owned())));

        repo.save(quote.clone()).await.expect("initial save");

        let mut fresh = quote.clone();
        fresh.version = 2;
        repo.save(fresh).await.expect("versioned update");

        let mut stale = quote.clone();
        stale.version = 2;
        let error = repo.save(stale).await.expect_err("stale write");
        assert!(matches!(
            error,
            RepositoryError::VersionConflict { expected: 3, found: 2, .. }
        ));

        // The losing write must not have clobbered anything.
        let stored = repo.find_by_id(&quote.id).await.expect("lookup").expect("present");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let repo = SqlQuoteRepository::new(test_pool().await);
        let quote = draft("QT-1", QuoteOwner::Session(SessionToken("sess-1".to_owned())));

        repo.save(quote.clone()).await.expect("save");
        repo.delete(&quote.id).await.expect("delete");

        let found = repo.find_by_id(&quote.id).await.expect("lookup");
        assert_eq!(found, None);
    }
}

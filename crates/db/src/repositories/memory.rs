use std::collections::HashMap;

use tokio::sync::RwLock;

use oohquote_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use oohquote_core::domain::session::QuoteOwner;

use super::{QuoteRepository, RepositoryError};

/// Test and demo double with the same version discipline as the SQL
/// repository.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn find_draft_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Option<Quote>, RepositoryError> {
        Ok(self.list_drafts_for_owner(owner).await?.into_iter().next())
    }

    async fn list_drafts_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut drafts: Vec<Quote> = quotes
            .values()
            .filter(|quote| quote.status == QuoteStatus::Draft && &quote.owner == owner)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(drafts)
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        if let Some(stored) = quotes.get(&quote.id.0) {
            if quote.version != stored.version + 1 {
                return Err(RepositoryError::VersionConflict {
                    quote_id: quote.id.0.clone(),
                    expected: stored.version + 1,
                    found: quote.version,
                });
            }
        }
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.remove(&id.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use oohquote_core::domain::quote::{Quote, QuoteId};
    use oohquote_core::domain::session::{QuoteOwner, SessionToken, UserId};

    use crate::repositories::{InMemoryQuoteRepository, QuoteRepository, RepositoryError};

    fn draft(id: &str, owner: QuoteOwner) -> Quote {
        Quote::new_draft(QuoteId(id.to_owned()), owner, Decimal::from(20))
    }

    #[tokio::test]
    async fn round_trip_and_owner_lookup() {
        let repo = InMemoryQuoteRepository::default();
        let owner = QuoteOwner::Session(SessionToken("sess-1".to_owned()));
        let quote = draft("QT-1", owner.clone());

        repo.save(quote.clone()).await.expect("save quote");

        let found = repo.find_by_id(&quote.id).await.expect("find quote");
        assert_eq!(found, Some(quote.clone()));

        let by_owner = repo.find_draft_for_owner(&owner).await.expect("find draft");
        assert_eq!(by_owner, Some(quote));

        let other = QuoteOwner::User(UserId("U-1".to_owned()));
        let none = repo.find_draft_for_owner(&other).await.expect("no draft");
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn stale_writes_are_rejected() {
        let repo = InMemoryQuoteRepository::default();
        let owner = QuoteOwner::User(UserId("U-1".to_owned()));
        let quote = draft("QT-1", owner);

        repo.save(quote.clone()).await.expect("initial save");

        let mut fresh = quote.clone();
        fresh.version = 2;
        repo.save(fresh).await.expect("versioned update");

        // A writer that read version 1 and never saw the update must fail.
        let mut stale = quote;
        stale.version = 2;
        let error = repo.save(stale).await.expect_err("stale write");
        assert!(matches!(
            error,
            RepositoryError::VersionConflict { expected: 3, found: 2, .. }
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let repo = InMemoryQuoteRepository::default();
        let quote = draft("QT-1", QuoteOwner::User(UserId("U-1".to_owned())));

        repo.save(quote.clone()).await.expect("save");
        repo.delete(&quote.id).await.expect("delete");

        let found = repo.find_by_id(&quote.id).await.expect("lookup");
        assert_eq!(found, None);
    }
}

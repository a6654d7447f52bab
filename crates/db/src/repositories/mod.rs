use async_trait::async_trait;
use thiserror::Error;

use oohquote_core::domain::quote::{Quote, QuoteId};
use oohquote_core::domain::session::QuoteOwner;

pub mod memory;
pub mod quote;

pub use memory::InMemoryQuoteRepository;
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("version conflict on quote {quote_id}: expected {expected}, found {found}")]
    VersionConflict { quote_id: String, expected: u32, found: u32 },
}

/// Persistence surface for quotes. `save` enforces optimistic concurrency:
/// the incoming quote's version must be exactly one ahead of the stored row
/// (or 1 for a new row), otherwise `VersionConflict` is returned and nothing
/// is written.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;

    /// The most recently updated draft for an owner, if any.
    async fn find_draft_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Option<Quote>, RepositoryError>;

    async fn list_drafts_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Vec<Quote>, RepositoryError>;

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError>;
}

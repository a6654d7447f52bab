use thiserror::Error;

use crate::domain::quote::{QuoteId, QuoteStatus};
use crate::lifecycle::TransitionError;
use crate::pricing::PricingError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("quote {quote_id:?} is {status:?} and no longer accepts line-item changes")]
    QuoteImmutable { quote_id: QuoteId, status: QuoteStatus },
    #[error("quote not found: {0:?}")]
    QuoteNotFound(QuoteId),
    #[error("quote {0:?} was modified concurrently; reload and retry")]
    ConcurrentMutationConflict(QuoteId),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Lifecycle violations and bad arguments are caller errors; everything
    /// else is infrastructure and worth a retry.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod service;

pub use connection::{connect, DbPool};
pub use repositories::{
    InMemoryQuoteRepository, QuoteRepository, RepositoryError, SqlQuoteRepository,
};
pub use service::{DispatchError, LoggingDispatcher, QuoteService, SideEffectDispatcher};

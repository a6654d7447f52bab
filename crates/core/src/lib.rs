pub mod aggregate;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod schedule;

pub use aggregate::{AggregationWarning, QuoteAggregator, QuoteSnapshot};
pub use catalog::{
    CatalogError, CreativeCostTier, DiscountTier, ProductionCostTier, RateCard, RateEntry,
    RateSource,
};
pub use domain::details::{
    ConfirmedDetails, ConfirmedItemDetails, ContactDetails, RejectionFeedback,
};
pub use domain::format::{FormatId, LocationId, MediaFormat};
pub use domain::quote::{LineItemId, Quote, QuoteId, QuoteLineItem, QuoteStatus, VatBreakdown};
pub use domain::session::{QuoteOwner, SessionToken, UserId};
pub use errors::{ApplicationError, DomainError};
pub use lifecycle::{LifecycleEvent, SideEffect, TransitionError, TransitionOutcome};
pub use pricing::{
    DeterministicPricingEngine, LineItemPricing, LineItemPricingInput, PricingEngine,
    PricingError, PricingSettings, PricingWarning,
};
pub use schedule::print_runs;

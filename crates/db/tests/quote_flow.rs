//! End-to-end flow against the SQLite repository: an anonymous visitor
//! configures two bookings, logs in, and the quote moves through the full
//! lifecycle.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;

use oohquote_core::audit::InMemoryAuditSink;
use oohquote_core::config::DatabaseConfig;
use oohquote_core::catalog::{DiscountTier, ProductionCostTier, RateCard, RateEntry};
use oohquote_core::domain::details::{ConfirmedDetails, RejectionFeedback};
use oohquote_core::domain::format::FormatId;
use oohquote_core::domain::quote::QuoteStatus;
use oohquote_core::domain::session::{QuoteOwner, SessionToken, UserId};
use oohquote_core::errors::{ApplicationError, DomainError};
use oohquote_core::lifecycle::LifecycleEvent;
use oohquote_core::pricing::{LineItemPricingInput, PricingSettings};
use oohquote_db::migrations::run_pending;
use oohquote_db::{connect, LoggingDispatcher, QuoteService, SqlQuoteRepository};

fn rate_card() -> RateCard {
    RateCard {
        rates: vec![RateEntry {
            format_id: FormatId("48-sheet".to_owned()),
            location_id: None,
            base_rate: Decimal::from(100),
            sale_price: None,
            reduced_price: None,
            markup_pct: Decimal::ZERO,
            enabled_periods: (1..=26).collect(),
        }],
        discount_tiers: vec![DiscountTier {
            format_id: FormatId("48-sheet".to_owned()),
            min_periods: 4,
            max_periods: None,
            discount_pct: Decimal::from(10),
        }],
        production_tiers: vec![ProductionCostTier {
            format_id: FormatId("48-sheet".to_owned()),
            location_id: None,
            min_units: 1,
            max_units: None,
            cost_per_unit: Decimal::from(20),
        }],
        creative_tiers: Vec::new(),
    }
}

async fn sqlite_service() -> QuoteService {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_owned(),
        max_connections: 1,
        timeout_secs: 30,
    };
    let pool = connect(&config).await.expect("connect");
    run_pending(&pool).await.expect("run migrations");

    QuoteService::new(
        Arc::new(SqlQuoteRepository::new(pool)),
        Arc::new(rate_card()),
        PricingSettings::default(),
        Arc::new(LoggingDispatcher),
        Arc::new(InMemoryAuditSink::default()),
    )
}

fn booking(periods: &[u32]) -> LineItemPricingInput {
    LineItemPricingInput {
        format_id: FormatId("48-sheet".to_owned()),
        locations: BTreeSet::new(),
        quantity: 1,
        selected_periods: periods.to_vec(),
        creative_asset_count: 0,
        category: None,
    }
}

#[tokio::test]
async fn anonymous_session_through_approval() {
    let service = sqlite_service().await;
    let session = SessionToken("sess-1".to_owned());
    let user = UserId("U-1".to_owned());

    let draft =
        service.start_draft(QuoteOwner::Session(session.clone())).await.expect("start draft");

    // Two bookings of the same format: 2 + 3 = 5 periods pulls the whole
    // group over the 4-period discount threshold.
    let first = service.add_item(&draft.id, &booking(&[1, 2]), "48 Sheet").await.expect("item 1");
    assert_eq!(first.quote.items[0].discount_pct, Decimal::ZERO);

    let second = service.add_item(&draft.id, &booking(&[3, 4, 5]), "48 Sheet").await.expect("item 2");
    for item in &second.quote.items {
        assert_eq!(item.discount_pct, Decimal::from(10));
    }

    // media 500 - 10% = 450, plus one 20-cost print run per item.
    assert_eq!(second.quote.total_cost, Decimal::from(490));
    assert_eq!(second.quote.vat.total_inc_vat, Decimal::from(588));

    // Login carries the draft over; a rerun is a no-op.
    let linked = service
        .link_session_to_user(&session, None, &user)
        .await
        .expect("link")
        .expect("carried draft");
    assert_eq!(linked.id, draft.id);
    assert_eq!(linked.owner, QuoteOwner::User(user.clone()));

    let relinked = service
        .link_session_to_user(&session, None, &user)
        .await
        .expect("relink")
        .expect("still the same draft");
    assert_eq!(relinked.id, linked.id);

    let (submitted, _) =
        service.transition(&draft.id, LifecycleEvent::Submit).await.expect("submit");
    assert_eq!(submitted.status, QuoteStatus::Submitted);

    // Post-draft quotes no longer accept line-item changes.
    let frozen = service
        .add_item(&draft.id, &booking(&[6]), "48 Sheet")
        .await
        .expect_err("submitted quote is immutable");
    assert!(matches!(frozen, ApplicationError::Domain(DomainError::QuoteImmutable { .. })));

    let confirm = LifecycleEvent::Confirm(ConfirmedDetails { items: Vec::new(), notes: None });
    let (confirmed, _) = service.transition(&draft.id, confirm).await.expect("confirm");
    assert_eq!(confirmed.status, QuoteStatus::Confirmed);

    let (approved, _) =
        service.transition(&draft.id, LifecycleEvent::Approve).await.expect("approve");
    assert_eq!(approved.status, QuoteStatus::Approved);

    // Costs never changed after submission.
    assert_eq!(approved.total_cost, second.quote.total_cost);
    assert_eq!(approved.vat, second.quote.vat);
}

#[tokio::test]
async fn rejection_is_terminal_and_keeps_feedback() {
    let service = sqlite_service().await;
    let owner = QuoteOwner::User(UserId("U-2".to_owned()));

    let draft = service.start_draft(owner).await.expect("start draft");
    service.add_item(&draft.id, &booking(&[10]), "48 Sheet").await.expect("item");

    service.transition(&draft.id, LifecycleEvent::Submit).await.expect("submit");
    service
        .transition(
            &draft.id,
            LifecycleEvent::Confirm(ConfirmedDetails { items: Vec::new(), notes: None }),
        )
        .await
        .expect("confirm");

    let reject = LifecycleEvent::Reject(RejectionFeedback {
        reason: "campaign postponed".to_owned(),
        requested_changes: None,
    });
    let (rejected, _) = service.transition(&draft.id, reject).await.expect("reject");
    assert_eq!(rejected.status, QuoteStatus::Rejected);
    assert_eq!(rejected.rejection.as_ref().map(|r| r.reason.as_str()), Some("campaign postponed"));

    let error = service
        .transition(&draft.id, LifecycleEvent::Approve)
        .await
        .expect_err("rejected is terminal");
    assert!(matches!(error, ApplicationError::Domain(DomainError::Transition(_))));
}

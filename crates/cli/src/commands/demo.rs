use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use oohquote_core::audit::InMemoryAuditSink;
use oohquote_core::catalog::{CreativeCostTier, DiscountTier, ProductionCostTier, RateCard, RateEntry};
use oohquote_core::domain::format::{FormatId, MediaFormat};
use oohquote_core::domain::session::{QuoteOwner, SessionToken, UserId};
use oohquote_core::errors::ApplicationError;
use oohquote_core::lifecycle::LifecycleEvent;
use oohquote_core::pricing::{LineItemPricingInput, PricingSettings};
use oohquote_db::{InMemoryQuoteRepository, LoggingDispatcher, QuoteService};

use crate::commands::CommandResult;

/// Scripted walkthrough: an anonymous visitor configures two 48-sheet
/// bookings, logs in, and submits. Everything runs in memory.
pub fn run() -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "demo",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(demo_flow());

    match result {
        Ok(data) => CommandResult::success_with_data("demo", "demo flow complete", data),
        Err(error) => CommandResult::failure("demo", "demo_flow", error.to_string(), 1),
    }
}

async fn demo_flow() -> Result<serde_json::Value, ApplicationError> {
    let service = QuoteService::new(
        Arc::new(InMemoryQuoteRepository::default()),
        Arc::new(demo_rate_card()),
        PricingSettings::default(),
        Arc::new(LoggingDispatcher),
        Arc::new(InMemoryAuditSink::default()),
    );

    let session = SessionToken("demo-session".to_owned());
    let user = UserId("demo-user".to_owned());
    let billboard = demo_format();

    let draft = service.start_draft(QuoteOwner::Session(session.clone())).await?;

    service
        .add_item(
            &draft.id,
            &LineItemPricingInput {
                format_id: billboard.id.clone(),
                locations: BTreeSet::new(),
                quantity: 2,
                selected_periods: vec![10, 11],
                creative_asset_count: 1,
                category: billboard.category.clone(),
            },
            &billboard.name,
        )
        .await?;

    let snapshot = service
        .add_item(
            &draft.id,
            &LineItemPricingInput {
                format_id: billboard.id.clone(),
                locations: BTreeSet::new(),
                quantity: 1,
                selected_periods: vec![12, 13],
                creative_asset_count: 0,
                category: billboard.category.clone(),
            },
            &billboard.name,
        )
        .await?;

    let linked = service.link_session_to_user(&session, None, &user).await?;
    let quote_id = linked.map(|quote| quote.id).unwrap_or(draft.id);

    let (submitted, outcome) = service.transition(&quote_id, LifecycleEvent::Submit).await?;

    Ok(json!({
        "quote": submitted,
        "group_warnings": snapshot.group_warnings,
        "side_effects": outcome.side_effects,
    }))
}

fn demo_format() -> MediaFormat {
    MediaFormat {
        id: FormatId("48-sheet".to_owned()),
        name: "48 Sheet Billboard".to_owned(),
        category: None,
        active: true,
    }
}

fn demo_rate_card() -> RateCard {
    let format = FormatId("48-sheet".to_owned());
    RateCard {
        rates: vec![RateEntry {
            format_id: format.clone(),
            location_id: None,
            base_rate: Decimal::from(275),
            sale_price: None,
            reduced_price: None,
            markup_pct: Decimal::from(10),
            enabled_periods: (1..=26).collect(),
        }],
        discount_tiers: vec![DiscountTier {
            format_id: format.clone(),
            min_periods: 4,
            max_periods: None,
            discount_pct: Decimal::from(10),
        }],
        production_tiers: vec![ProductionCostTier {
            format_id: format.clone(),
            location_id: None,
            min_units: 1,
            max_units: None,
            cost_per_unit: Decimal::from(18),
        }],
        creative_tiers: vec![CreativeCostTier {
            format_id: format,
            category: None,
            min_assets: 1,
            max_assets: None,
            cost_per_asset: Decimal::from(120),
        }],
    }
}

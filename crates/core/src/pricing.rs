//! The single source of truth for line-item pricing.
//!
//! Every caller (configurator estimates, quote aggregation, plan heuristics)
//! prices through this engine; nothing reimplements the rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::catalog::{
    resolve_creative_tier, resolve_discount_tier, resolve_production_tier, CatalogError,
    DiscountTier, RateSource,
};
use crate::domain::format::{FormatId, LocationId};
use crate::domain::quote::VatBreakdown;
use crate::money::{pct, round2};
use crate::schedule;

/// Tunable pricing defaults, sourced from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingSettings {
    pub vat_rate_pct: Decimal,
    /// Per-asset rate applied when no creative tier resolves; its use is
    /// always surfaced as a warning.
    pub default_creative_rate: Decimal,
    /// Built-in volume tier used only for formats with no configured
    /// discount tiers: `>= min periods` earns the flat percentage.
    pub default_discount_min_periods: u32,
    pub default_discount_pct: Decimal,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            vat_rate_pct: Decimal::from(20),
            default_creative_rate: Decimal::from(85),
            default_discount_min_periods: 3,
            default_discount_pct: Decimal::from(10),
        }
    }
}

impl PricingSettings {
    fn default_discount_tier(&self, format_id: &FormatId) -> DiscountTier {
        DiscountTier {
            format_id: format_id.clone(),
            min_periods: self.default_discount_min_periods,
            max_periods: None,
            discount_pct: self.default_discount_pct,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemPricingInput {
    pub format_id: FormatId,
    /// Locations feed the capacity check only; the rate is resolved per
    /// format regardless of which locations were picked.
    pub locations: BTreeSet<LocationId>,
    pub quantity: u32,
    pub selected_periods: Vec<u32>,
    pub creative_asset_count: u32,
    pub category: Option<String>,
}

/// Non-fatal advisories carried alongside a cost breakdown. None of these
/// block computation or mutate cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    /// More locations selected than `quantity x periods` can cover.
    CapacityExceeded { capacity: u32, selected_locations: u32 },
    /// No creative tier resolved; the documented default rate was charged.
    FallbackCreativeRate { rate: Decimal },
    /// The discount tier lookup failed; the item was priced at 0% discount.
    DiscountTiersUnavailable { detail: String },
    /// No production tier covered the unit count; production was priced at
    /// zero rather than silently inventing a rate.
    ProductionTierUnresolved { units: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid pricing input: {0}")]
    InvalidInput(String),
    #[error("no rate entry in the catalogue for format {0:?}")]
    RateNotFound(FormatId),
    #[error("rate catalogue unavailable: {0}")]
    Catalog(String),
}

/// Fully itemized cost breakdown for one configured line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemPricing {
    pub period_count: u32,
    pub print_runs: u32,
    pub production_units: u32,
    pub unit_rate: Decimal,
    pub media_cost: Decimal,
    pub discount_pct: Decimal,
    pub discount_amount: Decimal,
    pub media_cost_after_discount: Decimal,
    pub production_cost: Decimal,
    pub creative_cost: Decimal,
    pub total_cost: Decimal,
    pub vat: VatBreakdown,
    pub warnings: Vec<PricingWarning>,
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        input: &LineItemPricingInput,
        catalog: &dyn RateSource,
    ) -> Result<LineItemPricing, PricingError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicPricingEngine {
    settings: PricingSettings,
}

impl DeterministicPricingEngine {
    pub fn new(settings: PricingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        input: &LineItemPricingInput,
        catalog: &dyn RateSource,
    ) -> Result<LineItemPricing, PricingError> {
        price_line_item(input, catalog, &self.settings)
    }
}

/// Volume discount percentage for a format at a given total period count.
/// Formats without configured tiers use the built-in default tier. A failed
/// lookup is an error so callers can degrade to 0% per format group.
pub(crate) fn resolve_volume_discount(
    catalog: &dyn RateSource,
    settings: &PricingSettings,
    format_id: &FormatId,
    period_count: u32,
) -> Result<Decimal, CatalogError> {
    let tiers = catalog.discount_tiers(format_id)?;
    let resolved = if tiers.is_empty() {
        let default_tier = settings.default_discount_tier(format_id);
        default_tier.contains(period_count).then_some(default_tier.discount_pct)
    } else {
        resolve_discount_tier(&tiers, period_count).map(|tier| tier.discount_pct)
    };
    Ok(resolved.unwrap_or(Decimal::ZERO))
}

pub fn price_line_item(
    input: &LineItemPricingInput,
    catalog: &dyn RateSource,
    settings: &PricingSettings,
) -> Result<LineItemPricing, PricingError> {
    if input.quantity < 1 {
        return Err(PricingError::InvalidInput("quantity must be at least 1".to_owned()));
    }
    let periods = schedule::unique_sorted_periods(&input.selected_periods);
    if periods.is_empty() {
        return Err(PricingError::InvalidInput(
            "at least one incharge period must be selected".to_owned(),
        ));
    }
    let period_count = periods.len() as u32;

    let entry = catalog
        .rate_entry(&input.format_id)
        .map_err(|error| PricingError::Catalog(error.to_string()))?
        .ok_or_else(|| PricingError::RateNotFound(input.format_id.clone()))?;
    let unit_rate = entry.effective_unit_rate();

    // An empty booking window means the rate is unrestricted.
    if !entry.enabled_periods.is_empty() {
        if let Some(period) = periods.iter().find(|period| !entry.enabled_periods.contains(period))
        {
            return Err(PricingError::InvalidInput(format!(
                "incharge period {period} is not bookable for format {}",
                input.format_id.0
            )));
        }
    }

    let mut warnings = Vec::new();

    let media_cost = unit_rate * Decimal::from(input.quantity) * Decimal::from(period_count);
    let discount_pct =
        match resolve_volume_discount(catalog, settings, &input.format_id, period_count) {
            Ok(discount_pct) => discount_pct,
            Err(error) => {
                warnings.push(PricingWarning::DiscountTiersUnavailable {
                    detail: error.to_string(),
                });
                Decimal::ZERO
            }
        };
    let discount_amount = media_cost * pct(discount_pct);
    let media_cost_after_discount = media_cost - discount_amount;

    // Periods were validated non-empty above, so at least one run.
    let print_runs = schedule::print_runs(&periods).max(1);
    let production_units = input.quantity.checked_mul(print_runs).ok_or_else(|| {
        PricingError::InvalidInput(format!(
            "quantity {} across {print_runs} print runs overflows the production unit count",
            input.quantity
        ))
    })?;
    let production_cost = match catalog.production_tiers(&input.format_id) {
        Ok(tiers) => match resolve_production_tier(&tiers, production_units) {
            Some(tier) => tier.cost_per_unit * Decimal::from(production_units),
            None => {
                warnings
                    .push(PricingWarning::ProductionTierUnresolved { units: production_units });
                Decimal::ZERO
            }
        },
        Err(_) => {
            warnings.push(PricingWarning::ProductionTierUnresolved { units: production_units });
            Decimal::ZERO
        }
    };

    let creative_cost = if input.creative_asset_count == 0 {
        Decimal::ZERO
    } else {
        let tiers = catalog
            .creative_tiers(&input.format_id)
            .map_err(|error| PricingError::Catalog(error.to_string()))?;
        match resolve_creative_tier(&tiers, input.creative_asset_count, input.category.as_deref())
        {
            Some(tier) => tier.cost_per_asset * Decimal::from(input.creative_asset_count),
            None => {
                warnings.push(PricingWarning::FallbackCreativeRate {
                    rate: settings.default_creative_rate,
                });
                settings.default_creative_rate * Decimal::from(input.creative_asset_count)
            }
        }
    };

    let capacity = input.quantity.checked_mul(period_count).ok_or_else(|| {
        PricingError::InvalidInput(format!(
            "quantity {} across {period_count} periods overflows the placement capacity",
            input.quantity
        ))
    })?;
    let selected_locations = input.locations.len() as u32;
    if selected_locations > capacity {
        warnings.push(PricingWarning::CapacityExceeded { capacity, selected_locations });
    }

    // Intermediate figures stay unrounded; the item total is the first
    // currency-facing figure and lands on 2 decimal places.
    let total_cost = round2(media_cost_after_discount + production_cost + creative_cost);
    let vat = VatBreakdown::from_total(total_cost, settings.vat_rate_pct);

    Ok(LineItemPricing {
        period_count,
        print_runs,
        production_units,
        unit_rate,
        media_cost,
        discount_pct,
        discount_amount,
        media_cost_after_discount,
        production_cost,
        creative_cost,
        total_cost,
        vat,
        warnings,
    })
}

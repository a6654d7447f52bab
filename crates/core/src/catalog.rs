//! Rate catalogue types and lookup rules.
//!
//! The catalogue is consumed read-only: rate entries per format, volume
//! discount tiers keyed on total incharge count, production cost tiers keyed
//! on unit count, and creative design cost tiers keyed on asset count.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::format::{FormatId, LocationId};

/// Base-price record for a format, optionally scoped to a location. Price
/// precedence: sale price, then reduced price, then base rate with the
/// location markup applied. Sale and reduced are never both active; when
/// both are present sale wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub format_id: FormatId,
    /// `None` marks the general-purpose rate used when no location-specific
    /// entry applies.
    pub location_id: Option<LocationId>,
    pub base_rate: Decimal,
    pub sale_price: Option<Decimal>,
    pub reduced_price: Option<Decimal>,
    pub markup_pct: Decimal,
    /// Incharge periods this rate may be booked for; empty means
    /// unrestricted.
    pub enabled_periods: BTreeSet<u32>,
}

impl RateEntry {
    /// Price per unit per incharge after precedence and markup.
    pub fn effective_unit_rate(&self) -> Decimal {
        if let Some(sale) = self.sale_price {
            return sale;
        }
        if let Some(reduced) = self.reduced_price {
            return reduced;
        }
        self.base_rate * (Decimal::ONE + self.markup_pct / Decimal::ONE_HUNDRED)
    }
}

/// Volume discount by total incharge count across a format group.
/// `max_periods = None` means unbounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub format_id: FormatId,
    pub min_periods: u32,
    pub max_periods: Option<u32>,
    pub discount_pct: Decimal,
}

impl DiscountTier {
    pub fn contains(&self, period_count: u32) -> bool {
        period_count >= self.min_periods
            && self.max_periods.map_or(true, |max| period_count <= max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCostTier {
    pub format_id: FormatId,
    pub location_id: Option<LocationId>,
    pub min_units: u32,
    pub max_units: Option<u32>,
    pub cost_per_unit: Decimal,
}

impl ProductionCostTier {
    pub fn contains(&self, units: u32) -> bool {
        units >= self.min_units && self.max_units.map_or(true, |max| units <= max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeCostTier {
    pub format_id: FormatId,
    /// Tiers with a category only apply to items of that category and beat
    /// category-agnostic tiers when both match.
    pub category: Option<String>,
    pub min_assets: u32,
    pub max_assets: Option<u32>,
    pub cost_per_asset: Decimal,
}

impl CreativeCostTier {
    pub fn contains(&self, assets: u32) -> bool {
        assets >= self.min_assets && self.max_assets.map_or(true, |max| assets <= max)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("rate catalogue lookup failed: {0}")]
    Lookup(String),
}

/// Read-only query surface the pricing engine and aggregator consume. A
/// failing lookup is observable so discount resolution can degrade per
/// format group instead of aborting a whole recalculation.
pub trait RateSource: Send + Sync {
    fn rate_entry(&self, format_id: &FormatId) -> Result<Option<RateEntry>, CatalogError>;
    fn discount_tiers(&self, format_id: &FormatId) -> Result<Vec<DiscountTier>, CatalogError>;
    fn production_tiers(
        &self,
        format_id: &FormatId,
    ) -> Result<Vec<ProductionCostTier>, CatalogError>;
    fn creative_tiers(&self, format_id: &FormatId) -> Result<Vec<CreativeCostTier>, CatalogError>;
}

/// When several entries exist for one format, the general entry (no
/// location) wins; otherwise the entry with the lowest location id is used
/// so resolution stays deterministic. Locations never differentiate price
/// today; they only drive capacity warnings.
pub fn resolve_rate_entry(entries: &[RateEntry]) -> Option<&RateEntry> {
    if let Some(general) = entries.iter().find(|entry| entry.location_id.is_none()) {
        return Some(general);
    }
    entries.iter().min_by(|a, b| a.location_id.cmp(&b.location_id))
}

/// Deterministic tier selection: of all tiers containing the count, pick the
/// highest discount percentage; ties resolve to the tighter (higher) lower
/// bound.
pub fn resolve_discount_tier(tiers: &[DiscountTier], period_count: u32) -> Option<&DiscountTier> {
    tiers
        .iter()
        .filter(|tier| tier.contains(period_count))
        .max_by(|a, b| {
            a.discount_pct.cmp(&b.discount_pct).then_with(|| a.min_periods.cmp(&b.min_periods))
        })
}

/// Production tiers are expected to be range-disjoint per scope; when a
/// general and a location-scoped tier both match, the general one is used
/// because pricing is location-agnostic. Ties resolve to the tighter range.
pub fn resolve_production_tier(
    tiers: &[ProductionCostTier],
    units: u32,
) -> Option<&ProductionCostTier> {
    let matching = || tiers.iter().filter(|tier| tier.contains(units));
    matching()
        .filter(|tier| tier.location_id.is_none())
        .max_by_key(|tier| tier.min_units)
        .or_else(|| matching().max_by_key(|tier| tier.min_units))
}

/// Category-specific tiers beat category-agnostic ones when both match.
pub fn resolve_creative_tier<'a>(
    tiers: &'a [CreativeCostTier],
    assets: u32,
    category: Option<&str>,
) -> Option<&'a CreativeCostTier> {
    let matching = |want_category: bool| {
        tiers.iter().filter(move |tier| {
            tier.contains(assets)
                && if want_category {
                    tier.category.as_deref().is_some() && tier.category.as_deref() == category
                } else {
                    tier.category.is_none()
                }
        })
    };
    matching(true)
        .max_by_key(|tier| tier.min_assets)
        .or_else(|| matching(false).max_by_key(|tier| tier.min_assets))
}

/// In-memory rate catalogue, loadable from TOML fixtures.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    #[serde(default)]
    pub rates: Vec<RateEntry>,
    #[serde(default)]
    pub discount_tiers: Vec<DiscountTier>,
    #[serde(default)]
    pub production_tiers: Vec<ProductionCostTier>,
    #[serde(default)]
    pub creative_tiers: Vec<CreativeCostTier>,
}

impl RateSource for RateCard {
    fn rate_entry(&self, format_id: &FormatId) -> Result<Option<RateEntry>, CatalogError> {
        let entries: Vec<RateEntry> =
            self.rates.iter().filter(|entry| &entry.format_id == format_id).cloned().collect();
        Ok(resolve_rate_entry(&entries).cloned())
    }

    fn discount_tiers(&self, format_id: &FormatId) -> Result<Vec<DiscountTier>, CatalogError> {
        Ok(self
            .discount_tiers
            .iter()
            .filter(|tier| &tier.format_id == format_id)
            .cloned()
            .collect())
    }

    fn production_tiers(
        &self,
        format_id: &FormatId,
    ) -> Result<Vec<ProductionCostTier>, CatalogError> {
        Ok(self
            .production_tiers
            .iter()
            .filter(|tier| &tier.format_id == format_id)
            .cloned()
            .collect())
    }

    fn creative_tiers(&self, format_id: &FormatId) -> Result<Vec<CreativeCostTier>, CatalogError> {
        Ok(self
            .creative_tiers
            .iter()
            .filter(|tier| &tier.format_id == format_id)
            .cloned()
            .collect())
    }
}

//! Quote aggregation.
//!
//! Volume discounts are tiered on the *sum* of incharge periods across all
//! items sharing a format within one quote, so discount resolution can never
//! be done per item in isolation. The aggregator owns the item set and
//! re-derives the per-group discount on every mutation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::RateSource;
use crate::domain::format::FormatId;
use crate::domain::quote::{LineItemId, Quote, QuoteLineItem, VatBreakdown};
use crate::errors::DomainError;
use crate::money::{pct, round2};
use crate::pricing::{
    price_line_item, resolve_volume_discount, LineItemPricingInput, PricingSettings,
    PricingWarning,
};

/// Group-scoped advisories from a recalculation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// The discount lookup failed for one format group; that group was
    /// recalculated at 0% and every other group was left unaffected.
    DiscountTierUnresolved { format_id: FormatId, detail: String },
}

/// Immutable view of a quote handed back to collaborators after an
/// operation, with the advisories the operation produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub quote: Quote,
    pub item_warnings: Vec<PricingWarning>,
    pub group_warnings: Vec<AggregationWarning>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddItemOutcome {
    pub line_item_id: LineItemId,
    pub item_warnings: Vec<PricingWarning>,
    pub group_warnings: Vec<AggregationWarning>,
}

pub struct QuoteAggregator<'a> {
    catalog: &'a dyn RateSource,
    settings: PricingSettings,
}

impl<'a> QuoteAggregator<'a> {
    pub fn new(catalog: &'a dyn RateSource, settings: PricingSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    /// Price a configuration through the engine, append it, and re-aggregate
    /// the whole quote.
    pub fn add_item(
        &self,
        quote: &mut Quote,
        input: &LineItemPricingInput,
        format_name: &str,
    ) -> Result<AddItemOutcome, DomainError> {
        quote.ensure_mutable()?;

        let pricing = price_line_item(input, self.catalog, &self.settings)?;
        let item = QuoteLineItem {
            id: LineItemId(Uuid::new_v4().to_string()),
            format_id: input.format_id.clone(),
            format_name: format_name.to_owned(),
            quantity: input.quantity,
            locations: input.locations.clone(),
            periods: input.selected_periods.iter().copied().collect(),
            creative_asset_count: input.creative_asset_count,
            media_cost: pricing.media_cost,
            discount_pct: pricing.discount_pct,
            discount_amount: pricing.discount_amount,
            media_cost_after_discount: pricing.media_cost_after_discount,
            production_cost: pricing.production_cost,
            creative_cost: pricing.creative_cost,
            total_cost: pricing.total_cost,
            vat: pricing.vat.clone(),
        };
        let line_item_id = item.id.clone();
        quote.items.push(item);

        let group_warnings = self.recalculate(quote)?;
        Ok(AddItemOutcome { line_item_id, item_warnings: pricing.warnings, group_warnings })
    }

    pub fn remove_item(
        &self,
        quote: &mut Quote,
        item_id: &LineItemId,
    ) -> Result<Vec<AggregationWarning>, DomainError> {
        quote.ensure_mutable()?;

        let before = quote.items.len();
        quote.items.retain(|item| &item.id != item_id);
        if quote.items.len() == before {
            return Err(DomainError::InvalidInput(format!(
                "quote {} has no line item {}",
                quote.id.0, item_id.0
            )));
        }

        self.recalculate(quote)
    }

    /// Re-derive per-format discounts over the current complete item set and
    /// rebuild quote totals. Idempotent: a second pass with no intervening
    /// mutation produces identical state. Production and creative costs were
    /// fixed by the pricing engine at item creation and are not re-derived.
    pub fn recalculate(&self, quote: &mut Quote) -> Result<Vec<AggregationWarning>, DomainError> {
        quote.ensure_mutable()?;

        let mut group_periods: BTreeMap<FormatId, u32> = BTreeMap::new();
        for item in &quote.items {
            *group_periods.entry(item.format_id.clone()).or_default() += item.period_count();
        }

        let mut warnings = Vec::new();
        let mut group_discounts: BTreeMap<FormatId, Decimal> = BTreeMap::new();
        for (format_id, total_periods) in &group_periods {
            let discount_pct = match resolve_volume_discount(
                self.catalog,
                &self.settings,
                format_id,
                *total_periods,
            ) {
                Ok(discount_pct) => discount_pct,
                Err(error) => {
                    warnings.push(AggregationWarning::DiscountTierUnresolved {
                        format_id: format_id.clone(),
                        detail: error.to_string(),
                    });
                    Decimal::ZERO
                }
            };
            group_discounts.insert(format_id.clone(), discount_pct);
        }

        for item in &mut quote.items {
            let discount_pct =
                group_discounts.get(&item.format_id).copied().unwrap_or(Decimal::ZERO);
            item.discount_pct = discount_pct;
            item.discount_amount = item.media_cost * pct(discount_pct);
            item.media_cost_after_discount = item.media_cost - item.discount_amount;
            item.total_cost = round2(
                item.media_cost_after_discount + item.production_cost + item.creative_cost,
            );
            item.vat = VatBreakdown::from_total(item.total_cost, self.settings.vat_rate_pct);
        }

        quote.total_cost = round2(quote.items.iter().map(|item| item.total_cost).sum());
        quote.vat = VatBreakdown::from_total(quote.total_cost, self.settings.vat_rate_pct);

        Ok(warnings)
    }
}

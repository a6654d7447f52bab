use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::details::{ConfirmedDetails, ContactDetails, RejectionFeedback};
use crate::domain::format::{FormatId, LocationId};
use crate::domain::session::QuoteOwner;
use crate::errors::DomainError;
use crate::money::{pct, round2};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub String);

/// Linear lifecycle. `Draft` is the only mutable state; everything after is
/// an immutable snapshot plus appended metadata. `Rejected` is terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Submitted,
    Confirmed,
    Approved,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "confirmed" => Some(Self::Confirmed),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// VAT figures derived from an already-rounded cost total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatBreakdown {
    pub subtotal: Decimal,
    pub vat_rate_pct: Decimal,
    pub vat_amount: Decimal,
    pub total_inc_vat: Decimal,
}

impl VatBreakdown {
    pub fn from_total(total: Decimal, vat_rate_pct: Decimal) -> Self {
        let vat_amount = round2(total * pct(vat_rate_pct));
        Self { subtotal: total, vat_rate_pct, vat_amount, total_inc_vat: round2(total + vat_amount) }
    }

    pub fn zero(vat_rate_pct: Decimal) -> Self {
        Self::from_total(Decimal::ZERO, vat_rate_pct)
    }
}

/// One configured media-format booking inside a quote.
///
/// `media_cost` is the pre-discount media portion fixed at item creation;
/// the discount fields are group-sensitive and rewritten on every
/// recalculation. Production and creative costs are fixed at creation and
/// never re-derived by the aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub id: LineItemId,
    pub format_id: FormatId,
    pub format_name: String,
    pub quantity: u32,
    pub locations: BTreeSet<LocationId>,
    pub periods: BTreeSet<u32>,
    pub creative_asset_count: u32,
    pub media_cost: Decimal,
    pub discount_pct: Decimal,
    pub discount_amount: Decimal,
    pub media_cost_after_discount: Decimal,
    pub production_cost: Decimal,
    pub creative_cost: Decimal,
    pub total_cost: Decimal,
    pub vat: VatBreakdown,
}

impl QuoteLineItem {
    pub fn period_count(&self) -> u32 {
        self.periods.len() as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub owner: QuoteOwner,
    pub status: QuoteStatus,
    pub items: Vec<QuoteLineItem>,
    pub total_cost: Decimal,
    pub vat: VatBreakdown,
    pub contact: Option<ContactDetails>,
    pub confirmed_details: Option<ConfirmedDetails>,
    pub rejection: Option<RejectionFeedback>,
    /// Optimistic concurrency counter; bumped by the writer before save.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn new_draft(id: QuoteId, owner: QuoteOwner, vat_rate_pct: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner,
            status: QuoteStatus::Draft,
            items: Vec::new(),
            total_cost: Decimal::ZERO,
            vat: VatBreakdown::zero(vat_rate_pct),
            contact: None,
            confirmed_details: None,
            rejection: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Line-item mutation is only legal while the quote is a draft.
    pub fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.status == QuoteStatus::Draft {
            Ok(())
        } else {
            Err(DomainError::QuoteImmutable { quote_id: self.id.clone(), status: self.status.clone() })
        }
    }

    pub fn item(&self, id: &LineItemId) -> Option<&QuoteLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}

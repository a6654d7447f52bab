//! Typed payloads attached to a quote after it leaves draft. These replace
//! free-form key/value blobs so the limited real shapes are covered at
//! compile time.

use serde::{Deserialize, Serialize};

use crate::domain::quote::LineItemId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

/// Per-line-item delivery and posting instructions collected by staff when
/// confirming a submitted quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedItemDetails {
    pub line_item_id: LineItemId,
    pub artwork_delivery: Option<String>,
    pub posting_instructions: Option<String>,
    pub special_requirements: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedDetails {
    pub items: Vec<ConfirmedItemDetails>,
    pub notes: Option<String>,
}

/// Attached when a customer declines a confirmed quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionFeedback {
    pub reason: String,
    pub requested_changes: Option<String>,
}

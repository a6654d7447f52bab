//! Quote lifecycle state machine.
//!
//! Linear: draft -> submitted -> confirmed -> approved, with rejection as a
//! terminal branch off confirmed. No transition skips a state or moves
//! backward. Transitions name the side effects to dispatch; dispatch happens
//! outside the transition's transactional boundary and its failure never
//! rolls the transition back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::details::{ConfirmedDetails, RejectionFeedback};
use crate::domain::quote::{Quote, QuoteStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Customer submits the configured draft for review.
    Submit,
    /// Staff confirm a submitted quote, attaching delivery details.
    Confirm(ConfirmedDetails),
    /// Customer accepts the confirmed quote.
    Approve,
    /// Customer declines the confirmed quote. Terminal; changes require a
    /// fresh confirmation cycle on a new quote.
    Reject(RejectionFeedback),
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Confirm(_) => "confirm",
            Self::Approve => "approve",
            Self::Reject(_) => "reject",
        }
    }
}

/// Best-effort follow-ups dispatched after a transition commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    NotifyStaff,
    NotifyCustomer,
    SyncCrm,
    GenerateContractDocument,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: QuoteStatus,
    pub to: QuoteStatus,
    pub event: String,
    pub side_effects: Vec<SideEffect>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid lifecycle transition from {from:?} via `{event}`")]
    InvalidTransition { from: QuoteStatus, event: String },
    #[error("cannot submit a quote with no line items")]
    NothingToSubmit,
}

/// Apply a lifecycle event, mutating status and attaching the event payload.
/// Costs are never touched here; post-draft states are append-only.
pub fn apply_transition(
    quote: &mut Quote,
    event: LifecycleEvent,
) -> Result<TransitionOutcome, TransitionError> {
    use QuoteStatus::{Approved, Confirmed, Draft, Rejected, Submitted};
    use SideEffect::{GenerateContractDocument, NotifyCustomer, NotifyStaff, SyncCrm};

    let from = quote.status.clone();
    let event_name = event.name();

    let (to, side_effects) = match (&from, &event) {
        (Draft, LifecycleEvent::Submit) => {
            if quote.items.is_empty() {
                return Err(TransitionError::NothingToSubmit);
            }
            (Submitted, vec![NotifyStaff, SyncCrm])
        }
        (Submitted, LifecycleEvent::Confirm(_)) => {
            (Confirmed, vec![NotifyCustomer, GenerateContractDocument])
        }
        (Confirmed, LifecycleEvent::Approve) => (Approved, vec![NotifyStaff, SyncCrm]),
        (Confirmed, LifecycleEvent::Reject(_)) => (Rejected, vec![NotifyStaff]),
        _ => {
            return Err(TransitionError::InvalidTransition {
                from,
                event: event_name.to_owned(),
            });
        }
    };

    match event {
        LifecycleEvent::Confirm(details) => quote.confirmed_details = Some(details),
        LifecycleEvent::Reject(feedback) => quote.rejection = Some(feedback),
        LifecycleEvent::Submit | LifecycleEvent::Approve => {}
    }

    quote.status = to.clone();
    Ok(TransitionOutcome { from, to, event: event_name.to_owned(), side_effects })
}

//! Application service tying the pricing core to persistence.
//!
//! Every mutation of a quote runs under that quote's own async mutex, so two
//! concurrent writers to the same quote are serialized in-process; the
//! repository's version check catches writers on other processes. Side
//! effects named by a lifecycle transition are dispatched after the save
//! commits and never roll the transition back.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use oohquote_core::aggregate::{QuoteAggregator, QuoteSnapshot};
use oohquote_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use oohquote_core::catalog::RateSource;
use oohquote_core::domain::details::ContactDetails;
use oohquote_core::domain::quote::{LineItemId, Quote, QuoteId};
use oohquote_core::domain::session::{QuoteOwner, SessionToken, UserId};
use oohquote_core::errors::{ApplicationError, DomainError};
use oohquote_core::lifecycle::{apply_transition, LifecycleEvent, SideEffect, TransitionOutcome};
use oohquote_core::pricing::{
    price_line_item, LineItemPricing, LineItemPricingInput, PricingSettings,
};

use crate::repositories::{QuoteRepository, RepositoryError};

#[derive(Debug, Error)]
#[error("side effect dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Outbound follow-ups (notifications, CRM sync, document generation).
/// Dispatch is fire-and-forget; a failure is logged and never retried here.
#[async_trait]
pub trait SideEffectDispatcher: Send + Sync {
    async fn dispatch(&self, quote_id: &QuoteId, effect: SideEffect) -> Result<(), DispatchError>;
}

/// Dispatcher that only logs. Used by the CLI demo and anywhere no real
/// downstream integration is wired up.
#[derive(Clone, Debug, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl SideEffectDispatcher for LoggingDispatcher {
    async fn dispatch(&self, quote_id: &QuoteId, effect: SideEffect) -> Result<(), DispatchError> {
        tracing::info!(quote_id = %quote_id.0, effect = ?effect, "side effect dispatched");
        Ok(())
    }
}

pub struct QuoteService {
    repository: Arc<dyn QuoteRepository>,
    catalog: Arc<dyn RateSource>,
    settings: PricingSettings,
    dispatcher: Arc<dyn SideEffectDispatcher>,
    audit: Arc<dyn AuditSink>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QuoteService {
    pub fn new(
        repository: Arc<dyn QuoteRepository>,
        catalog: Arc<dyn RateSource>,
        settings: PricingSettings,
        dispatcher: Arc<dyn SideEffectDispatcher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { repository, catalog, settings, dispatcher, audit, locks: Mutex::new(HashMap::new()) }
    }

    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    /// Price a configuration without touching any quote. Used for previews.
    pub fn preview_price(
        &self,
        input: &LineItemPricingInput,
    ) -> Result<LineItemPricing, ApplicationError> {
        let pricing = price_line_item(input, self.catalog.as_ref(), &self.settings)
            .map_err(DomainError::from)?;
        Ok(pricing)
    }

    /// Return the owner's current draft, creating one when none exists.
    /// Calling this twice hands back the same draft.
    pub async fn start_draft(&self, owner: QuoteOwner) -> Result<Quote, ApplicationError> {
        if let Some(existing) =
            self.repository.find_draft_for_owner(&owner).await.map_err(map_repo_error)?
        {
            return Ok(existing);
        }

        let quote = Quote::new_draft(
            QuoteId(format!("QT-{}", Uuid::new_v4())),
            owner,
            self.settings.vat_rate_pct,
        );
        self.repository.save(quote.clone()).await.map_err(map_repo_error)?;
        self.emit_audit(&quote, "session.draft_started", AuditCategory::Session);
        tracing::info!(quote_id = %quote.id.0, "draft created");
        Ok(quote)
    }

    pub async fn draft_for_owner(
        &self,
        owner: &QuoteOwner,
    ) -> Result<Option<Quote>, ApplicationError> {
        self.repository.find_draft_for_owner(owner).await.map_err(map_repo_error)
    }

    pub async fn quote(&self, id: &QuoteId) -> Result<Quote, ApplicationError> {
        self.load(id).await
    }

    pub async fn add_item(
        &self,
        quote_id: &QuoteId,
        input: &LineItemPricingInput,
        format_name: &str,
    ) -> Result<QuoteSnapshot, ApplicationError> {
        let lock = self.quote_lock(quote_id).await;
        let _guard = lock.lock().await;

        let mut quote = self.load(quote_id).await?;
        let aggregator = QuoteAggregator::new(self.catalog.as_ref(), self.settings.clone());
        let outcome = aggregator.add_item(&mut quote, input, format_name)?;

        self.persist_mutation(&mut quote).await?;
        self.emit_audit(&quote, "aggregation.item_added", AuditCategory::Aggregation);

        Ok(QuoteSnapshot {
            quote,
            item_warnings: outcome.item_warnings,
            group_warnings: outcome.group_warnings,
        })
    }

    pub async fn remove_item(
        &self,
        quote_id: &QuoteId,
        item_id: &LineItemId,
    ) -> Result<QuoteSnapshot, ApplicationError> {
        let lock = self.quote_lock(quote_id).await;
        let _guard = lock.lock().await;

        let mut quote = self.load(quote_id).await?;
        let aggregator = QuoteAggregator::new(self.catalog.as_ref(), self.settings.clone());
        let group_warnings = aggregator.remove_item(&mut quote, item_id)?;

        self.persist_mutation(&mut quote).await?;
        self.emit_audit(&quote, "aggregation.item_removed", AuditCategory::Aggregation);

        Ok(QuoteSnapshot { quote, item_warnings: Vec::new(), group_warnings })
    }

    /// Force a full re-aggregation, typically after a catalogue change.
    pub async fn recalculate(&self, quote_id: &QuoteId) -> Result<QuoteSnapshot, ApplicationError> {
        let lock = self.quote_lock(quote_id).await;
        let _guard = lock.lock().await;

        let mut quote = self.load(quote_id).await?;
        let aggregator = QuoteAggregator::new(self.catalog.as_ref(), self.settings.clone());
        let group_warnings = aggregator.recalculate(&mut quote)?;

        self.persist_mutation(&mut quote).await?;
        self.emit_audit(&quote, "aggregation.recalculated", AuditCategory::Aggregation);

        Ok(QuoteSnapshot { quote, item_warnings: Vec::new(), group_warnings })
    }

    pub async fn set_contact(
        &self,
        quote_id: &QuoteId,
        contact: ContactDetails,
    ) -> Result<Quote, ApplicationError> {
        let lock = self.quote_lock(quote_id).await;
        let _guard = lock.lock().await;

        let mut quote = self.load(quote_id).await?;
        quote.ensure_mutable()?;
        quote.contact = Some(contact);

        self.persist_mutation(&mut quote).await?;
        self.emit_audit(&quote, "session.contact_updated", AuditCategory::Session);
        Ok(quote)
    }

    /// Apply a lifecycle event and dispatch its side effects. Dispatch
    /// happens after the save commits; a dispatch failure is logged and the
    /// transition stands.
    pub async fn transition(
        &self,
        quote_id: &QuoteId,
        event: LifecycleEvent,
    ) -> Result<(Quote, TransitionOutcome), ApplicationError> {
        let lock = self.quote_lock(quote_id).await;
        let _guard = lock.lock().await;

        let mut quote = self.load(quote_id).await?;
        let outcome = apply_transition(&mut quote, event).map_err(DomainError::from)?;

        self.persist_mutation(&mut quote).await?;
        self.emit_audit(&quote, "lifecycle.transition_applied", AuditCategory::Lifecycle);
        tracing::info!(
            quote_id = %quote.id.0,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "lifecycle transition applied"
        );

        for effect in outcome.side_effects.clone() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let quote_id = quote.id.clone();
            tokio::spawn(async move {
                if let Err(error) = dispatcher.dispatch(&quote_id, effect.clone()).await {
                    tracing::warn!(
                        quote_id = %quote_id.0,
                        effect = ?effect,
                        %error,
                        "side effect dispatch failed"
                    );
                }
            });
        }

        Ok((quote, outcome))
    }

    /// Carry an anonymous session's draft over to a logged-in user.
    /// `carried_session` is an optional second token that survived the login
    /// boundary (e.g. a pre-auth token still in a cookie); its drafts are
    /// gathered too. The freshest session draft is re-owned in place; a
    /// pre-existing user draft is superseded and deleted. Running this twice
    /// for the same tokens is a no-op that returns the user's current draft.
    pub async fn link_session_to_user(
        &self,
        session: &SessionToken,
        carried_session: Option<&SessionToken>,
        user: &UserId,
    ) -> Result<Option<Quote>, ApplicationError> {
        let user_owner = QuoteOwner::User(user.clone());

        let mut session_drafts = self
            .repository
            .list_drafts_for_owner(&QuoteOwner::Session(session.clone()))
            .await
            .map_err(map_repo_error)?;
        if let Some(carried_token) = carried_session {
            let mut extra = self
                .repository
                .list_drafts_for_owner(&QuoteOwner::Session(carried_token.clone()))
                .await
                .map_err(map_repo_error)?;
            session_drafts.append(&mut extra);
        }
        session_drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        if session_drafts.is_empty() {
            return self.repository.find_draft_for_owner(&user_owner).await.map_err(map_repo_error);
        }
        let mut carried = session_drafts.remove(0);

        // The session draft is the freshest work; older user drafts and any
        // stale extra session drafts go.
        let user_drafts =
            self.repository.list_drafts_for_owner(&user_owner).await.map_err(map_repo_error)?;
        for stale in user_drafts.iter().chain(session_drafts.iter()) {
            self.repository.delete(&stale.id).await.map_err(map_repo_error)?;
        }

        let lock = self.quote_lock(&carried.id).await;
        let _guard = lock.lock().await;

        carried.owner = user_owner;
        self.persist_mutation(&mut carried).await?;
        self.emit_audit(&carried, "session.linked_to_user", AuditCategory::Session);
        tracing::info!(quote_id = %carried.id.0, user_id = %user.0, "session draft linked to user");

        Ok(Some(carried))
    }

    async fn load(&self, id: &QuoteId) -> Result<Quote, ApplicationError> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| DomainError::QuoteNotFound(id.clone()).into())
    }

    async fn persist_mutation(&self, quote: &mut Quote) -> Result<(), ApplicationError> {
        quote.version += 1;
        quote.updated_at = Utc::now();
        self.repository.save(quote.clone()).await.map_err(map_repo_error)
    }

    async fn quote_lock(&self, id: &QuoteId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id.0.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    fn emit_audit(&self, quote: &Quote, event_type: &str, category: AuditCategory) {
        let session_token = match &quote.owner {
            QuoteOwner::Session(token) => Some(token.0.clone()),
            QuoteOwner::User(_) => None,
        };
        let context = AuditContext::new(
            Some(quote.id.clone()),
            session_token,
            Uuid::new_v4().to_string(),
            "quote-service",
        );
        self.audit.emit(
            AuditEvent::new(&context, event_type, category, AuditOutcome::Success)
                .with_metadata("status", quote.status.as_str())
                .with_metadata("version", quote.version.to_string()),
        );
    }
}

fn map_repo_error(error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::VersionConflict { quote_id, .. } => {
            DomainError::ConcurrentMutationConflict(QuoteId(quote_id)).into()
        }
        other => ApplicationError::Persistence(other.to_string()),
    }
}

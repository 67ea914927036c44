//! Feed processing: turn one submitted entry into one Notifuse contact import.
//!
//! Every failure is terminal for the current feed. It is reported through the
//! [`ErrorSink`] and surfaces to the caller only as `false`; nothing is retried.
use crate::contact::build_contact;
use crate::feed::Feed;
use crate::form::{Entry, FieldResolver, Form, FormFieldResolver};
use crate::notes::{ErrorSink, NoteSeverity, NoteSink};
use crate::notifuse::{ImportError, ImportRequest, ImportResponse, NotifuseClient};
use crate::settings::{can_create_feed, SettingsStore};
use std::sync::Arc;
use thiserror::Error;

const SUCCESS_NOTE: &str = "Contact successfully synced with Notifuse.";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Notifuse configuration incomplete. Please configure the instance URL, API token and workspace ID.")]
    ConfigurationIncomplete,
    #[error("Contact email not found.")]
    MissingEmail,
    #[error("Error connecting to Notifuse: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Notifuse returned an error (Code {code}): {body}")]
    Rejected { code: u16, body: String },
    #[error("Failed to encode Notifuse request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<ImportError> for FeedError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Transport(e) => FeedError::Transport(e),
            ImportError::Encode(e) => FeedError::Encode(e),
            ImportError::Rejected { code, body } => FeedError::Rejected { code, body },
        }
    }
}

/// What happened to one feed when an entry was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Processed { feed_id: u32, success: bool },
    SkippedInactive { feed_id: u32 },
    SkippedPaymentPending { feed_id: u32 },
    SkippedCondition { feed_id: u32 },
}

impl FeedOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FeedOutcome::Processed { success: false, .. })
    }
}

pub struct FeedProcessor {
    client: NotifuseClient,
    settings: Arc<dyn SettingsStore>,
    resolver: Arc<dyn FieldResolver>,
    notes: Arc<dyn NoteSink>,
    errors: Arc<dyn ErrorSink>,
}

impl FeedProcessor {
    pub fn new(
        client: NotifuseClient,
        settings: Arc<dyn SettingsStore>,
        notes: Arc<dyn NoteSink>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            client,
            settings,
            resolver: Arc::new(FormFieldResolver),
            notes,
            errors,
        }
    }

    /// Replaces the default field resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Whether feeds may be created or listed with the current settings.
    pub fn can_create_feed(&self) -> bool {
        can_create_feed(&self.settings.plugin_settings())
    }

    /// Processes one feed for one entry. Returns true when Notifuse accepted the contact.
    pub async fn process_feed(&self, feed: &Feed, entry: &Entry, form: &Form) -> bool {
        match self.sync_contact(feed, entry, form).await {
            Ok(response) => {
                tracing::info!(
                    feed_id = feed.id,
                    entry_id = entry.id,
                    status = response.status,
                    "Contact synced with Notifuse"
                );
                self.notes
                    .add_note(entry.id, SUCCESS_NOTE, NoteSeverity::Success);
                true
            }
            Err(e) => {
                tracing::warn!(feed_id = feed.id, entry_id = entry.id, error = %e, "Feed failed");
                self.errors.add_feed_error(&e.to_string(), feed, entry, form);
                false
            }
        }
    }

    async fn sync_contact(
        &self,
        feed: &Feed,
        entry: &Entry,
        form: &Form,
    ) -> Result<ImportResponse, FeedError> {
        let settings = self.settings.plugin_settings();
        if !settings.is_complete() {
            return Err(FeedError::ConfigurationIncomplete);
        }

        let subscribe_lists = feed.subscribe_lists();
        let contact = build_contact(
            &feed.mapped_fields,
            &feed.custom_fields,
            form,
            entry,
            self.resolver.as_ref(),
        );
        if contact.email().is_none() {
            return Err(FeedError::MissingEmail);
        }

        let request = ImportRequest::single(settings.workspace_id.as_str(), contact, subscribe_lists);
        let response = self
            .client
            .import_contacts(&settings.instance_url, &settings.api_token, &request)
            .await?;
        Ok(response)
    }

    /// Runs every feed bound to the entry's form, in order.
    ///
    /// Inactive feeds, feeds waiting on payment and feeds whose condition
    /// fails are skipped. A failing feed does not stop the ones after it.
    pub async fn process_entry(&self, feeds: &[Feed], entry: &Entry, form: &Form) -> Vec<FeedOutcome> {
        let mut outcomes = Vec::new();

        for feed in feeds.iter().filter(|f| f.form_id == form.id) {
            let outcome = if !feed.is_active {
                FeedOutcome::SkippedInactive { feed_id: feed.id }
            } else if !feed.is_payment_ready(entry.payment_status.as_deref()) {
                tracing::debug!(feed_id = feed.id, entry_id = entry.id, "Waiting for payment");
                FeedOutcome::SkippedPaymentPending { feed_id: feed.id }
            } else if !feed.condition.is_met(form, entry, self.resolver.as_ref()) {
                tracing::debug!(feed_id = feed.id, entry_id = entry.id, "Feed condition not met");
                FeedOutcome::SkippedCondition { feed_id: feed.id }
            } else {
                let success = self.process_feed(feed, entry, form).await;
                FeedOutcome::Processed {
                    feed_id: feed.id,
                    success,
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

//! Forwards form submissions to a Notifuse instance as contacts.
//!
//! A [`processor::FeedProcessor`] takes a submitted [`form::Entry`], maps the
//! fields selected by a [`feed::Feed`] onto the Notifuse contact schema and
//! posts the result to `{instance}/api/contacts.import`. The outcome is
//! recorded as a note on the entry.
//!
//! The host form platform is reached through small traits: settings come from
//! a [`settings::SettingsStore`], field values from a [`form::FieldResolver`],
//! and notes and errors go to [`notes::NoteSink`] and [`notes::ErrorSink`].
//!
//! ```ignore
//! use notifuse_feed::{notes::NoteJournal, notifuse::NotifuseClient, processor::FeedProcessor};
//!
//! let journal = Arc::new(NoteJournal::new());
//! let processor = FeedProcessor::new(
//!     NotifuseClient::new()?,
//!     Arc::new(config.notifuse),
//!     journal.clone(),
//!     journal.clone(),
//! );
//! let outcomes = processor.process_entry(&config.feeds, &entry, &form).await;
//! ```

pub mod condition;
pub mod config;
pub mod contact;
pub mod feed;
pub mod form;
pub mod notes;
pub mod notifuse;
pub mod processor;
pub mod settings;

pub use form::format_phone;
pub use processor::{FeedError, FeedOutcome, FeedProcessor};
pub use settings::{can_create_feed, validate_url, PluginSettings};

//! Append-only notes attached to entries, and the administrator-facing feed error log.
use crate::feed::Feed;
use crate::form::{Entry, Form};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSeverity {
    Success,
    Error,
}

impl fmt::Display for NoteSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoteSeverity::Success => "success",
            NoteSeverity::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNote {
    pub entry_id: u64,
    /// Feed that produced the note, when it came from the error log.
    pub feed_id: Option<u32>,
    pub message: String,
    pub severity: NoteSeverity,
}

pub trait NoteSink: Send + Sync {
    fn add_note(&self, entry_id: u64, message: &str, severity: NoteSeverity);
}

/// Receives feed failures. Must not fail or panic back into the caller.
pub trait ErrorSink: Send + Sync {
    fn add_feed_error(&self, message: &str, feed: &Feed, entry: &Entry, form: &Form);
}

/// In-memory note journal. Feed errors are also recorded as error notes on the entry.
#[derive(Debug, Default)]
pub struct NoteJournal {
    notes: Mutex<Vec<EntryNote>>,
}

impl NoteJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<EntryNote> {
        match self.notes.lock() {
            Ok(notes) => notes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn notes_for(&self, entry_id: u64) -> Vec<EntryNote> {
        self.notes()
            .into_iter()
            .filter(|n| n.entry_id == entry_id)
            .collect()
    }

    fn push(&self, note: EntryNote) {
        match self.notes.lock() {
            Ok(mut notes) => notes.push(note),
            Err(poisoned) => poisoned.into_inner().push(note),
        }
    }
}

impl NoteSink for NoteJournal {
    fn add_note(&self, entry_id: u64, message: &str, severity: NoteSeverity) {
        self.push(EntryNote {
            entry_id,
            feed_id: None,
            message: message.to_string(),
            severity,
        });
    }
}

impl ErrorSink for NoteJournal {
    fn add_feed_error(&self, message: &str, feed: &Feed, entry: &Entry, form: &Form) {
        tracing::error!(
            feed_id = feed.id,
            feed = %feed.name,
            entry_id = entry.id,
            form_id = form.id,
            error = %message,
            "Feed processing failed"
        );
        self.push(EntryNote {
            entry_id: entry.id,
            feed_id: Some(feed.id),
            message: message.to_string(),
            severity: NoteSeverity::Error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_records_notes_in_order() {
        let journal = NoteJournal::new();
        journal.add_note(1, "first", NoteSeverity::Success);
        journal.add_note(2, "other entry", NoteSeverity::Success);
        journal.add_note(1, "second", NoteSeverity::Success);

        let notes = journal.notes_for(1);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].message, "first");
        assert_eq!(notes[1].message, "second");
    }

    #[test]
    fn test_feed_error_becomes_error_note() {
        let journal = NoteJournal::new();
        let feed = Feed::new(5, 1, "Signup");
        let entry = Entry {
            id: 9,
            form_id: 1,
            ..Entry::default()
        };
        let form = Form {
            id: 1,
            title: String::new(),
            fields: vec![],
        };

        journal.add_feed_error("Contact email not found.", &feed, &entry, &form);

        assert_eq!(
            journal.notes(),
            vec![EntryNote {
                entry_id: 9,
                feed_id: Some(5),
                message: "Contact email not found.".to_string(),
                severity: NoteSeverity::Error,
            }]
        );
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(NoteSeverity::Success.to_string(), "success");
        assert_eq!(NoteSeverity::Error.to_string(), "error");
    }
}

//! Integration tests for end-to-end feed processing against a mocked Notifuse instance.
//!
//! Each test starts its own wiremock server and note journal, then drives the
//! public `FeedProcessor` API the way a host platform would on form submission.

use notifuse_feed::contact::ContactField;
use notifuse_feed::form::{Entry, Form};
use notifuse_feed::notes::{NoteJournal, NoteSeverity};
use notifuse_feed::notifuse::NotifuseClient;
use notifuse_feed::{FeedOutcome, FeedProcessor, PluginSettings};
use notifuse_feed::feed::Feed;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signup_form() -> Form {
    serde_json::from_value(serde_json::json!({
        "id": 4,
        "title": "Newsletter signup",
        "fields": [
            { "id": 1, "type": "email", "label": "Email" },
            { "id": 2, "type": "name", "label": "Name", "inputs": [
                { "id": "2.3", "label": "First" },
                { "id": "2.6", "label": "Last" }
            ]},
            { "id": 3, "type": "phone", "phoneFormat": "standard" },
            { "id": 5, "type": "text", "label": "Company" },
            { "id": 6, "type": "select", "label": "Interest" }
        ]
    }))
    .unwrap()
}

fn signup_entry(values: &[(&str, &str)]) -> Entry {
    Entry {
        id: 101,
        form_id: 4,
        values: values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Entry::default()
    }
}

fn signup_feed(id: u32, lists: &str) -> Feed {
    let mut feed = Feed::new(id, 4, format!("Feed {id}"));
    feed.subscribe_lists = lists.to_string();
    feed.mapped_fields.insert(ContactField::Email, "1".to_string());
    feed.mapped_fields.insert(ContactField::FirstName, "2.3".to_string());
    feed.mapped_fields.insert(ContactField::LastName, "2.6".to_string());
    feed.mapped_fields.insert(ContactField::Phone, "3".to_string());
    feed.custom_fields
        .push(("custom_string_1".to_string(), "5".to_string()));
    feed
}

fn processor(instance_url: String, journal: &Arc<NoteJournal>) -> FeedProcessor {
    FeedProcessor::new(
        NotifuseClient::new().unwrap(),
        Arc::new(PluginSettings::new(instance_url, "tok", "ws_1")),
        journal.clone(),
        journal.clone(),
    )
}

async fn sent_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ============================================================================
// Single feed
// ============================================================================

#[tokio::test]
async fn test_success_posts_contact_and_records_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contacts.import"))
        .and(header("authorization", "Bearer tok"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_string("{\"ok\":true}"))
        .expect(1)
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    // Trailing slash must not produce `//api/...`
    let processor = processor(format!("{}/", server.uri()), &journal);
    let entry = signup_entry(&[
        ("1", "a@b.com"),
        ("2.3", "Ada"),
        ("2.6", ""),
        ("3", "5551234567"),
        ("5", "Analytical Engines Ltd"),
    ]);

    let ok = processor
        .process_feed(&signup_feed(1, "newsletter, product_updates"), &entry, &signup_form())
        .await;
    assert!(ok);

    let bodies = sent_bodies(&server).await;
    assert_eq!(
        bodies,
        vec![serde_json::json!({
            "workspace_id": "ws_1",
            "contacts": [{
                "email": "a@b.com",
                "first_name": "Ada",
                "phone": "555-123-4567",
                "custom_string_1": "Analytical Engines Ltd"
            }],
            "subscribe_to_lists": ["newsletter", "product_updates"]
        })]
    );

    let notes = journal.notes_for(101);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, NoteSeverity::Success);
    assert_eq!(notes[0].message, "Contact successfully synced with Notifuse.");
}

#[tokio::test]
async fn test_rejected_status_records_code_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("{\"error\":\"invalid email\"}"))
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    let processor = processor(server.uri(), &journal);

    let ok = processor
        .process_feed(&signup_feed(1, ""), &signup_entry(&[("1", "a@b")]), &signup_form())
        .await;
    assert!(!ok);

    let notes = journal.notes_for(101);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, NoteSeverity::Error);
    assert_eq!(
        notes[0].message,
        "Notifuse returned an error (Code 422): {\"error\":\"invalid email\"}"
    );
}

#[tokio::test]
async fn test_lists_omitted_when_only_separators() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    let processor = processor(server.uri(), &journal);

    assert!(
        processor
            .process_feed(&signup_feed(1, " , ,"), &signup_entry(&[("1", "a@b.com")]), &signup_form())
            .await
    );

    let bodies = sent_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].get("subscribe_to_lists").is_none());
    assert_eq!(bodies[0]["contacts"], serde_json::json!([{ "email": "a@b.com" }]));
}

#[tokio::test]
async fn test_missing_email_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    let processor = processor(server.uri(), &journal);

    let ok = processor
        .process_feed(&signup_feed(1, "newsletter"), &signup_entry(&[("2.3", "Ada")]), &signup_form())
        .await;
    assert!(!ok);
    assert_eq!(journal.notes()[0].message, "Contact email not found.");
}

// ============================================================================
// Dispatch across feeds
// ============================================================================

#[tokio::test]
async fn test_failing_feed_does_not_block_the_next() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    let processor = processor(server.uri(), &journal);

    // First feed maps email to a blank field and fails; second succeeds.
    let mut broken = signup_feed(1, "");
    broken.mapped_fields.insert(ContactField::Email, "6".to_string());
    let feeds = vec![broken, signup_feed(2, "")];

    let outcomes = processor
        .process_entry(&feeds, &signup_entry(&[("1", "a@b.com")]), &signup_form())
        .await;

    assert_eq!(
        outcomes,
        vec![
            FeedOutcome::Processed { feed_id: 1, success: false },
            FeedOutcome::Processed { feed_id: 2, success: true },
        ]
    );
    let severities: Vec<_> = journal.notes().iter().map(|n| n.severity).collect();
    assert_eq!(severities, vec![NoteSeverity::Error, NoteSeverity::Success]);
}

#[tokio::test]
async fn test_dispatch_skips_gated_feeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    let processor = processor(server.uri(), &journal);

    let mut inactive = signup_feed(1, "");
    inactive.is_active = false;

    let mut held = signup_feed(2, "");
    held.delay_until_paid = true;

    let mut conditional: Feed = signup_feed(3, "");
    conditional.condition = serde_json::from_value(serde_json::json!({
        "enabled": true,
        "logic_type": "all",
        "rules": [{ "field_id": "6", "operator": "is", "value": "Webinars" }]
    }))
    .unwrap();

    let mut other_form = signup_feed(4, "");
    other_form.form_id = 99;

    let feeds = vec![inactive, held, conditional, other_form];
    let entry = signup_entry(&[("1", "a@b.com"), ("6", "Newsletter")]);

    let outcomes = processor.process_entry(&feeds, &entry, &signup_form()).await;

    assert_eq!(
        outcomes,
        vec![
            FeedOutcome::SkippedInactive { feed_id: 1 },
            FeedOutcome::SkippedPaymentPending { feed_id: 2 },
            FeedOutcome::SkippedCondition { feed_id: 3 },
        ]
    );
    assert!(journal.notes().is_empty());
}

#[tokio::test]
async fn test_paid_entry_releases_held_feed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let journal = Arc::new(NoteJournal::new());
    let processor = processor(server.uri(), &journal);

    let mut held = signup_feed(2, "");
    held.delay_until_paid = true;

    let mut entry = signup_entry(&[("1", "a@b.com")]);
    entry.payment_status = Some("Paid".to_string());

    let outcomes = processor.process_entry(&[held], &entry, &signup_form()).await;
    assert_eq!(outcomes, vec![FeedOutcome::Processed { feed_id: 2, success: true }]);
}

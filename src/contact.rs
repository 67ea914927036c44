//! Notifuse contact schema and contact record assembly.
use crate::form::{Entry, FieldResolver, Form};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fixed contact attributes a feed can map form fields onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Email,
    ExternalId,
    FirstName,
    LastName,
    Phone,
    Timezone,
    Language,
    JobTitle,
    #[serde(rename = "address_line_1")]
    AddressLine1,
    #[serde(rename = "address_line_2")]
    AddressLine2,
    Country,
    State,
    Postcode,
}

impl ContactField {
    pub const ALL: [ContactField; 13] = [
        ContactField::Email,
        ContactField::ExternalId,
        ContactField::FirstName,
        ContactField::LastName,
        ContactField::Phone,
        ContactField::Timezone,
        ContactField::Language,
        ContactField::JobTitle,
        ContactField::AddressLine1,
        ContactField::AddressLine2,
        ContactField::Country,
        ContactField::State,
        ContactField::Postcode,
    ];

    /// Key used in the Notifuse contact object.
    pub fn key(self) -> &'static str {
        match self {
            ContactField::Email => "email",
            ContactField::ExternalId => "external_id",
            ContactField::FirstName => "first_name",
            ContactField::LastName => "last_name",
            ContactField::Phone => "phone",
            ContactField::Timezone => "timezone",
            ContactField::Language => "language",
            ContactField::JobTitle => "job_title",
            ContactField::AddressLine1 => "address_line_1",
            ContactField::AddressLine2 => "address_line_2",
            ContactField::Country => "country",
            ContactField::State => "state",
            ContactField::Postcode => "postcode",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            ContactField::Email => "Email",
            ContactField::ExternalId => "External ID",
            ContactField::FirstName => "First Name",
            ContactField::LastName => "Last Name",
            ContactField::Phone => "Phone",
            ContactField::Timezone => "Timezone",
            ContactField::Language => "Language",
            ContactField::JobTitle => "Job Title",
            ContactField::AddressLine1 => "Address Line 1",
            ContactField::AddressLine2 => "Address Line 2",
            ContactField::Country => "Country",
            ContactField::State => "State/Province",
            ContactField::Postcode => "Postcode",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, ContactField::Email)
    }
}

/// Contact object sent to Notifuse. Keys with empty values are never present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContactRecord(BTreeMap<String, String>);

impl ContactRecord {
    /// Inserts `value` under `key` unless it is empty.
    pub fn set(&mut self, key: impl Into<String>, value: String) {
        if !value.is_empty() {
            self.0.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn email(&self) -> Option<&str> {
        self.get(ContactField::Email.key())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds a contact record from the mapped fields, then overlays custom fields.
///
/// Mappings with a blank field id (or a blank custom key) are skipped, and any
/// value that resolves empty is left out of the record.
pub fn build_contact(
    mapped_fields: &BTreeMap<ContactField, String>,
    custom_fields: &[(String, String)],
    form: &Form,
    entry: &Entry,
    resolver: &dyn FieldResolver,
) -> ContactRecord {
    let mut contact = ContactRecord::default();

    for (field, form_field_id) in mapped_fields {
        if form_field_id.is_empty() {
            continue;
        }
        contact.set(field.key(), resolver.field_value(form, entry, form_field_id));
    }

    for (name, form_field_id) in custom_fields {
        if name.is_empty() || form_field_id.is_empty() {
            continue;
        }
        contact.set(name.as_str(), resolver.field_value(form, entry, form_field_id));
    }

    contact
}

//! Forms, submitted entries, and field-value resolution.
//!
//! Values are looked up by field id the way the form platform addresses them:
//! `"3"` for a whole field, `"3.6"` for one sub-input of a compound field, and
//! a handful of meta ids (`id`, `date_created`, ...) for entry metadata.
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Field type tag as reported by the form definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Hidden,
    Phone,
    Name,
    Address,
    Checkbox,
    Select,
    Number,
    #[serde(other)]
    Other,
}

/// One sub-input of a compound field (name parts, address lines, checkbox choices).
#[derive(Debug, Clone, Deserialize)]
pub struct FieldInput {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormField {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
    /// Only meaningful for phone fields: "standard" or "international".
    #[serde(default, rename = "phoneFormat", alias = "phone_format")]
    pub phone_format: Option<String>,
    #[serde(default)]
    pub inputs: Vec<FieldInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Form {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl Form {
    /// Finds the field that owns `field_id`, whether it names the field or one of its inputs.
    pub fn field(&self, field_id: &str) -> Option<&FormField> {
        let base = field_id.split('.').next()?;
        let id: u32 = base.parse().ok()?;
        self.fields.iter().find(|f| f.id == id)
    }
}

/// A submitted entry. Read-only here; notes go through [`crate::notes::NoteSink`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    pub id: u64,
    pub form_id: u32,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Submitted values keyed by field or input id.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl Entry {
    /// Raw stored value for a field or input id, or "" when absent.
    pub fn raw(&self, field_id: &str) -> &str {
        self.values.get(field_id).map(String::as_str).unwrap_or("")
    }

    fn meta(&self, field_id: &str) -> Option<String> {
        let value = match field_id {
            "id" => self.id.to_string(),
            "form_id" => self.form_id.to_string(),
            "date_created" => self.date_created.map(|d| d.to_rfc3339()).unwrap_or_default(),
            "source_url" => self.source_url.clone().unwrap_or_default(),
            "ip" => self.ip.clone().unwrap_or_default(),
            "user_agent" => self.user_agent.clone().unwrap_or_default(),
            "payment_status" => self.payment_status.clone().unwrap_or_default(),
            _ => return None,
        };
        Some(value)
    }
}

/// Resolves the value a feed should send for a given field id.
pub trait FieldResolver: Send + Sync {
    fn field_value(&self, form: &Form, entry: &Entry, field_id: &str) -> String;
}

/// Default resolver: dispatches on the field type, formatting phone fields
/// and joining the sub-inputs of compound fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormFieldResolver;

impl FieldResolver for FormFieldResolver {
    fn field_value(&self, form: &Form, entry: &Entry, field_id: &str) -> String {
        if let Some(meta) = entry.meta(field_id) {
            return meta;
        }

        let Some(field) = form.field(field_id) else {
            // Not in the form definition; fall back to whatever was stored.
            return entry.raw(field_id).trim().to_string();
        };

        let whole_field = !field_id.contains('.');
        match field.kind {
            FieldKind::Phone => {
                let raw = entry.raw(field_id).trim();
                format_phone(raw, field.phone_format.as_deref().unwrap_or(""))
            }
            FieldKind::Name | FieldKind::Address if whole_field => join_inputs(field, entry, " "),
            FieldKind::Checkbox if whole_field => join_inputs(field, entry, ", "),
            _ => entry.raw(field_id).trim().to_string(),
        }
    }
}

fn join_inputs(field: &FormField, entry: &Entry, separator: &str) -> String {
    if field.inputs.is_empty() {
        return entry.raw(&field.id.to_string()).trim().to_string();
    }
    field
        .inputs
        .iter()
        .map(|input| entry.raw(&input.id).trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

static PHONE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn phone_pattern() -> &'static Regex {
    PHONE_PATTERN.get_or_init(|| {
        Regex::new(r"^\D?([0-9]{3})\D?\D?([0-9]{3})\D?([0-9]{4})$").expect("phone pattern is valid")
    })
}

/// Reformats a 10-digit North-American number to `NNN-NNN-NNNN` when the
/// field uses the "standard" phone format. Anything else passes through.
pub fn format_phone(raw_value: &str, phone_format: &str) -> String {
    if raw_value.is_empty() || phone_format != "standard" {
        return raw_value.to_string();
    }
    match phone_pattern().captures(raw_value) {
        Some(caps) => format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]),
        None => raw_value.to_string(),
    }
}

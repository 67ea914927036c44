//! Administrator-configured feeds binding a form to a Notifuse import.
use crate::condition::FeedCondition;
use crate::contact::ContactField;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Payment statuses that release a feed held for payment.
const PAID_STATUSES: [&str; 2] = ["Paid", "Approved"];

#[derive(Debug, Clone, Deserialize)]
pub struct Feed {
    pub id: u32,
    pub form_id: u32,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Raw comma-separated list names as entered by the administrator.
    #[serde(default)]
    pub subscribe_lists: String,
    #[serde(default, deserialize_with = "deserialize_mapped_fields")]
    pub mapped_fields: BTreeMap<ContactField, String>,
    /// Free-form contact attributes (ex: custom_string_1), in configured order.
    #[serde(default, deserialize_with = "deserialize_custom_fields")]
    pub custom_fields: Vec<(String, String)>,
    #[serde(default)]
    pub condition: FeedCondition,
    /// Only sync once the entry's payment has been received.
    #[serde(default)]
    pub delay_until_paid: bool,
}

fn default_active() -> bool {
    true
}

fn deserialize_mapped_fields<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<ContactField, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, field_id)| {
            ContactField::from_key(&key)
                .map(|field| (field, field_id))
                .ok_or_else(|| D::Error::custom(format!("unknown contact field `{key}`")))
        })
        .collect()
}

#[derive(Deserialize)]
struct CustomFieldEntry {
    key: String,
    field_id: String,
}

fn deserialize_custom_fields<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<CustomFieldEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|e| (e.key.trim().to_string(), e.field_id))
        .collect())
}

impl Feed {
    pub fn new(id: u32, form_id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            form_id,
            name: name.into(),
            is_active: true,
            subscribe_lists: String::new(),
            mapped_fields: BTreeMap::new(),
            custom_fields: Vec::new(),
            condition: FeedCondition::default(),
            delay_until_paid: false,
        }
    }

    /// Lists to subscribe the contact to: split on commas, trimmed, empties dropped.
    pub fn subscribe_lists(&self) -> Vec<String> {
        parse_list_names(&self.subscribe_lists)
    }

    /// Value shown in the feed list's "Lists" column.
    pub fn lists_column(&self) -> &str {
        if self.subscribe_lists.trim().is_empty() {
            "—"
        } else {
            &self.subscribe_lists
        }
    }

    /// Required contact fields with no form field selected.
    pub fn unmapped_required_fields(&self) -> Vec<ContactField> {
        ContactField::ALL
            .into_iter()
            .filter(|field| field.is_required())
            .filter(|field| {
                self.mapped_fields
                    .get(field)
                    .map_or(true, |form_field_id| form_field_id.trim().is_empty())
            })
            .collect()
    }

    /// Whether an entry with `payment_status` may be processed by this feed now.
    pub fn is_payment_ready(&self, payment_status: Option<&str>) -> bool {
        if !self.delay_until_paid {
            return true;
        }
        payment_status.is_some_and(|status| PAID_STATUSES.contains(&status))
    }
}

pub fn parse_list_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

//! Plugin-level Notifuse settings and their validators.
//!
//! The three settings are configured once by an administrator and read on
//! every feed run. The API token never appears in `Debug` output.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Please enter a valid URL.")]
    InvalidUrl,
}

/// Connection settings for a Notifuse instance.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Base URL of the instance (ex: https://demo.notifuse.com).
    pub instance_url: String,

    /// Bearer token sent with every import request.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_token: SecretString,

    /// Workspace the contacts are imported into (ex: ws_1234567890).
    pub workspace_id: String,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            api_token: SecretString::from(String::new()),
            workspace_id: String::new(),
        }
    }
}

impl std::fmt::Debug for PluginSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.api_token.expose_secret().is_empty() {
            None
        } else {
            Some("[REDACTED]")
        };
        f.debug_struct("PluginSettings")
            .field("instance_url", &self.instance_url)
            .field("api_token", &token)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}

impl PluginSettings {
    pub fn new(
        instance_url: impl Into<String>,
        api_token: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            api_token: SecretString::from(api_token.into()),
            workspace_id: workspace_id.into(),
        }
    }

    /// True when URL, token and workspace are all filled in.
    pub fn is_complete(&self) -> bool {
        !self.instance_url.trim().is_empty()
            && !self.api_token.expose_secret().trim().is_empty()
            && !self.workspace_id.trim().is_empty()
    }
}

/// Source of plugin settings, read fresh on every feed run.
pub trait SettingsStore: Send + Sync {
    fn plugin_settings(&self) -> PluginSettings;
}

impl SettingsStore for PluginSettings {
    fn plugin_settings(&self) -> PluginSettings {
        self.clone()
    }
}

/// Validates the instance URL setting.
///
/// An empty value passes (the field's own `required` flag covers that case);
/// anything else must parse as an absolute URL with a host.
pub fn validate_url(value: &str) -> Result<(), SettingsError> {
    if value.is_empty() {
        return Ok(());
    }
    match Url::parse(value) {
        Ok(url) if url.has_host() => Ok(()),
        _ => Err(SettingsError::InvalidUrl),
    }
}

/// Gates whether feeds may be created or listed.
pub fn can_create_feed(settings: &PluginSettings) -> bool {
    settings.is_complete()
}

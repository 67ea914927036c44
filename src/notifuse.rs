//! Client for the Notifuse `contacts.import` endpoint.
use crate::contact::ContactRecord;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const IMPORT_PATH: &str = "/api/contacts.import";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Cap on how much of an error response body is kept for the feed error.
const MAX_ERROR_BODY: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Notifuse returned an error (Code {code}): {body}")]
    Rejected { code: u16, body: String },
}

/// Body of a `contacts.import` call.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRequest {
    pub workspace_id: String,
    pub contacts: Vec<ContactRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subscribe_to_lists: Vec<String>,
}

impl ImportRequest {
    pub fn single(
        workspace_id: impl Into<String>,
        contact: ContactRecord,
        subscribe_to_lists: Vec<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            contacts: vec![contact],
            subscribe_to_lists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub status: u16,
    pub body: String,
}

/// Import endpoint for an instance URL, with any trailing slashes removed first.
pub fn import_endpoint(instance_url: &str) -> String {
    format!("{}{}", instance_url.trim_end_matches('/'), IMPORT_PATH)
}

#[derive(Debug, Clone)]
pub struct NotifuseClient {
    http: reqwest::Client,
}

impl NotifuseClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http })
    }

    /// Sends one import request. Only 200 and 201 count as success.
    pub async fn import_contacts(
        &self,
        instance_url: &str,
        api_token: &SecretString,
        request: &ImportRequest,
    ) -> Result<ImportResponse, ImportError> {
        let endpoint = import_endpoint(instance_url);
        let body = serde_json::to_vec(request)?;

        tracing::debug!(
            endpoint = %endpoint,
            contacts = request.contacts.len(),
            lists = request.subscribe_to_lists.len(),
            "Sending contacts to Notifuse"
        );

        let response = self
            .http
            .post(&endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", api_token.expose_secret()),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            let body = rejected_body(read_limited_text(response, MAX_ERROR_BODY).await);
            return Err(ImportError::Rejected { code: status, body });
        }

        let body = read_limited_text(response, MAX_ERROR_BODY).await?;
        Ok(ImportResponse { status, body })
    }
}

/// Body to report for a rejected import; an unreadable body must not hide the status code.
fn rejected_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Failed to read Notifuse error body");
        String::new()
    })
}

/// Reads at most `limit` bytes of the body; anything past that is dropped.
async fn read_limited_text(response: reqwest::Response, limit: usize) -> Result<String, reqwest::Error> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit.saturating_sub(bytes.len());
        if chunk.len() >= room {
            bytes.extend_from_slice(&chunk[..room]);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

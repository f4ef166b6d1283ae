//! HTTP clients for the SaaS APIs MiniVault reads from and writes to.
//!
//! Every call is single-shot: no retries and no backoff. Failures are classified into
//! [`UpstreamError`] so callers can pass upstream status codes through.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use reqwest::Response;
use serde_json::Value as JsonValue;
use thiserror::Error;

pub mod ai;
pub mod github;
pub mod google;
pub mod notion;

pub use ai::{AiProvider, AnthropicGenerator, OpenAiGenerator, Prompt, TextGenerator};
pub use github::GitHubClient;
pub use google::{DriveClient, GmailClient, ServiceAccountKey};
pub use notion::NotionClient;

pub const CRATE_NAME: &str = "minivault-upstream";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: Some(format!("minivault/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl HttpClientConfig {
    /// One pooled client shared by every upstream wrapper.
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        builder.build().context("building reqwest client")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Notion,
    GitHub,
    GoogleDrive,
    Gmail,
    GoogleOAuth,
    OpenAi,
    Anthropic,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Notion => "Notion",
            Self::GitHub => "GitHub",
            Self::GoogleDrive => "Google Drive",
            Self::Gmail => "Gmail",
            Self::GoogleOAuth => "Google OAuth",
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        })
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} responded with status {status}: {message}")]
    Status {
        service: Service,
        status: u16,
        message: String,
    },
    #[error("request to {service} failed: {source}")]
    Transport {
        service: Service,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response from {service}: {detail}")]
    Decode { service: Service, detail: String },
    #[error("invalid credential for {service}: {detail}")]
    Credential { service: Service, detail: String },
    /// Refused locally; nothing was sent.
    #[error("`{id}` is not a valid {service} id")]
    InvalidId { service: Service, id: String },
}

impl UpstreamError {
    pub fn service(&self) -> Service {
        match self {
            Self::Status { service, .. }
            | Self::Transport { service, .. }
            | Self::Decode { service, .. }
            | Self::Credential { service, .. }
            | Self::InvalidId { service, .. } => *service,
        }
    }

    /// Upstream HTTP status, when the remote side answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn decode(service: Service, detail: impl Into<String>) -> Self {
        Self::Decode {
            service,
            detail: detail.into(),
        }
    }
}

pub(crate) fn transport(service: Service) -> impl FnOnce(reqwest::Error) -> UpstreamError {
    move |source| UpstreamError::Transport { service, source }
}

/// Read a response body as JSON, turning non-2xx answers into [`UpstreamError::Status`].
pub(crate) async fn read_json(service: Service, resp: Response) -> Result<JsonValue, UpstreamError> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport(service))?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(&text).map_err(|e| UpstreamError::decode(service, e.to_string()))
}

/// Pull the human-readable message out of an error body from any of the upstream APIs.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        let candidates = [
            value.get("message"),
            value.pointer("/error/message"),
            value.get("error_description"),
            value.get("error"),
        ];
        if let Some(msg) = candidates
            .into_iter()
            .flatten()
            .find_map(JsonValue::as_str)
            .filter(|s| !s.is_empty())
        {
            return msg.to_string();
        }
    }
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}

//! Google Drive v3 and Gmail v1, plus the service-account token exchange.

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{read_json, transport, Service, UpstreamError};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The fields of a downloaded service-account JSON key that the exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccountKey {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Sign the RS256 assertion Google's token endpoint expects.
    pub fn assertion(&self, scopes: &[&str], now: DateTime<Utc>) -> Result<String, UpstreamError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: scopes.join(" "),
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(60)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            UpstreamError::Credential {
                service: Service::GoogleOAuth,
                detail: e.to_string(),
            }
        })?;
        encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| UpstreamError::Credential {
            service: Service::GoogleOAuth,
            detail: e.to_string(),
        })
    }

    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        scopes: &[&str],
    ) -> Result<String, UpstreamError> {
        let assertion = self.assertion(scopes, Utc::now())?;
        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(transport(Service::GoogleOAuth))?;
        let value = read_json(Service::GoogleOAuth, resp).await?;
        debug!(client_email = %self.client_email, "exchanged service-account assertion");
        value
            .get("access_token")
            .and_then(JsonValue::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| UpstreamError::decode(Service::GoogleOAuth, "token response has no access_token"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub modified_time: Option<String>,
    pub web_view_link: Option<String>,
    pub icon_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_folder(&self, access_token: &str, folder_id: &str) -> Result<Vec<DriveFile>, UpstreamError> {
        let q = format!("'{}' in parents and trashed = false", folder_id.replace('\'', "\\'"));
        let resp = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("q", q.as_str()),
                ("fields", "files(id,name,mimeType,modifiedTime,webViewLink,iconLink)"),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", "100"),
            ])
            .send()
            .await
            .map_err(transport(Service::GoogleDrive))?;
        let value = read_json(Service::GoogleDrive, resp).await?;
        let list: DriveFileList = serde_json::from_value(value)
            .map_err(|e| UpstreamError::decode(Service::GoogleDrive, e.to_string()))?;
        Ok(list.files)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
}

impl GmailClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_message_ids(
        &self,
        access_token: &str,
        query: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<String>, UpstreamError> {
        let mut params = vec![("maxResults", max_results.to_string())];
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }
        let resp = self
            .http
            .get(format!("{}/users/me/messages", self.base_url))
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .map_err(transport(Service::Gmail))?;
        let value = read_json(Service::Gmail, resp).await?;
        Ok(value
            .get("messages")
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m.get("id").and_then(JsonValue::as_str))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn message_metadata(&self, access_token: &str, id: &str) -> Result<MessageSummary, UpstreamError> {
        let resp = self
            .http
            .get(format!("{}/users/me/messages/{}", self.base_url, id))
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Date"),
            ])
            .send()
            .await
            .map_err(transport(Service::Gmail))?;
        let value = read_json(Service::Gmail, resp).await?;
        let header = |name: &str| {
            value
                .pointer("/payload/headers")
                .and_then(JsonValue::as_array)
                .and_then(|headers| {
                    headers.iter().find(|h| {
                        h.get("name")
                            .and_then(JsonValue::as_str)
                            .is_some_and(|n| n.eq_ignore_ascii_case(name))
                    })
                })
                .and_then(|h| h.get("value"))
                .and_then(JsonValue::as_str)
                .map(ToString::to_string)
        };
        Ok(MessageSummary {
            id: id.to_string(),
            thread_id: value
                .get("threadId")
                .and_then(JsonValue::as_str)
                .map(ToString::to_string),
            subject: header("Subject"),
            from: header("From"),
            date: header("Date"),
            snippet: value
                .get("snippet")
                .and_then(JsonValue::as_str)
                .map(ToString::to_string),
        })
    }

    /// List then fetch metadata for each message concurrently.
    pub async fn recent_messages(
        &self,
        access_token: &str,
        query: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>, UpstreamError> {
        let ids = self.list_message_ids(access_token, query, max_results).await?;
        try_join_all(ids.iter().map(|id| self.message_metadata(access_token, id))).await
    }
}

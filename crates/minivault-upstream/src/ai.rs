//! Free-text generation through OpenAI Chat Completions or Anthropic Messages.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::{read_json, transport, Service, UpstreamError};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl AiProvider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    pub max_tokens: u32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> AiProvider;
    fn model(&self) -> &str;
    async fn generate(&self, prompt: &Prompt) -> Result<String, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn provider(&self) -> AiProvider {
        AiProvider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, UpstreamError> {
        let mut messages = Vec::new();
        if let Some(system) = &prompt.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt.user }));

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "max_tokens": prompt.max_tokens,
            }))
            .send()
            .await
            .map_err(transport(Service::OpenAi))?;
        let value = read_json(Service::OpenAi, resp).await?;
        value
            .pointer("/choices/0/message/content")
            .and_then(JsonValue::as_str)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| UpstreamError::decode(Service::OpenAi, "completion has no message content"))
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    fn provider(&self) -> AiProvider {
        AiProvider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, UpstreamError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": prompt.max_tokens,
            "messages": [{ "role": "user", "content": prompt.user }],
        });
        if let Some(system) = &prompt.system {
            body["system"] = json!(system);
        }

        let resp = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport(Service::Anthropic))?;
        let value = read_json(Service::Anthropic, resp).await?;
        let text = value
            .get("content")
            .and_then(JsonValue::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(JsonValue::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(JsonValue::as_str))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(UpstreamError::decode(Service::Anthropic, "message has no text content"));
        }
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn prompt() -> Prompt {
        Prompt {
            system: Some("You write status reports.".into()),
            user: "Summarize the week.".into(),
            max_tokens: 256,
        }
    }

    #[test]
    fn provider_tags_parse_case_insensitively() {
        assert_eq!(AiProvider::parse("OpenAI"), Some(AiProvider::OpenAi));
        assert_eq!(AiProvider::parse(" anthropic "), Some(AiProvider::Anthropic));
        assert_eq!(AiProvider::parse("gemini"), None);
        assert_eq!(AiProvider::Anthropic.api_key_env(), "ANTHROPIC_API_KEY");
    }

    #[tokio::test]
    async fn openai_reads_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "You write status reports." },
                    { "role": "user", "content": "Summarize the week." }
                ]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":" All good. "}}]}"#)
            .create_async()
            .await;

        let generator = OpenAiGenerator::new(reqwest::Client::new(), server.url(), "sk-test", "gpt-4o-mini");
        assert_eq!(generator.generate(&prompt()).await.unwrap(), "All good.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn anthropic_joins_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "ak-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(json!({ "system": "You write status reports." })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Shipped "},{"type":"text","text":"v2."}]}"#)
            .create_async()
            .await;

        let generator = AnthropicGenerator::new(
            reqwest::Client::new(),
            server.url(),
            "ak-test",
            AiProvider::Anthropic.default_model(),
        );
        assert_eq!(generator.generate(&prompt()).await.unwrap(), "Shipped v2.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let generator = AnthropicGenerator::new(reqwest::Client::new(), server.url(), "bad", "m");
        let err = generator.generate(&prompt()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("invalid x-api-key"));
    }
}

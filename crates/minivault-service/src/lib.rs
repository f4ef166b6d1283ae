//! Request-level operations behind the `/api` routes.
//!
//! Each operation checks configuration first, then validates its input, then talks to
//! upstream. Nothing is cached between calls; the only shared state is the HTTP pool.

use anyhow::Result;
use minivault_core::{parse_notion_id, RecordKind};
use minivault_upstream::ai::{AnthropicGenerator, OpenAiGenerator};
use minivault_upstream::{AiProvider, GitHubClient, NotionClient, TextGenerator};

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod github;
pub mod google;
pub mod records;
pub mod reports;
pub mod sales;

pub use bootstrap::{BootstrapRequest, BootstrapResult};
pub use config::{Endpoints, Integrations, MiniVaultConfig};
pub use error::{ServiceError, ServiceResult};
pub use github::GitHubOverview;
pub use records::{BlockText, FieldMapping, ListQuery, SchemaReport};
pub use reports::{WeeklyReport, WeeklyReportRequest};
pub use sales::SalesSummary;

pub const CRATE_NAME: &str = "minivault-service";

#[derive(Debug, Clone)]
pub struct MiniVault {
    config: MiniVaultConfig,
    http: reqwest::Client,
}

impl MiniVault {
    pub fn new(config: MiniVaultConfig) -> Result<Self> {
        let http = config.http_client_config().build_client()?;
        Ok(Self { config, http })
    }

    pub fn with_client(config: MiniVaultConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn from_env() -> Result<Self> {
        Self::new(MiniVaultConfig::from_env())
    }

    pub fn config(&self) -> &MiniVaultConfig {
        &self.config
    }

    pub(crate) fn notion(&self) -> ServiceResult<NotionClient> {
        let token = self
            .config
            .notion_token
            .as_deref()
            .ok_or_else(|| ServiceError::Configuration("NOTION_TOKEN".into()))?;
        Ok(NotionClient::new(
            self.http.clone(),
            &self.config.endpoints.notion,
            token,
        ))
    }

    /// The caller's own token wins over the server-wide `GITHUB_TOKEN`.
    pub(crate) fn github(&self, user_token: Option<&str>) -> ServiceResult<GitHubClient> {
        let token = user_token
            .or(self.config.github_token.as_deref())
            .ok_or(ServiceError::Unauthorized("GitHub credential required"))?;
        Ok(GitHubClient::new(
            self.http.clone(),
            &self.config.endpoints.github,
            token,
        ))
    }

    pub(crate) fn generator(
        &self,
        provider: AiProvider,
        model: Option<&str>,
    ) -> ServiceResult<Box<dyn TextGenerator>> {
        let model = model.unwrap_or(provider.default_model());
        let generator: Box<dyn TextGenerator> = match provider {
            AiProvider::OpenAi => {
                let key = self
                    .config
                    .openai_api_key
                    .as_deref()
                    .ok_or_else(|| ServiceError::Configuration(provider.api_key_env().into()))?;
                Box::new(OpenAiGenerator::new(
                    self.http.clone(),
                    &self.config.endpoints.openai,
                    key,
                    model,
                ))
            }
            AiProvider::Anthropic => {
                let key = self
                    .config
                    .anthropic_api_key
                    .as_deref()
                    .ok_or_else(|| ServiceError::Configuration(provider.api_key_env().into()))?;
                Box::new(AnthropicGenerator::new(
                    self.http.clone(),
                    &self.config.endpoints.anthropic,
                    key,
                    model,
                ))
            }
        };
        Ok(generator)
    }

    /// Database for a request: the explicit id, else the kind's env default.
    pub(crate) fn database_for(&self, kind: &RecordKind, explicit: Option<&str>) -> ServiceResult<String> {
        let explicit = explicit.map(str::trim).filter(|id| !id.is_empty());
        let fallback = kind
            .default_database_env
            .and(self.config.notion_database_id.as_deref());
        let raw = explicit
            .or(fallback)
            .ok_or_else(|| ServiceError::MissingField("databaseId".into()))?;
        notion_id("databaseId", raw)
    }
}

/// Dashless Notion id for `field`, or a 400 naming the field.
pub(crate) fn notion_id(field: &str, raw: &str) -> ServiceResult<String> {
    parse_notion_id(raw).ok_or_else(|| ServiceError::invalid(field, "expected a Notion id (32 hex digits or a dashed UUID)"))
}

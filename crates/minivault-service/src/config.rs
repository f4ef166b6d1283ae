use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use minivault_upstream::ai::{ANTHROPIC_API_BASE, OPENAI_API_BASE};
use minivault_upstream::github::GITHUB_API_BASE;
use minivault_upstream::google::{DRIVE_API_BASE, GMAIL_API_BASE};
use minivault_upstream::notion::NOTION_API_BASE;
use minivault_upstream::HttpClientConfig;
use serde::Serialize;

const TEMPLATE_PREFIX: &str = "NOTION_TEMPLATE_";

/// Upstream base URLs. Overridable for tests and proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub notion: String,
    pub github: String,
    pub drive: String,
    pub gmail: String,
    pub openai: String,
    pub anthropic: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            notion: NOTION_API_BASE.to_string(),
            github: GITHUB_API_BASE.to_string(),
            drive: DRIVE_API_BASE.to_string(),
            gmail: GMAIL_API_BASE.to_string(),
            openai: OPENAI_API_BASE.to_string(),
            anthropic: ANTHROPIC_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every upstream at one base URL, e.g. a mock server.
    pub fn all(base: &str) -> Self {
        Self {
            notion: base.to_string(),
            github: base.to_string(),
            drive: base.to_string(),
            gmail: base.to_string(),
            openai: base.to_string(),
            anthropic: base.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MiniVaultConfig {
    pub notion_token: Option<String>,
    pub notion_database_id: Option<String>,
    pub notion_parent_page_id: Option<String>,
    /// `NOTION_TEMPLATE_<KIND>` → template database id, keyed by lowercased kind.
    pub notion_templates: BTreeMap<String, String>,
    pub google_service_account_key: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub github_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub endpoints: Endpoints,
}

impl Default for MiniVaultConfig {
    fn default() -> Self {
        Self {
            notion_token: None,
            notion_database_id: None,
            notion_parent_page_id: None,
            notion_templates: BTreeMap::new(),
            google_service_account_key: None,
            google_client_id: None,
            google_client_secret: None,
            github_client_id: None,
            github_client_secret: None,
            github_token: None,
            openai_api_key: None,
            anthropic_api_key: None,
            port: 3000,
            http_timeout_secs: 30,
            user_agent: format!("minivault/{}", env!("CARGO_PKG_VERSION")),
            endpoints: Endpoints::default(),
        }
    }
}

/// Which integrations have credentials configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Integrations {
    pub notion: bool,
    pub github: bool,
    pub google: bool,
    pub openai: bool,
    pub anthropic: bool,
}

impl MiniVaultConfig {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string());
        let defaults = Self::default();

        let notion_templates = vars
            .iter()
            .filter_map(|(key, value)| {
                let kind = key.strip_prefix(TEMPLATE_PREFIX)?;
                (!kind.is_empty()).then(|| (kind.to_ascii_lowercase(), value.trim().to_string()))
            })
            .collect();

        Self {
            notion_token: get("NOTION_TOKEN"),
            notion_database_id: get("NOTION_DATABASE_ID"),
            notion_parent_page_id: get("NOTION_PARENT_PAGE_ID"),
            notion_templates,
            google_service_account_key: get("GOOGLE_SERVICE_ACCOUNT_KEY"),
            google_client_id: get("GOOGLE_CLIENT_ID"),
            google_client_secret: get("GOOGLE_CLIENT_SECRET"),
            github_client_id: get("GITHUB_CLIENT_ID"),
            github_client_secret: get("GITHUB_CLIENT_SECRET"),
            github_token: get("GITHUB_TOKEN"),
            openai_api_key: get("OPENAI_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            port: get("MINIVAULT_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            http_timeout_secs: get("MINIVAULT_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            user_agent: get("MINIVAULT_USER_AGENT").unwrap_or(defaults.user_agent),
            endpoints: Endpoints {
                notion: get("NOTION_API_BASE").unwrap_or(defaults.endpoints.notion),
                github: get("GITHUB_API_BASE").unwrap_or(defaults.endpoints.github),
                drive: get("GOOGLE_DRIVE_API_BASE").unwrap_or(defaults.endpoints.drive),
                gmail: get("GMAIL_API_BASE").unwrap_or(defaults.endpoints.gmail),
                openai: get("OPENAI_API_BASE").unwrap_or(defaults.endpoints.openai),
                anthropic: get("ANTHROPIC_API_BASE").unwrap_or(defaults.endpoints.anthropic),
            },
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
        }
    }

    pub fn integrations(&self) -> Integrations {
        Integrations {
            notion: self.notion_token.is_some(),
            github: self.github_token.is_some()
                || (self.github_client_id.is_some() && self.github_client_secret.is_some()),
            google: self.google_service_account_key.is_some()
                || (self.google_client_id.is_some() && self.google_client_secret.is_some()),
            openai: self.openai_api_key.is_some(),
            anthropic: self.anthropic_api_key.is_some(),
        }
    }
}

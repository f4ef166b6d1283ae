//! Read-only GitHub REST v3 access for the repository overview.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{read_json, transport, Service, UpstreamError};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

const MAX_PER_PAGE: usize = 100;
const MAX_ISSUE_PAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub default_branch: Option<String>,
    pub stars: u64,
    pub open_issues: u64,
    pub pushed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    pub date: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub labels: Vec<String>,
    pub created_at: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: Option<String>,
    pub draft: bool,
    pub created_at: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    full_name: String,
    description: Option<String>,
    html_url: String,
    default_branch: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    pushed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    html_url: String,
    commit: RawCommitDetail,
    author: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    message: String,
    author: Option<RawCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    state: String,
    html_url: String,
    user: Option<RawUser>,
    #[serde(default)]
    labels: Vec<RawLabel>,
    created_at: Option<String>,
    pull_request: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RawPull {
    number: u64,
    title: String,
    state: String,
    html_url: String,
    user: Option<RawUser>,
    #[serde(default)]
    draft: bool,
    created_at: Option<String>,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .query(query)
            .send()
            .await
            .map_err(transport(Service::GitHub))?;
        let value = read_json(Service::GitHub, resp).await?;
        serde_json::from_value(value).map_err(|e| UpstreamError::decode(Service::GitHub, e.to_string()))
    }

    pub async fn repository(&self, repo: &str) -> Result<RepoSummary, UpstreamError> {
        let raw: RawRepo = self.get(&format!("/repos/{repo}"), &[]).await?;
        Ok(RepoSummary {
            full_name: raw.full_name,
            description: raw.description,
            html_url: raw.html_url,
            default_branch: raw.default_branch,
            stars: raw.stargazers_count,
            open_issues: raw.open_issues_count,
            pushed_at: raw.pushed_at,
        })
    }

    pub async fn commits(
        &self,
        repo: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, UpstreamError> {
        let mut query = vec![("per_page", limit.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        let raw: Vec<RawCommit> = self.get(&format!("/repos/{repo}/commits"), &query).await?;
        Ok(raw
            .into_iter()
            .map(|c| CommitSummary {
                sha: c.sha,
                message: c.commit.message.lines().next().unwrap_or_default().to_string(),
                author: c
                    .author
                    .map(|u| u.login)
                    .or_else(|| c.commit.author.as_ref().and_then(|a| a.name.clone())),
                date: c.commit.author.and_then(|a| a.date),
                html_url: c.html_url,
            })
            .collect())
    }

    /// Open issues, excluding pull requests (GitHub lists both on this endpoint).
    ///
    /// Pull requests still count against `per_page`, so later pages are read until
    /// `limit` issues are collected or the listing runs out.
    pub async fn open_issues(&self, repo: &str, limit: usize) -> Result<Vec<IssueSummary>, UpstreamError> {
        let per_page = limit.clamp(1, MAX_PER_PAGE);
        let mut issues = Vec::new();
        for page in 1..=MAX_ISSUE_PAGES {
            let query = [
                ("state", "open".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ];
            let raw: Vec<RawIssue> = self.get(&format!("/repos/{repo}/issues"), &query).await?;
            let fetched = raw.len();
            issues.extend(raw.into_iter().filter(|i| i.pull_request.is_none()).map(|i| IssueSummary {
                number: i.number,
                title: i.title,
                state: i.state,
                author: i.user.map(|u| u.login),
                labels: i.labels.into_iter().map(|l| l.name).collect(),
                created_at: i.created_at,
                html_url: i.html_url,
            }));
            if issues.len() >= limit || fetched < per_page {
                break;
            }
        }
        issues.truncate(limit);
        Ok(issues)
    }

    pub async fn open_pulls(&self, repo: &str, limit: usize) -> Result<Vec<PullSummary>, UpstreamError> {
        let query = [("state", "open".to_string()), ("per_page", limit.to_string())];
        let raw: Vec<RawPull> = self.get(&format!("/repos/{repo}/pulls"), &query).await?;
        Ok(raw
            .into_iter()
            .map(|p| PullSummary {
                number: p.number,
                title: p.title,
                state: p.state,
                author: p.user.map(|u| u.login),
                draft: p.draft,
                created_at: p.created_at,
                html_url: p.html_url,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn issues_skip_pull_requests() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/site/issues")
            .match_header("accept", "application/vnd.github.v3+json")
            .match_header("authorization", "Bearer gh_token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "open".into()),
                Matcher::UrlEncoded("per_page".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[
                  {"number":1,"title":"Bug","state":"open","html_url":"https://github.com/acme/site/issues/1","user":{"login":"ana"},"labels":[{"name":"bug"}],"created_at":"2026-10-01T00:00:00Z"},
                  {"number":2,"title":"PR","state":"open","html_url":"https://github.com/acme/site/pull/2","user":{"login":"bo"},"labels":[],"pull_request":{"url":"x"}}
                ]"#,
            )
            .create_async()
            .await;

        let client = GitHubClient::new(reqwest::Client::new(), server.url(), "gh_token");
        let issues = client.open_issues("acme/site", 5).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Bug");
        assert_eq!(issues[0].labels, vec!["bug".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn issues_fill_the_limit_across_pages() {
        let mut server = mockito::Server::new_async().await;
        let issue = |n: u64| format!(r#"{{"number":{n},"title":"Issue {n}","state":"open","html_url":"h{n}","user":null,"labels":[]}}"#);
        let pull = r#"{"number":2,"title":"PR","state":"open","html_url":"p","user":null,"labels":[],"pull_request":{"url":"x"}}"#;
        let first = server
            .mock("GET", "/repos/acme/site/issues")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(format!("[{},{pull}]", issue(1)))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/acme/site/issues")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(format!("[{},{}]", issue(3), issue(4)))
            .create_async()
            .await;

        let client = GitHubClient::new(reqwest::Client::new(), server.url(), "t");
        let issues = client.open_issues("acme/site", 2).await.unwrap();
        assert_eq!(issues.iter().map(|i| i.number).collect::<Vec<_>>(), [1, 3]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn commits_keep_first_message_line() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/site/commits")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"sha":"abc","html_url":"https://github.com/acme/site/commit/abc","author":null,
                     "commit":{"message":"Fix login\n\nLong body","author":{"name":"Ana","date":"2026-10-10T10:00:00Z"}}}]"#,
            )
            .create_async()
            .await;

        let client = GitHubClient::new(reqwest::Client::new(), server.url(), "t");
        let commits = client.commits("acme/site", None, 10).await.unwrap();
        assert_eq!(commits[0].message, "Fix login");
        assert_eq!(commits[0].author.as_deref(), Some("Ana"));
        assert_eq!(commits[0].date.as_deref(), Some("2026-10-10T10:00:00Z"));
    }
}

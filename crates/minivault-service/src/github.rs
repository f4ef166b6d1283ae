use minivault_upstream::github::{CommitSummary, IssueSummary, PullSummary, RepoSummary};
use serde::Serialize;
use tracing::debug;

use crate::{MiniVault, ServiceError, ServiceResult};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubOverview {
    pub repo: RepoSummary,
    pub commits: Vec<CommitSummary>,
    pub issues: Vec<IssueSummary>,
    pub pull_requests: Vec<PullSummary>,
}

/// `owner/name`, with a leading github.com URL tolerated.
pub(crate) fn parse_repo(raw: Option<&str>) -> ServiceResult<String> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ServiceError::MissingField("repo".into()))?;
    let repo = raw
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .trim_end_matches(".git")
        .trim_matches('/');
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(format!("{owner}/{name}")),
        _ => Err(ServiceError::invalid("repo", "expected `owner/name`")),
    }
}

impl MiniVault {
    /// Repository, recent commits, open issues and open pull requests, fetched concurrently.
    pub async fn github_overview(
        &self,
        user_token: Option<&str>,
        repo: Option<&str>,
        limit: Option<usize>,
    ) -> ServiceResult<GitHubOverview> {
        let github = self.github(user_token)?;
        let repo = parse_repo(repo)?;
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let (summary, commits, issues, pull_requests) = tokio::try_join!(
            github.repository(&repo),
            github.commits(&repo, None, limit),
            github.open_issues(&repo, limit),
            github.open_pulls(&repo, limit),
        )?;
        debug!(%repo, commits = commits.len(), issues = issues.len(), "github overview");
        Ok(GitHubOverview {
            repo: summary,
            commits,
            issues,
            pull_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    use crate::testing::vault;

    #[test]
    fn repo_argument_forms() {
        assert_eq!(parse_repo(Some("acme/site")).unwrap(), "acme/site");
        assert_eq!(parse_repo(Some("https://github.com/acme/site.git")).unwrap(), "acme/site");
        assert!(matches!(parse_repo(None), Err(ServiceError::MissingField(_))));
        assert!(matches!(parse_repo(Some("acme")), Err(ServiceError::InvalidField { .. })));
        assert!(matches!(parse_repo(Some("a/b/c")), Err(ServiceError::InvalidField { .. })));
    }

    #[tokio::test]
    async fn overview_requires_a_credential() {
        let server = mockito::Server::new_async().await;
        let err = vault(&server)
            .github_overview(None, Some("acme/site"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn overview_joins_four_reads() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/site")
            .match_header("authorization", "Bearer gho_user")
            .match_header("accept", "application/vnd.github.v3+json")
            .with_status(200)
            .with_body(r#"{"full_name":"acme/site","description":null,"html_url":"https://github.com/acme/site","stargazers_count":4,"open_issues_count":2}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/site/commits")
            .match_query(Matcher::UrlEncoded("per_page".into(), "5".into()))
            .with_status(200)
            .with_body(r#"[{"sha":"abc","html_url":"h","commit":{"message":"Fix nav\n\nlong body","author":{"name":"Ana","date":"2026-10-10T10:00:00Z"}},"author":{"login":"ana"}}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/site/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"number":1,"title":"Bug","state":"open","html_url":"h1"},{"number":2,"title":"PR","state":"open","html_url":"h2","pull_request":{}}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/site/pulls")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"number":2,"title":"PR","state":"open","html_url":"h2","draft":true}]"#)
            .create_async()
            .await;

        let overview = vault(&server)
            .github_overview(Some("gho_user"), Some("acme/site"), Some(5))
            .await
            .unwrap();
        assert_eq!(overview.repo.stars, 4);
        assert_eq!(overview.commits[0].message, "Fix nav");
        assert_eq!(overview.issues.len(), 1);
        assert!(overview.pull_requests[0].draft);

        let value = serde_json::to_value(&overview).unwrap();
        assert!(value.get("pullRequests").is_some());
    }
}

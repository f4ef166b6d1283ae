use chrono::{DateTime, Duration, Utc};
use minivault_core::catalog::TASKS;
use minivault_core::NormalizedRecord;
use minivault_mapper::UNTITLED;
use minivault_upstream::github::CommitSummary;
use minivault_upstream::{AiProvider, Prompt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::github::parse_repo;
use crate::records::ListQuery;
use crate::{notion_id, MiniVault, ServiceError, ServiceResult};

const REPORT_WINDOW_DAYS: i64 = 7;
const REPORT_MAX_TOKENS: u32 = 800;
const COMMIT_LIMIT: usize = 100;

const SYSTEM_PROMPT: &str = "You are a project assistant. Write a concise weekly status report in Markdown \
with sections for progress, risks and next steps. Only use the facts provided.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportRequest {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub project_name: Option<String>,
    pub tasks_database_id: Option<String>,
    pub repo: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub report: String,
    pub provider: AiProvider,
    pub model: String,
    pub task_count: usize,
    pub commit_count: usize,
}

impl MiniVault {
    /// Gather the last week of tasks and commits, then ask the chosen model to summarize.
    pub async fn weekly_report(
        &self,
        user_token: Option<&str>,
        request: &WeeklyReportRequest,
    ) -> ServiceResult<WeeklyReport> {
        let provider = match request.provider.as_deref().map(str::trim) {
            None | Some("") => return Err(ServiceError::MissingField("provider".into())),
            Some(raw) => AiProvider::parse(raw)
                .ok_or_else(|| ServiceError::invalid("provider", format!("unknown provider `{raw}`")))?,
        };
        let model = request.model.as_deref().map(str::trim).filter(|m| !m.is_empty());
        let generator = self.generator(provider, model)?;

        let tasks_db = match request.tasks_database_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                self.notion()?;
                Some(notion_id("tasksDatabaseId", raw)?)
            }
            _ => None,
        };
        let repo = match request.repo.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(parse_repo(Some(raw))?),
            None => None,
        };
        let github = repo.as_ref().map(|_| self.github(user_token)).transpose()?;

        let since = Utc::now() - Duration::days(REPORT_WINDOW_DAYS);
        let load_tasks = async {
            match &tasks_db {
                Some(db) => {
                    let query = ListQuery {
                        database_id: Some(db.clone()),
                        ..ListQuery::default()
                    };
                    let tasks = self.list_records(&TASKS, &query).await?;
                    Ok::<_, ServiceError>(edited_since(tasks, since))
                }
                None => Ok(Vec::new()),
            }
        };
        let load_commits = async {
            match (&github, &repo) {
                (Some(github), Some(repo)) => Ok::<_, ServiceError>(github.commits(repo, Some(since), COMMIT_LIMIT).await?),
                _ => Ok(Vec::new()),
            }
        };
        let (tasks, commits) = tokio::try_join!(load_tasks, load_commits)?;

        let prompt = Prompt {
            system: Some(SYSTEM_PROMPT.to_string()),
            user: compose_prompt(request.project_name.as_deref(), &tasks, &commits, request.notes.as_deref()),
            max_tokens: REPORT_MAX_TOKENS,
        };
        let report = generator.generate(&prompt).await?;
        info!(provider = %generator.provider(), model = generator.model(), tasks = tasks.len(), commits = commits.len(), "weekly report generated");

        Ok(WeeklyReport {
            report,
            provider: generator.provider(),
            model: generator.model().to_string(),
            task_count: tasks.len(),
            commit_count: commits.len(),
        })
    }
}

/// Records whose last edit falls inside the window. Unparseable timestamps are dropped.
fn edited_since(records: Vec<NormalizedRecord>, since: DateTime<Utc>) -> Vec<NormalizedRecord> {
    records
        .into_iter()
        .filter(|r| {
            r.last_edited_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .is_some_and(|t| t.with_timezone(&Utc) >= since)
        })
        .collect()
}

fn compose_prompt(
    project_name: Option<&str>,
    tasks: &[NormalizedRecord],
    commits: &[CommitSummary],
    notes: Option<&str>,
) -> String {
    let mut lines = Vec::new();
    let project = project_name.map(str::trim).filter(|p| !p.is_empty()).unwrap_or("the project");
    lines.push(format!("Weekly report for {project}."));

    lines.push(String::new());
    lines.push(format!("Tasks updated this week ({}):", tasks.len()));
    if tasks.is_empty() {
        lines.push("- none".to_string());
    }
    for task in tasks {
        let title = task.text("title").unwrap_or(UNTITLED);
        match task.text("status") {
            Some(status) => lines.push(format!("- {title} [{status}]")),
            None => lines.push(format!("- {title}")),
        }
    }

    lines.push(String::new());
    lines.push(format!("Commits this week ({}):", commits.len()));
    if commits.is_empty() {
        lines.push("- none".to_string());
    }
    for commit in commits {
        let author = commit.author.as_deref().unwrap_or("unknown");
        lines.push(format!("- {} ({author})", commit.message));
    }

    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        lines.push(String::new());
        lines.push(format!("Additional notes: {notes}"));
    }
    lines.join("\n")
}

use std::collections::BTreeMap;

use futures::future::join_all;
use minivault_core::{parse_notion_id, PageRef};
use minivault_mapper::{creation_properties, SchemaSource};
use minivault_upstream::NotionClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{notion_id, MiniVault, ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapRequest {
    pub project_name: Option<String>,
    pub parent_page_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapResult {
    pub success: bool,
    /// Template kind → newly created database.
    pub databases: BTreeMap<String, PageRef>,
}

impl MiniVault {
    /// Duplicate every configured template database under the project's parent page.
    pub async fn bootstrap_project(&self, request: &BootstrapRequest) -> ServiceResult<BootstrapResult> {
        let notion = self.notion()?;
        if self.config.notion_templates.is_empty() {
            return Err(ServiceError::Configuration("NOTION_TEMPLATE_*".into()));
        }
        let parent = request
            .parent_page_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .or(self.config.notion_parent_page_id.as_deref())
            .ok_or_else(|| ServiceError::Configuration("NOTION_PARENT_PAGE_ID".into()))?;
        let parent = notion_id("parentPageId", parent)?;
        let project_name = request
            .project_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::MissingField("projectName".into()))?;
        let mut templates = Vec::with_capacity(self.config.notion_templates.len());
        for (kind, raw) in &self.config.notion_templates {
            let template_id = parse_notion_id(raw)
                .ok_or_else(|| ServiceError::Configuration(format!("NOTION_TEMPLATE_{}", kind.to_uppercase())))?;
            templates.push((kind.as_str(), template_id));
        }

        // no short-circuit: databases created before a failure are reported below
        let outcomes = join_all(
            templates
                .iter()
                .map(|(kind, template_id)| duplicate(&notion, kind, template_id, &parent, project_name)),
        )
        .await;
        let mut databases = BTreeMap::new();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok((kind, database)) => {
                    databases.insert(kind, database);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            if !databases.is_empty() {
                warn!(
                    %project_name,
                    orphaned = ?databases.iter().map(|(kind, db)| format!("{kind}={}", db.id)).collect::<Vec<_>>(),
                    "bootstrap failed after creating some databases"
                );
            }
            return Err(err);
        }
        info!(%project_name, count = databases.len(), "bootstrapped project databases");

        Ok(BootstrapResult {
            success: true,
            databases,
        })
    }
}

async fn duplicate(
    notion: &NotionClient,
    kind: &str,
    template_id: &str,
    parent: &str,
    project_name: &str,
) -> ServiceResult<(String, PageRef)> {
    let template = notion.fetch_schema(template_id).await?;
    let derived = creation_properties(&template);
    if !derived.skipped.is_empty() {
        debug!(%kind, skipped = ?derived.skipped, "template properties not carried over");
    }

    let template_title = template.title.clone().unwrap_or_else(|| title_case(kind));
    let body = json!({
        "parent": { "type": "page_id", "page_id": parent },
        "title": [{ "type": "text", "text": { "content": format!("{project_name} — {template_title}") } }],
        "properties": derived.properties,
    });
    let database = notion.create_database(body).await?;
    Ok((kind.to_string(), PageRef::from_notion(&database)))
}

fn title_case(kind: &str) -> String {
    kind.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    use crate::testing::vault_with;

    const PARENT: &str = "5a5a5a5a5a5a45a5a5a5a5a5a5a5a5a5";
    const TASKS_TEMPLATE: &str = "7a7a7a7a7a7a47a7a7a7a7a7a7a7a7a7";
    const GOALS_TEMPLATE: &str = "6b6b6b6b6b6b46b6b6b6b6b6b6b6b6b6";

    #[test]
    fn kinds_become_titles() {
        assert_eq!(title_case("recurring_tasks"), "Recurring Tasks");
        assert_eq!(title_case("goals"), "Goals");
    }

    #[tokio::test]
    async fn configuration_is_checked_before_input() {
        let server = mockito::Server::new_async().await;
        let vault = vault_with(&server, |_| {});
        let err = vault.bootstrap_project(&BootstrapRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing configuration: NOTION_TEMPLATE_*");

        let vault = vault_with(&server, |c| {
            c.notion_templates.insert("tasks".into(), TASKS_TEMPLATE.into());
        });
        let err = vault.bootstrap_project(&BootstrapRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing configuration: NOTION_PARENT_PAGE_ID");

        let request = BootstrapRequest {
            project_name: None,
            parent_page_id: Some(PARENT.into()),
        };
        let err = vault.bootstrap_project(&request).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingField(ref f) if f == "projectName"));

        let request = BootstrapRequest {
            project_name: Some("Atlas".into()),
            parent_page_id: Some("../pages".into()),
        };
        let err = vault.bootstrap_project(&request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidField { ref field, .. } if field == "parentPageId"));

        let vault = vault_with(&server, |c| {
            c.notion_templates.insert("tasks".into(), "not-an-id".into());
        });
        let request = BootstrapRequest {
            project_name: Some("Atlas".into()),
            parent_page_id: Some(PARENT.into()),
        };
        let err = vault.bootstrap_project(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing configuration: NOTION_TEMPLATE_TASKS");
    }

    #[tokio::test]
    async fn duplicates_each_template_under_the_parent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/databases/{TASKS_TEMPLATE}").as_str())
            .with_status(200)
            .with_body(
                json!({
                    "id": TASKS_TEMPLATE,
                    "title": [{ "plain_text": "Tasks" }],
                    "properties": {
                        "Name": { "name": "Name", "type": "title", "title": {} },
                        "Stage": { "name": "Stage", "type": "status", "status": { "options": [{ "name": "Todo", "color": "gray" }] } },
                        "Epic": { "name": "Epic", "type": "relation", "relation": {} }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", format!("/databases/{GOALS_TEMPLATE}").as_str())
            .with_status(200)
            .with_body(r#"{"id":"goals","title":[],"properties":{"Name":{"name":"Name","type":"title","title":{}}}}"#)
            .create_async()
            .await;
        let create_tasks = server
            .mock("POST", "/databases")
            .match_body(Matcher::Json(json!({
                "parent": { "type": "page_id", "page_id": PARENT },
                "title": [{ "type": "text", "text": { "content": "Atlas — Tasks" } }],
                "properties": {
                    "Name": { "title": {} },
                    "Stage": { "select": { "options": [{ "name": "Todo", "color": "gray" }] } }
                }
            })))
            .with_status(200)
            .with_body(r#"{"object":"database","id":"new-tasks","url":"https://www.notion.so/new-tasks"}"#)
            .create_async()
            .await;
        let create_goals = server
            .mock("POST", "/databases")
            .match_body(Matcher::PartialJson(json!({
                "title": [{ "type": "text", "text": { "content": "Atlas — Goals" } }]
            })))
            .with_status(200)
            .with_body(r#"{"object":"database","id":"new-goals","url":"https://www.notion.so/new-goals"}"#)
            .create_async()
            .await;

        let vault = vault_with(&server, |c| {
            c.notion_parent_page_id = Some(PARENT.into());
            c.notion_templates.insert("tasks".into(), TASKS_TEMPLATE.into());
            c.notion_templates.insert("goals".into(), GOALS_TEMPLATE.into());
        });
        let result = vault
            .bootstrap_project(&BootstrapRequest {
                project_name: Some("Atlas".into()),
                parent_page_id: None,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.databases["tasks"].id, "new-tasks");
        assert_eq!(result.databases["goals"].url, "https://www.notion.so/new-goals");
        create_tasks.assert_async().await;
        create_goals.assert_async().await;
    }

    #[tokio::test]
    async fn a_failed_template_still_lets_the_others_finish() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/databases/{TASKS_TEMPLATE}").as_str())
            .with_status(200)
            .with_body(r#"{"id":"tasks","title":[],"properties":{"Name":{"name":"Name","type":"title","title":{}}}}"#)
            .create_async()
            .await;
        server
            .mock("GET", format!("/databases/{GOALS_TEMPLATE}").as_str())
            .with_status(404)
            .with_body(r#"{"object":"error","status":404,"message":"Could not find database"}"#)
            .create_async()
            .await;
        let created = server
            .mock("POST", "/databases")
            .with_status(200)
            .with_body(r#"{"object":"database","id":"new-tasks","url":"https://www.notion.so/new-tasks"}"#)
            .expect(1)
            .create_async()
            .await;

        let vault = vault_with(&server, |c| {
            c.notion_parent_page_id = Some(PARENT.into());
            c.notion_templates.insert("tasks".into(), TASKS_TEMPLATE.into());
            c.notion_templates.insert("goals".into(), GOALS_TEMPLATE.into());
        });
        let err = vault
            .bootstrap_project(&BootstrapRequest {
                project_name: Some("Atlas".into()),
                parent_page_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Upstream(ref e) if e.status() == Some(404)));
        created.assert_async().await;
    }
}

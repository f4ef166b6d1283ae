use minivault_upstream::google::{DriveFile, MessageSummary, DRIVE_READONLY_SCOPE};
use minivault_upstream::{DriveClient, GmailClient, ServiceAccountKey};
use tracing::debug;

use crate::{MiniVault, ServiceError, ServiceResult};

const DEFAULT_MAX_RESULTS: u32 = 10;
const MAX_RESULTS_CAP: u32 = 50;

/// How a Drive request authenticates.
enum GoogleAuth<'a> {
    User(&'a str),
    ServiceAccount(ServiceAccountKey),
}

impl MiniVault {
    fn google_auth<'a>(&self, user_token: Option<&'a str>) -> ServiceResult<GoogleAuth<'a>> {
        if let Some(token) = user_token {
            return Ok(GoogleAuth::User(token));
        }
        let raw = self
            .config
            .google_service_account_key
            .as_deref()
            .ok_or(ServiceError::Unauthorized("Google credential required"))?;
        let key = ServiceAccountKey::parse(raw)
            .map_err(|e| ServiceError::Configuration(format!("GOOGLE_SERVICE_ACCOUNT_KEY ({e})")))?;
        Ok(GoogleAuth::ServiceAccount(key))
    }

    /// Non-trashed files in a Drive folder. Uses the caller's token, else the service account.
    pub async fn drive_files(&self, user_token: Option<&str>, folder_id: Option<&str>) -> ServiceResult<Vec<DriveFile>> {
        let auth = self.google_auth(user_token)?;
        let folder_id = folder_id
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ServiceError::MissingField("folderId".into()))?;

        let token = match auth {
            GoogleAuth::User(token) => token.to_string(),
            GoogleAuth::ServiceAccount(key) => key.access_token(&self.http, &[DRIVE_READONLY_SCOPE]).await?,
        };
        let drive = DriveClient::new(self.http.clone(), &self.config.endpoints.drive);
        let files = drive.list_folder(&token, folder_id).await?;
        debug!(%folder_id, count = files.len(), "listed drive folder");
        Ok(files)
    }

    pub async fn gmail_messages(
        &self,
        user_token: Option<&str>,
        query: Option<&str>,
        max_results: Option<u32>,
    ) -> ServiceResult<Vec<MessageSummary>> {
        let token = user_token.ok_or(ServiceError::Unauthorized("Google credential required"))?;
        let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS).clamp(1, MAX_RESULTS_CAP);
        let query = query.map(str::trim).filter(|q| !q.is_empty());

        let gmail = GmailClient::new(self.http.clone(), &self.config.endpoints.gmail);
        Ok(gmail.recent_messages(token, query, max_results).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    use crate::testing::{vault, vault_with};

    #[tokio::test]
    async fn drive_needs_some_credential() {
        let server = mockito::Server::new_async().await;
        let err = vault(&server).drive_files(None, Some("f1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn malformed_service_account_key_is_a_configuration_error() {
        let server = mockito::Server::new_async().await;
        let vault = vault_with(&server, |c| c.google_service_account_key = Some("{not json".into()));
        let err = vault.drive_files(None, Some("f1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(ref v) if v.starts_with("GOOGLE_SERVICE_ACCOUNT_KEY")));
    }

    #[tokio::test]
    async fn drive_uses_the_caller_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_header("authorization", "Bearer ya29.user")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"files":[{"id":"a","name":"Roadmap"}]}"#)
            .create_async()
            .await;

        let files = vault(&server).drive_files(Some("ya29.user"), Some("folder")).await.unwrap();
        assert_eq!(files[0].name, "Roadmap");
        mock.assert_async().await;

        let err = vault(&server).drive_files(Some("ya29.user"), Some(" ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingField(ref f) if f == "folderId"));
    }

    #[tokio::test]
    async fn gmail_requires_a_user_token_and_caps_results() {
        let mut server = mockito::Server::new_async().await;
        let err = vault(&server).gmail_messages(None, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let list = server
            .mock("GET", "/users/me/messages")
            .match_query(Matcher::UrlEncoded("maxResults".into(), "50".into()))
            .with_status(200)
            .with_body(r#"{"resultSizeEstimate":0}"#)
            .create_async()
            .await;
        let messages = vault(&server)
            .gmail_messages(Some("ya29.user"), Some("  "), Some(500))
            .await
            .unwrap();
        assert!(messages.is_empty());
        list.assert_async().await;
    }
}

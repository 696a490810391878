//! Workspace directory listing.

use anyhow::anyhow;
use async_trait::async_trait;
use secrecy::Secret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use tracing::{debug, instrument};

use crate::error::AuditError;
use crate::models::DirectoryUser;
use crate::services::credentials::CredentialProvider;
use crate::services::token::fetch_access_token;

/// Directory pages carry at most this many users per request.
const DIRECTORY_PAGE_SIZE: u32 = 500;

/// Lists the users of a Workspace domain via an impersonated admin
/// identity.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Fully materialized listing, pages concatenated in response
    /// order. Suspended users are included; filtering them is the
    /// orchestrator's job. Any page failure aborts the listing.
    async fn list_users(
        &self,
        domain: &str,
        admin_email: &str,
    ) -> Result<Vec<DirectoryUser>, AuditError>;

    /// Single-page, single-result smoke test. Never mutates state.
    async fn probe(&self, domain: &str, admin_email: &str) -> Result<usize, AuditError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersPage {
    #[serde(default)]
    users: Vec<ApiUser>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    primary_email: String,
    name: Option<ApiUserName>,
    #[serde(default)]
    suspended: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUserName {
    full_name: Option<String>,
}

impl From<ApiUser> for DirectoryUser {
    fn from(user: ApiUser) -> Self {
        DirectoryUser {
            display_name: user
                .name
                .and_then(|n| n.full_name)
                .unwrap_or_else(|| user.primary_email.clone()),
            email: user.primary_email,
            suspended: user.suspended,
        }
    }
}

/// Admin SDK Directory API client.
pub struct GoogleDirectoryClient {
    http: reqwest::Client,
    service_account_key: Option<Secret<String>>,
    base_url: String,
}

impl GoogleDirectoryClient {
    pub fn new(service_account_key: Option<Secret<String>>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            service_account_key,
            base_url,
        }
    }

    /// Issue a bearer token impersonating the domain admin. The key
    /// material is read once per issuance, never cached.
    async fn admin_token(&self, domain: &str, admin_email: &str) -> Result<String, AuditError> {
        let provider = CredentialProvider::from_secret(self.service_account_key.as_ref())?;
        let credential = provider.issue(admin_email)?;
        fetch_access_token(&self.http, &credential)
            .await
            .map_err(|e| AuditError::DirectoryUnavailable {
                domain: domain.to_string(),
                source: e,
            })
    }

    async fn fetch_page(
        &self,
        domain: &str,
        token: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<UsersPage, anyhow::Error> {
        let url = format!("{}/admin/directory/v1/users", self.base_url);
        let max_results = max_results.to_string();
        let mut query: Vec<(&str, &str)> =
            vec![("domain", domain), ("maxResults", max_results.as_str())];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token));
        }

        let response = self
            .http
            .traced_get(&url)
            .query(&query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| anyhow!("directory request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("directory API returned {}: {}", status, body));
        }

        response
            .json::<UsersPage>()
            .await
            .map_err(|e| anyhow!("directory API returned an unreadable body: {}", e))
    }
}

#[async_trait]
impl DirectoryLister for GoogleDirectoryClient {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn list_users(
        &self,
        domain: &str,
        admin_email: &str,
    ) -> Result<Vec<DirectoryUser>, AuditError> {
        let token = self.admin_token(domain, admin_email).await?;

        let mut users = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(domain, &token, DIRECTORY_PAGE_SIZE, page_token.as_deref())
                .await
                .map_err(|e| AuditError::DirectoryUnavailable {
                    domain: domain.to_string(),
                    source: e,
                })?;

            debug!(
                domain = %domain,
                page_users = page.users.len(),
                has_next = page.next_page_token.is_some(),
                "Fetched directory page"
            );

            users.extend(page.users.into_iter().map(DirectoryUser::from));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(users)
    }

    #[instrument(skip(self), fields(domain = %domain))]
    async fn probe(&self, domain: &str, admin_email: &str) -> Result<usize, AuditError> {
        let token = self.admin_token(domain, admin_email).await?;

        let page = self
            .fetch_page(domain, &token, 1, None)
            .await
            .map_err(|e| AuditError::DirectoryUnavailable {
                domain: domain.to_string(),
                source: e,
            })?;

        Ok(page.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directory_page() {
        let body = serde_json::json!({
            "users": [
                {"primaryEmail": "a@example.com", "name": {"fullName": "Alice A"}, "suspended": false},
                {"primaryEmail": "b@example.com", "suspended": true},
            ],
            "nextPageToken": "tok-2",
        });

        let page: UsersPage = serde_json::from_value(body).unwrap();
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("tok-2"));

        let alice = DirectoryUser::from(
            serde_json::from_value::<ApiUser>(serde_json::json!({
                "primaryEmail": "a@example.com",
                "name": {"fullName": "Alice A"},
            }))
            .unwrap(),
        );
        assert_eq!(alice.email, "a@example.com");
        assert_eq!(alice.display_name, "Alice A");
        assert!(!alice.suspended);
    }

    #[test]
    fn missing_name_falls_back_to_email() {
        let user: ApiUser = serde_json::from_value(serde_json::json!({
            "primaryEmail": "b@example.com",
            "suspended": true,
        }))
        .unwrap();

        let user = DirectoryUser::from(user);
        assert_eq!(user.display_name, "b@example.com");
        assert!(user.suspended);
    }

    #[test]
    fn empty_page_has_no_users() {
        let page: UsersPage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(page.users.is_empty());
        assert!(page.next_page_token.is_none());
    }
}

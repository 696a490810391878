//! Per-user scan for publicly shared Drive files.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::Secret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use tracing::{debug, instrument};

use crate::error::AuditError;
use crate::models::{FilePermission, GranteeType, SharedFileRecord};
use crate::services::credentials::CredentialProvider;
use crate::services::token::fetch_access_token;

/// File pages carry at most this many files per request.
const FILES_PAGE_SIZE: u32 = 1000;

/// Server-side pre-filter: only files flagged link-shareable. This is
/// advisory; the permission check below is authoritative.
const VISIBILITY_QUERY: &str = "visibility='anyoneCanFind' or visibility='anyoneWithLink'";

const FILE_FIELDS: &str = "nextPageToken, files(id, name, webViewLink, modifiedTime, \
                           owners(emailAddress), permissions(type, role, domain))";

/// Scans one impersonated user's files for publicly reachable ones.
#[async_trait]
pub trait SharingScanner: Send + Sync {
    async fn scan_public_files(
        &self,
        domain: &str,
        user_email: &str,
    ) -> Result<Vec<SharedFileRecord>, AuditError>;
}

/// Authoritative public/private determination: a file is publicly
/// reachable iff some permission grants to anyone, or to the audited
/// domain as a whole.
pub fn is_publicly_shared(permissions: &[FilePermission], audited_domain: &str) -> bool {
    permissions.iter().any(|p| match p.grantee {
        GranteeType::Anyone => true,
        GranteeType::Domain => p.domain.as_deref() == Some(audited_domain),
        GranteeType::Other => false,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilesPage {
    #[serde(default)]
    files: Vec<ApiFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: String,
    name: String,
    web_view_link: Option<String>,
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    owners: Vec<ApiOwner>,
    #[serde(default)]
    permissions: Vec<ApiPermission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiOwner {
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPermission {
    #[serde(rename = "type")]
    grantee_type: String,
    role: String,
    domain: Option<String>,
}

impl ApiFile {
    fn into_record(self, scanned_user: &str) -> SharedFileRecord {
        let owner_email = self
            .owners
            .into_iter()
            .find_map(|o| o.email_address)
            .unwrap_or_else(|| scanned_user.to_string());

        SharedFileRecord {
            file_id: self.id,
            name: self.name,
            view_link: self.web_view_link,
            modified_utc: self.modified_time,
            owner_email,
            permissions: self
                .permissions
                .into_iter()
                .map(|p| FilePermission {
                    grantee: GranteeType::from_string(&p.grantee_type),
                    role: p.role,
                    domain: p.domain,
                })
                .collect(),
        }
    }
}

/// Drive API client that lists a user's link-shareable files and
/// re-validates them against the permission check.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    service_account_key: Option<Secret<String>>,
    base_url: String,
}

impl GoogleDriveClient {
    pub fn new(service_account_key: Option<Secret<String>>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            service_account_key,
            base_url,
        }
    }

    async fn user_token(&self, user_email: &str) -> Result<String, AuditError> {
        let provider = CredentialProvider::from_secret(self.service_account_key.as_ref())?;
        // Impersonates the scanned user, not the admin: permission
        // metadata on private files is only visible to the owner.
        let credential = provider.issue(user_email)?;
        fetch_access_token(&self.http, &credential)
            .await
            .map_err(|e| AuditError::Scan {
                user: user_email.to_string(),
                source: e,
            })
    }

    async fn fetch_page(
        &self,
        token: &str,
        page_token: Option<&str>,
    ) -> Result<FilesPage, anyhow::Error> {
        let url = format!("{}/drive/v3/files", self.base_url);
        let page_size = FILES_PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("q", VISIBILITY_QUERY),
            ("pageSize", page_size.as_str()),
            ("fields", FILE_FIELDS),
        ];
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
            .map_err(|e| anyhow!("file listing request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Drive API returned {}: {}", status, body));
        }

        response
            .json::<FilesPage>()
            .await
            .map_err(|e| anyhow!("Drive API returned an unreadable body: {}", e))
    }
}

#[async_trait]
impl SharingScanner for GoogleDriveClient {
    #[instrument(skip(self), fields(user = %user_email))]
    async fn scan_public_files(
        &self,
        domain: &str,
        user_email: &str,
    ) -> Result<Vec<SharedFileRecord>, AuditError> {
        let token = self.user_token(user_email).await?;

        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(&token, page_token.as_deref())
                .await
                .map_err(|e| AuditError::Scan {
                    user: user_email.to_string(),
                    source: e,
                })?;

            debug!(
                user = %user_email,
                page_files = page.files.len(),
                has_next = page.next_page_token.is_some(),
                "Fetched file page"
            );

            records.extend(
                page.files
                    .into_iter()
                    .map(|f| f.into_record(user_email))
                    .filter(|f| is_publicly_shared(&f.permissions, domain)),
            );

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(grantee: GranteeType, role: &str, domain: Option<&str>) -> FilePermission {
        FilePermission {
            grantee,
            role: role.to_string(),
            domain: domain.map(|d| d.to_string()),
        }
    }

    #[test]
    fn anyone_permission_is_public() {
        let perms = [perm(GranteeType::Anyone, "reader", None)];
        assert!(is_publicly_shared(&perms, "example.com"));
    }

    #[test]
    fn audited_domain_permission_is_public() {
        let perms = [perm(GranteeType::Domain, "reader", Some("example.com"))];
        assert!(is_publicly_shared(&perms, "example.com"));
    }

    #[test]
    fn foreign_domain_permission_is_not_public() {
        let perms = [perm(GranteeType::Domain, "reader", Some("other.com"))];
        assert!(!is_publicly_shared(&perms, "example.com"));
    }

    #[test]
    fn owner_only_permissions_are_not_public() {
        // The server-side visibility filter may still return such a
        // file; the client-side check excludes it.
        let perms = [
            perm(GranteeType::Other, "owner", None),
            perm(GranteeType::Other, "writer", None),
        ];
        assert!(!is_publicly_shared(&perms, "example.com"));
    }

    #[test]
    fn no_permissions_is_not_public() {
        assert!(!is_publicly_shared(&[], "example.com"));
    }

    #[test]
    fn parses_file_page_and_maps_grantees() {
        let body = serde_json::json!({
            "files": [{
                "id": "f1",
                "name": "Quarterly report",
                "webViewLink": "https://drive.example.com/f1",
                "modifiedTime": "2025-06-01T12:00:00Z",
                "owners": [{"emailAddress": "a@example.com"}],
                "permissions": [
                    {"type": "anyone", "role": "reader"},
                    {"type": "domain", "role": "commenter", "domain": "example.com"},
                    {"type": "user", "role": "owner"},
                ],
            }],
        });

        let page: FilesPage = serde_json::from_value(body).unwrap();
        assert!(page.next_page_token.is_none());

        let record = page
            .files
            .into_iter()
            .next()
            .unwrap()
            .into_record("a@example.com");
        assert_eq!(record.file_id, "f1");
        assert_eq!(record.owner_email, "a@example.com");
        assert_eq!(record.permissions.len(), 3);
        assert_eq!(record.permissions[0].grantee, GranteeType::Anyone);
        assert_eq!(record.permissions[1].grantee, GranteeType::Domain);
        assert_eq!(record.permissions[2].grantee, GranteeType::Other);
        assert!(is_publicly_shared(&record.permissions, "example.com"));
    }

    #[test]
    fn missing_owner_falls_back_to_scanned_user() {
        let file: ApiFile = serde_json::from_value(serde_json::json!({
            "id": "f2",
            "name": "Orphan",
        }))
        .unwrap();

        let record = file.into_record("b@example.com");
        assert_eq!(record.owner_email, "b@example.com");
        assert!(record.permissions.is_empty());
    }
}

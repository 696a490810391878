//! Audit run models.
//!
//! The audit payload is a plain record hierarchy: an `AuditRun` embeds
//! per-user results, which embed the publicly shared files found for
//! that user. Runs are append-only history and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A user row from the Workspace directory listing. Produced fresh on
/// each audit run, never cached across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub email: String,
    pub display_name: String,
    pub suspended: bool,
}

/// Who a file permission grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranteeType {
    /// Anyone on the internet, with or without the link.
    Anyone,
    /// Everyone in a specific domain.
    Domain,
    /// A specific user, group, or other non-public grantee.
    Other,
}

impl GranteeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranteeType::Anyone => "anyone",
            GranteeType::Domain => "domain",
            GranteeType::Other => "other",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "anyone" => GranteeType::Anyone,
            "domain" => GranteeType::Domain,
            _ => GranteeType::Other,
        }
    }
}

/// One permission entry on a shared file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePermission {
    pub grantee: GranteeType,
    pub role: String,
    /// Set when `grantee` is `Domain`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// A file judged publicly reachable after the authoritative
/// permission check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedFileRecord {
    pub file_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_link: Option<String>,
    pub modified_utc: Option<DateTime<Utc>>,
    pub owner_email: String,
    pub permissions: Vec<FilePermission>,
}

/// Per-user audit outcome. Only materialized for users with at least
/// one public file; users with zero public files are counted in the
/// run totals but not itemized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAuditResult {
    pub email: String,
    pub display_name: String,
    pub file_count: i32,
    pub files: Vec<SharedFileRecord>,
}

/// A completed domain audit, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRun {
    pub run_id: Uuid,
    pub domain: String,
    /// Every user in the directory listing, suspended users included.
    pub total_users: i32,
    /// Invariant: equals the sum of `file_count` across `results`.
    pub total_files: i32,
    pub results: Vec<UserAuditResult>,
    pub created_utc: DateTime<Utc>,
}

/// Row shape for `audit_runs`; `results` round-trips through JSONB.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRunRecord {
    pub run_id: Uuid,
    pub domain: String,
    pub total_users: i32,
    pub total_files: i32,
    pub results: Json<Vec<UserAuditResult>>,
    pub created_utc: DateTime<Utc>,
}

impl From<AuditRunRecord> for AuditRun {
    fn from(record: AuditRunRecord) -> Self {
        Self {
            run_id: record.run_id,
            domain: record.domain,
            total_users: record.total_users,
            total_files: record.total_files,
            results: record.results.0,
            created_utc: record.created_utc,
        }
    }
}

/// Input for persisting a completed run. The store assigns the id and
/// creation timestamp.
#[derive(Debug, Clone)]
pub struct NewAuditRun {
    pub domain: String,
    pub total_users: i32,
    pub total_files: i32,
    pub results: Vec<UserAuditResult>,
}

/// What `runAudit` hands back to the caller: the persisted run plus
/// derived counts.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRunSummary {
    pub run_id: Uuid,
    pub domain: String,
    pub total_users: i32,
    pub total_files: i32,
    /// Users with at least one public file.
    pub users_flagged: i32,
    /// Users whose scan failed and was skipped; the run still completed.
    pub users_failed: i32,
    pub created_utc: DateTime<Utc>,
}

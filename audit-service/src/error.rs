//! Domain errors for the sharing-audit pipeline.

use service_core::error::AppError;
use thiserror::Error;

/// Failures the audit pipeline distinguishes.
///
/// `Scan` is recovered locally by the orchestrator (the run continues
/// without that user); everything else aborts the operation invoked.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Missing or malformed service-account signing key.
    #[error("Signing key configuration invalid: {0}")]
    Configuration(String),

    /// Directory listing failed; no partial directory is acceptable,
    /// so the whole run aborts and nothing is persisted.
    #[error("Directory listing failed for domain {domain}: {source}")]
    DirectoryUnavailable {
        domain: String,
        #[source]
        source: anyhow::Error,
    },

    /// A single user's file scan failed.
    #[error("File scan failed for user {user}: {source}")]
    Scan {
        user: String,
        #[source]
        source: anyhow::Error,
    },

    /// Persisting a completed run failed.
    #[error("Failed to persist audit run: {0}")]
    Store(#[source] anyhow::Error),
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Configuration(msg) => {
                AppError::ConfigError(anyhow::anyhow!("Signing key configuration invalid: {}", msg))
            }
            e @ AuditError::DirectoryUnavailable { .. } => AppError::BadGateway(e.to_string()),
            e @ AuditError::Scan { .. } => AppError::BadGateway(e.to_string()),
            AuditError::Store(source) => AppError::DatabaseError(source),
        }
    }
}

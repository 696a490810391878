//! Services module for audit-service.

pub mod credentials;
pub mod database;
pub mod directory;
pub mod drive;
pub mod metrics;
pub mod orchestrator;
mod token;

pub use credentials::{CredentialProvider, ScopedCredential, AUDIT_SCOPES};
pub use database::{AuditStore, Database};
pub use directory::{DirectoryLister, GoogleDirectoryClient};
pub use drive::{is_publicly_shared, GoogleDriveClient, SharingScanner};
pub use metrics::{get_metrics, init_metrics};
pub use orchestrator::{AuditOrchestrator, TestConnectionResult};

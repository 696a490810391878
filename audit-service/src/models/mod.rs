//! Domain models for audit-service.

mod audit;
mod connection;

pub use audit::{
    AuditRun, AuditRunRecord, AuditRunSummary, DirectoryUser, FilePermission, GranteeType,
    NewAuditRun, SharedFileRecord, UserAuditResult,
};
pub use connection::DomainConnection;

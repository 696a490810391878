//! HTTP handlers for audit-service.

pub mod audits;
pub mod connections;

//! Audit run handlers.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{AuditRun, AuditRunSummary};
use crate::services::AuditStore;
use crate::startup::AppState;
use service_core::error::AppError;

/// Request to audit a domain.
#[derive(Debug, Deserialize, Validate)]
pub struct RunAuditRequest {
    #[validate(length(min = 1, message = "domain must not be blank"))]
    pub domain: String,
    #[validate(email(message = "admin_email must be an email address"))]
    pub admin_email: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditHistoryQuery {
    pub domain: Option<String>,
}

/// Run a full domain audit.
///
/// POST /audits
///
/// Returns the persisted run's summary. A directory or configuration
/// failure surfaces as an error; per-user scan failures are already
/// absorbed into the summary's `users_failed` count.
pub async fn run_audit(
    State(state): State<AppState>,
    Json(req): Json<RunAuditRequest>,
) -> Result<(StatusCode, Json<AuditRunSummary>), AppError> {
    req.validate()?;

    let summary = state
        .orchestrator
        .run_audit(req.domain.trim(), req.admin_email.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// List audit history, newest first, capped at 50.
///
/// GET /audits?domain=...
pub async fn list_audit_history(
    State(state): State<AppState>,
    Query(query): Query<AuditHistoryQuery>,
) -> Result<Json<Vec<AuditRun>>, AppError> {
    let runs = state.db.list_audit_history(query.domain.as_deref()).await?;
    Ok(Json(runs))
}

/// Get one audit run by id.
///
/// GET /audits/:run_id
pub async fn get_audit_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<AuditRun>, AppError> {
    let run = state
        .db
        .get_audit_run(run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Audit run not found")))?;

    Ok(Json(run))
}

//! Domain connection handlers.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::DomainConnection;
use crate::services::metrics::{inc_counter, CONNECTION_OPERATIONS_TOTAL};
use crate::services::{AuditStore, TestConnectionResult};
use crate::startup::AppState;
use service_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request to create (or refresh) a domain connection.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConnectionRequest {
    pub owner_id: Uuid,
    #[validate(length(min = 1, message = "domain must not be blank"))]
    pub domain: String,
    #[validate(email(message = "admin_email must be an email address"))]
    pub admin_email: String,
}

/// Request for the read-only connection smoke test.
#[derive(Debug, Deserialize, Validate)]
pub struct TestConnectionRequest {
    #[validate(length(min = 1, message = "domain must not be blank"))]
    pub domain: String,
    #[validate(email(message = "admin_email must be an email address"))]
    pub admin_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ListConnectionsQuery {
    pub owner_id: Uuid,
}

/// Connection response.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub connection_id: Uuid,
    pub owner_id: Uuid,
    pub domain: String,
    pub admin_email: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<DomainConnection> for ConnectionResponse {
    fn from(connection: DomainConnection) -> Self {
        Self {
            connection_id: connection.connection_id,
            owner_id: connection.owner_id,
            domain: connection.domain,
            admin_email: connection.admin_email,
            is_active: connection.is_active,
            created_utc: connection.created_utc,
            updated_utc: connection.updated_utc,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a domain connection, or refresh the existing one for the
/// same (owner, domain).
///
/// POST /connections
pub async fn create_connection(
    State(state): State<AppState>,
    Json(req): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ConnectionResponse>), AppError> {
    req.validate()?;

    let connection = state
        .db
        .upsert_connection(req.owner_id, req.domain.trim(), req.admin_email.trim())
        .await?;

    inc_counter(&CONNECTION_OPERATIONS_TOTAL, &["upsert"]);

    Ok((
        StatusCode::CREATED,
        Json(ConnectionResponse::from(connection)),
    ))
}

/// List connections for an owner.
///
/// GET /connections?owner_id=...
pub async fn list_connections(
    State(state): State<AppState>,
    Query(query): Query<ListConnectionsQuery>,
) -> Result<Json<Vec<ConnectionResponse>>, AppError> {
    let connections = state.db.list_connections(query.owner_id).await?;

    Ok(Json(
        connections
            .into_iter()
            .map(ConnectionResponse::from)
            .collect(),
    ))
}

/// Deactivate a connection. Idempotent; 404 for unknown ids.
///
/// POST /connections/:connection_id/deactivate
pub async fn deactivate_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ConnectionResponse>, AppError> {
    let connection = state.db.deactivate_connection(connection_id).await?;

    inc_counter(&CONNECTION_OPERATIONS_TOTAL, &["deactivate"]);

    Ok(Json(ConnectionResponse::from(connection)))
}

/// Smoke-test a domain/admin pair with a single-result directory
/// call. Never mutates state; failures are reported in-band.
///
/// POST /connections/test
pub async fn test_connection(
    State(state): State<AppState>,
    Json(req): Json<TestConnectionRequest>,
) -> Result<Json<TestConnectionResult>, AppError> {
    req.validate()?;

    let result = state
        .orchestrator
        .test_connection(req.domain.trim(), req.admin_email.trim())
        .await;

    Ok(Json(result))
}

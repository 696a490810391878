//! Domain connection model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A configured link between an owning account and a Google Workspace
/// domain, carrying the admin identity used for directory impersonation.
///
/// At most one record exists per (owner_id, domain); repeat setup calls
/// update the admin identity and reactivate the existing record.
/// Connections are deactivated logically, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DomainConnection {
    pub connection_id: Uuid,
    pub owner_id: Uuid,
    pub domain: String,
    pub admin_email: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

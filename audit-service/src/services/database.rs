//! Database service for audit-service.

use crate::models::{AuditRun, AuditRunRecord, DomainConnection, NewAuditRun};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// History lookups return at most this many runs.
const AUDIT_HISTORY_LIMIT: i64 = 50;

/// Persistence contract for connection and audit-run records. The
/// orchestrator and handlers depend on this trait so tests can swap
/// in an in-memory store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Create or refresh the authoritative connection for
    /// (owner_id, domain): an existing record keeps its id but takes
    /// the new admin identity and is reactivated.
    async fn upsert_connection(
        &self,
        owner_id: Uuid,
        domain: &str,
        admin_email: &str,
    ) -> Result<DomainConnection, AppError>;

    async fn list_connections(&self, owner_id: Uuid) -> Result<Vec<DomainConnection>, AppError>;

    /// Logical deletion; idempotent. `NotFound` for unknown ids.
    async fn deactivate_connection(
        &self,
        connection_id: Uuid,
    ) -> Result<DomainConnection, AppError>;

    /// Append-only insert with a server-assigned creation timestamp.
    async fn save_audit_run(&self, run: NewAuditRun) -> Result<AuditRun, AppError>;

    /// Newest-first, capped at 50; optional exact-match domain filter.
    async fn list_audit_history(&self, domain: Option<&str>) -> Result<Vec<AuditRun>, AppError>;

    async fn get_audit_run(&self, run_id: Uuid) -> Result<Option<AuditRun>, AppError>;
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "audit-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl AuditStore for Database {
    #[instrument(skip(self), fields(owner_id = %owner_id, domain = %domain))]
    async fn upsert_connection(
        &self,
        owner_id: Uuid,
        domain: &str,
        admin_email: &str,
    ) -> Result<DomainConnection, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_connection"])
            .start_timer();

        let connection = sqlx::query_as::<_, DomainConnection>(
            r#"
            INSERT INTO domain_connections (connection_id, owner_id, domain, admin_email, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (owner_id, domain) DO UPDATE
                SET admin_email = EXCLUDED.admin_email,
                    is_active = TRUE,
                    updated_utc = NOW()
            RETURNING connection_id, owner_id, domain, admin_email, is_active, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(domain)
        .bind(admin_email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to upsert connection: {}", e))
        })?;

        timer.observe_duration();
        info!(connection_id = %connection.connection_id, "Connection upserted");

        Ok(connection)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_connections(&self, owner_id: Uuid) -> Result<Vec<DomainConnection>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_connections"])
            .start_timer();

        let connections = sqlx::query_as::<_, DomainConnection>(
            r#"
            SELECT connection_id, owner_id, domain, admin_email, is_active, created_utc, updated_utc
            FROM domain_connections
            WHERE owner_id = $1
            ORDER BY created_utc DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list connections: {}", e))
        })?;

        timer.observe_duration();
        Ok(connections)
    }

    #[instrument(skip(self), fields(connection_id = %connection_id))]
    async fn deactivate_connection(
        &self,
        connection_id: Uuid,
    ) -> Result<DomainConnection, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["deactivate_connection"])
            .start_timer();

        let connection = sqlx::query_as::<_, DomainConnection>(
            r#"
            UPDATE domain_connections
            SET is_active = FALSE, updated_utc = NOW()
            WHERE connection_id = $1
            RETURNING connection_id, owner_id, domain, admin_email, is_active, created_utc, updated_utc
            "#,
        )
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to deactivate connection: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Connection not found")))?;

        timer.observe_duration();
        info!(connection_id = %connection_id, "Connection deactivated");

        Ok(connection)
    }

    #[instrument(skip(self, run), fields(domain = %run.domain))]
    async fn save_audit_run(&self, run: NewAuditRun) -> Result<AuditRun, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_audit_run"])
            .start_timer();

        let record = sqlx::query_as::<_, AuditRunRecord>(
            r#"
            INSERT INTO audit_runs (run_id, domain, total_users, total_files, results)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING run_id, domain, total_users, total_files, results, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&run.domain)
        .bind(run.total_users)
        .bind(run.total_files)
        .bind(Json(&run.results))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to save audit run: {}", e))
        })?;

        timer.observe_duration();
        info!(run_id = %record.run_id, "Audit run saved");

        Ok(record.into())
    }

    #[instrument(skip(self))]
    async fn list_audit_history(&self, domain: Option<&str>) -> Result<Vec<AuditRun>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_audit_history"])
            .start_timer();

        let records = match domain {
            Some(domain) => {
                sqlx::query_as::<_, AuditRunRecord>(
                    r#"
                    SELECT run_id, domain, total_users, total_files, results, created_utc
                    FROM audit_runs
                    WHERE domain = $1
                    ORDER BY created_utc DESC
                    LIMIT $2
                    "#,
                )
                .bind(domain)
                .bind(AUDIT_HISTORY_LIMIT)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, AuditRunRecord>(
                    r#"
                    SELECT run_id, domain, total_users, total_files, results, created_utc
                    FROM audit_runs
                    ORDER BY created_utc DESC
                    LIMIT $1
                    "#,
                )
                .bind(AUDIT_HISTORY_LIMIT)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list audit history: {}", e))
        })?;

        timer.observe_duration();
        Ok(records.into_iter().map(AuditRun::from).collect())
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn get_audit_run(&self, run_id: Uuid) -> Result<Option<AuditRun>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_audit_run"])
            .start_timer();

        let record = sqlx::query_as::<_, AuditRunRecord>(
            r#"
            SELECT run_id, domain, total_users, total_files, results, created_utc
            FROM audit_runs
            WHERE run_id = $1
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get audit run: {}", e)))?;

        timer.observe_duration();
        Ok(record.map(AuditRun::from))
    }
}

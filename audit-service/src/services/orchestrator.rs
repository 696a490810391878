//! Audit orchestration: directory listing, per-user scans, aggregation.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::AuditError;
use crate::models::{AuditRunSummary, DirectoryUser, NewAuditRun, UserAuditResult};
use crate::services::database::AuditStore;
use crate::services::directory::DirectoryLister;
use crate::services::drive::SharingScanner;
use crate::services::metrics::{
    add_counter, inc_counter, AUDIT_RUNS_TOTAL, PUBLIC_FILES_FOUND_TOTAL, SCAN_FAILURES_TOTAL,
    USERS_SCANNED_TOTAL,
};

/// Outcome of the read-only connection smoke test.
#[derive(Debug, Serialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_count: Option<usize>,
}

/// Drives a full domain audit: list every user, scan each active one
/// for publicly shared files, aggregate, persist.
///
/// Holds no state between runs; each run is derived entirely from
/// live directory and file-service responses.
pub struct AuditOrchestrator {
    directory: Arc<dyn DirectoryLister>,
    scanner: Arc<dyn SharingScanner>,
    store: Arc<dyn AuditStore>,
    scan_concurrency: usize,
}

impl AuditOrchestrator {
    pub fn new(
        directory: Arc<dyn DirectoryLister>,
        scanner: Arc<dyn SharingScanner>,
        store: Arc<dyn AuditStore>,
        scan_concurrency: usize,
    ) -> Self {
        Self {
            directory,
            scanner,
            store,
            scan_concurrency,
        }
    }

    /// Run a full domain audit and persist the result.
    ///
    /// A directory failure aborts the run and nothing is persisted. A
    /// single user's scan failure is logged and skipped; the run
    /// completes with that user absent from the results. Suspended
    /// users count toward `total_users` but are never scanned.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn run_audit(
        &self,
        domain: &str,
        admin_email: &str,
    ) -> Result<AuditRunSummary, AuditError> {
        let users = match self.directory.list_users(domain, admin_email).await {
            Ok(users) => users,
            Err(e) => {
                inc_counter(&AUDIT_RUNS_TOTAL, &[domain, "failed"]);
                return Err(e);
            }
        };

        let total_users = users.len() as i32;
        add_counter(&USERS_SCANNED_TOTAL, &[domain], users.len() as u64);
        info!(total_users = total_users, "Directory listed, starting scans");

        let active: Vec<DirectoryUser> = users.into_iter().filter(|u| !u.suspended).collect();

        // buffered (not buffer_unordered) keeps results in directory
        // order, which is the run's persisted order.
        let concurrency = self.scan_concurrency.max(1);
        let outcomes = stream::iter(active)
            .map(|user| {
                let scanner = Arc::clone(&self.scanner);
                let domain = domain.to_string();
                async move {
                    let outcome = scanner.scan_public_files(&domain, &user.email).await;
                    (user, outcome)
                }
            })
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut results: Vec<UserAuditResult> = Vec::new();
        let mut total_files: i32 = 0;
        let mut users_failed: i32 = 0;

        for (user, outcome) in outcomes {
            match outcome {
                Ok(files) => {
                    if files.is_empty() {
                        continue;
                    }
                    total_files += files.len() as i32;
                    results.push(UserAuditResult {
                        email: user.email,
                        display_name: user.display_name,
                        file_count: files.len() as i32,
                        files,
                    });
                }
                Err(e) => {
                    // One user's failure never aborts the run.
                    warn!(user = %user.email, error = %e, "Skipping user after scan failure");
                    inc_counter(&SCAN_FAILURES_TOTAL, &[domain]);
                    users_failed += 1;
                }
            }
        }

        add_counter(&PUBLIC_FILES_FOUND_TOTAL, &[domain], total_files as u64);

        let run = self
            .store
            .save_audit_run(NewAuditRun {
                domain: domain.to_string(),
                total_users,
                total_files,
                results,
            })
            .await
            .map_err(|e| AuditError::Store(anyhow::Error::new(e)))?;

        inc_counter(&AUDIT_RUNS_TOTAL, &[domain, "completed"]);
        info!(
            run_id = %run.run_id,
            total_files = run.total_files,
            users_flagged = run.results.len(),
            users_failed = users_failed,
            "Audit run completed"
        );

        Ok(AuditRunSummary {
            run_id: run.run_id,
            domain: run.domain,
            total_users: run.total_users,
            total_files: run.total_files,
            users_flagged: run.results.len() as i32,
            users_failed,
            created_utc: run.created_utc,
        })
    }

    /// Read-only smoke test of the directory connection. Upstream and
    /// configuration failures are reported in-band, never thrown.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn test_connection(&self, domain: &str, admin_email: &str) -> TestConnectionResult {
        match self.directory.probe(domain, admin_email).await {
            Ok(user_count) => TestConnectionResult {
                success: true,
                message: format!("Connected to the directory for {}", domain),
                user_count: Some(user_count),
            },
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                TestConnectionResult {
                    success: false,
                    message: e.to_string(),
                    user_count: None,
                }
            }
        }
    }
}

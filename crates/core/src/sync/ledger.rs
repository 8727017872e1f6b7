//! Per-execution run ledger: status transitions, counters, and the
//! append-only diagnostic log.

use crate::db::repository::SlateRepository;
use crate::error::Result;
use crate::models::sync::{LocalKind, LogLevel, RunCounter, SyncDirection, SyncRun};
use crate::sync::context::SyncContext;

/// Optional per-record context attached to a log line.
#[derive(Debug, Clone, Default)]
pub struct LogDetail {
    pub entity_type: Option<LocalKind>,
    pub entity_id: Option<i64>,
    pub external_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl LogDetail {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn external(external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            ..Self::default()
        }
    }

    pub fn with_entity(mut self, entity_type: LocalKind, entity_id: i64) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Handle to one sync run. Exactly one connector instance writes to a given
/// run; counters use atomic storage-side increments regardless.
pub struct RunLedger<'a, R: SlateRepository> {
    repo: &'a R,
    run_id: i64,
}

impl<'a, R: SlateRepository> RunLedger<'a, R> {
    /// Create a pending run for the context's config.
    pub async fn create(
        repo: &'a R,
        ctx: &SyncContext,
        sync_type: &str,
        direction: SyncDirection,
        triggered_by: Option<i64>,
    ) -> Result<Self> {
        let run = repo
            .create_sync_run(ctx.tenant_id, ctx.config_id(), sync_type, direction, triggered_by)
            .await?;
        Ok(Self {
            repo,
            run_id: run.id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// pending → running. Errors if called out of sequence.
    pub async fn start(&self) -> Result<()> {
        self.repo.mark_run_running(self.run_id).await
    }

    /// running → completed.
    pub async fn complete(&self) -> Result<()> {
        self.repo.mark_run_completed(self.run_id).await
    }

    /// running → failed with the captured message.
    pub async fn fail(&self, message: &str) -> Result<()> {
        self.repo.mark_run_failed(self.run_id, message).await
    }

    pub async fn record_processed(&self) -> Result<()> {
        self.repo
            .increment_run_counter(self.run_id, RunCounter::Processed)
            .await
    }

    pub async fn record_succeeded(&self) -> Result<()> {
        self.repo
            .increment_run_counter(self.run_id, RunCounter::Succeeded)
            .await
    }

    pub async fn record_failed(&self) -> Result<()> {
        self.repo
            .increment_run_counter(self.run_id, RunCounter::Failed)
            .await
    }

    pub async fn log_info(&self, message: &str, detail: LogDetail) -> Result<()> {
        self.append(LogLevel::Info, message, detail).await
    }

    pub async fn log_warn(&self, message: &str, detail: LogDetail) -> Result<()> {
        self.append(LogLevel::Warn, message, detail).await
    }

    pub async fn log_error(&self, message: &str, detail: LogDetail) -> Result<()> {
        self.append(LogLevel::Error, message, detail).await
    }

    async fn append(&self, level: LogLevel, message: &str, detail: LogDetail) -> Result<()> {
        self.repo
            .append_sync_log(
                self.run_id,
                level,
                message,
                detail.entity_type,
                detail.entity_id,
                detail.external_id.as_deref(),
                detail.metadata.as_ref(),
            )
            .await?;
        Ok(())
    }

    /// Reload the run row, e.g. to return it from a connector entry point.
    pub async fn reload(&self) -> Result<SyncRun> {
        self.repo
            .get_sync_run(self.run_id)
            .await?
            .ok_or_else(|| crate::error::SlateError::Sync(format!("sync run {} vanished", self.run_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::SqliteRepository;
    use crate::db::DatabasePool;
    use crate::models::integration::{IntegrationProvider, IntegrationStatus};
    use crate::models::sync::SyncStatus;

    async fn setup() -> (SqliteRepository, SyncContext) {
        let pool = DatabasePool::new_sqlite_memory().await.unwrap();
        let repo = match pool {
            DatabasePool::Sqlite(p) => SqliteRepository::new(p),
        };
        let config = crate::db::repository::IntegrationConfigRepository::create_integration_config(
            &repo,
            7,
            IntegrationProvider::Oneroster,
            IntegrationStatus::Active,
            &serde_json::json!({}),
        )
        .await
        .unwrap();
        let ctx = SyncContext::new(config);
        (repo, ctx)
    }

    #[tokio::test]
    async fn ledger_lifecycle_happy_path() {
        let (repo, ctx) = setup().await;
        let ledger = RunLedger::create(&repo, &ctx, "oneroster_api_sync", SyncDirection::Pull, Some(3))
            .await
            .unwrap();

        ledger.start().await.unwrap();
        ledger.record_processed().await.unwrap();
        ledger.record_succeeded().await.unwrap();
        ledger.complete().await.unwrap();

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.sync_type, "oneroster_api_sync");
        assert_eq!(run.direction, SyncDirection::Pull);
        assert_eq!(run.triggered_by, Some(3));
        assert_eq!(run.records_processed, 1);
        assert_eq!(run.records_succeeded, 1);
        assert_eq!(run.records_failed, 0);
    }

    #[tokio::test]
    async fn ledger_fail_records_message() {
        let (repo, ctx) = setup().await;
        let ledger = RunLedger::create(&repo, &ctx, "oneroster_api_sync", SyncDirection::Pull, None)
            .await
            .unwrap();
        ledger.start().await.unwrap();
        ledger.fail("provider unreachable").await.unwrap();

        let run = ledger.reload().await.unwrap();
        assert_eq!(run.status, SyncStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("provider unreachable"));
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn ledger_guards_double_finalize() {
        let (repo, ctx) = setup().await;
        let ledger = RunLedger::create(&repo, &ctx, "oneroster_api_sync", SyncDirection::Pull, None)
            .await
            .unwrap();
        ledger.start().await.unwrap();
        ledger.complete().await.unwrap();
        assert!(ledger.complete().await.is_err());
        assert!(ledger.fail("late").await.is_err());
    }

    #[tokio::test]
    async fn ledger_logs_with_detail() {
        let (repo, ctx) = setup().await;
        let ledger = RunLedger::create(&repo, &ctx, "oneroster_api_sync", SyncDirection::Pull, None)
            .await
            .unwrap();
        ledger
            .log_info(
                "synced school",
                LogDetail::external("org-001").with_entity(LocalKind::School, 1),
            )
            .await
            .unwrap();
        ledger.log_warn("skipping row", LogDetail::none()).await.unwrap();

        let logs = crate::db::repository::SyncLogRepository::list_sync_logs(&repo, ledger.run_id())
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].level, LogLevel::Info);
        assert_eq!(logs[0].entity_type, Some(LocalKind::School));
        assert_eq!(logs[0].external_id.as_deref(), Some("org-001"));
        assert_eq!(logs[1].level, LogLevel::Warn);
    }
}

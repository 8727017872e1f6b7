//! The generic reconciliation primitive.
//!
//! Every connector aligns external records with local entities through the
//! same audited path: look up the identity mapping by external id, apply the
//! record (diff-update an existing entity, or create one through the normal
//! validated path), then record or refresh the mapping. Connectors supply a
//! [`RecordAdapter`] per entity type instead of re-implementing the sequence.

use async_trait::async_trait;
use tracing::debug;

use crate::db::repository::SlateRepository;
use crate::error::{Result, SlateError};
use crate::models::sync::{ExternalKind, LocalKind};
use crate::sync::context::SyncContext;
use crate::sync::ledger::{LogDetail, RunLedger};

/// Decision made for a record before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Reconcile the record.
    Process,
    /// Drop the record without counting it (deleted or out-of-scope rows).
    SkipSilent,
    /// Count the record as processed, log a warning, and move on.
    SkipWarn(String),
}

/// What a successful apply did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Result of applying one record.
#[derive(Debug, Clone, Copy)]
pub struct Applied {
    pub local_id: i64,
    pub outcome: ApplyOutcome,
}

/// Per-entity-type descriptor driving the reconciliation primitive.
#[async_trait]
pub trait RecordAdapter<R: SlateRepository>: Send + Sync {
    type Record: Send + Sync;

    fn local_kind(&self) -> LocalKind;
    fn external_kind(&self) -> ExternalKind;
    fn external_id<'r>(&self, record: &'r Self::Record) -> &'r str;

    /// Admission policy applied before any counter or write.
    fn admit(&self, _record: &Self::Record) -> Admission {
        Admission::Process
    }

    /// Create the local entity (when `existing` is None) or diff it against
    /// the record and write only what changed.
    async fn apply(
        &self,
        repo: &R,
        ctx: &SyncContext,
        existing: Option<i64>,
        record: &Self::Record,
    ) -> Result<Applied>;
}

/// Reconcile a single record against the mapping store.
///
/// Idempotent: repeating the same record refreshes `last_synced_at` and
/// performs no other writes.
pub async fn reconcile_record<R, A>(
    repo: &R,
    ctx: &SyncContext,
    adapter: &A,
    record: &A::Record,
) -> Result<Applied>
where
    R: SlateRepository,
    A: RecordAdapter<R>,
{
    let external_id = adapter.external_id(record);
    let mapping = repo
        .find_mapping_by_external(ctx.config_id(), adapter.external_kind(), external_id)
        .await?;

    match mapping {
        Some(mapping) => {
            let applied = adapter
                .apply(repo, ctx, Some(mapping.local_id), record)
                .await?;
            repo.touch_mapping(mapping.id, applied.local_id).await?;
            debug!(
                external_id,
                local_id = applied.local_id,
                "refreshed existing mapping"
            );
            Ok(applied)
        }
        None => {
            let applied = adapter.apply(repo, ctx, None, record).await?;
            repo.create_sync_mapping(
                ctx.tenant_id,
                ctx.config_id(),
                adapter.local_kind(),
                applied.local_id,
                adapter.external_kind(),
                external_id,
            )
            .await?;
            debug!(external_id, local_id = applied.local_id, "created mapping");
            Ok(applied)
        }
    }
}

/// Run one entity-type pass with per-record failure isolation.
///
/// A record failure is logged and tallied; the loop continues. Only ledger
/// and mapping-store I/O errors escape, since the batch itself cannot
/// proceed without them.
pub async fn run_pass<R, A>(
    repo: &R,
    ctx: &SyncContext,
    ledger: &RunLedger<'_, R>,
    adapter: &A,
    records: &[A::Record],
    label: &str,
) -> Result<()>
where
    R: SlateRepository,
    A: RecordAdapter<R>,
{
    for record in records {
        let external_id = adapter.external_id(record).to_string();
        match adapter.admit(record) {
            Admission::SkipSilent => continue,
            Admission::SkipWarn(reason) => {
                ledger.record_processed().await?;
                ledger
                    .log_warn(&reason, LogDetail::external(&external_id))
                    .await?;
                continue;
            }
            Admission::Process => {}
        }

        ledger.record_processed().await?;
        match reconcile_record(repo, ctx, adapter, record).await {
            Ok(applied) => {
                ledger.record_succeeded().await?;
                ledger
                    .log_info(
                        &format!("synced {label}"),
                        LogDetail::external(&external_id)
                            .with_entity(adapter.local_kind(), applied.local_id),
                    )
                    .await?;
            }
            Err(SlateError::MissingMapping(message)) => {
                ledger.record_failed().await?;
                ledger
                    .log_warn(&message, LogDetail::external(&external_id))
                    .await?;
            }
            Err(e) => {
                ledger.record_failed().await?;
                ledger
                    .log_error(
                        &format!("failed to sync {label}: {e}"),
                        LogDetail::external(&external_id),
                    )
                    .await?;
            }
        }
    }
    Ok(())
}

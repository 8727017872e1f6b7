//! Pull connectors for the OneRoster SIS: full REST sync and CSV bundle
//! import. Each entry point owns one run: create, execute, finalize. Fatal
//! errors mark the run failed and re-raise so the job framework's retry
//! policy can act; idempotent reconciliation makes whole-run replays safe.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use slate_core::db::repository::SlateRepository;
use slate_core::error::{Result, SlateError};
use slate_core::models::sync::{SyncDirection, SyncRun};
use slate_core::sync::context::SyncContext;
use slate_core::sync::ledger::{LogDetail, RunLedger};
use slate_core::sync::roster::records::RosterBundle;
use slate_core::sync::roster::RosterProcessor;

use crate::bundle::read_bundle;
use crate::client::OneRosterClient;

pub const SYNC_TYPE_API: &str = "oneroster_api_sync";
pub const SYNC_TYPE_CSV: &str = "oneroster_csv_import";

/// Full roster pull over the OneRoster REST API.
pub struct OneRosterApiSync<R> {
    repo: Arc<R>,
    allow_private_hosts: bool,
}

impl<R: SlateRepository> OneRosterApiSync<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            allow_private_hosts: false,
        }
    }

    /// Permit private base URLs. Only for tests against a local mock server.
    pub fn allow_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }

    pub async fn run(&self, config_id: i64, triggered_by: Option<i64>) -> Result<SyncRun> {
        let config = self
            .repo
            .get_integration_config(config_id)
            .await?
            .ok_or_else(|| {
                SlateError::Config(format!("integration config {config_id} not found"))
            })?;
        config.ensure_active()?;
        let settings = config.oneroster_settings()?;
        // Client construction validates the base URL, so a blocked address
        // is a configuration error raised before any run exists.
        let client = OneRosterClient::with_options(
            &settings.base_url,
            &settings.client_id,
            &settings.client_secret,
            self.allow_private_hosts,
        )?;

        let ctx = SyncContext::new(config);
        let ledger = RunLedger::create(
            self.repo.as_ref(),
            &ctx,
            SYNC_TYPE_API,
            SyncDirection::Pull,
            triggered_by,
        )
        .await?;
        ledger.start().await?;
        info!(config_id, run_id = ledger.run_id(), "starting OneRoster API sync");

        match self.execute(&client, &ctx, &ledger).await {
            Ok(()) => {
                ledger.complete().await?;
                ledger.reload().await
            }
            Err(e) => {
                error!(run_id = ledger.run_id(), error = %e, "OneRoster API sync failed");
                ledger.fail(&e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        client: &OneRosterClient,
        ctx: &SyncContext,
        ledger: &RunLedger<'_, R>,
    ) -> Result<()> {
        client.authenticate().await?;

        // Each collection is fetched in full before its pass reconciles, so
        // a fetch failure surfaces before any partial write for that pass.
        let orgs: Vec<_> = client
            .get_all_orgs()
            .await?
            .into_iter()
            .map(|r| r.into_record())
            .collect();
        info!(count = orgs.len(), "fetched orgs");

        let sessions: Vec<_> = client
            .get_all_academic_sessions()
            .await?
            .into_iter()
            .map(|r| r.into_record())
            .collect();
        info!(count = sessions.len(), "fetched academic sessions");

        let users: Vec<_> = client
            .get_all_users()
            .await?
            .into_iter()
            .map(|r| r.into_record())
            .collect();
        info!(count = users.len(), "fetched users");

        let classes: Vec<_> = client
            .get_all_classes()
            .await?
            .into_iter()
            .map(|r| r.into_record())
            .collect();
        info!(count = classes.len(), "fetched classes");

        let enrollments: Vec<_> = client
            .get_all_enrollments()
            .await?
            .into_iter()
            .map(|r| r.into_record())
            .collect();
        info!(count = enrollments.len(), "fetched enrollments");

        let bundle = RosterBundle {
            orgs,
            sessions,
            users,
            classes,
            enrollments,
        };

        RosterProcessor::new(self.repo.as_ref(), ctx, ledger)
            .process(&bundle)
            .await
    }
}

/// Roster pull from an uploaded OneRoster CSV zip bundle.
pub struct OneRosterCsvImport<R> {
    repo: Arc<R>,
}

impl<R: SlateRepository> OneRosterCsvImport<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn run(
        &self,
        config_id: i64,
        bundle_path: &Path,
        triggered_by: Option<i64>,
    ) -> Result<SyncRun> {
        let config = self
            .repo
            .get_integration_config(config_id)
            .await?
            .ok_or_else(|| {
                SlateError::Config(format!("integration config {config_id} not found"))
            })?;
        config.ensure_active()?;

        let ctx = SyncContext::new(config);
        let ledger = RunLedger::create(
            self.repo.as_ref(),
            &ctx,
            SYNC_TYPE_CSV,
            SyncDirection::Pull,
            triggered_by,
        )
        .await?;
        ledger.start().await?;
        info!(config_id, run_id = ledger.run_id(), bundle = %bundle_path.display(), "starting OneRoster CSV import");

        match self.execute(&ctx, &ledger, bundle_path).await {
            Ok(()) => {
                ledger.complete().await?;
                ledger.reload().await
            }
            Err(e) => {
                error!(run_id = ledger.run_id(), error = %e, "OneRoster CSV import failed");
                ledger.fail(&e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        ctx: &SyncContext,
        ledger: &RunLedger<'_, R>,
        bundle_path: &Path,
    ) -> Result<()> {
        let bundle = read_bundle(bundle_path)?;
        for warning in &bundle.warnings {
            ledger.log_warn(warning, LogDetail::none()).await?;
        }

        RosterProcessor::new(self.repo.as_ref(), ctx, ledger)
            .process(&bundle.roster)
            .await
    }
}

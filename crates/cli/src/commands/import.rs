use std::path::Path;

use slate_oneroster_sync::pull::OneRosterCsvImport;

use super::open_repository;

pub async fn run(
    config_path: &str,
    config_id: i64,
    bundle: &str,
    triggered_by: Option<i64>,
) -> anyhow::Result<()> {
    let repo = open_repository(config_path).await?;
    let import = OneRosterCsvImport::new(repo);
    let run = import
        .run(config_id, Path::new(bundle), triggered_by)
        .await?;

    println!(
        "Import run {} {}: {} processed, {} succeeded, {} failed",
        run.id,
        run.status.as_str(),
        run.records_processed,
        run.records_succeeded,
        run.records_failed
    );
    Ok(())
}

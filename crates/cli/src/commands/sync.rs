use slate_oneroster_sync::pull::OneRosterApiSync;

use super::open_repository;

pub async fn run(
    config_path: &str,
    config_id: i64,
    triggered_by: Option<i64>,
) -> anyhow::Result<()> {
    let repo = open_repository(config_path).await?;
    let sync = OneRosterApiSync::new(repo);
    let run = sync.run(config_id, triggered_by).await?;

    println!(
        "Sync run {} {}: {} processed, {} succeeded, {} failed",
        run.id,
        run.status.as_str(),
        run.records_processed,
        run.records_succeeded,
        run.records_failed
    );
    Ok(())
}

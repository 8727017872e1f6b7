use slate_core::db::repository::SyncRunRepository;

use super::open_repository;

pub async fn run(config_path: &str, tenant_id: i64, limit: i64) -> anyhow::Result<()> {
    let repo = open_repository(config_path).await?;
    let runs = repo.list_recent_runs(tenant_id, limit).await?;

    if runs.is_empty() {
        println!("No sync runs for tenant {tenant_id}");
        return Ok(());
    }

    println!(
        "{:<6} {:<26} {:<6} {:<10} {:>9} {:>9} {:>7}",
        "id", "type", "dir", "status", "processed", "succeeded", "failed"
    );
    for run in runs {
        println!(
            "{:<6} {:<26} {:<6} {:<10} {:>9} {:>9} {:>7}",
            run.id,
            run.sync_type,
            run.direction.as_str(),
            run.status.as_str(),
            run.records_processed,
            run.records_succeeded,
            run.records_failed
        );
        if let Some(message) = &run.error_message {
            println!("       error: {message}");
        }
    }
    Ok(())
}

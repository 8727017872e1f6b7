use anyhow::Context;

use slate_classroom_sync::client::ClassroomClient;
use slate_classroom_sync::push::{CourseworkPush, GradePassback};
use slate_core::db::repository::IntegrationConfigRepository;
use slate_core::db::sqlite::SqliteRepository;
use slate_core::models::sync::SyncRun;

use super::open_repository;

async fn classroom_client(
    repo: &SqliteRepository,
    config_id: i64,
) -> anyhow::Result<ClassroomClient> {
    let config = repo
        .get_integration_config(config_id)
        .await?
        .with_context(|| format!("integration config {config_id} not found"))?;
    let settings = config.classroom_settings()?;
    Ok(ClassroomClient::new(&settings.access_token))
}

fn print_run(what: &str, run: &SyncRun) {
    println!(
        "{what} run {} {}: {} processed, {} succeeded, {} failed",
        run.id,
        run.status.as_str(),
        run.records_processed,
        run.records_succeeded,
        run.records_failed
    );
}

pub async fn coursework(
    config_path: &str,
    config_id: i64,
    assignment_id: i64,
    triggered_by: Option<i64>,
) -> anyhow::Result<()> {
    let repo = open_repository(config_path).await?;
    let client = classroom_client(&repo, config_id).await?;
    let push = CourseworkPush::new(repo, client);
    let run = push.run(config_id, triggered_by, assignment_id).await?;
    print_run("Coursework push", &run);
    Ok(())
}

pub async fn grades(
    config_path: &str,
    config_id: i64,
    assignment_id: i64,
    triggered_by: Option<i64>,
) -> anyhow::Result<()> {
    let repo = open_repository(config_path).await?;
    let client = classroom_client(&repo, config_id).await?;
    let push = GradePassback::new(repo, client);
    let run = push.run(config_id, triggered_by, assignment_id).await?;
    print_run("Grade passback", &run);
    Ok(())
}

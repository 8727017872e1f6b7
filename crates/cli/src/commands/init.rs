use std::path::Path;

use anyhow::Context;
use tracing::info;

use slate_core::config::SlateConfig;
use slate_core::db::DatabasePool;

/// Create the data directory, write a default config, and run migrations.
pub async fn run(config_path: &str, data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {data_dir}"))?;

    let db_path = format!("{}/slate.db", data_dir.trim_end_matches('/'));
    if !Path::new(config_path).exists() {
        let toml = SlateConfig::default_toml("slate", &db_path);
        std::fs::write(config_path, toml)
            .with_context(|| format!("failed to write {config_path}"))?;
        info!(config = config_path, "wrote default configuration");
    }

    // Touch the database file so sqlite can open it, then run migrations.
    if !Path::new(&db_path).exists() {
        std::fs::File::create(&db_path)
            .with_context(|| format!("failed to create database file {db_path}"))?;
    }
    DatabasePool::new_sqlite(&db_path).await?;
    info!(database = %db_path, "database initialized");

    println!("Initialized Slate in {data_dir}");
    Ok(())
}

pub mod import;
pub mod init;
pub mod push;
pub mod status;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use slate_core::config::SlateConfig;
use slate_core::db::sqlite::SqliteRepository;
use slate_core::db::DatabasePool;

/// Load the app config and open the repository it points at.
pub(crate) async fn open_repository(config_path: &str) -> anyhow::Result<Arc<SqliteRepository>> {
    let config = SlateConfig::load(Path::new(config_path))
        .with_context(|| format!("failed to load config from {config_path}"))?;
    let pool = DatabasePool::new_sqlite(&config.slate.database.path)
        .await
        .with_context(|| format!("failed to open database at {}", config.slate.database.path))?;
    let DatabasePool::Sqlite(pool) = pool;
    Ok(Arc::new(SqliteRepository::new(pool)))
}

pub mod postgres;
pub mod sqlite;
pub mod trait_def;

#[cfg(test)]
mod storage_tests;

pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::models::{ClickRecord, ShortLink};

/// Open the configured backend. Tables are not created until `init`.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            tracing::info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };
    Ok(storage)
}

/// Distribute click rows (already in arrival order) onto their links
pub(crate) fn attach_clicks(links: &mut [ShortLink], clicks: Vec<ClickRecord>) {
    let mut by_link: HashMap<i64, Vec<ClickRecord>> = HashMap::new();
    for click in clicks {
        by_link.entry(click.link_id).or_default().push(click);
    }

    for link in links.iter_mut() {
        if let Some(records) = by_link.remove(&link.id) {
            link.click_details = records;
        }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

//! Storage for computed daily summaries.
//!
//! Both SQLite and MySQL are reached through the sqlx `Any` driver. The Any
//! driver cannot decode `DATE`/`BOOLEAN` columns, so every read casts them to
//! text/integer and dates travel as `YYYY-MM-DD` strings.

mod energy_queries;
mod schema;

use std::{fmt, path::Path, str::FromStr, time::Duration};

use serde::Deserialize;
use sqlx::{any::AnyPoolOptions, AnyPool};

pub use energy_queries::{upsert_summary, UpsertOutcome};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
}

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[default]
    Sqlite,
    Mysql,
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "mysql" => Ok(Self::Mysql),
            other => Err(format!("unsupported database type '{other}'")),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => f.write_str("sqlite"),
            Self::Mysql => f.write_str("mysql"),
        }
    }
}

pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

pub fn mysql_url(host: &str, user: &str, password: &str, dbname: &str) -> String {
    format!(
        "mysql://{}:{}@{}/{}",
        urlencoding::encode(user),
        urlencoding::encode(password),
        host,
        dbname
    )
}

/// Create the parent directory of a SQLite file if it does not exist yet.
pub fn prepare_sqlite_path(path: &Path) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

/// Handle to the `energy_data` table.
///
/// Acquired once per run; call [`EnergyStore::close`] when done.
#[derive(Clone)]
pub struct EnergyStore {
    pool: AnyPool,
    kind: DatabaseKind,
}

impl EnergyStore {
    pub async fn connect(kind: DatabaseKind, url: &str, max_connections: u32) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        // A single in-memory SQLite database only lives as long as its connection.
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        tracing::debug!(%kind, "connected to energy store");
        Ok(Self { pool, kind })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub async fn memory_store() -> EnergyStore {
        let store = EnergyStore::connect(DatabaseKind::Sqlite, "sqlite::memory:", 1)
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store
    }
}

use super::{DatabaseKind, EnergyStore, StoreError};

// Tables created by earlier versions have no UNIQUE(date); the upsert path
// does not rely on it.
const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS energy_data (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        date        DATE NOT NULL UNIQUE,
        charged_kwh REAL NOT NULL,
        at_home     BOOLEAN NOT NULL
    )
"#;

const MYSQL_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS energy_data (
        id          INT AUTO_INCREMENT PRIMARY KEY,
        date        DATE NOT NULL,
        charged_kwh DOUBLE NOT NULL,
        at_home     BOOLEAN NOT NULL,
        UNIQUE KEY energy_data_date_uq (date)
    )
"#;

impl EnergyStore {
    /// Create `energy_data` if it is missing. Safe to call on every run.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let ddl = match self.kind {
            DatabaseKind::Sqlite => SQLITE_SCHEMA,
            DatabaseKind::Mysql => MYSQL_SCHEMA,
        };
        sqlx::query(ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::memory_store;

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let store = memory_store().await;
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        let rows = sqlx::query("SELECT id FROM energy_data")
            .fetch_all(store.pool())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}

use sqlx::{AnyConnection, Row};

use super::{DatabaseKind, EnergyStore, StoreError};
use crate::domain::{parse_date, DailySummary, DateWindow, EnergyRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Write one summary on `conn`: update `charged_kwh` if the date already has
/// a row, otherwise insert it with `at_home = true`.
///
/// The existing row's `at_home` is left alone. Run this inside a transaction;
/// the check and the write are separate statements.
pub async fn upsert_summary(
    conn: &mut AnyConnection,
    summary: &DailySummary,
) -> Result<UpsertOutcome, sqlx::Error> {
    let date = summary.date.to_string();

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM energy_data WHERE date = ?")
        .bind(date.as_str())
        .fetch_one(&mut *conn)
        .await?;

    if existing > 0 {
        sqlx::query("UPDATE energy_data SET charged_kwh = ? WHERE date = ?")
            .bind(summary.charged_kwh)
            .bind(date.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(UpsertOutcome::Updated)
    } else {
        sqlx::query("INSERT INTO energy_data (date, charged_kwh, at_home) VALUES (?, ?, ?)")
            .bind(date.as_str())
            .bind(summary.charged_kwh)
            .bind(true)
            .execute(&mut *conn)
            .await?;
        Ok(UpsertOutcome::Inserted)
    }
}

impl EnergyStore {
    /// Sum of `charged_kwh` over `[window.start, window.end]`; `0.0` when no
    /// row matches.
    pub async fn windowed_total(&self, window: DateWindow) -> Result<f64, StoreError> {
        let total: Option<f64> = sqlx::query_scalar(
            "SELECT SUM(charged_kwh) FROM energy_data WHERE date >= ? AND date <= ?",
        )
        .bind(window.start.to_string())
        .bind(window.end.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0.0))
    }

    /// Stored rows inside `window`, ascending by date.
    pub async fn records(&self, window: DateWindow) -> Result<Vec<EnergyRecord>, StoreError> {
        let sql = match self.kind {
            DatabaseKind::Sqlite => {
                r#"
                SELECT
                    CAST(date AS TEXT)           AS date,
                    CAST(charged_kwh AS REAL)    AS charged_kwh,
                    CAST(at_home AS INTEGER)     AS at_home
                FROM energy_data
                WHERE date >= ?
                  AND date <= ?
                ORDER BY date, id
                "#
            }
            DatabaseKind::Mysql => {
                r#"
                SELECT
                    DATE_FORMAT(date, '%Y-%m-%d') AS date,
                    CAST(charged_kwh AS DOUBLE)   AS charged_kwh,
                    CAST(at_home AS SIGNED)       AS at_home
                FROM energy_data
                WHERE date >= ?
                  AND date <= ?
                ORDER BY date, id
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(window.start.to_string())
            .bind(window.end.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<EnergyRecord, StoreError> {
                let raw_date: String = row.try_get("date")?;
                let date = parse_date(&raw_date)
                    .map_err(|e| StoreError::InvalidRow(format!("date '{raw_date}': {e}")))?;
                let at_home: i64 = row.try_get("at_home")?;
                Ok(EnergyRecord {
                    date,
                    charged_kwh: row.try_get("charged_kwh")?,
                    at_home: at_home != 0,
                })
            })
            .collect()
    }
}

use anyhow::{anyhow, bail, Result};
use charge_client::domain::{parse_date, DateWindow};
use charge_ingest::{config::AppConfig, job::open_store, observability};
use std::env;
use time::OffsetDateTime;

/// Print the stored kWh total for `[start, end]`, or for last calendar month
/// when no range is given.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let window = match args.as_slice() {
        [] => {
            let today = OffsetDateTime::now_local()
                .unwrap_or_else(|_| OffsetDateTime::now_utc())
                .date();
            DateWindow::previous_month(today).ok_or_else(|| anyhow!("no previous month for {today}"))?
        }
        [start, end] => DateWindow::new(parse_date(start)?, parse_date(end)?),
        _ => bail!("usage: monthly_total [<start YYYY-MM-DD> <end YYYY-MM-DD>]"),
    };

    let cfg = AppConfig::load()?;
    let store = open_store(&cfg.database).await?;
    let total = store.windowed_total(window).await;
    store.close().await;

    let total = total?;
    tracing::info!(%window, total_kwh = total, "windowed total");
    println!("{total:.2}");

    Ok(())
}

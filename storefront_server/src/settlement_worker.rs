use chrono::{Duration, Utc};
use log::*;
use storefront_engine::{events::EventProducers, SettlementApi, SettlementReport, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the coin settlement worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The first run happens immediately, so coins that matured while the server was down are credited at startup.
/// Settlement is safe to repeat, so a run that overlaps a restart cannot credit an order twice.
pub fn start_settlement_worker(db: SqliteDatabase, producers: EventProducers, interval: Duration) -> JoinHandle<()> {
    let period = interval.to_std().unwrap_or_else(|_| {
        warn!("🕰️ Invalid settlement interval {interval}. Using 24 hours.");
        std::time::Duration::from_secs(24 * 3600)
    });
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        let api = SettlementApi::new(db, producers);
        info!("🕰️ Coin settlement worker started. Running every {} hours", interval.num_hours());
        loop {
            timer.tick().await;
            info!("🕰️ Running coin settlement job");
            match api.settle_matured_coins(Utc::now()).await {
                Ok(report) => log_report(&report),
                Err(e) => error!("🕰️ Error running coin settlement job: {e}"),
            }
        }
    })
}

fn log_report(report: &SettlementReport) {
    info!("🕰️ {} orders settled, {} credited in total", report.credited.len(), report.total_credited());
    if !report.credited.is_empty() {
        let orders = report.credited.iter().map(|s| format!("#{} ({})", s.order_id, s.user_id)).collect::<Vec<_>>();
        debug!("🕰️ Settled orders: {}", orders.join(", "));
    }
    for failure in &report.failed {
        warn!("🕰️ Order #{} was not settled and will be retried. {}", failure.order_id, failure.reason);
    }
}

//! Background confirmation of pending operations.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::TradeService;

/// Polls pending operations every `period` and confirms the ones that are
/// due. The first check runs immediately.
///
/// The task runs until the handle is aborted.
pub fn spawn_status_poller(service: Arc<TradeService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Status poller started ({}s interval)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match service.refresh_statuses().await {
                Ok(ids) if ids.is_empty() => {}
                Ok(ids) => debug!("Status poll confirmed {} operations", ids.len()),
                Err(e) => warn!("Status poll failed: {}", e),
            }
        }
    })
}

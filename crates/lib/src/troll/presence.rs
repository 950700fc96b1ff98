//! Periodic presence signal.

use crate::troll::{Troll, TrollError};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const PRESENCE_INTERVAL: Duration = Duration::from_secs(120);

impl Troll {
    /// Emit the presence signal every interval until `cancel` fires. Failed updates are logged and skipped.
    /// Always ends with `TrollError::Cancelled`.
    pub async fn presence_loop(&self, cancel: CancellationToken) -> Result<(), TrollError> {
        log::info!(
            "presence: running update status loop every {}s",
            self.presence_interval.as_secs()
        );
        let mut ticker = interval_at(
            Instant::now() + self.presence_interval,
            self.presence_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TrollError::Cancelled),
                _ = ticker.tick() => {
                    if let Err(e) = self.messenger.update_presence(false).await {
                        log::warn!("presence: update status failed: {}", e);
                    }
                }
            }
        }
    }
}

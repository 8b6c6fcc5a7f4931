//! # Purge Scheduler
//!
//! Background task that periodically drops expired nonce records.

use crate::ports::inbound::LaunchAuthenticationApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Run `purge` every `interval` until `shutdown` becomes `true` or its sender
/// is dropped.
///
/// The first purge runs one full interval after spawning.
pub fn spawn_purge_task<A>(
    authenticator: Arc<A>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    A: LaunchAuthenticationApi + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "Nonce purge task started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match authenticator.purge().await {
                        Ok(removed) => info!(removed, "Purged expired nonce records"),
                        Err(e) => error!(error = %e, "Nonce purge failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    debug!("Ignoring shutdown signal reset");
                }
            }
        }
        info!("Nonce purge task stopped");
    })
}

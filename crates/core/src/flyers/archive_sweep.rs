//! Background sweep that periodically archives stale flyers.

use log::{error, info};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use super::flyers_traits::FlyerLifecycleServiceTrait;
use crate::errors::Result;
use crate::settings::LifecycleSettings;

/// Runs one sweep with the configured threshold.
pub async fn run_archive_sweep(service: &dyn FlyerLifecycleServiceTrait) -> Result<usize> {
    match service.archive_stale().await {
        Ok(count) => {
            if count > 0 {
                info!("Archive sweep archived {} flyer(s)", count);
            }
            Ok(count)
        }
        Err(e) => {
            error!("Archive sweep failed: {}", e);
            Err(e)
        }
    }
}

/// Spawns the periodic archive sweep on the current Tokio runtime.
///
/// The first sweep runs after `sweep_initial_delay_secs`, then every
/// `sweep_interval_secs`. A failed sweep is logged and retried on the next tick.
pub fn spawn_archive_sweep(
    service: Arc<dyn FlyerLifecycleServiceTrait>,
    settings: &LifecycleSettings,
) -> JoinHandle<()> {
    let initial_delay = Duration::from_secs(settings.sweep_initial_delay_secs);
    let period = Duration::from_secs(settings.sweep_interval_secs);
    let threshold = settings.archive_after_days;

    tokio::spawn(async move {
        info!(
            "Archive sweep started ({}s interval, {} day threshold)",
            period.as_secs(),
            threshold
        );
        sleep(initial_delay).await;

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let _ = run_archive_sweep(service.as_ref()).await;
        }
    })
}

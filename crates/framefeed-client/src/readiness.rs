//! Readiness polling.
//!
//! The render target is created by the host on its own schedule, so the
//! session probes for it at a fixed interval. The probe future resolves once;
//! dropping it (or returning from it) is what cancels the recurring timer.

use crate::host::{Discovery, Host};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Error returned when the render target never shows up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadinessError {
    #[error("render target not found within {0:?}")]
    TimedOut(Duration),
}

/// Probe `host` every `interval` until the render target exists.
///
/// The first probe happens immediately. With `timeout` set, gives up after
/// that long; with `None`, probes forever.
pub async fn wait_for_target<H: Host + ?Sized>(
    host: &mut H,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<Discovery, ReadinessError> {
    let probe = async {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reported_missing = false;

        loop {
            ticker.tick().await;

            if let Some(surface) = host.find_render_target() {
                let (width, height) = surface.size();
                tracing::info!(width, height, "Render target found");

                let widgets = host.find_status_widgets();
                if widgets.is_none() {
                    tracing::warn!("Status widgets not found, status updates will be skipped");
                }
                return Discovery { surface, widgets };
            }

            if !reported_missing {
                tracing::info!("Render target not found yet, polling every {:?}", interval);
                reported_missing = true;
            }
        }
    };

    match timeout {
        Some(limit) => time::timeout(limit, probe)
            .await
            .map_err(|_| ReadinessError::TimedOut(limit)),
        None => Ok(probe.await),
    }
}

//! Background version check.
//!
//! # Responsibilities
//! - Periodically probe for a newer deployed version
//! - Pause while the document is not visible
//! - Surface an advisory flag; never block interaction
//!
//! # Design Decisions
//! - Runs independently of navigation on its own interval
//! - Probe failures are logged at debug and retried next tick; the check
//!   is advisory, not load-bearing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::error::ResumeError;

/// Document visibility collaborator.
pub trait VisibilitySource: Send + Sync {
    fn is_visible(&self) -> bool;
}

/// Deployed-version probe collaborator.
pub trait VersionProbe: Send + Sync {
    fn current_version(&self) -> BoxFuture<'static, Result<String, ResumeError>>;
}

/// Advisory timer that flags when a newer version is deployed.
pub struct VersionChecker {
    probe: Arc<dyn VersionProbe>,
    visibility: Arc<dyn VisibilitySource>,
    interval: Duration,
    served_version: String,
    update_available: Arc<AtomicBool>,
}

impl VersionChecker {
    pub fn new(
        probe: Arc<dyn VersionProbe>,
        visibility: Arc<dyn VisibilitySource>,
        interval: Duration,
        served_version: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            visibility,
            interval,
            served_version: served_version.into(),
            update_available: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle to the advisory flag.
    pub fn update_flag(&self) -> Arc<AtomicBool> {
        self.update_available.clone()
    }

    /// Tick until shutdown. Hidden documents skip the probe entirely.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.visibility.is_visible() {
                        continue;
                    }
                    match self.probe.current_version().await {
                        Ok(version) => {
                            if version != self.served_version {
                                if !self.update_available.swap(true, Ordering::SeqCst) {
                                    tracing::info!(
                                        served = %self.served_version,
                                        deployed = %version,
                                        "newer version deployed"
                                    );
                                }
                            }
                        }
                        Err(error) => {
                            tracing::debug!(error = %error, "version probe failed");
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }
}

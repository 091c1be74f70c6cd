//! Fixed-cadence portfolio refresh loop (§4.9). Cooperative shutdown
//! follows the teacher's `tokio::select!` reconnect-loop idiom rather than
//! OS signal handling, which this crate leaves to the embedding binary.

use crate::orchestrator::{Orchestrator, PortfolioSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    interval: std::time::Duration,
    interactive: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Handle an embedder holds onto independently of the running loop: flip
/// `interactive` while walking an operator through a confirmation prompt,
/// or call `shutdown()` to stop the loop at the next iteration boundary.
#[derive(Clone)]
pub struct SchedulerHandle {
    interactive: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl SchedulerHandle {
    pub fn set_interactive(&self, interactive: bool) {
        self.interactive.store(interactive, Ordering::SeqCst);
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, interval: std::time::Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            orchestrator,
            interval,
            interactive: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            interactive: self.interactive.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Runs until `SchedulerHandle::shutdown` is called. `on_snapshot` is
    /// invoked with each successfully refreshed snapshot; a failed refresh
    /// is logged and the loop continues at the next tick rather than
    /// exiting.
    pub async fn run(mut self, on_snapshot: impl Fn(PortfolioSnapshot) + Send + Sync) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.interactive.load(Ordering::SeqCst) {
                        info!("skipping refresh: interactive session in progress");
                        continue;
                    }
                    let result = self.orchestrator.get_comprehensive_portfolio_data().await;
                    if result.success {
                        if let Some(snapshot) = result.details {
                            on_snapshot(snapshot);
                        }
                    } else {
                        warn!(message = %result.message, "scheduled portfolio refresh failed");
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_set_interactive_is_observable_on_the_shared_flag() {
        let interactive = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, _rx) = watch::channel(false);
        let handle = SchedulerHandle {
            interactive: interactive.clone(),
            shutdown_tx,
        };
        handle.set_interactive(true);
        assert!(interactive.load(Ordering::SeqCst));
    }

    #[test]
    fn handle_shutdown_flips_the_watch_channel() {
        let interactive = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = SchedulerHandle { interactive, shutdown_tx };
        handle.shutdown();
        assert!(*shutdown_rx.borrow());
    }
}

use crate::api::{BackendClient, PollOutcome};
use crate::logging;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Predicates gating each poll tick: the terminal must be focused (the
/// browser original checked `document.hidden`) and this instance must hold
/// the tab arbitration. Gating suppresses new ticks only; a request already
/// in flight completes and its outcome is still delivered.
#[derive(Clone)]
pub struct PollGates {
    pub visible: Arc<AtomicBool>,
    pub active: Arc<AtomicBool>,
}

impl Default for PollGates {
    fn default() -> Self {
        Self::new()
    }
}

impl PollGates {
    pub fn new() -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(true)),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn open(&self) -> bool {
        self.visible.load(Ordering::Relaxed) && self.active.load(Ordering::Relaxed)
    }
}

/// Periodic status-poll task. Outcomes (including "unreachable") go over the
/// channel to the owning loop; only decode-level failures are logged here.
pub struct Poller {
    cancel: CancellationToken,
}

impl Poller {
    pub fn spawn(
        client: BackendClient,
        gates: PollGates,
        outcome_tx: mpsc::UnboundedSender<PollOutcome>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if !gates.open() {
                    continue;
                }

                match client.poll().await {
                    Ok(outcome) => {
                        if outcome_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                    Err(error) => logging::log_error("poll", &error),
                }
            }
        });

        Self { cancel }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

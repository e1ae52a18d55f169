use crate::manager::PlayerManager;
use crate::types::{PlayerState, RawPlayer};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shared tick counter deciding which players get polled
#[derive(Debug)]
pub(crate) struct PollCounter {
    ticks: u32,
    threshold: u32,
}

impl PollCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            ticks: 0,
            threshold,
        }
    }

    /// Whether this tick polls every player that needs polling
    pub fn is_full_poll(&self) -> bool {
        self.ticks >= self.threshold
    }

    /// Polled players are refreshed on full polls, playing ones on every tick
    pub fn should_poll(&self, raw: &RawPlayer) -> bool {
        raw.should_poll && (self.is_full_poll() || raw.state == PlayerState::Playing)
    }

    pub fn advance(&mut self) {
        if self.is_full_poll() {
            self.ticks = 0;
        } else {
            self.ticks += 1;
        }
    }
}

/// Running poll loop and job worker
pub(crate) struct Background {
    stop_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl Background {
    /// Spawn the poll loop and the job worker for a manager
    pub fn spawn(manager: PlayerManager, poll_interval: Duration) -> Self {
        let (stop_tx, _) = broadcast::channel(1);

        let poller = {
            let manager = manager.clone();
            let mut stop_rx = stop_tx.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(poll_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = stop_rx.recv() => {
                            tracing::debug!("Poll loop stopped");
                            break;
                        }
                        _ = ticker.tick() => manager.poll_once().await,
                    }
                }
            })
        };

        let worker = {
            let mut stop_rx = stop_tx.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop_rx.recv() => {
                            tracing::debug!("Job worker stopped");
                            break;
                        }
                        job = manager.next_job() => match job {
                            Some(job) => manager.execute(job).await,
                            None => break,
                        },
                    }
                }
            })
        };

        Self {
            stop_tx,
            tasks: vec![poller, worker],
        }
    }

    /// Signal both tasks and wait briefly for them to finish
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        for task in self.tasks {
            // Give it a moment to stop gracefully
            let _ = tokio::time::timeout(Duration::from_millis(500), task).await;
        }
    }
}

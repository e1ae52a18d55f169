use crate::types::{ControlId, ControlState, PlayerId};
use tokio::sync::{mpsc, Mutex};

/// Follow-up work dispatched by the registry and the command router
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Job {
    /// Reconcile a player from its last raw record
    Reconcile(PlayerId),
    /// Push a new value into the control registry
    SetControlState {
        control_id: ControlId,
        state: ControlState,
    },
    /// Ask a player's queue to refresh its state
    RefreshQueue(PlayerId),
}

pub(crate) struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    rx: Mutex<mpsc::UnboundedReceiver<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn dispatch(&self, job: Job) {
        tracing::trace!("Dispatching {:?}", job);
        // The receiver lives as long as the queue itself
        let _ = self.tx.send(job);
    }

    /// Take the next job without waiting
    ///
    /// Also returns `None` while a worker holds the receiver.
    pub fn try_next(&self) -> Option<Job> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Wait for the next job
    pub async fn next(&self) -> Option<Job> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jobs_come_out_in_dispatch_order() {
        let queue = JobQueue::new();
        queue.dispatch(Job::Reconcile("a".into()));
        queue.dispatch(Job::RefreshQueue("b".into()));
        queue.dispatch(Job::SetControlState {
            control_id: "plug".into(),
            state: ControlState::Power(true),
        });

        assert_eq!(queue.next().await, Some(Job::Reconcile("a".into())));
        assert_eq!(queue.try_next(), Some(Job::RefreshQueue("b".into())));
        assert!(matches!(queue.try_next(), Some(Job::SetControlState { .. })));
        assert_eq!(queue.try_next(), None);
    }
}

use crate::error::{HubError, Result};
use crate::types::{ControlId, EffectivePlayer, PlayerId};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Externally visible change of players or controls
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A player was seen for the first time
    PlayerAdded(Box<EffectivePlayer>),

    /// A player was removed from the registry
    PlayerRemoved { player_id: PlayerId },

    /// The effective state of a player changed
    PlayerChanged(Box<EffectivePlayer>),

    /// A control was registered or replaced
    ControlRegistered(ControlId),

    /// The state of a control changed
    ControlUpdated(ControlId),
}

/// Publishes hub events to whoever listens
pub trait EventBus: Send + Sync {
    fn publish(&self, event: PlayerEvent);
}

/// Event bus backed by a tokio broadcast channel
pub struct BroadcastEventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl BroadcastEventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.tx.subscribe())
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, event: PlayerEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

/// Receiver for hub events
pub struct EventReceiver {
    rx: broadcast::Receiver<PlayerEvent>,
    /// Events dropped because this receiver fell behind
    missed: u64,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<PlayerEvent>) -> Self {
        Self { rx, missed: 0 }
    }

    /// Receive the next event
    ///
    /// A receiver that fell behind skips to the oldest event still buffered.
    /// Fails with `EventBusClosed` once the bus has been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Ok(event),
                Err(RecvError::Lagged(n)) => self.skipped(n),
                Err(RecvError::Closed) => return Err(HubError::EventBusClosed),
            }
        }
    }

    /// Try to receive an event without waiting
    ///
    /// Returns `None` if no event is available.
    pub fn try_recv(&mut self) -> Result<Option<PlayerEvent>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(n)) => self.skipped(n),
                Err(TryRecvError::Closed) => return Err(HubError::EventBusClosed),
            }
        }
    }

    /// Number of events this receiver missed by falling behind
    pub fn missed(&self) -> u64 {
        self.missed
    }

    fn skipped(&mut self, count: u64) {
        tracing::warn!("Event receiver fell behind, skipped {} events", count);
        self.missed += count;
    }

    /// Drain every event currently buffered
    pub fn drain(&mut self) -> Result<Vec<PlayerEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv()? {
            events.push(event);
        }
        Ok(events)
    }
}

use crate::catalog::{MediaCatalog, TrackStream};
use crate::config::{HubConfig, MemoryConfigStore};
use crate::error::{HubError, Result};
use crate::manager::{Collaborators, PlayerManager};
use crate::provider::PlayerProvider;
use crate::queue::{PlayerQueue, QueueFactory};
use crate::subscription::{BroadcastEventBus, EventReceiver};
use crate::types::{MediaItem, PlayerState, QueueItem, RawPlayer, VolumeLevel};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider id of every fixture player
pub const PROVIDER_ID: &str = "test";

/// Device command received by the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Stop(String),
    Play(String),
    Pause(String),
    PowerOn(String),
    PowerOff(String),
    VolumeSet(String, VolumeLevel),
    Mute(String, bool),
}

/// Provider recording every command it receives
#[derive(Default)]
pub struct MockProvider {
    calls: Mutex<Vec<Call>>,
    polls: Mutex<Vec<String>>,
    poll_results: Mutex<HashMap<String, RawPlayer>>,
    should_fail: AtomicBool,
}

impl MockProvider {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn polls(&self) -> Vec<String> {
        self.polls.lock().unwrap().clone()
    }

    /// Make every device command fail
    pub fn fail_commands(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot returned when the player is polled
    pub fn set_poll_result(&self, raw: RawPlayer) {
        self.poll_results
            .lock()
            .unwrap()
            .insert(raw.player_id.clone(), raw);
    }

    fn record(&self, call: Call) -> Result<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            let player_id = match &call {
                Call::Stop(id)
                | Call::Play(id)
                | Call::Pause(id)
                | Call::PowerOn(id)
                | Call::PowerOff(id)
                | Call::VolumeSet(id, _)
                | Call::Mute(id, _) => id.clone(),
            };
            return Err(HubError::provider(player_id, "device unreachable"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl PlayerProvider for MockProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn cmd_stop(&self, player_id: &str) -> Result<()> {
        self.record(Call::Stop(player_id.into()))
    }

    async fn cmd_play(&self, player_id: &str) -> Result<()> {
        self.record(Call::Play(player_id.into()))
    }

    async fn cmd_pause(&self, player_id: &str) -> Result<()> {
        self.record(Call::Pause(player_id.into()))
    }

    async fn cmd_power_on(&self, player_id: &str) -> Result<()> {
        self.record(Call::PowerOn(player_id.into()))
    }

    async fn cmd_power_off(&self, player_id: &str) -> Result<()> {
        self.record(Call::PowerOff(player_id.into()))
    }

    async fn cmd_volume_set(&self, player_id: &str, volume_level: VolumeLevel) -> Result<()> {
        self.record(Call::VolumeSet(player_id.into(), volume_level))
    }

    async fn cmd_volume_mute(&self, player_id: &str, muted: bool) -> Result<()> {
        self.record(Call::Mute(player_id.into(), muted))
    }

    async fn poll_player(&self, player_id: &str) -> Result<Option<RawPlayer>> {
        self.polls.lock().unwrap().push(player_id.to_string());
        Ok(self.poll_results.lock().unwrap().get(player_id).cloned())
    }
}

/// Queue operation received by a mock queue
#[derive(Debug, Clone, PartialEq)]
pub enum QueueCall {
    Load(Vec<QueueItem>),
    Insert(Vec<QueueItem>, usize),
    Append(Vec<QueueItem>),
    Resume,
    Next,
    Previous,
}

#[derive(Default)]
pub struct MockQueue {
    calls: Mutex<Vec<QueueCall>>,
    cur_item: Mutex<Option<String>>,
    updates: AtomicUsize,
    closed: AtomicBool,
}

impl MockQueue {
    /// Playback operations, state refreshes excluded
    pub fn calls(&self) -> Vec<QueueCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: QueueCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl PlayerQueue for MockQueue {
    async fn load(&self, items: Vec<QueueItem>) -> Result<()> {
        *self.cur_item.lock().unwrap() = items.first().map(|item| item.queue_item_id.clone());
        self.record(QueueCall::Load(items))
    }

    async fn insert(&self, items: Vec<QueueItem>, offset: usize) -> Result<()> {
        self.record(QueueCall::Insert(items, offset))
    }

    async fn append(&self, items: Vec<QueueItem>) -> Result<()> {
        self.record(QueueCall::Append(items))
    }

    async fn resume(&self) -> Result<()> {
        self.record(QueueCall::Resume)
    }

    async fn next(&self) -> Result<()> {
        self.record(QueueCall::Next)
    }

    async fn previous(&self) -> Result<()> {
        self.record(QueueCall::Previous)
    }

    async fn update_state(&self) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn cur_item_id(&self) -> Option<String> {
        self.cur_item.lock().unwrap().clone()
    }
}

/// Queue factory keeping every queue it created
#[derive(Default)]
pub struct MockQueueFactory {
    queues: Mutex<HashMap<String, Arc<MockQueue>>>,
}

impl MockQueueFactory {
    pub fn queue(&self, player_id: &str) -> Arc<MockQueue> {
        self.queues
            .lock()
            .unwrap()
            .get(player_id)
            .cloned()
            .unwrap_or_else(|| panic!("no queue created for {}", player_id))
    }
}

impl QueueFactory for MockQueueFactory {
    fn create(&self, player_id: &str) -> Arc<dyn PlayerQueue> {
        self.queues
            .lock()
            .unwrap()
            .entry(player_id.to_string())
            .or_default()
            .clone()
    }
}

/// Catalog serving the same track lists for artists, albums and playlists
#[derive(Default)]
pub struct MockCatalog {
    tracks: Mutex<HashMap<String, Vec<MediaItem>>>,
    loudness: Mutex<HashMap<String, f64>>,
}

impl MockCatalog {
    pub fn add_playlist(&self, item_id: &str, tracks: Vec<MediaItem>) {
        self.tracks
            .lock()
            .unwrap()
            .insert(item_id.to_string(), tracks);
    }

    pub fn set_loudness(&self, item_id: &str, loudness: f64) {
        self.loudness
            .lock()
            .unwrap()
            .insert(item_id.to_string(), loudness);
    }

    fn stream(&self, item_id: &str) -> TrackStream {
        let tracks = self
            .tracks
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .unwrap_or_default();
        stream::iter(tracks.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl MediaCatalog for MockCatalog {
    fn artist_top_tracks(&self, item_id: &str, _provider: &str) -> TrackStream {
        self.stream(item_id)
    }

    fn album_tracks(&self, item_id: &str, _provider: &str) -> TrackStream {
        self.stream(item_id)
    }

    fn playlist_tracks(&self, item_id: &str, _provider: &str) -> TrackStream {
        self.stream(item_id)
    }

    async fn track_loudness(&self, item_id: &str, _provider: &str) -> Result<Option<f64>> {
        Ok(self.loudness.lock().unwrap().get(item_id).copied())
    }
}

/// Manager wired to mock collaborators
pub struct Fixture {
    pub manager: PlayerManager,
    pub provider: Arc<MockProvider>,
    pub config: Arc<MemoryConfigStore>,
    pub queues: Arc<MockQueueFactory>,
    pub catalog: Arc<MockCatalog>,
    pub events: EventReceiver,
}

impl Fixture {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let provider = Arc::new(MockProvider::default());
        let config = Arc::new(MemoryConfigStore::new());
        let queues = Arc::new(MockQueueFactory::default());
        let catalog = Arc::new(MockCatalog::default());
        let bus = Arc::new(BroadcastEventBus::new(256));
        let events = bus.subscribe();

        let manager = PlayerManager::new(
            HubConfig::default(),
            Collaborators {
                config: config.clone(),
                catalog: catalog.clone(),
                queues: queues.clone(),
                events: bus,
            },
        );
        manager.register_provider(provider.clone());

        Self {
            manager,
            provider,
            config,
            queues,
            catalog,
            events,
        }
    }
}

/// Idle single player
pub fn speaker(player_id: &str, powered: bool, volume_level: VolumeLevel) -> RawPlayer {
    RawPlayer {
        powered,
        volume_level,
        state: PlayerState::Stopped,
        ..RawPlayer::new(player_id, PROVIDER_ID)
    }
}

/// Idle group player with the given members
pub fn group(player_id: &str, powered: bool, children: &[&str]) -> RawPlayer {
    RawPlayer {
        is_group_player: true,
        group_children: children.iter().map(|child| child.to_string()).collect(),
        ..speaker(player_id, powered, 0)
    }
}

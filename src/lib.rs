//! Rust library for reconciling and controlling players from multiple playback providers
//!
//! Providers report what their devices are doing; this library turns those
//! reports into one consistent, caller-facing record per player. It supports:
//!
//! - Group players whose members follow the group's queue while it is powered
//! - External power and volume controls overriding device behavior
//! - Change events filtered down to meaningful differences
//! - Commands routed through controls, groups, queues and providers
//! - Periodic polling of players that cannot push updates
//!
//! # Quick Start
//!
//! ```no_run
//! use player_hub::{
//!     BroadcastEventBus, Collaborators, HubConfig, MediaCatalog, MemoryConfigStore,
//!     PlayerManager, PlayerProvider, QueueFactory, RawPlayer,
//! };
//! use std::sync::Arc;
//!
//! async fn run(
//!     provider: Arc<dyn PlayerProvider>,
//!     catalog: Arc<dyn MediaCatalog>,
//!     queues: Arc<dyn QueueFactory>,
//! ) -> player_hub::Result<()> {
//!     let bus = Arc::new(BroadcastEventBus::default());
//!     let mut events = bus.subscribe();
//!
//!     let manager = PlayerManager::new(
//!         HubConfig::default(),
//!         Collaborators {
//!             config: Arc::new(MemoryConfigStore::new()),
//!             catalog,
//!             queues,
//!             events: bus,
//!         },
//!     );
//!     manager.register_provider(provider);
//!     manager.start();
//!
//!     // Providers report their devices
//!     manager.add_player(RawPlayer {
//!         powered: true,
//!         ..RawPlayer::new("kitchen", "sonos")
//!     });
//!     manager.cmd_volume_set("kitchen", 30).await?;
//!
//!     // Subscribe to player changes
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     manager.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Manager**: Player registry, lookups and the background lifecycle
//! - **Commands**: Command routing through controls, groups and queues
//! - **Reconcile**: Pure calculation of the effective player record
//! - **Hierarchy / Controls**: Group membership index and control registry
//! - **Notify / Jobs**: Change evaluation and the FIFO follow-up queue
//! - **Provider / Queue / Catalog / Config**: Interfaces to the outside world

mod catalog;
mod commands;
mod config;
mod controls;
mod error;
mod hierarchy;
mod jobs;
mod manager;
mod notify;
mod provider;
mod queue;
mod reconcile;
mod scheduler;
mod subscription;
mod types;

#[cfg(test)]
mod test_fixtures;

// Public exports
pub use catalog::{MediaCatalog, TrackStream};
pub use config::{
    ConfigStore, HubConfig, MemoryConfigStore, PlayerConfig, CONF_POWER_CONTROL,
    CONF_VOLUME_CONTROL,
};
pub use error::{HubError, Result};
pub use manager::{Collaborators, PlayerManager};
pub use provider::PlayerProvider;
pub use queue::{PlayerQueue, QueueFactory};
pub use subscription::{BroadcastEventBus, EventBus, EventReceiver, PlayerEvent};
pub use types::{
    ConfigEntry, ConfigEntryType, ConfigValueOption, Control, ControlId, ControlState,
    ControlType, DeviceInfo, EffectivePlayer, MediaItem, MediaType, PlayerId,
    PlayerState, ProviderId, QueueItem, QueueOption, RawPlayer, VolumeLevel,
};

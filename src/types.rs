use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Player identifier
pub type PlayerId = String;

/// Provider identifier
pub type ProviderId = String;

/// Control identifier
pub type ControlId = String;

/// Volume level (0-100)
pub type VolumeLevel = u8;

/// Playback state of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    #[default]
    Off,
    Playing,
    Paused,
    #[serde(alias = "idle")]
    Stopped,
}

/// Device metadata reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub address: String,
}

/// Value type of a configuration entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigEntryType {
    Boolean,
    String,
    Int,
    Float,
}

/// A selectable value of a configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigValueOption {
    pub text: String,
    pub value: String,
}

/// Configuration schema entry exposed for a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub entry_type: ConfigEntryType,
    #[serde(default)]
    pub description_key: Option<String>,

    /// Allowed values, empty when free-form
    #[serde(default)]
    pub values: Vec<ConfigValueOption>,

    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
}

/// Player state as last reported by its provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlayer {
    pub player_id: PlayerId,
    pub provider_id: ProviderId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub powered: bool,
    #[serde(default)]
    pub volume_level: VolumeLevel,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub state: PlayerState,

    /// Elapsed time of the current item in seconds
    #[serde(default)]
    pub elapsed_time: u64,
    #[serde(default)]
    pub current_uri: Option<String>,
    #[serde(default)]
    pub is_group_player: bool,

    /// Ordered member ids, only meaningful for group players
    #[serde(default)]
    pub group_children: Vec<PlayerId>,

    /// Capability tags declared by the provider, passed through untouched
    #[serde(default)]
    pub features: Vec<String>,

    /// Provider cannot push updates and must be polled
    #[serde(default)]
    pub should_poll: bool,
    #[serde(default)]
    pub config_entries: Vec<ConfigEntry>,
    #[serde(default)]
    pub device_info: DeviceInfo,
}

impl RawPlayer {
    /// Create an available, powered-off player record
    pub fn new(player_id: impl Into<PlayerId>, provider_id: impl Into<ProviderId>) -> Self {
        let player_id = player_id.into();
        Self {
            name: player_id.clone(),
            player_id,
            provider_id: provider_id.into(),
            available: true,
            ..Default::default()
        }
    }
}

/// Calculated, provider-agnostic state of a player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivePlayer {
    pub player_id: PlayerId,
    pub provider_id: ProviderId,
    pub name: String,
    pub available: bool,
    pub powered: bool,
    pub volume_level: VolumeLevel,
    pub muted: bool,
    pub state: PlayerState,
    pub elapsed_time: u64,
    pub current_uri: Option<String>,
    pub is_group_player: bool,
    pub group_children: Vec<PlayerId>,
    pub features: Vec<String>,
    pub should_poll: bool,
    pub device_info: DeviceInfo,

    /// Provider entries followed by the synthesized control selectors
    pub config_entries: Vec<ConfigEntry>,

    /// Player whose queue this player currently follows
    pub active_queue: PlayerId,
    pub cur_queue_item_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of an externally registered control
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Power,
    Volume,
}

/// Current value of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ControlState {
    Power(bool),
    Volume(VolumeLevel),
}

impl ControlState {
    /// Get the control type this value belongs to
    pub fn control_type(&self) -> ControlType {
        match self {
            ControlState::Power(_) => ControlType::Power,
            ControlState::Volume(_) => ControlType::Volume,
        }
    }
}

/// Externally registered power or volume overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    pub name: String,
    pub state: ControlState,
}

impl Control {
    /// Create a new control
    pub fn new(id: impl Into<ControlId>, name: impl Into<String>, state: ControlState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state,
        }
    }

    /// Get the control type
    pub fn control_type(&self) -> ControlType {
        self.state.control_type()
    }

    /// Get the power state, if this is a power control
    pub fn power(&self) -> Option<bool> {
        match self.state {
            ControlState::Power(on) => Some(on),
            ControlState::Volume(_) => None,
        }
    }

    /// Get the volume level, if this is a volume control
    pub fn volume(&self) -> Option<VolumeLevel> {
        match self.state {
            ControlState::Volume(level) => Some(level),
            ControlState::Power(_) => None,
        }
    }
}

/// Kind of a media catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Artist,
    Album,
    Track,
    Playlist,
    Radio,
}

/// Reference to an item in the media catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub item_id: String,
    pub provider: String,
    pub name: String,
    pub media_type: MediaType,

    /// Extra provider metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl MediaItem {
    /// Create a media item without extra metadata
    pub fn new(
        item_id: impl Into<String>,
        provider: impl Into<String>,
        name: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            provider: provider.into(),
            name: name.into(),
            media_type,
            metadata: BTreeMap::new(),
        }
    }
}

/// A track placed in a player queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub queue_item_id: String,
    pub uri: String,
    pub item: MediaItem,
}

/// How `play_media` inserts new items into the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOption {
    /// Insert at the current position and start playing
    #[default]
    Play,
    /// Replace the queue contents
    Replace,
    /// Play after the current item
    Next,
    /// Append to the end of the queue
    Add,
}

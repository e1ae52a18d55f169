use crate::error::Result;
use crate::types::{ControlId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Config key of the synthesized power control selector
pub const CONF_POWER_CONTROL: &str = "power_control";

/// Config key of the synthesized volume control selector
pub const CONF_VOLUME_CONTROL: &str = "volume_control";

/// Settings of the player hub itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Period of the poll tick in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of ticks between full polls of idle players
    #[serde(default = "default_poll_ticks")]
    pub poll_ticks: u32,

    /// Item count above which Play/Next replace the queue instead of inserting
    #[serde(default = "default_replace_threshold")]
    pub replace_threshold: usize,

    /// Base URL used to build queue item stream URIs
    #[serde(default = "default_stream_base_url")]
    pub stream_base_url: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_ticks() -> u32 {
    10
}

fn default_replace_threshold() -> usize {
    10
}

fn default_stream_base_url() -> String {
    "http://localhost:8095".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_ticks: default_poll_ticks(),
            replace_threshold: default_replace_threshold(),
            stream_base_url: default_stream_base_url(),
        }
    }
}

impl HubConfig {
    /// Parse hub settings from JSON, missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Get the poll tick period, at least one millisecond
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Configuration of a single player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Display name override
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub power_control: Option<ControlId>,

    #[serde(default)]
    pub volume_control: Option<ControlId>,

    #[serde(default = "default_enabled")]
    pub volume_normalisation: bool,

    /// Target loudness in LUFS
    #[serde(default = "default_target_volume")]
    pub target_volume: i32,

    /// Gain correction used when a track's loudness is unknown
    #[serde(default = "default_fallback_gain_correct")]
    pub fallback_gain_correct: i32,
}

fn default_enabled() -> bool {
    true
}

fn default_target_volume() -> i32 {
    -23
}

fn default_fallback_gain_correct() -> i32 {
    -12
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            name: None,
            power_control: None,
            volume_control: None,
            volume_normalisation: default_enabled(),
            target_volume: default_target_volume(),
            fallback_gain_correct: default_fallback_gain_correct(),
        }
    }
}

impl PlayerConfig {
    /// Whether this player uses the given control as power or volume overlay
    pub fn references_control(&self, control_id: &str) -> bool {
        self.power_control.as_deref() == Some(control_id)
            || self.volume_control.as_deref() == Some(control_id)
    }
}

/// Read-only access to per-player configuration
pub trait ConfigStore: Send + Sync {
    /// Get the configuration of a player, defaults when nothing is stored
    fn player_config(&self, player_id: &str) -> PlayerConfig;
}

/// In-memory configuration store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    players: RwLock<BTreeMap<PlayerId, PlayerConfig>>,
}

impl MemoryConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load player configurations from a JSON object keyed by player id
    pub fn from_json(json: &str) -> Result<Self> {
        let players: BTreeMap<PlayerId, PlayerConfig> = serde_json::from_str(json)?;
        Ok(Self {
            players: RwLock::new(players),
        })
    }

    /// Store the configuration of a player
    pub fn set(&self, player_id: impl Into<PlayerId>, config: PlayerConfig) {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player_id.into(), config);
    }
}

impl ConfigStore for MemoryConfigStore {
    fn player_config(&self, player_id: &str) -> PlayerConfig {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player_id)
            .cloned()
            .unwrap_or_default()
    }
}

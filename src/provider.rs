use crate::error::Result;
use crate::types::{RawPlayer, VolumeLevel};
use async_trait::async_trait;

/// A provider able to command one family of playback devices
///
/// Implementations report state by calling
/// [`PlayerManager::update_player`](crate::PlayerManager::update_player) and
/// return [`HubError::Provider`](crate::HubError::Provider) when a device
/// command fails.
#[async_trait]
pub trait PlayerProvider: Send + Sync {
    /// Unique provider id, matched against `RawPlayer::provider_id`
    fn id(&self) -> &str;

    /// Stop playback
    async fn cmd_stop(&self, player_id: &str) -> Result<()>;

    /// Start or unpause playback
    async fn cmd_play(&self, player_id: &str) -> Result<()>;

    /// Pause playback
    async fn cmd_pause(&self, player_id: &str) -> Result<()>;

    /// Power the device on
    async fn cmd_power_on(&self, player_id: &str) -> Result<()>;

    /// Power the device off
    async fn cmd_power_off(&self, player_id: &str) -> Result<()>;

    /// Set the device volume (0-100)
    async fn cmd_volume_set(&self, player_id: &str, volume_level: VolumeLevel) -> Result<()>;

    /// Set the device mute state
    async fn cmd_volume_mute(&self, player_id: &str, muted: bool) -> Result<()>;

    /// Fetch fresh state for a polled player
    ///
    /// Returning `None` means the provider has no new snapshot and the last
    /// reported record is reconciled again.
    async fn poll_player(&self, _player_id: &str) -> Result<Option<RawPlayer>> {
        Ok(None)
    }
}

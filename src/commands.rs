use crate::error::Result;
use crate::jobs::Job;
use crate::manager::{CommandTarget, PlayerManager};
use crate::types::{
    Control, ControlState, MediaItem, MediaType, PlayerId, PlayerState, QueueItem, QueueOption,
    VolumeLevel,
};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use std::collections::HashSet;
use uuid::Uuid;

impl PlayerManager {
    /// Play media items on a player
    ///
    /// Artists, albums and playlists are expanded into their tracks. Play and
    /// Next replace the whole queue when more items than the configured
    /// threshold are added.
    pub async fn play_media(
        &self,
        player_id: &str,
        media_items: &[MediaItem],
        option: QueueOption,
    ) -> Result<()> {
        if self.lookup(player_id).is_none() {
            return Ok(());
        }

        let mut queue_items = Vec::new();
        for media_item in media_items {
            let catalog = self.catalog();
            let (item_id, provider) = (media_item.item_id.as_str(), media_item.provider.as_str());
            let mut tracks = match media_item.media_type {
                MediaType::Artist => catalog.artist_top_tracks(item_id, provider),
                MediaType::Album => catalog.album_tracks(item_id, provider),
                MediaType::Playlist => catalog.playlist_tracks(item_id, provider),
                MediaType::Track | MediaType::Radio => {
                    futures_util::stream::iter([Ok(media_item.clone())]).boxed()
                }
            };
            while let Some(track) = tracks.next().await {
                queue_items.push(self.queue_item(player_id, track?));
            }
        }
        tracing::debug!(
            "Playing {} items on {} ({:?})",
            queue_items.len(),
            player_id,
            option
        );

        self.cmd_power_on(player_id).await?;
        let Some(queue) = self.get_queue(player_id) else {
            return Ok(());
        };
        let replace = queue_items.len() > self.settings().replace_threshold;
        match option {
            QueueOption::Replace => queue.load(queue_items).await,
            QueueOption::Play | QueueOption::Next if replace => queue.load(queue_items).await,
            QueueOption::Play => queue.insert(queue_items, 0).await,
            QueueOption::Next => queue.insert(queue_items, 1).await,
            QueueOption::Add => queue.append(queue_items).await,
        }
    }

    fn queue_item(&self, player_id: &str, item: MediaItem) -> QueueItem {
        let queue_item_id = Uuid::new_v4().to_string();
        QueueItem {
            uri: format!(
                "{}/stream/{}/{}",
                self.settings().stream_base_url,
                player_id,
                queue_item_id
            ),
            queue_item_id,
            item,
        }
    }

    /// Stop playback
    pub async fn cmd_stop(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        target.provider.cmd_stop(player_id).await
    }

    /// Power on, then unpause when paused or resume the player's own queue
    pub async fn cmd_play(&self, player_id: &str) -> Result<()> {
        if self.lookup(player_id).is_none() {
            return Ok(());
        }
        self.cmd_power_on(player_id).await?;
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        if target.player.state == PlayerState::Paused {
            return target.provider.cmd_play(player_id).await;
        }
        match self.own_queue(player_id) {
            Some(queue) => queue.resume().await,
            None => Ok(()),
        }
    }

    /// Pause playback
    pub async fn cmd_pause(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        target.provider.cmd_pause(player_id).await
    }

    /// Pause when playing, play otherwise
    pub async fn cmd_play_pause(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        if target.player.state == PlayerState::Playing {
            self.cmd_pause(player_id).await
        } else {
            self.cmd_play(player_id).await
        }
    }

    /// Skip to the next item of the queue the player follows
    pub async fn cmd_next(&self, player_id: &str) -> Result<()> {
        match self.get_queue(player_id) {
            Some(queue) => queue.next().await,
            None => {
                tracing::warn!("Player not found: {}", player_id);
                Ok(())
            }
        }
    }

    /// Go back to the previous item of the queue the player follows
    pub async fn cmd_previous(&self, player_id: &str) -> Result<()> {
        match self.get_queue(player_id) {
            Some(queue) => queue.previous().await,
            None => {
                tracing::warn!("Player not found: {}", player_id);
                Ok(())
            }
        }
    }

    /// Power on a player and its power control
    pub async fn cmd_power_on(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        target.provider.cmd_power_on(player_id).await?;
        self.set_power_control(&target, true);
        Ok(())
    }

    /// Power off a player and its power control
    ///
    /// Members of a group player are powered off as well, depth first.
    pub async fn cmd_power_off(&self, player_id: &str) -> Result<()> {
        let mut visited = HashSet::new();
        self.power_off_cascade(player_id.to_string(), &mut visited)
            .await
    }

    fn power_off_cascade<'a>(
        &'a self,
        player_id: PlayerId,
        visited: &'a mut HashSet<PlayerId>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if !visited.insert(player_id.clone()) {
                return Ok(());
            }
            let Some(target) = self.lookup(&player_id) else {
                return Ok(());
            };
            target.provider.cmd_power_off(&player_id).await?;
            self.set_power_control(&target, false);

            if target.player.is_group_player {
                for child_id in &target.player.group_children {
                    if self.get_player(child_id).is_some() {
                        self.power_off_cascade(child_id.clone(), visited).await?;
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Toggle power based on the effective powered state
    pub async fn cmd_power_toggle(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        if target.player.powered {
            self.cmd_power_off(player_id).await
        } else {
            self.cmd_power_on(player_id).await
        }
    }

    /// Set the volume of a player (clamped to 0-100)
    ///
    /// Ignored while the player is not powered. A configured volume control
    /// takes the level and the device is set to full volume. Group players
    /// scale the volume of their active members relative to the group level.
    pub async fn cmd_volume_set(&self, player_id: &str, volume_level: i32) -> Result<()> {
        let mut visited = HashSet::new();
        self.volume_set_cascade(player_id.to_string(), volume_level, &mut visited)
            .await
    }

    fn volume_set_cascade<'a>(
        &'a self,
        player_id: PlayerId,
        volume_level: i32,
        visited: &'a mut HashSet<PlayerId>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if !visited.insert(player_id.clone()) {
                return Ok(());
            }
            let Some(target) = self.lookup(&player_id) else {
                return Ok(());
            };
            if !target.player.powered {
                tracing::debug!("Ignoring volume command for powered off {}", player_id);
                return Ok(());
            }
            let volume_level = volume_level.clamp(0, 100) as VolumeLevel;

            if let Some(control) = self.overlay_control(target.config.volume_control.as_deref()) {
                self.dispatch(Job::SetControlState {
                    control_id: control.id,
                    state: ControlState::Volume(volume_level),
                });
                // The control owns the volume, keep the device itself at full volume
                target.provider.cmd_volume_set(&player_id, 100).await?;
            } else if target.player.is_group_player {
                let group_level = target.player.volume_level;
                for child_id in &target.player.group_children {
                    let Some(child) = self.get_player(child_id) else {
                        continue;
                    };
                    if child.available && child.powered {
                        let child_level =
                            scaled_child_volume(group_level, volume_level, child.volume_level);
                        self.volume_set_cascade(child_id.clone(), child_level, visited)
                            .await?;
                    }
                }
            } else {
                target
                    .provider
                    .cmd_volume_set(&player_id, volume_level)
                    .await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Raise the volume by one step
    pub async fn cmd_volume_up(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        let level = (i32::from(target.player.volume_level) + 1).min(100);
        self.cmd_volume_set(player_id, level).await
    }

    /// Lower the volume by one step
    pub async fn cmd_volume_down(&self, player_id: &str) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        let level = (i32::from(target.player.volume_level) - 1).max(0);
        self.cmd_volume_set(player_id, level).await
    }

    /// Mute or unmute the device
    pub async fn cmd_volume_mute(&self, player_id: &str, muted: bool) -> Result<()> {
        let Some(target) = self.lookup(player_id) else {
            return Ok(());
        };
        target.provider.cmd_volume_mute(player_id, muted).await
    }

    /// Gain correction in dB for playing a track on a player
    ///
    /// Returns 0 when volume normalisation is disabled for the player and
    /// the configured fallback when the track loudness was never measured.
    pub async fn gain_correct(
        &self,
        player_id: &str,
        item_id: &str,
        provider: &str,
    ) -> Result<f64> {
        let config = self.player_config(player_id);
        if !config.volume_normalisation {
            return Ok(0.0);
        }
        let loudness = self.catalog().track_loudness(item_id, provider).await?;
        let gain = match loudness {
            Some(loudness) => f64::from(config.target_volume) - loudness,
            None => f64::from(config.fallback_gain_correct),
        };
        let gain = (gain * 100.0).round() / 100.0;
        tracing::debug!(
            "Loudness level for track {}/{} is {:?} - calculated replayGain is {}",
            provider,
            item_id,
            loudness,
            gain
        );
        Ok(gain)
    }

    fn lookup(&self, player_id: &str) -> Option<CommandTarget> {
        match self.command_target(player_id) {
            Ok(target) => Some(target),
            Err(e) => {
                tracing::warn!("Ignoring command for {}: {}", player_id, e);
                None
            }
        }
    }

    fn overlay_control(&self, control_id: Option<&str>) -> Option<Control> {
        self.get_control(control_id?)
    }

    fn set_power_control(&self, target: &CommandTarget, powered: bool) {
        if let Some(control) = self.overlay_control(target.config.power_control.as_deref()) {
            self.dispatch(Job::SetControlState {
                control_id: control.id,
                state: ControlState::Power(powered),
            });
        }
    }
}

/// Volume a group member gets when the group moves from `group_level` to `new_level`
///
/// Members keep their relative balance. A silent group scales by
/// `1 + new_level / 100` instead. Fractions are truncated and the result is
/// not clamped.
fn scaled_child_volume(
    group_level: VolumeLevel,
    new_level: VolumeLevel,
    child_level: VolumeLevel,
) -> i32 {
    let (group_level, new_level) = (f64::from(group_level), f64::from(new_level));
    let child_level = f64::from(child_level);
    let target = if group_level == 0.0 {
        child_level * (1.0 + new_level / 100.0)
    } else {
        child_level + child_level * ((new_level - group_level) / group_level)
    };
    target.trunc() as i32
}

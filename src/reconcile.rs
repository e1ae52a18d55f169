use crate::config::PlayerConfig;
use crate::types::{
    ConfigEntry, Control, EffectivePlayer, PlayerId, PlayerState, RawPlayer, VolumeLevel,
};
use chrono::Utc;

/// Everything the reconciler reads for one player
pub(crate) struct ReconcileInput<'a> {
    pub raw: &'a RawPlayer,
    pub prior: Option<&'a EffectivePlayer>,
    pub config: &'a PlayerConfig,
    pub power_control: Option<&'a Control>,
    pub volume_control: Option<&'a Control>,

    /// Effective records of the registered group members
    pub children: Vec<&'a EffectivePlayer>,
    pub active_queue: PlayerId,

    /// Effective record of the active queue owner when it is another player
    pub queue_owner: Option<&'a EffectivePlayer>,
    pub cur_queue_item_id: Option<String>,
    pub control_entries: &'a [ConfigEntry],
}

/// Calculate the effective record of a player
///
/// Everything it needs is resolved by the registry beforehand, so running it
/// twice on the same input yields the same record.
pub(crate) fn reconcile(input: ReconcileInput<'_>) -> EffectivePlayer {
    let raw = input.raw;
    let available = raw.available && input.config.enabled;
    let powered = available
        && input
            .power_control
            .and_then(Control::power)
            .unwrap_or(raw.powered);

    let volume_level = if !available {
        0
    } else if let Some(level) = input.volume_control.and_then(Control::volume) {
        level
    } else if raw.is_group_player {
        group_volume(&input.children)
    } else {
        raw.volume_level
    };

    let owner = input
        .queue_owner
        .filter(|owner| owner.player_id == input.active_queue && owner.player_id != raw.player_id);
    let (elapsed_time, current_uri) = match owner {
        Some(owner) => (owner.elapsed_time, owner.current_uri.clone()),
        None => (raw.elapsed_time, raw.current_uri.clone()),
    };
    let state = if !powered {
        PlayerState::Off
    } else {
        owner.map_or(raw.state, |owner| owner.state)
    };

    let name = input
        .config
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| raw.name.clone());

    let mut config_entries = raw.config_entries.clone();
    config_entries.extend_from_slice(input.control_entries);

    EffectivePlayer {
        player_id: raw.player_id.clone(),
        provider_id: raw.provider_id.clone(),
        name,
        available,
        powered,
        volume_level,
        muted: raw.muted,
        state,
        elapsed_time,
        current_uri,
        is_group_player: raw.is_group_player,
        group_children: raw.group_children.clone(),
        features: raw.features.clone(),
        should_poll: raw.should_poll,
        device_info: raw.device_info.clone(),
        config_entries,
        active_queue: input.active_queue,
        cur_queue_item_id: input.cur_queue_item_id,
        updated_at: input.prior.map_or_else(Utc::now, |prior| prior.updated_at),
    }
}

/// Mean volume of the available and powered members, 0 without any
fn group_volume(children: &[&EffectivePlayer]) -> VolumeLevel {
    let active: Vec<u32> = children
        .iter()
        .filter(|child| child.available && child.powered)
        .map(|child| u32::from(child.volume_level))
        .collect();
    if active.is_empty() {
        return 0;
    }
    let mean = f64::from(active.iter().sum::<u32>()) / active.len() as f64;
    mean.round().clamp(0.0, 100.0) as VolumeLevel
}

/// Fields of the effective record a change notification can be about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PlayerField {
    Name,
    Available,
    Powered,
    VolumeLevel,
    Muted,
    State,
    ElapsedTime,
    CurrentUri,
    IsGroupPlayer,
    GroupChildren,
    Features,
    ShouldPoll,
    DeviceInfo,
    ConfigEntries,
    ActiveQueue,
    CurQueueItemId,
}

/// Fields that differ between two snapshots of the same player
pub(crate) fn changed_fields(prior: &EffectivePlayer, next: &EffectivePlayer) -> Vec<PlayerField> {
    let checks = [
        (PlayerField::Name, prior.name != next.name),
        (PlayerField::Available, prior.available != next.available),
        (PlayerField::Powered, prior.powered != next.powered),
        (PlayerField::VolumeLevel, prior.volume_level != next.volume_level),
        (PlayerField::Muted, prior.muted != next.muted),
        (PlayerField::State, prior.state != next.state),
        (PlayerField::ElapsedTime, prior.elapsed_time != next.elapsed_time),
        (PlayerField::CurrentUri, prior.current_uri != next.current_uri),
        (PlayerField::IsGroupPlayer, prior.is_group_player != next.is_group_player),
        (PlayerField::GroupChildren, prior.group_children != next.group_children),
        (PlayerField::Features, prior.features != next.features),
        (PlayerField::ShouldPoll, prior.should_poll != next.should_poll),
        (PlayerField::DeviceInfo, prior.device_info != next.device_info),
        (PlayerField::ConfigEntries, prior.config_entries != next.config_entries),
        (PlayerField::ActiveQueue, prior.active_queue != next.active_queue),
        (PlayerField::CurQueueItemId, prior.cur_queue_item_id != next.cur_queue_item_id),
    ];
    checks
        .into_iter()
        .filter_map(|(field, changed)| changed.then_some(field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfigEntryType, ControlState};

    fn input<'a>(raw: &'a RawPlayer, config: &'a PlayerConfig) -> ReconcileInput<'a> {
        ReconcileInput {
            raw,
            prior: None,
            config,
            power_control: None,
            volume_control: None,
            children: Vec::new(),
            active_queue: raw.player_id.clone(),
            queue_owner: None,
            cur_queue_item_id: None,
            control_entries: &[],
        }
    }

    fn speaker(id: &str, powered: bool, volume: VolumeLevel) -> RawPlayer {
        RawPlayer {
            powered,
            volume_level: volume,
            state: PlayerState::Playing,
            ..RawPlayer::new(id, "test")
        }
    }

    fn effective(raw: &RawPlayer) -> EffectivePlayer {
        let config = PlayerConfig::default();
        reconcile(input(raw, &config))
    }

    #[test]
    fn reconciling_twice_is_idempotent() {
        let raw = speaker("den", true, 35);
        let config = PlayerConfig::default();
        let entries = vec![ConfigEntry {
            key: "power_control".into(),
            entry_type: ConfigEntryType::String,
            description_key: None,
            values: vec![],
            default_value: None,
        }];

        let first = reconcile(ReconcileInput {
            control_entries: &entries,
            ..input(&raw, &config)
        });
        let second = reconcile(ReconcileInput {
            prior: Some(&first),
            control_entries: &entries,
            ..input(&raw, &config)
        });
        assert_eq!(first, second);
        assert!(changed_fields(&first, &second).is_empty());
    }

    #[test]
    fn disabled_player_is_unavailable_and_off() {
        let raw = speaker("den", true, 35);
        let config = PlayerConfig {
            enabled: false,
            ..Default::default()
        };
        let player = reconcile(input(&raw, &config));
        assert!(!player.available);
        assert!(!player.powered);
        assert_eq!(player.volume_level, 0);
        assert_eq!(player.state, PlayerState::Off);
    }

    #[test]
    fn controls_override_power_and_volume() {
        let raw = speaker("den", false, 35);
        let config = PlayerConfig::default();
        let plug = Control::new("plug", "Plug", ControlState::Power(true));
        let amp = Control::new("amp", "Amp", ControlState::Volume(62));

        let player = reconcile(ReconcileInput {
            power_control: Some(&plug),
            volume_control: Some(&amp),
            ..input(&raw, &config)
        });
        assert!(player.powered);
        assert_eq!(player.volume_level, 62);
        assert_eq!(player.state, PlayerState::Playing);
    }

    #[test]
    fn mismatched_control_falls_back_to_device() {
        let raw = speaker("den", true, 35);
        let config = PlayerConfig::default();
        let amp = Control::new("amp", "Amp", ControlState::Volume(62));

        let player = reconcile(ReconcileInput {
            power_control: Some(&amp),
            ..input(&raw, &config)
        });
        assert!(player.powered);
        assert_eq!(player.volume_level, 35);
    }

    #[test]
    fn group_volume_averages_active_children_only() {
        let config = PlayerConfig::default();
        let group = RawPlayer {
            is_group_player: true,
            group_children: vec!["a".into(), "b".into(), "c".into()],
            ..speaker("group", true, 99)
        };
        let a = effective(&speaker("a", true, 20));
        let b = effective(&speaker("b", true, 40));
        let c = effective(&speaker("c", false, 0));
        let gone = effective(&RawPlayer {
            available: false,
            ..speaker("d", true, 90)
        });

        let player = reconcile(ReconcileInput {
            children: vec![&a, &b, &c, &gone],
            ..input(&group, &config)
        });
        assert_eq!(player.volume_level, 30);

        let player = reconcile(ReconcileInput {
            children: vec![&c, &gone],
            ..input(&group, &config)
        });
        assert_eq!(player.volume_level, 0);
    }

    #[test]
    fn child_mirrors_active_queue_owner() {
        let config = PlayerConfig::default();
        let owner = effective(&RawPlayer {
            elapsed_time: 42,
            current_uri: Some("http://hub/stream/group/1".into()),
            state: PlayerState::Paused,
            ..speaker("group", true, 50)
        });
        let raw = RawPlayer {
            elapsed_time: 3,
            current_uri: Some("local".into()),
            ..speaker("kid", true, 20)
        };

        let player = reconcile(ReconcileInput {
            active_queue: "group".into(),
            queue_owner: Some(&owner),
            cur_queue_item_id: Some("item-7".into()),
            ..input(&raw, &config)
        });
        assert_eq!(player.active_queue, "group");
        assert_eq!(player.elapsed_time, 42);
        assert_eq!(player.current_uri.as_deref(), Some("http://hub/stream/group/1"));
        assert_eq!(player.state, PlayerState::Paused);
        assert_eq!(player.cur_queue_item_id.as_deref(), Some("item-7"));
        assert_eq!(player.volume_level, 20);
    }

    #[test]
    fn unpowered_child_is_off_even_when_following_a_group() {
        let config = PlayerConfig::default();
        let owner = effective(&speaker("group", true, 50));
        let raw = speaker("kid", false, 20);

        let player = reconcile(ReconcileInput {
            active_queue: "group".into(),
            queue_owner: Some(&owner),
            ..input(&raw, &config)
        });
        assert_eq!(player.state, PlayerState::Off);
    }

    #[test]
    fn name_override_and_entries_are_merged() {
        let mut raw = speaker("den", true, 10);
        raw.name = "Provider Name".into();
        raw.config_entries.push(ConfigEntry {
            key: "crossfade".into(),
            entry_type: ConfigEntryType::Boolean,
            description_key: None,
            values: vec![],
            default_value: Some(serde_json::json!(false)),
        });
        let synthesized = vec![ConfigEntry {
            key: "volume_control".into(),
            entry_type: ConfigEntryType::String,
            description_key: None,
            values: vec![],
            default_value: None,
        }];
        let config = PlayerConfig {
            name: Some("Den".into()),
            ..Default::default()
        };

        let player = reconcile(ReconcileInput {
            control_entries: &synthesized,
            ..input(&raw, &config)
        });
        assert_eq!(player.name, "Den");
        let keys: Vec<_> = player.config_entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["crossfade", "volume_control"]);
    }

    #[test]
    fn changed_fields_reports_each_difference() {
        let before = effective(&speaker("den", true, 10));
        let mut after = before.clone();
        after.elapsed_time = 12;
        after.state = PlayerState::Paused;
        assert_eq!(
            changed_fields(&before, &after),
            vec![PlayerField::State, PlayerField::ElapsedTime]
        );
    }
}

use crate::reconcile::PlayerField;
use crate::types::EffectivePlayer;

/// Follow-ups the registry performs after storing a reconciled record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChangeOutcome {
    /// Refresh `updated_at`
    pub touch: bool,
    /// Publish `PlayerChanged`
    pub emit_changed: bool,
    /// Reconcile the available members of this group
    pub cascade_children: bool,
    /// Ask the player's own queue to refresh its state
    pub refresh_queue: bool,
}

impl ChangeOutcome {
    /// Outcome for a player seen for the first time
    pub fn added(player: &EffectivePlayer, has_queue: bool) -> Self {
        Self {
            touch: false,
            emit_changed: false,
            cascade_children: player.is_group_player,
            refresh_queue: has_queue && player.active_queue == player.player_id,
        }
    }
}

/// Evaluate the changes of an existing player
pub(crate) fn evaluate(
    player: &EffectivePlayer,
    changes: &[PlayerField],
    has_queue: bool,
) -> ChangeOutcome {
    if changes.is_empty() {
        return ChangeOutcome::default();
    }
    // Unreachable players only report becoming reachable again
    if !player.available && !changes.contains(&PlayerField::Available) {
        return ChangeOutcome::default();
    }
    if changes.iter().all(|field| *field == PlayerField::ConfigEntries) {
        return ChangeOutcome::default();
    }
    let significant = changes
        .iter()
        .any(|field| !matches!(field, PlayerField::ElapsedTime | PlayerField::ConfigEntries));
    ChangeOutcome {
        touch: true,
        emit_changed: significant,
        cascade_children: significant && player.is_group_player,
        refresh_queue: has_queue && player.active_queue == player.player_id,
    }
}

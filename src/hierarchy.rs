use crate::types::PlayerId;
use std::collections::HashMap;

/// Group membership index
///
/// Keeps parent→children edges as reported by group players together with
/// the reverse children→parents index, ordered by the registration order of
/// the parents. Group players never have parents of their own.
#[derive(Debug, Default)]
pub(crate) struct GroupIndex {
    next_seq: u64,
    /// Registration sequence number per known player
    seq: HashMap<PlayerId, u64>,
    children: HashMap<PlayerId, Vec<PlayerId>>,
    parents: HashMap<PlayerId, Vec<PlayerId>>,
}

impl GroupIndex {
    /// Record a player's registration, returns whether it was new
    pub fn register(&mut self, player_id: &str) -> bool {
        if self.seq.contains_key(player_id) {
            return false;
        }
        self.seq.insert(player_id.to_string(), self.next_seq);
        self.next_seq += 1;
        true
    }

    /// Replace the member list of a player
    ///
    /// Non-group players and self references contribute no edges.
    pub fn set_children(&mut self, group_id: &str, is_group_player: bool, children: &[PlayerId]) {
        self.unlink(group_id);
        if !is_group_player {
            return;
        }
        let group_seq = self.seq_of(group_id);
        let mut members = Vec::with_capacity(children.len());
        for child in children {
            if child == group_id || members.contains(child) {
                continue;
            }
            members.push(child.clone());
            let parents = self.parents.entry(child.clone()).or_default();
            let pos = parents
                .iter()
                .position(|p| self.seq.get(p).copied().unwrap_or(u64::MAX) > group_seq)
                .unwrap_or(parents.len());
            parents.insert(pos, group_id.to_string());
        }
        self.children.insert(group_id.to_string(), members);
    }

    /// Forget a player and every edge it declared as group
    pub fn remove(&mut self, player_id: &str) {
        self.unlink(player_id);
        self.seq.remove(player_id);
    }

    /// Group players listing this player, in registration order
    pub fn parents_of(&self, player_id: &str, is_group_player: bool) -> &[PlayerId] {
        if is_group_player {
            return &[];
        }
        self.parents.get(player_id).map_or(&[], Vec::as_slice)
    }

    /// Members of a group player, without self references or duplicates
    pub fn children_of(&self, group_id: &str) -> &[PlayerId] {
        self.children.get(group_id).map_or(&[], Vec::as_slice)
    }

    /// Whether the player currently declares members
    pub fn is_group(&self, player_id: &str) -> bool {
        self.children.contains_key(player_id)
    }

    /// Registration sequence, used to list players in registration order
    pub fn seq_of(&self, player_id: &str) -> u64 {
        self.seq.get(player_id).copied().unwrap_or(u64::MAX)
    }

    fn unlink(&mut self, group_id: &str) {
        let Some(old_children) = self.children.remove(group_id) else {
            return;
        };
        for child in old_children {
            if let Some(parents) = self.parents.get_mut(&child) {
                parents.retain(|p| p != group_id);
                if parents.is_empty() {
                    self.parents.remove(&child);
                }
            }
        }
    }
}

/// Resolve whose queue a player follows: the first powered parent, else itself
pub(crate) fn active_queue_owner(
    player_id: &str,
    parents: &[PlayerId],
    is_powered: impl Fn(&str) -> bool,
) -> PlayerId {
    parents
        .iter()
        .find(|parent| is_powered(parent))
        .cloned()
        .unwrap_or_else(|| player_id.to_string())
}

use crate::config::{CONF_POWER_CONTROL, CONF_VOLUME_CONTROL};
use crate::error::{HubError, Result};
use crate::types::{
    ConfigEntry, ConfigEntryType, ConfigValueOption, Control, ControlId, ControlState, ControlType,
};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub(crate) struct ControlRegistry {
    controls: BTreeMap<ControlId, Control>,

    /// Selector entries offered to every player, rebuilt on registration
    config_entries: Vec<ConfigEntry>,
}

impl ControlRegistry {
    /// Store a control, replacing one with the same id
    pub fn register(&mut self, control: Control) {
        self.controls.insert(control.id.clone(), control);
        self.config_entries = [
            (ControlType::Power, CONF_POWER_CONTROL),
            (ControlType::Volume, CONF_VOLUME_CONTROL),
        ]
        .into_iter()
        .filter_map(|(control_type, key)| self.selector_entry(control_type, key))
        .collect();
    }

    /// Store a new control value
    ///
    /// Returns `false` when the control is unknown, the value is unchanged or
    /// the value does not fit the control type.
    pub fn update_state(&mut self, control_id: &str, state: ControlState) -> bool {
        let Some(control) = self.controls.get_mut(control_id) else {
            tracing::debug!("Ignoring update for unknown control {}", control_id);
            return false;
        };
        let state = match state {
            ControlState::Volume(level) => ControlState::Volume(level.min(100)),
            other => other,
        };
        if control.state == state {
            return false;
        }
        if control.control_type() != state.control_type() {
            tracing::warn!(
                "Ignoring {:?} value for {:?} control {}",
                state.control_type(),
                control.control_type(),
                control_id
            );
            return false;
        }
        tracing::info!("Control {} updated - new state: {:?}", control.name, state);
        control.state = state;
        true
    }

    pub fn get(&self, control_id: &str) -> Result<&Control> {
        self.controls
            .get(control_id)
            .ok_or_else(|| HubError::ControlNotFound(control_id.to_string()))
    }

    pub fn list(&self, filter: Option<ControlType>) -> Vec<Control> {
        self.controls
            .values()
            .filter(|control| filter.map_or(true, |t| control.control_type() == t))
            .cloned()
            .collect()
    }

    pub fn config_entries(&self) -> &[ConfigEntry] {
        &self.config_entries
    }

    fn selector_entry(&self, control_type: ControlType, key: &str) -> Option<ConfigEntry> {
        let values: Vec<ConfigValueOption> = self
            .controls
            .values()
            .filter(|control| control.control_type() == control_type)
            .map(|control| ConfigValueOption {
                text: control.name.clone(),
                value: control.id.clone(),
            })
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(ConfigEntry {
            key: key.to_string(),
            entry_type: ConfigEntryType::String,
            description_key: Some(key.to_string()),
            values,
            default_value: None,
        })
    }
}

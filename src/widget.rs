//! Read model for the end-user widget
//!
//! The widget never touches the document, storage or URL. It renders a
//! [`WidgetModel`] snapshot and reports user actions back through the
//! engine API.

use serde::Serialize;
use tracing::debug;

use crate::dom::Document;
use crate::engine::Engine;
use crate::types::{GroupId, TabId, ToggleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOption {
    pub id: ToggleId,
    pub checked: bool,
    /// Forced hidden through the visibility overlay
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabOption {
    pub id: TabId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupView {
    pub id: GroupId,
    pub label: String,
    pub selected: Option<TabId>,
    pub tabs: Vec<TabOption>,
}

/// Everything the widget needs to draw itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetModel {
    pub toggles: Vec<ToggleOption>,
    pub tab_groups: Vec<TabGroupView>,
    pub profiles: Vec<String>,
    pub active_profile: Option<String>,
    /// Predefined states of the active profile
    pub states: Vec<String>,
    pub share_url: Option<String>,
}

impl WidgetModel {
    pub fn from_engine<D: Document>(engine: &Engine<D>) -> Self {
        let Some(config) = engine.config() else {
            return Self::default();
        };
        let current = engine.current_state();
        let hidden = engine.hidden_toggles();

        let toggles = config
            .all_toggles
            .iter()
            .map(|id| ToggleOption {
                id: id.clone(),
                checked: current.has_toggle(id),
                hidden: hidden.contains(id),
            })
            .collect();

        let tab_groups = config
            .tab_groups
            .iter()
            .map(|group| TabGroupView {
                id: group.id.clone(),
                label: group.label.clone().unwrap_or_else(|| group.id.clone()),
                selected: current
                    .tabs
                    .get(&group.id)
                    .cloned()
                    .or_else(|| group.fallback_tab().map(str::to_string)),
                tabs: group
                    .tabs
                    .iter()
                    .map(|tab| TabOption {
                        id: tab.id.clone(),
                        label: tab.label.clone().unwrap_or_else(|| tab.id.clone()),
                    })
                    .collect(),
            })
            .collect();

        let active_profile = engine.active_profile().map(str::to_string);
        let states = active_profile
            .as_deref()
            .and_then(|id| config.profile(id))
            .map(|p| p.states.keys().cloned().collect())
            .unwrap_or_default();

        Self {
            toggles,
            tab_groups,
            profiles: config.profiles.keys().cloned().collect(),
            active_profile,
            states,
            share_url: engine.shareable_url(),
        }
    }
}

/// Checkbox action: turn one toggle on or off, keeping the rest of the state
pub fn set_toggle_checked<D: Document>(engine: &mut Engine<D>, toggle_id: &str, checked: bool) {
    let mut state = engine.current_state();
    let changed = if checked {
        state.toggles.insert(toggle_id.to_string())
    } else {
        state.toggles.remove(toggle_id)
    };
    debug!(toggle = %toggle_id, checked = checked, changed = changed, "Widget toggle");
    if changed {
        engine.apply_state(&state);
    }
}

//! Value types shared across the crate

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of a toggle category (`"mac"`, `"linux"`, ...)
pub type ToggleId = String;

/// Identifier of a tab group container (`<cv-tabgroup id="...">`)
pub type GroupId = String;

/// Identifier of a tab panel within a group (`<cv-tab id="...">`)
pub type TabId = String;

/// A view state: which toggles are on and which tab each group shows.
///
/// States are plain values. `Clone` is the structural copy the engine takes
/// whenever a caller hands one in, so nothing the caller holds aliases engine
/// state afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub toggles: BTreeSet<ToggleId>,

    /// Groups absent from the map have no explicit selection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tabs: BTreeMap<GroupId, TabId>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with the given toggles on and no tab selections
    pub fn with_toggles<I, S>(toggles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            toggles: toggles.into_iter().map(Into::into).collect(),
            tabs: BTreeMap::new(),
        }
    }

    /// Builder-style tab selection
    pub fn with_tab(mut self, group: impl Into<String>, tab: impl Into<String>) -> Self {
        self.tabs.insert(group.into(), tab.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty() && self.tabs.is_empty()
    }

    pub fn has_toggle(&self, toggle: &str) -> bool {
        self.toggles.contains(toggle)
    }

    pub fn toggle_list(&self) -> Vec<ToggleId> {
        self.toggles.iter().cloned().collect()
    }
}

/// One tab inside a configured group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabConfig {
    pub id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A configured tab group, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabGroupConfig {
    pub id: GroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Tab used when neither the state nor the DOM picks one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TabId>,

    #[serde(default)]
    pub tabs: Vec<TabConfig>,
}

impl TabGroupConfig {
    pub fn has_tab(&self, tab: &str) -> bool {
        self.tabs.iter().any(|t| t.id == tab)
    }

    pub fn tab_label(&self, tab: &str) -> Option<&str> {
        self.tabs
            .iter()
            .find(|t| t.id == tab)
            .and_then(|t| t.label.as_deref())
    }

    /// Configured default, else the first listed tab
    pub fn fallback_tab(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.tabs.first().map(|t| t.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_without_empty_tabs() {
        let state = State::with_toggles(["windows"]);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"toggles":["windows"]}"#);
    }

    #[test]
    fn test_state_deserializes_missing_fields() {
        let state: State = serde_json::from_str("{}").unwrap();
        assert!(state.is_empty());

        let state: State = serde_json::from_str(r#"{"toggles":["a","a","b"]}"#).unwrap();
        assert_eq!(state.toggle_list(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = State::with_toggles(["mac"]).with_tab("os", "mac");
        let mut copy = original.clone();
        copy.toggles.insert("linux".into());
        copy.tabs.insert("os".into(), "linux".into());

        assert_eq!(original.toggle_list(), vec!["mac".to_string()]);
        assert_eq!(original.tabs.get("os").map(String::as_str), Some("mac"));
    }

    #[test]
    fn test_fallback_tab_prefers_default() {
        let group = TabGroupConfig {
            id: "os".into(),
            label: None,
            default: Some("b".into()),
            tabs: vec![
                TabConfig { id: "a".into(), label: None },
                TabConfig { id: "b".into(), label: Some("Bee".into()) },
            ],
        };
        assert_eq!(group.fallback_tab(), Some("b"));
        assert_eq!(group.tab_label("b"), Some("Bee"));

        let group = TabGroupConfig { default: None, ..group };
        assert_eq!(group.fallback_tab(), Some("a"));
    }
}

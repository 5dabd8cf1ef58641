//! Site configuration
//!
//! The authoritative description of a site's customizable surface. Loaded once
//! when the engine is built and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use super::profile::Profile;
use crate::error::{Error, Result};
use crate::types::{State, TabGroupConfig, ToggleId};

/// Top-level configuration payload (camelCase JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Every toggle the widget should offer
    pub all_toggles: Vec<ToggleId>,

    /// Shown when neither the URL nor storage provides a state
    pub default_state: State,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tab_groups: Vec<TabGroupConfig>,

    /// Whether tab selections are written into the shareable URL token
    #[serde(default = "default_true")]
    pub include_tabs_in_url: bool,

    /// Whether the current state is mirrored into the address bar
    #[serde(default = "default_true")]
    pub show_url: bool,

    /// Optional profile indirection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// Prefix for relative asset paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Location of the asset catalog, relative to `base_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_json_path: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Configuration {
    /// Configuration with the given toggle catalog and default state
    pub fn new(all_toggles: Vec<ToggleId>, default_state: State) -> Self {
        Self {
            all_toggles,
            default_state,
            tab_groups: Vec::new(),
            include_tabs_in_url: true,
            show_url: true,
            profiles: BTreeMap::new(),
            default_profile: None,
            base_url: None,
            assets_json_path: None,
        }
    }

    /// Empty catalog, empty default state. Used when loading failed but the
    /// host allows running in default-state-only mode.
    pub fn minimal() -> Self {
        Self::new(Vec::new(), State::default())
    }

    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        let mut config: Configuration =
            serde_json::from_str(json).map_err(|source| Error::ConfigParse {
                origin: origin.to_string(),
                source,
            })?;
        config.validate()?;
        info!(
            origin = %origin,
            toggles = config.all_toggles.len(),
            tab_groups = config.tab_groups.len(),
            profiles = config.profiles.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn with_tab_groups(mut self, tab_groups: Vec<TabGroupConfig>) -> Self {
        self.tab_groups = tab_groups;
        self
    }

    pub fn tab_group(&self, group_id: &str) -> Option<&TabGroupConfig> {
        self.tab_groups.iter().find(|g| g.id == group_id)
    }

    pub fn profile(&self, profile_id: &str) -> Option<&Profile> {
        self.profiles.get(profile_id)
    }

    pub fn uses_profiles(&self) -> bool {
        !self.profiles.is_empty()
    }

    /// Profile active at startup: the configured one, else the first by id
    pub fn initial_profile(&self) -> Option<&str> {
        self.default_profile
            .as_deref()
            .filter(|id| self.profiles.contains_key(*id))
            .or_else(|| self.profiles.keys().next().map(String::as_str))
    }

    /// Default state for the given profile, falling back to `default_state`
    pub fn default_state_for(&self, profile_id: Option<&str>) -> &State {
        profile_id
            .and_then(|id| self.profiles.get(id))
            .and_then(Profile::default_state)
            .unwrap_or(&self.default_state)
    }

    /// Check cross references and repair what can be repaired.
    ///
    /// Unknown toggles and unknown tab defaults only warn (the DOM may carry
    /// more than the catalog lists); broken profile references are fatal
    /// because the engine could not pick a default state.
    pub fn validate(&mut self) -> Result<()> {
        let known: BTreeSet<&str> = self.all_toggles.iter().map(String::as_str).collect();
        for toggle in &self.default_state.toggles {
            if !known.contains(toggle.as_str()) {
                warn!(toggle = %toggle, "defaultState references a toggle missing from allToggles");
            }
        }

        let mut seen_groups = BTreeSet::new();
        for group in &mut self.tab_groups {
            if !seen_groups.insert(group.id.clone()) {
                warn!(group = %group.id, "Duplicate tab group id, only the first is used");
            }
            if let Some(default) = group.default.as_deref()
                && !group.tabs.is_empty()
                && !group.has_tab(default)
            {
                warn!(group = %group.id, default = %default, "Tab group default is not one of its tabs, ignoring");
                group.default = None;
            }
        }

        for (group, tab) in &self.default_state.tabs {
            if let Some(cfg) = self.tab_groups.iter().find(|g| &g.id == group)
                && !cfg.tabs.is_empty()
                && !cfg.has_tab(tab)
            {
                warn!(group = %group, tab = %tab, "defaultState selects an unknown tab");
            }
        }

        for (id, profile) in &self.profiles {
            if profile.default_state().is_none() {
                return Err(Error::InvalidConfig(format!(
                    "profile '{id}' defaults to unknown state '{}'",
                    profile.default_state
                )));
            }
        }

        if let Some(id) = self.default_profile.as_deref()
            && !self.profiles.contains_key(id)
        {
            return Err(Error::InvalidConfig(format!("defaultProfile '{id}' is not defined")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TabConfig;

    const SITE_JSON: &str = r#"{
        "allToggles": ["mac", "linux", "windows"],
        "defaultState": { "toggles": ["mac"], "tabs": { "fruit": "apple" } },
        "tabGroups": [
            {
                "id": "fruit",
                "label": "Fruit",
                "default": "pear",
                "tabs": [{ "id": "apple", "label": "Apple" }, { "id": "pear" }]
            }
        ]
    }"#;

    #[test]
    fn test_parse_site_config() {
        let config = Configuration::from_json(SITE_JSON, "inline").unwrap();
        assert_eq!(config.all_toggles.len(), 3);
        assert!(config.default_state.has_toggle("mac"));
        assert_eq!(config.default_state.tabs.get("fruit").map(String::as_str), Some("apple"));
        assert!(config.show_url);
        assert!(config.include_tabs_in_url);
        assert_eq!(config.tab_group("fruit").unwrap().default.as_deref(), Some("pear"));
        assert!(!config.uses_profiles());
    }

    #[test]
    fn test_missing_default_state_is_parse_error() {
        let err = Configuration::from_json(r#"{"allToggles": []}"#, "inline").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_drops_unknown_tab_default() {
        let mut config = Configuration::minimal().with_tab_groups(vec![TabGroupConfig {
            id: "os".into(),
            label: None,
            default: Some("beos".into()),
            tabs: vec![TabConfig { id: "mac".into(), label: None }],
        }]);
        config.validate().unwrap();
        assert_eq!(config.tab_group("os").unwrap().default, None);
    }

    #[test]
    fn test_validate_rejects_broken_profile() {
        let json = r#"{
            "allToggles": [],
            "defaultState": { "toggles": [] },
            "profiles": { "student": { "states": {}, "defaultState": "nope" } }
        }"#;
        let err = Configuration::from_json(json, "inline").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_default_profile() {
        let json = r#"{
            "allToggles": [],
            "defaultState": { "toggles": [] },
            "defaultProfile": "ghost"
        }"#;
        let err = Configuration::from_json(json, "inline").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_default_state_for_profile() {
        let json = r#"{
            "allToggles": ["mac", "linux"],
            "defaultState": { "toggles": ["mac"] },
            "profiles": {
                "b-ops": { "states": { "l": { "toggles": ["linux"] } }, "defaultState": "l" },
                "a-dev": { "states": { "m": { "toggles": ["mac"] } }, "defaultState": "m" }
            },
            "defaultProfile": "b-ops"
        }"#;
        let config = Configuration::from_json(json, "inline").unwrap();
        assert_eq!(config.initial_profile(), Some("b-ops"));
        assert_eq!(config.default_state_for(Some("b-ops")), &State::with_toggles(["linux"]));
        assert_eq!(config.default_state_for(Some("missing")), &State::with_toggles(["mac"]));
        assert_eq!(config.default_state_for(None), &State::with_toggles(["mac"]));
    }

    #[test]
    fn test_initial_profile_falls_back_to_first() {
        let mut config = Configuration::minimal();
        config.profiles.insert(
            "zeta".into(),
            Profile {
                description: String::new(),
                allowed_toggles: None,
                states: BTreeMap::from([("s".to_string(), State::default())]),
                default_state: "s".into(),
            },
        );
        assert_eq!(config.initial_profile(), Some("zeta"));
    }
}

//! Profile indirection
//!
//! A profile is a named scope over the site's toggles: it restricts which
//! toggles a reader may turn on and carries a set of predefined states, one of
//! which is shown by default. Sites without profiles never touch this module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{State, ToggleId};

/// A named set of predefined states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub description: String,

    /// Toggles visible to readers of this profile; `None` allows all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_toggles: Option<Vec<ToggleId>>,

    /// Predefined states keyed by state id
    pub states: BTreeMap<String, State>,

    /// Id of the state shown when this profile becomes active
    pub default_state: String,
}

impl Profile {
    /// Look up a predefined state by id
    pub fn state(&self, state_id: &str) -> Option<&State> {
        self.states.get(state_id)
    }

    /// The profile's default state, if its id resolves
    pub fn default_state(&self) -> Option<&State> {
        self.states.get(&self.default_state)
    }

    pub fn allows(&self, toggle: &str) -> bool {
        self.allowed_toggles
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|t| t == toggle))
    }

    /// Drop toggles this profile does not allow
    pub fn restrict(&self, state: &State) -> State {
        let mut restricted = state.clone();
        restricted.toggles.retain(|t| {
            let keep = self.allows(t);
            if !keep {
                debug!(toggle = %t, "Dropping toggle not allowed by profile");
            }
            keep
        });
        restricted
    }
}

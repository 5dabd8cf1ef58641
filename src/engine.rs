//! State resolution engine
//!
//! Owns the view state for one document. On load and on every history
//! navigation it picks the authoritative state (URL token, then persisted
//! state, then the configured default), paints it, and keeps storage and the
//! URL in step.
//!
//! Every mutation funnels through [`Engine::apply_state`]:
//! copy → paint (overlay-filtered) → persist → sync URL → notify.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::appliers::{
    apply_tab_selections, apply_toggles, apply_visibility_only, build_navs, discover_toggles,
    dispatch_nav_click, update_nav_active_state,
};
use crate::assets::AssetStore;
use crate::codec::{History, MemoryHistory, UrlSync};
use crate::config::{Configuration, Profile};
use crate::dom::Document;
use crate::listeners::{Listener, ListenerId, Listeners};
use crate::persistence::{KeyValueStorage, MemoryStorage, PersistenceStore};
use crate::styles::inject_styles;
use crate::types::{GroupId, State, TabGroupConfig, TabId, ToggleId};
use crate::visibility::{VisibilityChange, VisibilityOverlay};

/// Which source won resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    Url,
    Persisted,
    Default,
}

impl fmt::Display for StateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSource::Url => write!(f, "url"),
            StateSource::Persisted => write!(f, "persisted"),
            StateSource::Default => write!(f, "default"),
        }
    }
}

pub struct Engine<D: Document> {
    config: Option<Configuration>,
    assets: AssetStore,
    persistence: PersistenceStore,
    overlay: VisibilityOverlay,
    url: UrlSync,
    doc: D,
    root: D::Node,
    listeners: Listeners<State>,
    /// Unfiltered copy of what was last painted
    last_applied: Option<State>,
    active_profile: Option<String>,
    initialized: bool,
    history_listener_installed: bool,
}

fn groups_of(config: &Option<Configuration>) -> &[TabGroupConfig] {
    config
        .as_ref()
        .map(|c| c.tab_groups.as_slice())
        .unwrap_or_default()
}

impl<D: Document> Engine<D> {
    /// Engine over `doc`'s body with in-memory storage and history.
    /// Hosts swap those out with the `with_*` builders.
    pub fn new(doc: D, config: Option<Configuration>) -> Self {
        let root = doc.body();
        let include_tabs = config.as_ref().is_none_or(|c| c.include_tabs_in_url);
        let active_profile = config
            .as_ref()
            .and_then(Configuration::initial_profile)
            .map(str::to_string);

        Self {
            config,
            assets: AssetStore::empty(),
            persistence: PersistenceStore::new(Box::new(MemoryStorage::new())),
            overlay: VisibilityOverlay::new(),
            url: UrlSync::new(Box::new(MemoryHistory::default()), include_tabs),
            doc,
            root,
            listeners: Listeners::new(),
            last_applied: None,
            active_profile,
            initialized: false,
            history_listener_installed: false,
        }
    }

    pub fn with_storage(mut self, storage: Box<dyn KeyValueStorage>) -> Self {
        self.persistence = PersistenceStore::new(storage);
        self
    }

    pub fn with_history(mut self, history: Box<dyn History>) -> Self {
        let include_tabs = self.config.as_ref().is_none_or(|c| c.include_tabs_in_url);
        self.url = UrlSync::new(history, include_tabs);
        self
    }

    pub fn with_assets(mut self, assets: AssetStore) -> Self {
        self.assets = assets;
        self
    }

    /// Limit painting to the subtree under `root`
    pub fn with_root(mut self, root: D::Node) -> Self {
        self.root = root;
        self
    }

    /// Inject styles and build tab navigation (first call only), then resolve.
    /// Returns `None` when there is no configuration to work with.
    pub fn init(&mut self) -> Option<StateSource> {
        if !self.initialized {
            let injected = inject_styles(&mut self.doc);
            build_navs(&mut self.doc, &self.root, groups_of(&self.config));
            self.history_listener_installed = true;
            self.initialized = true;
            info!(styles = injected, "Initialized view engine");
        }
        self.resolve()
    }

    /// URL token, else persisted state, else the default. No merging.
    pub fn resolve(&mut self) -> Option<StateSource> {
        if self.config.is_none() {
            warn!("No configuration loaded, customization disabled");
            return None;
        }

        let source = if let Some(state) = self.url.state_from_url() {
            self.apply_state(&state);
            StateSource::Url
        } else if let Some(state) = self.persistence.load() {
            self.apply_state(&state);
            StateSource::Persisted
        } else {
            let default = self.default_state();
            self.render_state(&default);
            StateSource::Default
        };
        info!(source = %source, "Resolved view state");
        Some(source)
    }

    /// Back/forward navigation: the URL may carry a different token now
    pub fn handle_history_navigation(&mut self) -> Option<StateSource> {
        debug!(url = %self.url.current_url(), "History navigation");
        self.resolve()
    }

    /// The single write path: paint, persist, sync the URL, notify
    pub fn apply_state(&mut self, state: &State) {
        let state = self.restrict(state);
        let filtered = self.overlay.filter_state_for_persistence(&state);

        self.paint(&filtered);
        self.persistence.persist(Some(&filtered));
        if self.show_url() {
            self.url.write(&filtered);
        } else {
            self.url.clear();
        }
        self.last_applied = Some(state);
        self.notify();
    }

    /// Paint and notify without persisting or touching the URL
    pub fn render_state(&mut self, state: &State) {
        let state = self.restrict(state);
        let filtered = self.overlay.filter_state_for_persistence(&state);
        self.paint(&filtered);
        self.last_applied = Some(state);
        self.notify();
    }

    pub fn current_active_toggles(&self) -> Vec<ToggleId> {
        self.current_state().toggle_list()
    }

    pub fn current_active_tabs(&self) -> BTreeMap<GroupId, TabId> {
        self.current_state().tabs
    }

    /// Last applied state, else the default
    pub fn current_state(&self) -> State {
        self.last_applied.clone().unwrap_or_else(|| self.default_state())
    }

    /// Select `tab_id` in `group_id`, keeping everything else.
    /// Unknown groups or tabs of a configured catalog are ignored.
    pub fn set_active_tab(&mut self, group_id: &str, tab_id: &str) -> bool {
        let groups = groups_of(&self.config);
        if !groups.is_empty() {
            match groups.iter().find(|g| g.id == group_id) {
                None => {
                    warn!(group = %group_id, "Unknown tab group");
                    return false;
                }
                Some(group) if !group.tabs.is_empty() && !group.has_tab(tab_id) => {
                    warn!(group = %group_id, tab = %tab_id, "Unknown tab");
                    return false;
                }
                Some(_) => {}
            }
        }

        let mut state = self.current_state();
        state.tabs.insert(group_id.to_string(), tab_id.to_string());
        self.apply_state(&state);
        update_nav_active_state(&mut self.doc, &self.root, group_id, tab_id);
        true
    }

    /// Forget persisted and shared state and show the default
    pub fn reset_to_default(&mut self) {
        info!("Resetting to default view");
        self.erase_traces();
    }

    pub fn clear_persistence(&mut self) {
        info!("Clearing persisted view");
        self.erase_traces();
    }

    fn erase_traces(&mut self) {
        self.persistence.clear();
        self.url.clear();
        if self.config.is_none() {
            warn!("No configuration loaded, cannot render default state");
            return;
        }
        let default = self.default_state();
        self.render_state(&default);
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile.as_deref()
    }

    /// Activate a profile and apply its default state
    pub fn switch_profile(&mut self, profile_id: &str) -> bool {
        let Some(profile) = self.config.as_ref().and_then(|c| c.profile(profile_id)) else {
            warn!(profile = %profile_id, "Unknown profile");
            return false;
        };
        let Some(default) = profile.default_state().cloned() else {
            warn!(profile = %profile_id, "Profile has no usable default state");
            return false;
        };
        info!(profile = %profile_id, "Switching profile");
        self.active_profile = Some(profile_id.to_string());
        self.apply_state(&default);
        true
    }

    /// Apply one of the active profile's predefined states
    pub fn select_state(&mut self, state_id: &str) -> bool {
        let Some(profile) = self.profile() else {
            warn!(state = %state_id, "No active profile to select a state from");
            return false;
        };
        let Some(state) = profile.state(state_id).cloned() else {
            warn!(profile = ?self.active_profile, state = %state_id, "Unknown state");
            return false;
        };
        self.apply_state(&state);
        true
    }

    /// Hide or show a toggle regardless of state; repaints on change
    pub fn set_toggle_visibility(&mut self, toggle_id: &str, visible: bool) -> bool {
        let changed = self.overlay.set_visible(toggle_id, visible);
        if changed {
            self.apply_visibility_to_dom();
        }
        changed
    }

    /// Hide every known toggle (catalog plus document)
    pub fn hide_all(&mut self) {
        let ids = self.known_toggles();
        self.overlay.hide_all(&ids);
        self.apply_visibility_to_dom();
    }

    pub fn show_all(&mut self) {
        let ids = self.known_toggles();
        self.overlay.show_all(&ids);
        self.apply_visibility_to_dom();
    }

    /// Active toggles that are neither hidden nor absent from the document
    pub fn visible_toggles(&self) -> Vec<ToggleId> {
        let present = discover_toggles(&self.doc, &self.root);
        self.overlay
            .visible_toggles(&self.current_state().toggles, Some(&present))
    }

    pub fn hidden_toggles(&self) -> Vec<ToggleId> {
        self.overlay.hidden_ids()
    }

    pub fn filter_toggles_for_persistence<I, S>(&self, ids: I) -> Vec<ToggleId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.overlay.filter_visible(ids)
    }

    /// Repaint toggle visibility from the current state and overlay.
    /// No asset rendering, no persistence, no URL write.
    pub fn apply_visibility_to_dom(&mut self) {
        let state = self.overlay.filter_state_for_persistence(&self.current_state());
        apply_visibility_only(&mut self.doc, &self.root, &state.toggles);
    }

    pub fn on_visibility_change(&mut self, listener: Listener<VisibilityChange>) -> ListenerId {
        self.overlay.subscribe(listener)
    }

    pub fn remove_visibility_listener(&mut self, id: ListenerId) -> bool {
        self.overlay.unsubscribe(id)
    }

    pub fn add_state_change_listener(&mut self, listener: Listener<State>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Removing an unknown id is a no-op
    pub fn remove_state_change_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Route a click on `node`; returns whether it hit a tab nav item
    pub fn handle_nav_click(&mut self, node: &D::Node) -> bool {
        let mut selected = None;
        dispatch_nav_click(&self.doc, node, |group, tab| {
            selected = Some((group.to_string(), tab.to_string()));
        });
        match selected {
            Some((group, tab)) => {
                self.set_active_tab(&group, &tab);
                true
            }
            None => false,
        }
    }

    /// Current URL carrying the current (overlay-filtered) state
    pub fn shareable_url(&self) -> Option<String> {
        let state = self.overlay.filter_state_for_persistence(&self.current_state());
        self.url.shareable_url(&state)
    }

    pub fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    pub fn tab_groups(&self) -> &[TabGroupConfig] {
        groups_of(&self.config)
    }

    pub fn has_configuration(&self) -> bool {
        self.config.is_some()
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetStore {
        &mut self.assets
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn root(&self) -> &D::Node {
        &self.root
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether the host should route back/forward events to
    /// [`handle_history_navigation`](Self::handle_history_navigation)
    pub fn history_listener_installed(&self) -> bool {
        self.history_listener_installed
    }

    fn show_url(&self) -> bool {
        self.config.as_ref().is_none_or(|c| c.show_url)
    }

    fn default_state(&self) -> State {
        self.config
            .as_ref()
            .map(|c| c.default_state_for(self.active_profile.as_deref()).clone())
            .unwrap_or_default()
    }

    fn profile(&self) -> Option<&Profile> {
        let id = self.active_profile.as_deref()?;
        self.config.as_ref()?.profile(id)
    }

    fn restrict(&self, state: &State) -> State {
        match self.profile() {
            Some(profile) => profile.restrict(state),
            None => state.clone(),
        }
    }

    fn known_toggles(&self) -> BTreeSet<ToggleId> {
        let mut ids = discover_toggles(&self.doc, &self.root);
        if let Some(config) = &self.config {
            ids.extend(config.all_toggles.iter().cloned());
        }
        ids
    }

    fn paint(&mut self, state: &State) {
        apply_toggles(&mut self.doc, &self.root, &state.toggles, Some(&self.assets));
        apply_tab_selections(&mut self.doc, &self.root, &state.tabs, groups_of(&self.config));
    }

    fn notify(&mut self) {
        if let Some(state) = &self.last_applied {
            self.listeners.emit(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode, token_from_url};
    use crate::constants::presentation::{HIDDEN_CLASS, VISIBLE_CLASS};
    use crate::constants::storage::STATE_KEY;
    use crate::constants::tabs::NAV_TAB_ATTR;
    use crate::dom::{NodeId, Tree};
    use crate::persistence::UnavailableStorage;
    use crate::types::TabConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Harness {
        engine: Engine<Tree>,
        storage: MemoryStorage,
        history: Rc<RefCell<MemoryHistory>>,
        mac: NodeId,
        linux: NodeId,
        windows: NodeId,
        tab_a: NodeId,
        tab_b: NodeId,
    }

    fn os_config() -> Configuration {
        Configuration::new(
            vec!["mac".into(), "linux".into(), "windows".into()],
            State::with_toggles(["mac"]),
        )
        .with_tab_groups(vec![TabGroupConfig {
            id: "os".into(),
            label: None,
            default: Some("b".into()),
            tabs: vec![
                TabConfig { id: "a".into(), label: None },
                TabConfig { id: "b".into(), label: None },
            ],
        }])
    }

    fn harness_with(config: Option<Configuration>, url: &str, storage: MemoryStorage) -> Harness {
        let mut tree = Tree::new();
        let body = tree.body();
        let mac = tree.element(body, "div", &[("data-cv-toggle", "mac")]);
        let linux = tree.element(body, "div", &[("data-cv-toggle", "linux")]);
        let windows = tree.element(body, "div", &[("data-customviews-toggle", "windows")]);
        let group = tree.element(body, "cv-tabgroup", &[("id", "os")]);
        let tab_a = tree.element(group, "cv-tab", &[("id", "a")]);
        let tab_b = tree.element(group, "cv-tab", &[("id", "b")]);

        let history = Rc::new(RefCell::new(MemoryHistory::new(url)));
        let engine = Engine::new(tree, config)
            .with_storage(Box::new(storage.clone()))
            .with_history(Box::new(history.clone()));
        Harness { engine, storage, history, mac, linux, windows, tab_a, tab_b }
    }

    fn harness() -> Harness {
        harness_with(Some(os_config()), "http://localhost/docs/", MemoryStorage::new())
    }

    impl Harness {
        fn visible(&self, node: NodeId) -> bool {
            let doc = self.engine.document();
            doc.has_class(&node, VISIBLE_CLASS) && !doc.has_class(&node, HIDDEN_CLASS)
        }

        fn url_state(&self) -> Option<State> {
            token_from_url(&self.history.borrow().current_url()).and_then(|t| decode(&t))
        }

        fn persisted(&self) -> Option<State> {
            self.storage
                .raw(STATE_KEY)
                .map(|raw| serde_json::from_str(&raw).unwrap())
        }
    }

    fn url_with(state: &State) -> String {
        format!("http://localhost/docs/?view={}", encode(state, true).unwrap())
    }

    #[test]
    fn test_default_then_apply_scenario() {
        let mut h = harness();
        assert_eq!(h.engine.init(), Some(StateSource::Default));
        assert!(h.visible(h.mac));
        assert!(!h.visible(h.linux));
        assert!(!h.visible(h.windows));
        // Default rendering leaves no traces
        assert_eq!(h.persisted(), None);
        assert_eq!(h.url_state(), None);

        h.engine.apply_state(&State::with_toggles(["windows"]));
        assert!(h.visible(h.windows));
        assert!(!h.visible(h.mac));
        assert!(!h.visible(h.linux));
        assert_eq!(h.url_state(), Some(State::with_toggles(["windows"])));
        assert_eq!(h.storage.raw(STATE_KEY).as_deref(), Some(r#"{"toggles":["windows"]}"#));
    }

    #[test]
    fn test_url_beats_persisted() {
        let storage = MemoryStorage::new();
        PersistenceStore::new(Box::new(storage.clone())).persist(Some(&State::with_toggles(["linux"])));
        let url = url_with(&State::with_toggles(["windows"]));
        let mut h = harness_with(Some(os_config()), &url, storage);

        assert_eq!(h.engine.init(), Some(StateSource::Url));
        assert!(h.visible(h.windows));
        assert!(!h.visible(h.linux));
        // The URL state is now the persisted one too
        assert_eq!(h.persisted(), Some(State::with_toggles(["windows"])));
    }

    #[test]
    fn test_persisted_beats_default() {
        let storage = MemoryStorage::new();
        PersistenceStore::new(Box::new(storage.clone())).persist(Some(&State::with_toggles(["linux"])));
        let mut h = harness_with(Some(os_config()), "http://localhost/docs/", storage);

        assert_eq!(h.engine.init(), Some(StateSource::Persisted));
        assert!(h.visible(h.linux));
        assert!(!h.visible(h.mac));
        assert_eq!(h.url_state(), Some(State::with_toggles(["linux"])));
    }

    #[test]
    fn test_undecodable_token_falls_through() {
        let mut h = harness_with(
            Some(os_config()),
            "http://localhost/docs/?view=%%%garbage",
            MemoryStorage::new(),
        );
        assert_eq!(h.engine.init(), Some(StateSource::Default));
        assert!(h.visible(h.mac));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut h = harness();
        h.engine.init();
        let state = State::with_toggles(["mac", "linux"]).with_tab("os", "a");

        h.engine.apply_state(&state);
        let html = h.engine.document().to_html(h.engine.document().root());
        let blob = h.storage.raw(STATE_KEY);
        let url = h.history.borrow().current_url();

        h.engine.apply_state(&state);
        assert_eq!(h.engine.document().to_html(h.engine.document().root()), html);
        assert_eq!(h.storage.raw(STATE_KEY), blob);
        assert_eq!(h.history.borrow().current_url(), url);
        assert_eq!(h.history.borrow().replacements(), 1);
    }

    #[test]
    fn test_apply_twice_before_init_is_idempotent() {
        let mut h = harness();
        let state = State::with_toggles(["mac"]);

        h.engine.apply_state(&state);
        let html = h.engine.document().to_html(h.engine.document().root());
        h.engine.apply_state(&state);
        assert_eq!(h.engine.document().to_html(h.engine.document().root()), html);

        h.engine.apply_state(&State::with_toggles(["mac", "linux"]));
        assert!(h.visible(h.linux));
        let doc = h.engine.document();
        assert!(!doc.has_attribute(&h.linux, "tabindex"));
        assert!(!doc.has_attribute(&h.linux, "data-cv-orig-tabindex"));
        assert!(!doc.has_attribute(&h.linux, "aria-hidden"));
    }

    #[test]
    fn test_overlay_intersection() {
        let mut h = harness();
        h.engine.init();
        assert!(h.engine.set_toggle_visibility("linux", false));

        h.engine.apply_state(&State::with_toggles(["mac", "linux"]));
        assert!(h.visible(h.mac));
        assert!(!h.visible(h.linux));
        assert_eq!(h.persisted(), Some(State::with_toggles(["mac"])));
        assert_eq!(h.url_state(), Some(State::with_toggles(["mac"])));
        assert!(!h.engine.shareable_url().unwrap().contains(&encode(&State::with_toggles(["mac", "linux"]), true).unwrap()));
        assert_eq!(h.engine.hidden_toggles(), vec!["linux".to_string()]);
        assert_eq!(h.engine.visible_toggles(), vec!["mac".to_string()]);

        // Showing it again repaints from the applied state
        assert!(h.engine.set_toggle_visibility("linux", true));
        assert!(h.visible(h.linux));
    }

    #[test]
    fn test_hide_all_and_show_all() {
        let mut h = harness();
        h.engine.init();
        h.engine.hide_all();
        assert!(!h.visible(h.mac));
        assert_eq!(h.engine.hidden_toggles().len(), 3);
        assert_eq!(
            h.engine.filter_toggles_for_persistence(["mac", "other"]),
            vec!["other".to_string()]
        );

        h.engine.show_all();
        assert!(h.visible(h.mac));
        assert!(h.engine.hidden_toggles().is_empty());
    }

    #[test]
    fn test_tab_precedence_and_selection() {
        let mut h = harness();
        h.engine.init();
        // Configured default "b"
        assert!(h.visible(h.tab_b));
        assert!(!h.visible(h.tab_a));

        assert!(h.engine.set_active_tab("os", "a"));
        assert!(h.visible(h.tab_a));
        assert!(!h.visible(h.tab_b));
        // Toggles are carried over
        assert!(h.visible(h.mac));
        assert_eq!(
            h.engine.current_active_tabs(),
            BTreeMap::from([("os".to_string(), "a".to_string())])
        );
        assert_eq!(h.persisted(), Some(State::with_toggles(["mac"]).with_tab("os", "a")));

        assert!(!h.engine.set_active_tab("lang", "py"));
        assert!(!h.engine.set_active_tab("os", "c"));
        assert!(h.visible(h.tab_a));
    }

    #[test]
    fn test_nav_click_selects_tab() {
        let mut h = harness();
        h.engine.init();
        let button = h.engine.document().find_by_attribute(NAV_TAB_ATTR, "a")[0];
        assert!(h.engine.handle_nav_click(&button));
        assert!(h.visible(h.tab_a));
        assert!(!h.engine.handle_nav_click(&h.mac));
    }

    #[test]
    fn test_reset_scenario() {
        let mut h = harness();
        h.engine.init();
        h.engine.apply_state(&State::with_toggles(["linux", "windows"]).with_tab("os", "a"));
        assert!(h.persisted().is_some());

        h.engine.reset_to_default();
        assert_eq!(h.persisted(), None);
        assert_eq!(h.url_state(), None);
        assert_eq!(h.history.borrow().current_url(), "http://localhost/docs/");
        assert!(h.visible(h.mac));
        assert!(!h.visible(h.linux));
        assert!(!h.visible(h.windows));
        assert!(h.visible(h.tab_b));
        assert_eq!(h.engine.current_active_toggles(), vec!["mac".to_string()]);
    }

    #[test]
    fn test_clear_persistence_matches_reset() {
        let mut h = harness();
        h.engine.init();
        h.engine.apply_state(&State::with_toggles(["linux"]));
        h.engine.clear_persistence();
        assert_eq!(h.persisted(), None);
        assert_eq!(h.url_state(), None);
        assert!(h.visible(h.mac));
    }

    #[test]
    fn test_history_navigation() {
        let mut h = harness();
        h.engine.init();
        h.engine.apply_state(&State::with_toggles(["windows"]));

        h.history.borrow_mut().navigate(url_with(&State::with_toggles(["linux"])));
        assert_eq!(h.engine.handle_history_navigation(), Some(StateSource::Url));
        assert!(h.visible(h.linux));

        h.history.borrow_mut().navigate("http://localhost/docs/");
        assert_eq!(h.engine.handle_history_navigation(), Some(StateSource::Persisted));
        assert!(h.visible(h.linux));
    }

    #[test]
    fn test_listeners_run_in_order_and_survive_failures() {
        let mut h = harness();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = seen.clone();
        let id = h.engine.add_state_change_listener(Box::new(move |state| {
            first.borrow_mut().push(format!("first:{}", state.toggle_list().join(",")));
            Ok(())
        }));
        h.engine.add_state_change_listener(Box::new(|_| anyhow::bail!("widget exploded")));
        let second = seen.clone();
        h.engine.add_state_change_listener(Box::new(move |_| {
            second.borrow_mut().push("second".to_string());
            Ok(())
        }));

        h.engine.apply_state(&State::with_toggles(["linux"]));
        assert_eq!(*seen.borrow(), vec!["first:linux", "second"]);

        assert!(h.engine.remove_state_change_listener(id));
        assert!(!h.engine.remove_state_change_listener(id));
        h.engine.reset_to_default();
        assert_eq!(*seen.borrow(), vec!["first:linux", "second", "second"]);
    }

    #[test]
    fn test_returned_state_is_a_copy() {
        let mut h = harness();
        let mut input = State::with_toggles(["linux"]);
        h.engine.apply_state(&input);
        input.toggles.insert("windows".into());

        let mut toggles = h.engine.current_active_toggles();
        toggles.push("mac".into());
        assert_eq!(h.engine.current_active_toggles(), vec!["linux".to_string()]);
    }

    #[test]
    fn test_show_url_disabled_clears_stale_token() {
        let mut config = os_config();
        config.show_url = false;
        let url = format!(
            "http://localhost/docs/?x=1&view={}",
            encode(&State::with_toggles(["linux"]), true).unwrap()
        );
        let mut h = harness_with(Some(config), &url, MemoryStorage::new());

        assert_eq!(h.engine.init(), Some(StateSource::Url));
        assert!(h.visible(h.linux));
        assert_eq!(h.history.borrow().current_url(), "http://localhost/docs/?x=1");
        assert_eq!(h.persisted(), Some(State::with_toggles(["linux"])));
    }

    #[test]
    fn test_tabs_left_out_of_url_when_disabled() {
        let mut config = os_config();
        config.include_tabs_in_url = false;
        let mut h = harness_with(Some(config), "http://localhost/docs/", MemoryStorage::new());
        h.engine.init();
        h.engine.set_active_tab("os", "a");
        assert_eq!(h.url_state(), Some(State::with_toggles(["mac"])));
        assert_eq!(h.persisted(), Some(State::with_toggles(["mac"]).with_tab("os", "a")));
    }

    #[test]
    fn test_without_configuration() {
        let mut h = harness_with(None, "http://localhost/docs/", MemoryStorage::new());
        assert!(!h.engine.has_configuration());
        assert_eq!(h.engine.init(), None);
        assert!(h.engine.current_active_toggles().is_empty());
        assert!(h.engine.tab_groups().is_empty());
        h.engine.reset_to_default();
    }

    #[test]
    fn test_unavailable_storage_degrades() {
        let mut h = harness();
        h.engine = Engine::new(Tree::new(), Some(os_config())).with_storage(Box::new(UnavailableStorage));
        assert_eq!(h.engine.init(), Some(StateSource::Default));
        h.engine.apply_state(&State::with_toggles(["linux"]));
        assert_eq!(h.engine.resolve(), Some(StateSource::Url));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let mut h = harness();
        h.engine.init();
        h.engine.init();
        let doc = h.engine.document();
        assert_eq!(doc.children(&doc.head()).len(), 2);
        assert_eq!(doc.find_by_attribute(NAV_TAB_ATTR, "a").len(), 1);
        assert!(h.engine.history_listener_installed());
    }

    fn profile_config() -> Configuration {
        Configuration::from_json(
            r#"{
                "allToggles": ["mac", "linux", "windows"],
                "defaultState": {"toggles": ["windows"]},
                "profiles": {
                    "student": {
                        "allowedToggles": ["mac", "linux"],
                        "states": {
                            "mac-only": {"toggles": ["mac"]},
                            "everything": {"toggles": ["mac", "linux", "windows"]}
                        },
                        "defaultState": "mac-only"
                    },
                    "staff": {
                        "states": {"win": {"toggles": ["windows"]}},
                        "defaultState": "win"
                    }
                },
                "defaultProfile": "student"
            }"#,
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_profiles() {
        let mut h = harness_with(Some(profile_config()), "http://localhost/docs/", MemoryStorage::new());
        assert_eq!(h.engine.active_profile(), Some("student"));
        h.engine.init();
        assert!(h.visible(h.mac));
        assert!(!h.visible(h.windows));

        assert!(h.engine.select_state("everything"));
        assert!(h.visible(h.mac));
        assert!(h.visible(h.linux));
        assert!(!h.visible(h.windows));

        assert!(!h.engine.select_state("missing"));
        assert!(!h.engine.switch_profile("guest"));
        assert_eq!(h.engine.active_profile(), Some("student"));

        assert!(h.engine.switch_profile("staff"));
        assert!(h.visible(h.windows));
        assert!(!h.visible(h.mac));

        h.engine.reset_to_default();
        assert_eq!(h.engine.current_active_toggles(), vec!["windows".to_string()]);
    }
}

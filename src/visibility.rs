//! Visibility overlay
//!
//! A session-local set of toggles the widget forcibly hides, independent of
//! the state. The overlay never changes a [`State`]; it filters what gets
//! painted, persisted and shared.

use std::collections::BTreeSet;
use tracing::debug;

use crate::constants::presentation::{
    ARIA_HIDDEN, HIDDEN_CLASS, INERT, ORIG_TABINDEX, TABINDEX, VISIBLE_CLASS,
};
use crate::dom::Document;
use crate::listeners::{Listener, ListenerId, Listeners};
use crate::types::{State, ToggleId};

/// Emitted when a toggle's overlay visibility actually changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityChange {
    pub toggle_id: ToggleId,
    pub visible: bool,
}

#[derive(Default)]
pub struct VisibilityOverlay {
    hidden: BTreeSet<ToggleId>,
    listeners: Listeners<VisibilityChange>,
}

impl VisibilityOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a toggle visible or hidden. Returns true if anything changed.
    pub fn set_visible(&mut self, toggle_id: &str, visible: bool) -> bool {
        let changed = if visible {
            self.hidden.remove(toggle_id)
        } else {
            self.hidden.insert(toggle_id.to_string())
        };
        if changed {
            debug!(toggle = %toggle_id, visible = visible, "Overlay visibility changed");
            self.listeners.emit(&VisibilityChange {
                toggle_id: toggle_id.to_string(),
                visible,
            });
        }
        changed
    }

    pub fn hide_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.set_visible(id.as_ref(), false);
        }
    }

    pub fn show_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.set_visible(id.as_ref(), true);
        }
    }

    /// Set `visible` on every id matching `predicate`
    pub fn set_visibility_by_predicate<I, S, P>(&mut self, ids: I, predicate: P, visible: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: Fn(&str) -> bool,
    {
        for id in ids {
            let id = id.as_ref();
            if predicate(id) {
                self.set_visible(id, visible);
            }
        }
    }

    pub fn hidden_ids(&self) -> Vec<ToggleId> {
        self.hidden.iter().cloned().collect()
    }

    pub fn is_hidden(&self, toggle_id: &str) -> bool {
        self.hidden.contains(toggle_id)
    }

    /// Keep only ids the overlay does not hide, preserving order
    pub fn filter_visible<I, S>(&self, ids: I) -> Vec<ToggleId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter(|id| !self.is_hidden(id.as_ref()))
            .map(|id| id.as_ref().to_string())
            .collect()
    }

    /// State toggles minus hidden ones, optionally limited to those present in the DOM
    pub fn visible_toggles(
        &self,
        state_toggles: &BTreeSet<ToggleId>,
        present_in_dom: Option<&BTreeSet<ToggleId>>,
    ) -> Vec<ToggleId> {
        state_toggles
            .iter()
            .filter(|t| !self.is_hidden(t))
            .filter(|t| present_in_dom.is_none_or(|present| present.contains(*t)))
            .cloned()
            .collect()
    }

    /// Copy of `state` safe for storage and URLs: hidden toggles removed,
    /// tab selections kept as they are
    pub fn filter_state_for_persistence(&self, state: &State) -> State {
        State {
            toggles: state
                .toggles
                .iter()
                .filter(|t| !self.is_hidden(t))
                .cloned()
                .collect(),
            tabs: state.tabs.clone(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener<VisibilityChange>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

/// Show or hide one element, keeping assistive technology and keyboard
/// focus consistent with what is painted. Idempotent.
pub fn apply_element_visibility<D: Document>(doc: &mut D, el: &D::Node, visible: bool) {
    if visible {
        let was_hidden = doc.has_class(el, HIDDEN_CLASS);
        doc.remove_class(el, HIDDEN_CLASS);
        doc.add_class(el, VISIBLE_CLASS);
        doc.remove_attribute(el, ARIA_HIDDEN);
        doc.remove_attribute(el, INERT);
        if was_hidden {
            restore_focusability(doc, el);
        }
    } else {
        let was_hidden = doc.has_class(el, HIDDEN_CLASS);
        defocus_if_contains_active(doc, el);
        doc.add_class(el, HIDDEN_CLASS);
        doc.remove_class(el, VISIBLE_CLASS);
        doc.set_attribute(el, ARIA_HIDDEN, "true");
        doc.set_attribute(el, INERT, "");
        if !was_hidden {
            remove_focusability(doc, el);
        }
    }
}

/// Only call on the visible -> hidden transition; a later hide would take
/// our own `-1` for the author's value
fn remove_focusability<D: Document>(doc: &mut D, el: &D::Node) {
    if !doc.has_attribute(el, ORIG_TABINDEX)
        && let Some(original) = doc.attribute(el, TABINDEX)
    {
        doc.set_attribute(el, ORIG_TABINDEX, &original);
    }
    doc.set_attribute(el, TABINDEX, "-1");
}

fn restore_focusability<D: Document>(doc: &mut D, el: &D::Node) {
    match doc.attribute(el, ORIG_TABINDEX) {
        Some(original) => {
            doc.set_attribute(el, TABINDEX, &original);
            doc.remove_attribute(el, ORIG_TABINDEX);
        }
        None => doc.remove_attribute(el, TABINDEX),
    }
}

fn defocus_if_contains_active<D: Document>(doc: &mut D, el: &D::Node) {
    let Some(active) = doc.active_element() else {
        return;
    };
    if !doc.contains(el, &active) {
        return;
    }
    let body = doc.body();
    doc.focus(&body);
    if doc.active_element().as_ref() == Some(&active) {
        doc.blur(&active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Tree;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_set_visible_reports_changes() {
        let mut overlay = VisibilityOverlay::new();
        assert!(overlay.set_visible("mac", false));
        assert!(!overlay.set_visible("mac", false));
        assert!(overlay.is_hidden("mac"));
        assert!(overlay.set_visible("mac", true));
        assert!(!overlay.set_visible("mac", true));
        assert!(overlay.hidden_ids().is_empty());
    }

    #[test]
    fn test_events_only_on_change() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut overlay = VisibilityOverlay::new();
        let sink = events.clone();
        let id = overlay.subscribe(Box::new(move |change| {
            sink.borrow_mut().push(change.clone());
            Ok(())
        }));

        overlay.hide_all(["a", "b", "a"]);
        overlay.show_all(["b", "c"]);
        assert_eq!(
            *events.borrow(),
            vec![
                VisibilityChange { toggle_id: "a".into(), visible: false },
                VisibilityChange { toggle_id: "b".into(), visible: false },
                VisibilityChange { toggle_id: "b".into(), visible: true },
            ]
        );

        assert!(overlay.unsubscribe(id));
        overlay.show_all(["a"]);
        assert_eq!(events.borrow().len(), 3);
    }

    #[test]
    fn test_predicate_and_filters() {
        let mut overlay = VisibilityOverlay::new();
        let all = ["os-mac", "os-linux", "lang-py"];
        overlay.set_visibility_by_predicate(all, |t| t.starts_with("os-"), false);
        assert_eq!(overlay.hidden_ids(), vec!["os-linux".to_string(), "os-mac".to_string()]);
        assert_eq!(overlay.filter_visible(all), vec!["lang-py".to_string()]);

        let state_toggles: BTreeSet<String> =
            ["os-mac", "lang-py", "lang-rs"].map(String::from).into();
        let present: BTreeSet<String> = ["lang-py"].map(String::from).into();
        assert_eq!(
            overlay.visible_toggles(&state_toggles, None),
            vec!["lang-py".to_string(), "lang-rs".to_string()]
        );
        assert_eq!(
            overlay.visible_toggles(&state_toggles, Some(&present)),
            vec!["lang-py".to_string()]
        );
    }

    #[test]
    fn test_filter_state_keeps_tabs() {
        let mut overlay = VisibilityOverlay::new();
        overlay.set_visible("mac", false);
        let state = State::with_toggles(["mac", "linux"]).with_tab("os", "mac");
        let filtered = overlay.filter_state_for_persistence(&state);
        assert_eq!(filtered, State::with_toggles(["linux"]).with_tab("os", "mac"));
        // The input is untouched
        assert!(state.has_toggle("mac"));
    }

    #[test]
    fn test_hide_and_show_element() {
        let mut tree = Tree::new();
        let body = tree.body();
        let el = tree.element(body, "div", &[("tabindex", "0")]);

        apply_element_visibility(&mut tree, &el, false);
        apply_element_visibility(&mut tree, &el, false);
        assert!(tree.has_class(&el, HIDDEN_CLASS));
        assert!(!tree.has_class(&el, VISIBLE_CLASS));
        assert_eq!(tree.attribute(&el, ARIA_HIDDEN).as_deref(), Some("true"));
        assert!(tree.has_attribute(&el, INERT));
        assert_eq!(tree.attribute(&el, TABINDEX).as_deref(), Some("-1"));
        assert_eq!(tree.attribute(&el, ORIG_TABINDEX).as_deref(), Some("0"));

        apply_element_visibility(&mut tree, &el, true);
        assert!(tree.has_class(&el, VISIBLE_CLASS));
        assert!(!tree.has_class(&el, HIDDEN_CLASS));
        assert!(!tree.has_attribute(&el, ARIA_HIDDEN));
        assert!(!tree.has_attribute(&el, INERT));
        assert_eq!(tree.attribute(&el, TABINDEX).as_deref(), Some("0"));
        assert!(!tree.has_attribute(&el, ORIG_TABINDEX));
    }

    #[test]
    fn test_show_without_original_tabindex_removes_it() {
        let mut tree = Tree::new();
        let body = tree.body();
        let el = tree.element(body, "div", &[]);
        apply_element_visibility(&mut tree, &el, false);
        apply_element_visibility(&mut tree, &el, true);
        assert!(!tree.has_attribute(&el, TABINDEX));
    }

    #[test]
    fn test_repeated_hide_restores_native_focusability() {
        let mut tree = Tree::new();
        let body = tree.body();
        let link = tree.element(body, "a", &[("href", "#x")]);

        apply_element_visibility(&mut tree, &link, false);
        let once = tree.to_html(link);
        apply_element_visibility(&mut tree, &link, false);
        assert_eq!(tree.to_html(link), once);
        assert!(!tree.has_attribute(&link, ORIG_TABINDEX));

        apply_element_visibility(&mut tree, &link, true);
        assert!(!tree.has_attribute(&link, TABINDEX));
        assert!(!tree.has_attribute(&link, ORIG_TABINDEX));
    }

    #[test]
    fn test_repeated_hide_keeps_author_tabindex() {
        let mut tree = Tree::new();
        let body = tree.body();
        let el = tree.element(body, "div", &[("tabindex", "3")]);

        apply_element_visibility(&mut tree, &el, false);
        apply_element_visibility(&mut tree, &el, false);
        apply_element_visibility(&mut tree, &el, true);
        assert_eq!(tree.attribute(&el, TABINDEX).as_deref(), Some("3"));
    }

    #[test]
    fn test_show_keeps_author_tabindex_on_never_hidden_element() {
        let mut tree = Tree::new();
        let body = tree.body();
        let el = tree.element(body, "div", &[("tabindex", "2")]);
        apply_element_visibility(&mut tree, &el, true);
        apply_element_visibility(&mut tree, &el, true);
        assert_eq!(tree.attribute(&el, TABINDEX).as_deref(), Some("2"));
    }

    #[test]
    fn test_hiding_moves_focus_out() {
        let mut tree = Tree::new();
        let body = tree.body();
        let section = tree.element(body, "section", &[]);
        let button = tree.element(section, "button", &[]);
        assert!(tree.focus(&button));

        apply_element_visibility(&mut tree, &section, false);
        assert_ne!(tree.active_element(), Some(button));
    }

    #[test]
    fn test_hiding_unrelated_element_keeps_focus() {
        let mut tree = Tree::new();
        let body = tree.body();
        let section = tree.element(body, "section", &[]);
        let button = tree.element(body, "button", &[]);
        assert!(tree.focus(&button));

        apply_element_visibility(&mut tree, &section, false);
        assert_eq!(tree.active_element(), Some(button));
    }
}

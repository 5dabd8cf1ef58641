//! Tab groups
//!
//! `<cv-tabgroup id>` holds `<cv-tab id>` panels; exactly one panel per group
//! is visible. Groups asking for it get a generated row of nav buttons.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::constants::presentation::{HIDDEN_CLASS, VISIBLE_CLASS};
use crate::constants::tabs::{
    GROUP_TAG, HEADER_ATTR, NAV_ACTIVE_CLASS, NAV_ATTR, NAV_AUTO, NAV_CLASS, NAV_GROUP_ATTR,
    NAV_ITEM_CLASS, NAV_ITEM_TAG, NAV_TAB_ATTR, TAB_TAG,
};
use crate::dom::Document;
use crate::types::{GroupId, TabGroupConfig, TabId};

/// Show the selected panel of every group under `root` and hide its siblings
pub fn apply_tab_selections<D: Document>(
    doc: &mut D,
    root: &D::Node,
    tabs: &BTreeMap<GroupId, TabId>,
    groups: &[TabGroupConfig],
) {
    for group_el in doc.elements_by_tag(root, GROUP_TAG) {
        let Some(group_id) = doc.attribute(&group_el, "id") else {
            continue;
        };
        let panels = panels(doc, &group_el);
        let active = resolve_active_tab(&group_id, tabs, groups, &panels);
        if active.is_none() {
            debug!(group = %group_id, "Tab group has no panels");
        }

        for (panel, tab_id) in &panels {
            let visible = active.as_deref() == Some(tab_id.as_str());
            if visible {
                doc.remove_class(panel, HIDDEN_CLASS);
                doc.add_class(panel, VISIBLE_CLASS);
            } else {
                doc.add_class(panel, HIDDEN_CLASS);
                doc.remove_class(panel, VISIBLE_CLASS);
            }
        }
        if let Some(active) = &active {
            set_nav_active(doc, &group_el, active);
        }
    }
}

/// Selected tab: state, then configured default, then first configured tab,
/// then first panel in the document
fn resolve_active_tab<N>(
    group_id: &str,
    tabs: &BTreeMap<GroupId, TabId>,
    groups: &[TabGroupConfig],
    panels: &[(N, TabId)],
) -> Option<TabId> {
    if let Some(selected) = tabs.get(group_id) {
        return Some(selected.clone());
    }
    if let Some(fallback) = groups
        .iter()
        .find(|g| g.id == group_id)
        .and_then(TabGroupConfig::fallback_tab)
    {
        return Some(fallback.to_string());
    }
    panels.first().map(|(_, id)| id.clone())
}

/// Generate nav rows for groups with `nav="auto"` or no `nav` attribute.
/// A group that already has a nav row is left alone.
pub fn build_navs<D: Document>(doc: &mut D, root: &D::Node, groups: &[TabGroupConfig]) {
    for group_el in doc.elements_by_tag(root, GROUP_TAG) {
        let Some(group_id) = doc.attribute(&group_el, "id") else {
            warn!("Skipping tab group without id");
            continue;
        };
        if doc
            .attribute(&group_el, NAV_ATTR)
            .is_some_and(|nav| nav != NAV_AUTO)
        {
            continue;
        }
        if nav_container(doc, &group_el).is_some() {
            continue;
        }
        let panels = panels(doc, &group_el);
        if panels.is_empty() {
            continue;
        }

        let config = groups.iter().find(|g| g.id == group_id);
        let nav = doc.create_element("div");
        doc.add_class(&nav, NAV_CLASS);
        for (panel, tab_id) in &panels {
            let label = doc
                .attribute(panel, HEADER_ATTR)
                .filter(|h| !h.is_empty())
                .or_else(|| config.and_then(|c| c.tab_label(tab_id)).map(str::to_string))
                .unwrap_or_else(|| tab_id.clone());

            let item = doc.create_element(NAV_ITEM_TAG);
            doc.add_class(&item, NAV_ITEM_CLASS);
            doc.set_text_content(&item, &label);
            doc.set_attribute(&item, NAV_TAB_ATTR, tab_id);
            doc.set_attribute(&item, NAV_GROUP_ATTR, &group_id);
            if doc.has_class(panel, VISIBLE_CLASS) {
                doc.add_class(&item, NAV_ACTIVE_CLASS);
            }
            doc.append_child(&nav, &item);
        }
        doc.prepend_child(&group_el, &nav);
        debug!(group = %group_id, tabs = panels.len(), "Built tab navigation");
    }
}

/// Move the `active` decoration in every nav of `group_id` to `tab_id`
pub fn update_nav_active_state<D: Document>(doc: &mut D, root: &D::Node, group_id: &str, tab_id: &str) {
    for group_el in doc.elements_by_tag(root, GROUP_TAG) {
        if doc.attribute(&group_el, "id").as_deref() == Some(group_id) {
            set_nav_active(doc, &group_el, tab_id);
        }
    }
}

/// `(group, tab)` of the nav item at or above `node`
pub fn nav_target<D: Document>(doc: &D, node: &D::Node) -> Option<(GroupId, TabId)> {
    let mut current = Some(node.clone());
    while let Some(el) = current {
        if doc.has_class(&el, NAV_ITEM_CLASS) {
            let group = doc.attribute(&el, NAV_GROUP_ATTR)?;
            let tab = doc.attribute(&el, NAV_TAB_ATTR)?;
            return Some((group, tab));
        }
        current = doc.parent(&el);
    }
    None
}

/// Route a click on `node` to `on_select` when it hit a nav item.
/// Returns whether the click was handled.
pub fn dispatch_nav_click<D, F>(doc: &D, node: &D::Node, on_select: F) -> bool
where
    D: Document,
    F: FnOnce(&str, &str),
{
    match nav_target(doc, node) {
        Some((group, tab)) => {
            on_select(&group, &tab);
            true
        }
        None => false,
    }
}

/// Panels belonging to `group_el` itself, not to nested groups
fn panels<D: Document>(doc: &D, group_el: &D::Node) -> Vec<(D::Node, TabId)> {
    doc.elements_by_tag(group_el, TAB_TAG)
        .into_iter()
        .filter(|panel| owning_group(doc, panel).as_ref() == Some(group_el))
        .filter_map(|panel| doc.attribute(&panel, "id").map(|id| (panel, id)))
        .collect()
}

fn owning_group<D: Document>(doc: &D, node: &D::Node) -> Option<D::Node> {
    let mut current = doc.parent(node);
    while let Some(el) = current {
        if doc.tag_name(&el) == GROUP_TAG {
            return Some(el);
        }
        current = doc.parent(&el);
    }
    None
}

fn nav_container<D: Document>(doc: &D, group_el: &D::Node) -> Option<D::Node> {
    doc.children(group_el)
        .into_iter()
        .find(|child| doc.has_class(child, NAV_CLASS))
}

fn set_nav_active<D: Document>(doc: &mut D, group_el: &D::Node, tab_id: &str) {
    let Some(nav) = nav_container(doc, group_el) else {
        return;
    };
    for item in doc.children(&nav) {
        if doc.attribute(&item, NAV_TAB_ATTR).as_deref() == Some(tab_id) {
            doc.add_class(&item, NAV_ACTIVE_CLASS);
        } else {
            doc.remove_class(&item, NAV_ACTIVE_CLASS);
        }
    }
}

//! Toggle regions
//!
//! A toggle element is anything carrying `data-cv-toggle` (or the older
//! `data-customviews-toggle`), or a `<cv-toggle category="...">` element.
//! Each lists one or more space-separated categories and is visible when
//! any of them is active.

use std::collections::BTreeSet;
use tracing::debug;

use crate::assets::AssetStore;
use crate::constants::toggle::{ATTR, ID_ATTR, LEGACY_ATTR, LEGACY_ID_ATTR, TAG, TAG_CATEGORY_ATTR};
use crate::dom::Document;
use crate::types::ToggleId;
use crate::visibility::apply_element_visibility;

/// Show/hide every toggle element under `root`, then render assets into
/// the visible ones when a store is given
pub fn apply_toggles<D: Document>(
    doc: &mut D,
    root: &D::Node,
    active: &BTreeSet<ToggleId>,
    assets: Option<&AssetStore>,
) {
    let elements = toggle_elements(doc, root);
    for (el, categories) in &elements {
        let visible = categories.iter().any(|c| active.contains(c));
        apply_element_visibility(doc, el, visible);
    }
    debug!(elements = elements.len(), active = active.len(), "Applied toggles");

    if let Some(assets) = assets {
        render_assets(doc, root, active, assets);
    }
}

/// Repaint visibility without touching rendered assets
pub fn apply_visibility_only<D: Document>(doc: &mut D, root: &D::Node, active: &BTreeSet<ToggleId>) {
    apply_toggles(doc, root, active, None);
}

/// Render assets into visible toggle elements that name one via `data-cv-id`
pub fn render_assets<D: Document>(
    doc: &mut D,
    root: &D::Node,
    active: &BTreeSet<ToggleId>,
    assets: &AssetStore,
) {
    for (el, categories) in toggle_elements(doc, root) {
        if !categories.iter().any(|c| active.contains(c)) {
            continue;
        }
        if let Some(asset_id) = asset_id(doc, &el) {
            assets.render_into(doc, &el, &asset_id);
        }
    }
}

/// Every category mentioned by a toggle element under `root`
pub fn discover_toggles<D: Document>(doc: &D, root: &D::Node) -> BTreeSet<ToggleId> {
    toggle_elements(doc, root)
        .into_iter()
        .flat_map(|(_, categories)| categories)
        .collect()
}

/// Categories declared by `el`; empty when it is not a toggle element
pub fn toggle_categories<D: Document>(doc: &D, el: &D::Node) -> Vec<ToggleId> {
    let raw = if doc.tag_name(el) == TAG {
        doc.attribute(el, TAG_CATEGORY_ATTR)
    } else {
        doc.attribute(el, ATTR).or_else(|| doc.attribute(el, LEGACY_ATTR))
    };
    raw.map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn is_toggle_element<D: Document>(doc: &D, el: &D::Node) -> bool {
    doc.tag_name(el) == TAG || doc.has_attribute(el, ATTR) || doc.has_attribute(el, LEGACY_ATTR)
}

fn toggle_elements<D: Document>(doc: &D, root: &D::Node) -> Vec<(D::Node, Vec<ToggleId>)> {
    doc.descendants(root)
        .into_iter()
        .filter(|el| is_toggle_element(doc, el))
        .map(|el| {
            let categories = toggle_categories(doc, &el);
            (el, categories)
        })
        .collect()
}

fn asset_id<D: Document>(doc: &D, el: &D::Node) -> Option<String> {
    doc.attribute(el, ID_ATTR)
        .or_else(|| doc.attribute(el, LEGACY_ID_ATTR))
        .filter(|id| !id.is_empty())
}

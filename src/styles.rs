//! Presentation styles
//!
//! Two `<style>` blocks are injected into `<head>` once per document: the
//! toggle transitions plus a screen-reader utility, and the tab panel/nav
//! styles. Re-injection is a no-op, keyed on the element id.

use tracing::debug;

use crate::constants::presentation::{CORE_STYLE_ID, TAB_STYLE_ID};
use crate::dom::Document;

/// Toggle visibility transitions. Hidden regions collapse instead of using
/// the `hidden` attribute so the transition stays visible.
pub const CORE_STYLES: &str = r#"
[data-cv-toggle], [data-customviews-toggle], cv-toggle {
  transition: opacity 150ms ease,
              transform 150ms ease,
              max-height 200ms ease,
              margin 150ms ease;
  will-change: opacity, transform, max-height, margin;
}

.cv-visible {
  opacity: 1 !important;
  transform: translateY(0) !important;
  max-height: var(--cv-max-height, 9999px) !important;
}

.cv-hidden {
  opacity: 0 !important;
  transform: translateY(-4px) !important;
  pointer-events: none !important;
  padding-top: 0 !important;
  padding-bottom: 0 !important;
  border-top-width: 0 !important;
  border-bottom-width: 0 !important;
  max-height: 0 !important;
  margin-top: 0 !important;
  margin-bottom: 0 !important;
  overflow: hidden !important;
}

.cv-sr-only {
  position: absolute !important;
  width: 1px !important;
  height: 1px !important;
  padding: 0 !important;
  margin: -1px !important;
  overflow: hidden !important;
  clip: rect(0, 0, 0, 0) !important;
  white-space: nowrap !important;
  border: 0 !important;
}
"#;

/// Tab navigation and panels. Panels switch with `display`, not the collapse
/// transition.
pub const TAB_STYLES: &str = r#"
.cv-tabs-nav {
  display: flex;
  flex-wrap: wrap;
  padding-left: 0;
  margin-bottom: 1rem;
  border-bottom: 1px solid #dee2e6;
}

.cv-tabs-nav-item {
  background: none;
  border: none;
  border-bottom: 2px solid transparent;
  padding: 0.5rem 1rem;
  cursor: pointer;
  font-size: 1rem;
  color: #6c757d;
  transition: color 150ms ease, border-color 150ms ease;
}

.cv-tabs-nav-item:hover {
  color: #495057;
  border-bottom-color: #dee2e6;
}

.cv-tabs-nav-item.active {
  color: #007bff;
  border-bottom-color: #007bff;
  font-weight: 500;
}

.cv-tabs-nav-item:focus {
  outline: 2px solid #007bff;
  outline-offset: 2px;
}

cv-tabgroup {
  display: block;
  margin-bottom: 1.5rem;
}

cv-tab {
  display: block;
}

cv-tab.cv-hidden {
  display: none !important;
}

cv-tab.cv-visible {
  display: block !important;
}
"#;

/// Inject both style blocks unless already present. Returns how many were added.
pub fn inject_styles<D: Document>(doc: &mut D) -> usize {
    [(CORE_STYLE_ID, CORE_STYLES), (TAB_STYLE_ID, TAB_STYLES)]
        .into_iter()
        .filter(|(id, css)| inject_once(doc, id, css))
        .count()
}

fn inject_once<D: Document>(doc: &mut D, id: &str, css: &str) -> bool {
    if doc.element_by_id(id).is_some() {
        return false;
    }
    let style = doc.create_element("style");
    doc.set_attribute(&style, "id", id);
    doc.set_text_content(&style, css);
    let head = doc.head();
    doc.append_child(&head, &style);
    debug!(id = %id, "Injected styles");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Tree;

    #[test]
    fn test_inject_once() {
        let mut tree = Tree::new();
        assert_eq!(inject_styles(&mut tree), 2);
        assert_eq!(inject_styles(&mut tree), 0);

        let head = tree.head();
        assert_eq!(tree.children(&head).len(), 2);
        let core = tree.element_by_id(CORE_STYLE_ID).unwrap();
        assert_eq!(tree.tag_name(&core), "style");
        assert!(tree.text_content(core).contains(".cv-hidden"));
    }

    #[test]
    fn test_existing_author_block_is_respected() {
        let mut tree = Tree::new();
        let head = tree.head();
        tree.element(head, "style", &[("id", TAB_STYLE_ID)]);
        assert_eq!(inject_styles(&mut tree), 1);
        assert_eq!(tree.children(&head).len(), 2);
    }
}

//! Document abstraction
//!
//! The appliers discover toggles and tab groups by walking the document, the
//! same way page authors annotate static HTML. All of that walking goes
//! through [`Document`], so the engine never talks to a browser directly:
//! [`Tree`] backs tests and the CLI, `web::WebDocument` backs the browser.

mod tree;

pub use tree::{NodeId, Tree};

use std::fmt::Debug;

/// The handful of DOM operations the appliers need
pub trait Document {
    /// Handle to an element. Cheap to clone, compared by identity.
    type Node: Clone + PartialEq + Debug;

    fn head(&self) -> Self::Node;
    fn body(&self) -> Self::Node;

    /// Element descendants of `root` in document order, `root` excluded
    fn descendants(&self, root: &Self::Node) -> Vec<Self::Node>;

    /// Direct element children
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Lowercase tag name
    fn tag_name(&self, node: &Self::Node) -> String;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn add_class(&mut self, node: &Self::Node, class: &str);
    fn remove_class(&mut self, node: &Self::Node, class: &str);

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> Self::Node;
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
    /// Insert `child` before the first child of `parent`
    fn prepend_child(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Replace all children with a single text node
    fn set_text_content(&mut self, node: &Self::Node, text: &str);
    /// Replace all children with author-provided markup
    fn set_inner_html(&mut self, node: &Self::Node, html: &str);

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Currently focused element, if any
    fn active_element(&self) -> Option<Self::Node>;
    /// Try to focus `node`; returns whether focus actually moved there
    fn focus(&mut self, node: &Self::Node) -> bool;
    fn blur(&mut self, node: &Self::Node);

    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Inclusive containment: a node contains itself
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            current = self.parent(&n);
        }
        false
    }

    /// Descendants of `root` with the given tag
    fn elements_by_tag(&self, root: &Self::Node, tag: &str) -> Vec<Self::Node> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.tag_name(n).eq_ignore_ascii_case(tag))
            .collect()
    }

    /// First descendant of `root` carrying `class`
    fn first_with_class(&self, root: &Self::Node, class: &str) -> Option<Self::Node> {
        self.descendants(root)
            .into_iter()
            .find(|n| self.has_class(n, class))
    }
}

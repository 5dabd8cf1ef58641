//! In-memory document
//!
//! Arena of nodes addressed by [`NodeId`]. Enough DOM to run the appliers
//! without a browser: elements with attributes, text, parent links and a
//! focus pointer. Markup passed to `set_inner_html` is kept verbatim.

use super::Document;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<NodeId>,
    },
    Text {
        text: String,
    },
    /// Author markup inserted as-is
    Markup {
        html: String,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Empty `<html><head></head><body></body></html>`
    pub fn new() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            html: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            focused: None,
        };
        let html = tree.alloc_element("html");
        let head = tree.alloc_element("head");
        let body = tree.alloc_element("body");
        tree.link(html, head, false);
        tree.link(html, body, false);
        tree.html = html;
        tree.head = head;
        tree.body = body;
        tree
    }

    pub fn root(&self) -> NodeId {
        self.html
    }

    /// Append a new element under `parent`
    pub fn element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.alloc_element(tag);
        for (name, value) in attributes {
            self.set_attribute(&id, name, value);
        }
        self.link(parent, id, false);
        id
    }

    /// Append a text node under `parent`
    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text { text: text.to_string() });
        self.link(parent, id, false);
        id
    }

    /// Concatenated text/markup below `node`
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// Serialize `node` and its subtree
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Every element, including `<html>`, with the given attribute value
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = std::iter::once(self.html)
            .chain(self.descendants(&self.html))
            .collect();
        found.retain(|n| self.attribute(n, name).as_deref() == Some(value));
        found
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    fn alloc_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        })
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Element { .. })
    }

    fn raw_children(&self, id: NodeId) -> &[NodeId] {
        match &self.data(id).kind {
            NodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.data(child).parent
            && let NodeKind::Element { children, .. } = &mut self.data_mut(old_parent).kind
        {
            children.retain(|c| *c != child);
        }
        self.data_mut(child).parent = None;
    }

    fn link(&mut self, parent: NodeId, child: NodeId, at_front: bool) {
        self.detach(child);
        if let NodeKind::Element { children, .. } = &mut self.data_mut(parent).kind {
            if at_front {
                children.insert(0, child);
            } else {
                children.push(child);
            }
        } else {
            return;
        }
        self.data_mut(child).parent = Some(parent);
    }

    fn clear_children(&mut self, node: NodeId) {
        let children = self.raw_children(node).to_vec();
        for child in children {
            if let Some(focused) = self.focused
                && self.contains(&child, &focused)
            {
                self.focused = None;
            }
            self.data_mut(child).parent = None;
        }
        if let NodeKind::Element { children, .. } = &mut self.data_mut(node).kind {
            children.clear();
        }
    }

    fn attributes_mut(&mut self, node: NodeId) -> Option<&mut Vec<(String, String)>> {
        match &mut self.data_mut(node).kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    fn class_list(&self, node: NodeId) -> Vec<String> {
        self.attribute(&node, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.data(node).kind {
            NodeKind::Text { text } => out.push_str(text),
            NodeKind::Markup { html } => out.push_str(html),
            NodeKind::Element { children, .. } => {
                for c in children {
                    self.collect_text(*c, out);
                }
            }
        }
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.data(node).kind {
            NodeKind::Text { text } => out.push_str(&escape(text, false)),
            NodeKind::Markup { html } => out.push_str(html),
            NodeKind::Element { name, attributes, children } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attributes {
                    out.push(' ');
                    out.push_str(k);
                    if !v.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(v, true));
                        out.push('"');
                    }
                }
                out.push('>');
                for c in children {
                    self.write_html(*c, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

fn escape(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

impl Document for Tree {
    type Node = NodeId;

    fn head(&self) -> NodeId {
        self.head
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn descendants(&self, root: &NodeId) -> Vec<NodeId> {
        fn walk(tree: &Tree, node: NodeId, out: &mut Vec<NodeId>) {
            for &c in tree.raw_children(node) {
                if tree.is_element(c) {
                    out.push(c);
                    walk(tree, c, out);
                }
            }
        }

        let mut out = Vec::new();
        walk(self, *root, &mut out);
        out
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.raw_children(*node)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.data(*node).parent
    }

    fn tag_name(&self, node: &NodeId) -> String {
        match &self.data(*node).kind {
            NodeKind::Element { name, .. } => name.clone(),
            _ => String::new(),
        }
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        match &self.data(*node).kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        let Some(attributes) = self.attributes_mut(*node) else {
            return;
        };
        match attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => attributes.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        if let Some(attributes) = self.attributes_mut(*node) {
            attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.class_list(*node).iter().any(|c| c == class)
    }

    fn add_class(&mut self, node: &NodeId, class: &str) {
        let mut classes = self.class_list(*node);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    fn remove_class(&mut self, node: &NodeId, class: &str) {
        let mut classes = self.class_list(*node);
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() != before {
            self.set_attribute(node, "class", &classes.join(" "));
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc_element(tag)
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.link(*parent, *child, false);
    }

    fn prepend_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.link(*parent, *child, true);
    }

    fn set_text_content(&mut self, node: &NodeId, text: &str) {
        self.clear_children(*node);
        if !text.is_empty() {
            self.text(*node, text);
        }
    }

    fn set_inner_html(&mut self, node: &NodeId, html: &str) {
        self.clear_children(*node);
        if !html.is_empty() {
            let id = self.alloc(NodeKind::Markup { html: html.to_string() });
            self.link(*node, id, false);
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_by_attribute("id", id).into_iter().next()
    }

    fn active_element(&self) -> Option<NodeId> {
        self.focused
    }

    fn focus(&mut self, node: &NodeId) -> bool {
        // Only elements attached to the document can take focus
        if !self.is_element(*node) || !self.contains(&self.html, node) {
            return false;
        }
        self.focused = Some(*node);
        true
    }

    fn blur(&mut self, node: &NodeId) {
        if self.focused == Some(*node) {
            self.focused = None;
        }
    }
}

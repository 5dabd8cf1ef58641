//! Browser implementations of the host seams

use tracing::warn;
use wasm_bindgen::{JsCast, JsValue, UnwrapThrowExt};
use web_sys::{Element, HtmlElement, Window};

use crate::codec::History;
use crate::dom::Document;
use crate::error::StorageError;
use crate::persistence::KeyValueStorage;

fn log_js_error(op: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        warn!(op = %op, error = ?e, "DOM operation failed");
    }
}

/// The live page document
pub struct WebDocument {
    document: web_sys::Document,
    head: Element,
    body: Element,
}

impl WebDocument {
    pub fn from_window(window: &Window) -> Option<Self> {
        let document = window.document()?;
        let head = Element::from(document.head()?);
        let body = Element::from(document.body()?);
        Some(Self { document, head, body })
    }

    pub fn raw(&self) -> &web_sys::Document {
        &self.document
    }
}

impl Document for WebDocument {
    type Node = Element;

    fn head(&self) -> Element {
        self.head.clone()
    }

    fn body(&self) -> Element {
        self.body.clone()
    }

    fn descendants(&self, root: &Element) -> Vec<Element> {
        let Ok(list) = root.query_selector_all("*") else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn children(&self, node: &Element) -> Vec<Element> {
        let children = node.children();
        (0..children.length()).filter_map(|i| children.item(i)).collect()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_ascii_lowercase()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        log_js_error("set_attribute", node.set_attribute(name, value));
    }

    fn remove_attribute(&mut self, node: &Element, name: &str) {
        log_js_error("remove_attribute", node.remove_attribute(name));
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&mut self, node: &Element, class: &str) {
        log_js_error("add_class", node.class_list().add_1(class));
    }

    fn remove_class(&mut self, node: &Element, class: &str) {
        log_js_error("remove_class", node.class_list().remove_1(class));
    }

    fn create_element(&mut self, tag: &str) -> Element {
        // Tags come from this crate's constants, never from page input
        self.document
            .create_element(tag)
            .expect_throw("element tag must be valid")
    }

    fn append_child(&mut self, parent: &Element, child: &Element) {
        log_js_error("append_child", parent.append_child(child).map(drop));
    }

    fn prepend_child(&mut self, parent: &Element, child: &Element) {
        let first = parent.first_child();
        log_js_error("prepend_child", parent.insert_before(child, first.as_ref()).map(drop));
    }

    fn set_text_content(&mut self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn set_inner_html(&mut self, node: &Element, html: &str) {
        node.set_inner_html(html);
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn active_element(&self) -> Option<Element> {
        self.document.active_element()
    }

    fn focus(&mut self, node: &Element) -> bool {
        let Some(el) = node.dyn_ref::<HtmlElement>() else {
            return false;
        };
        log_js_error("focus", el.focus());
        self.document.active_element().as_ref() == Some(node)
    }

    fn blur(&mut self, node: &Element) {
        if let Some(el) = node.dyn_ref::<HtmlElement>() {
            log_js_error("blur", el.blur());
        }
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        ancestor.contains(Some(node.as_ref()))
    }
}

/// `window.localStorage`
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// `None` when the page may not use storage (sandboxed frame, privacy mode)
    pub fn from_window(window: &Window) -> Option<Self> {
        match window.local_storage() {
            Ok(Some(storage)) => Some(Self { storage }),
            Ok(None) => None,
            Err(e) => {
                warn!(error = ?e, "localStorage is not accessible");
                None
            }
        }
    }
}

fn backend_error(e: JsValue) -> StorageError {
    StorageError::Backend(format!("{e:?}"))
}

impl KeyValueStorage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(backend_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(backend_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key).map_err(backend_error)
    }
}

/// `window.location` plus `history.replaceState`
pub struct BrowserHistory {
    window: Window,
}

impl BrowserHistory {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl History for BrowserHistory {
    fn current_url(&self) -> String {
        self.window.location().href().unwrap_or_else(|e| {
            warn!(error = ?e, "Cannot read location");
            String::new()
        })
    }

    fn replace_url(&mut self, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        log_js_error("replace_state", result);
    }
}

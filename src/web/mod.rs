//! Browser entry point
//!
//! The host page fetches the configuration (and optionally the asset catalog)
//! and constructs a [`CustomViewsHandle`]. The handle owns the engine, wires
//! `popstate` and tab nav clicks to it, and exposes a small camelCase API to
//! the widget script.

mod host;

pub use host::{BrowserHistory, LocalStorage, WebDocument};

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, Window};

use crate::assets::AssetStore;
use crate::config::{OnConfigError, Source, bootstrap};
use crate::engine::Engine;
use crate::persistence::UnavailableStorage;
use crate::types::State;
use crate::widget::WidgetModel;

type SharedEngine = Rc<RefCell<Engine<WebDocument>>>;

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

#[wasm_bindgen]
pub struct CustomViewsHandle {
    engine: SharedEngine,
    window: Window,
    document: web_sys::Document,
    popstate: Closure<dyn FnMut(Event)>,
    click: Closure<dyn FnMut(Event)>,
}

impl CustomViewsHandle {
    fn engine(&self) -> Result<RefMut<'_, Engine<WebDocument>>, JsValue> {
        self.engine.try_borrow_mut().map_err(js_error)
    }
}

#[wasm_bindgen]
impl CustomViewsHandle {
    /// Build the engine over the current page and resolve the initial state.
    /// A configuration that fails to parse degrades to an empty one.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, assets_json: Option<String>) -> Result<CustomViewsHandle, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
        let doc = WebDocument::from_window(&window).ok_or_else(|| js_error("document has no head or body"))?;
        let document = doc.raw().clone();

        let config = bootstrap(&Source::Inline(config_json.to_string()), OnConfigError::UseMinimal);
        let base_url = config
            .as_ref()
            .and_then(|c| c.base_url.clone())
            .unwrap_or_default();

        let assets = match assets_json {
            Some(json) => AssetStore::from_json(&json, &base_url, "inline").unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring asset catalog");
                AssetStore::empty()
            }),
            None => AssetStore::empty(),
        };

        let mut engine = Engine::new(doc, config)
            .with_history(Box::new(BrowserHistory::new(window.clone())))
            .with_assets(assets);
        engine = match LocalStorage::from_window(&window) {
            Some(storage) => engine.with_storage(Box::new(storage)),
            None => engine.with_storage(Box::new(UnavailableStorage)),
        };

        let engine: SharedEngine = Rc::new(RefCell::new(engine));
        let source = engine.borrow_mut().init();
        info!(source = ?source.map(|s| s.to_string()), "customviews ready");

        let popstate = {
            let engine = Rc::clone(&engine);
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| match engine.try_borrow_mut() {
                Ok(mut engine) => {
                    engine.handle_history_navigation();
                }
                Err(_) => warn!("Engine busy, dropping popstate"),
            })
        };
        let click = {
            let engine = Rc::clone(&engine);
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                    return;
                };
                if let Ok(mut engine) = engine.try_borrow_mut()
                    && engine.handle_nav_click(&target)
                {
                    event.prevent_default();
                }
            })
        };

        window.add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())?;
        document.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;

        Ok(CustomViewsHandle {
            engine,
            window,
            document,
            popstate,
            click,
        })
    }

    /// Apply a state given as `{"toggles": [...], "tabs": {...}}`
    #[wasm_bindgen(js_name = applyState)]
    pub fn apply_state(&self, state_json: &str) -> Result<(), JsValue> {
        let state: State = serde_json::from_str(state_json).map_err(js_error)?;
        self.engine()?.apply_state(&state);
        Ok(())
    }

    #[wasm_bindgen(js_name = resetToDefault)]
    pub fn reset_to_default(&self) -> Result<(), JsValue> {
        self.engine()?.reset_to_default();
        Ok(())
    }

    #[wasm_bindgen(js_name = setActiveTab)]
    pub fn set_active_tab(&self, group_id: &str, tab_id: &str) -> Result<bool, JsValue> {
        Ok(self.engine()?.set_active_tab(group_id, tab_id))
    }

    #[wasm_bindgen(js_name = setToggleChecked)]
    pub fn set_toggle_checked(&self, toggle_id: &str, checked: bool) -> Result<(), JsValue> {
        let mut engine = self.engine()?;
        crate::widget::set_toggle_checked(&mut *engine, toggle_id, checked);
        Ok(())
    }

    #[wasm_bindgen(js_name = currentActiveToggles)]
    pub fn current_active_toggles(&self) -> Result<js_sys::Array, JsValue> {
        let toggles = self.engine()?.current_active_toggles();
        Ok(toggles.iter().map(|t| JsValue::from_str(t)).collect())
    }

    #[wasm_bindgen(js_name = setToggleVisibility)]
    pub fn set_toggle_visibility(&self, toggle_id: &str, visible: bool) -> Result<bool, JsValue> {
        Ok(self.engine()?.set_toggle_visibility(toggle_id, visible))
    }

    #[wasm_bindgen(js_name = switchProfile)]
    pub fn switch_profile(&self, profile_id: &str) -> Result<bool, JsValue> {
        Ok(self.engine()?.switch_profile(profile_id))
    }

    #[wasm_bindgen(js_name = selectState)]
    pub fn select_state(&self, state_id: &str) -> Result<bool, JsValue> {
        Ok(self.engine()?.select_state(state_id))
    }

    #[wasm_bindgen(js_name = clearPersistence)]
    pub fn clear_persistence(&self) -> Result<(), JsValue> {
        self.engine()?.clear_persistence();
        Ok(())
    }

    /// Re-resolve after back/forward. Returns the winning source.
    #[wasm_bindgen(js_name = handlePopstate)]
    pub fn handle_popstate(&self) -> Result<Option<String>, JsValue> {
        let source = self.engine()?.handle_history_navigation();
        Ok(source.map(|s| s.to_string()))
    }

    #[wasm_bindgen(js_name = shareableUrl)]
    pub fn shareable_url(&self) -> Result<Option<String>, JsValue> {
        Ok(self.engine()?.shareable_url())
    }

    /// JSON snapshot for the widget to render
    #[wasm_bindgen(js_name = widgetModel)]
    pub fn widget_model(&self) -> Result<String, JsValue> {
        let engine = self.engine()?;
        serde_json::to_string(&WidgetModel::from_engine(&*engine)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = hasConfiguration)]
    pub fn has_configuration(&self) -> Result<bool, JsValue> {
        Ok(self.engine()?.has_configuration())
    }
}

impl Drop for CustomViewsHandle {
    fn drop(&mut self) {
        let popstate = self
            .window
            .remove_event_listener_with_callback("popstate", self.popstate.as_ref().unchecked_ref());
        let click = self
            .document
            .remove_event_listener_with_callback("click", self.click.as_ref().unchecked_ref());
        if popstate.is_err() || click.is_err() {
            warn!("Failed to detach page listeners");
        }
    }
}

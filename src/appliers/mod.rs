//! DOM appliers
//!
//! Stateless functions that paint a view state onto a [`Document`](crate::dom::Document):
//! - **toggles**: show/hide toggle regions and render their assets
//! - **tabs**: select tab panels, build and decorate tab navigation

pub mod tabs;
pub mod toggles;

pub use tabs::{apply_tab_selections, build_navs, dispatch_nav_click, nav_target, update_nav_active_state};
pub use toggles::{apply_toggles, apply_visibility_only, discover_toggles, render_assets};

//! Reserved names shared between the engine and page authors
//!
//! Every attribute, class, storage key and query parameter the engine reads or
//! writes lives here, so the DOM/URL/storage contract has one source of truth.

/// URL contract
pub mod url {
    /// Query parameter carrying the compact state token
    pub const VIEW_PARAM: &str = "view";
}

/// Durable storage keys
pub mod storage {
    /// Single key holding the JSON-serialized current state
    pub const STATE_KEY: &str = "customviews-state";

    /// Keys written by the three-key scheme (profile, state id, custom state).
    /// Only recognised so their presence can be reported; never read as state.
    pub const LEGACY_PROFILE_KEY: &str = "customviews-profile";
    pub const LEGACY_CUSTOM_STATE_KEY: &str = "customviews-custom-state";

    /// File name used by the file-backed storage
    pub const FILE_NAME: &str = "storage.json";
}

/// Configuration file locations
pub mod config {
    /// Directory under the platform config/data dir
    pub const APP_DIR: &str = "customviews";

    /// Default configuration file name
    pub const FILENAME: &str = "config.json";
}

/// Toggle markers
pub mod toggle {
    /// Current attribute spelling for toggle categories
    pub const ATTR: &str = "data-cv-toggle";

    /// Historical attribute spelling, still honoured
    pub const LEGACY_ATTR: &str = "data-customviews-toggle";

    /// Dedicated element form: `<cv-toggle category="a b">`
    pub const TAG: &str = "cv-toggle";
    pub const TAG_CATEGORY_ATTR: &str = "category";

    /// Asset id companions
    pub const ID_ATTR: &str = "data-cv-id";
    pub const LEGACY_ID_ATTR: &str = "data-customviews-id";
}

/// Tab markers
pub mod tabs {
    pub const GROUP_TAG: &str = "cv-tabgroup";
    pub const TAB_TAG: &str = "cv-tab";

    /// `nav="auto"` (or no attribute) asks for generated navigation
    pub const NAV_ATTR: &str = "nav";
    pub const NAV_AUTO: &str = "auto";

    /// Author-provided label on a `<cv-tab>`
    pub const HEADER_ATTR: &str = "header";

    pub const NAV_CLASS: &str = "cv-tabs-nav";
    pub const NAV_ITEM_CLASS: &str = "cv-tabs-nav-item";
    pub const NAV_ITEM_TAG: &str = "button";
    pub const NAV_ACTIVE_CLASS: &str = "active";
    pub const NAV_GROUP_ATTR: &str = "data-group-id";
    pub const NAV_TAB_ATTR: &str = "data-tab-id";
}

/// Presentation classes and accessibility attributes
pub mod presentation {
    pub const VISIBLE_CLASS: &str = "cv-visible";
    pub const HIDDEN_CLASS: &str = "cv-hidden";

    pub const ARIA_HIDDEN: &str = "aria-hidden";
    pub const INERT: &str = "inert";
    pub const TABINDEX: &str = "tabindex";

    /// Remembers an author tabindex while the element is hidden
    pub const ORIG_TABINDEX: &str = "data-cv-orig-tabindex";

    /// `id` of the injected `<style>` elements
    pub const CORE_STYLE_ID: &str = "cv-core-styles";
    pub const TAB_STYLE_ID: &str = "cv-tab-styles";
}

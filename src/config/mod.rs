//! Configuration management for customviews
//!
//! - **site**: the configuration payload (toggle catalog, default state, tab groups)
//! - **profile**: optional profile indirection over predefined states
//! - **source**: loading payloads inline, from disk or over HTTP

pub mod profile;
pub mod site;
pub mod source;

pub use profile::Profile;
pub use site::Configuration;
pub use source::{OnConfigError, Source, bootstrap};

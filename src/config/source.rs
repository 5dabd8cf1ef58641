//! Where configuration and asset catalogs come from
//!
//! A payload is either handed over inline, read from disk, or fetched once
//! over HTTP. There is no retry, no timeout policy and no caching: the fetch
//! happens during start-up and either produces a payload or an error.

use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::site::Configuration;
use crate::error::{Error, Result};

/// Origin of a JSON payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// JSON text already in memory (script tag attribute, test fixture)
    Inline(String),
    File(PathBuf),
    Url(String),
}

impl Source {
    /// Default configuration file: `<config dir>/customviews/config.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Interpret a CLI/host argument: `http(s)://` is fetched, anything else is a path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::File(PathBuf::from(location))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Source::Inline(_) => "inline".to_string(),
            Source::File(path) => path.display().to_string(),
            Source::Url(url) => url.clone(),
        }
    }

    /// Read the payload text
    pub fn read_text(&self) -> Result<String> {
        match self {
            Source::Inline(json) => Ok(json.clone()),
            Source::File(path) => fs::read_to_string(path).map_err(|source| Error::ConfigRead {
                path: path.clone(),
                source,
            }),
            Source::Url(url) => fetch_text(url),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_text(url: &str) -> Result<String> {
    info!(url = %url, "Fetching payload");
    let response = ureq::get(url).call().map_err(|e| Error::ConfigFetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    response.into_string().map_err(|e| Error::ConfigFetch {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(target_arch = "wasm32")]
fn fetch_text(url: &str) -> Result<String> {
    // In the browser the host page fetches and passes the payload inline
    Err(Error::ConfigFetch {
        url: url.to_string(),
        reason: "blocking fetch is not available on wasm32".to_string(),
    })
}

/// What to do when the configuration cannot be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConfigError {
    /// Leave the engine without configuration (profile-based setups)
    Abort,
    /// Fall back to [`Configuration::minimal`] and keep going
    UseMinimal,
}

impl Configuration {
    pub fn load(source: &Source) -> Result<Self> {
        let text = source.read_text()?;
        Self::from_json(&text, &source.describe())
    }
}

/// Load a configuration, absorbing the failure according to `policy`.
///
/// Logs once; callers check the returned `Option` (or the engine's
/// `has_configuration()`) before relying on catalogs.
pub fn bootstrap(source: &Source, policy: OnConfigError) -> Option<Configuration> {
    match Configuration::load(source) {
        Ok(config) => Some(config),
        Err(err) => match policy {
            OnConfigError::Abort => {
                error!(source = %source.describe(), error = %err, "Failed to load configuration, customization disabled");
                None
            }
            OnConfigError::UseMinimal => {
                warn!(source = %source.describe(), error = %err, "Failed to load configuration, using defaults");
                Some(Configuration::minimal())
            }
        },
    }
}

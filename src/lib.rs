//! customviews: reader-side view personalization for static documentation
//!
//! Pages mark optional regions with toggle categories and group alternatives
//! into tab groups. The [`Engine`] decides which of them are shown, keeps that
//! choice in durable storage and in a shareable `?view=` token, and repaints
//! the document whenever the choice changes.

#![cfg_attr(not(feature = "web"), forbid(unsafe_code))]

pub mod appliers;
pub mod assets;
pub mod codec;
pub mod config;
pub mod constants;
pub mod dom;
pub mod engine;
pub mod error;
pub mod listeners;
pub mod persistence;
pub mod styles;
pub mod types;
pub mod visibility;
pub mod widget;

#[cfg(feature = "web")]
pub mod web;

pub use assets::{Asset, AssetKind, AssetStore};
pub use codec::{History, MemoryHistory, UrlSync, decode, encode};
pub use config::{Configuration, OnConfigError, Profile, Source, bootstrap};
pub use dom::{Document, NodeId, Tree};
pub use engine::{Engine, StateSource};
pub use error::{Error, Result, StorageError};
pub use listeners::{Listener, ListenerId};
pub use persistence::{FileStorage, KeyValueStorage, MemoryStorage, PersistenceStore, UnavailableStorage};
pub use types::{GroupId, State, TabConfig, TabGroupConfig, TabId, ToggleId};
pub use visibility::{VisibilityChange, VisibilityOverlay};
pub use widget::WidgetModel;

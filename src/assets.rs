//! Asset store and renderer
//!
//! Assets are small payloads (an image, a text snippet, a markup fragment)
//! keyed by id. Elements tagged with `data-cv-id` get the matching asset
//! rendered into them while their toggle is visible.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::Source;
use crate::dom::Document;
use crate::error::{Error, Result};

/// Defaults applied to rendered images unless the asset's style sets them
const IMAGE_DEFAULT_STYLE: &[(&str, &str)] =
    &[("max-width", "100%"), ("height", "auto"), ("display", "block")];

/// One renderable payload as it appears in the asset catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Explicit renderer; detected from the other fields when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Text,
    Html,
    Unknown(String),
}

impl Asset {
    pub fn image(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Self::default()
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Declared type, else image when there is a `src`, html when the
    /// content contains a tag, text otherwise
    pub fn kind(&self) -> AssetKind {
        match self.kind.as_deref() {
            Some("image") => AssetKind::Image,
            Some("text") => AssetKind::Text,
            Some("html") => AssetKind::Html,
            Some(other) => AssetKind::Unknown(other.to_string()),
            None if self.src.as_deref().is_some_and(|s| !s.is_empty()) => AssetKind::Image,
            None if self.content.as_deref().is_some_and(looks_like_markup) => AssetKind::Html,
            None => AssetKind::Text,
        }
    }

    /// An asset needs something to render
    pub fn is_valid(&self) -> bool {
        self.src.as_deref().is_some_and(|s| !s.is_empty())
            || self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

fn looks_like_markup(content: &str) -> bool {
    content
        .match_indices('<')
        .any(|(i, _)| content[i + 1..].find('>').is_some_and(|end| end > 0))
}

/// Id → asset catalog with base-URL resolution for `src` paths
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    assets: HashMap<String, Asset>,
    base_url: String,
}

impl AssetStore {
    pub fn new(assets: HashMap<String, Asset>, base_url: impl Into<String>) -> Self {
        let store = Self {
            assets,
            base_url: base_url.into(),
        };
        if !store.validate() {
            warn!(count = store.assets.len(), "Asset catalog has entries without src or content");
        }
        store
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str, base_url: &str, origin: &str) -> Result<Self> {
        let assets: HashMap<String, Asset> =
            serde_json::from_str(json).map_err(|source| Error::ConfigParse {
                origin: origin.to_string(),
                source,
            })?;
        info!(origin = %origin, count = assets.len(), "Loaded asset catalog");
        Ok(Self::new(assets, base_url))
    }

    pub fn load(source: &Source, base_url: &str) -> Result<Self> {
        let text = source.read_text()?;
        Self::from_json(&text, base_url, &source.describe())
    }

    /// Every asset has a `src` or `content`
    pub fn validate(&self) -> bool {
        self.assets.values().all(Asset::is_valid)
    }

    /// The asset with `src` resolved against the base URL
    pub fn get(&self, id: &str) -> Option<Asset> {
        let asset = self.assets.get(id)?;
        let mut resolved = asset.clone();
        if !self.base_url.is_empty()
            && let Some(src) = &asset.src
        {
            resolved.src = Some(self.prepend_base_url(src));
        }
        Some(resolved)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    /// Replace the whole catalog
    pub fn load_from(&mut self, assets: HashMap<String, Asset>) {
        self.assets = assets;
    }

    /// Merge more assets in; later entries win
    pub fn load_additional(&mut self, assets: HashMap<String, Asset>) {
        self.assets.extend(assets);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn prepend_base_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.strip_suffix('/').unwrap_or(&self.base_url);
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Render asset `id` into `el`; returns false when there is no such asset
    pub fn render_into<D: Document>(&self, doc: &mut D, el: &D::Node, id: &str) -> bool {
        match self.get(id) {
            Some(asset) => {
                render_asset_into(doc, el, &asset);
                true
            }
            None => {
                debug!(asset = %id, "No asset for element");
                false
            }
        }
    }
}

/// Render `asset` into `el`, replacing its children
pub fn render_asset_into<D: Document>(doc: &mut D, el: &D::Node, asset: &Asset) {
    match asset.kind() {
        AssetKind::Image => render_image(doc, el, asset),
        AssetKind::Text => {
            if let Some(content) = &asset.content {
                doc.set_text_content(el, content);
            }
            decorate(doc, el, asset);
        }
        AssetKind::Html => {
            if let Some(content) = &asset.content {
                doc.set_inner_html(el, content);
            }
            decorate(doc, el, asset);
        }
        AssetKind::Unknown(kind) => {
            warn!(kind = %kind, "Unknown asset type, rendering content as markup");
            doc.set_inner_html(el, asset.content.as_deref().unwrap_or_default());
        }
    }
}

fn render_image<D: Document>(doc: &mut D, el: &D::Node, asset: &Asset) {
    let Some(src) = asset.src.as_deref().filter(|s| !s.is_empty()) else {
        return;
    };
    doc.set_inner_html(el, "");
    let img = doc.create_element("img");
    doc.set_attribute(&img, "src", src);
    doc.set_attribute(&img, "alt", asset.alt.as_deref().unwrap_or_default());
    add_classes(doc, &img, asset.class_name.as_deref());
    doc.set_attribute(&img, "style", &with_image_defaults(asset.style.as_deref()));
    doc.append_child(el, &img);
}

/// Asset classes are added, never replacing the element's own (which carry
/// the visibility classes)
fn decorate<D: Document>(doc: &mut D, el: &D::Node, asset: &Asset) {
    add_classes(doc, el, asset.class_name.as_deref());
    if let Some(style) = &asset.style {
        let merged = merge_style(doc.attribute(el, "style").as_deref(), style);
        doc.set_attribute(el, "style", &merged);
    }
}

fn declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(prop, value)| (prop.trim(), value.trim()))
        .filter(|(prop, _)| !prop.is_empty())
}

/// Author declarations survive unless the asset sets the same property
fn merge_style(existing: Option<&str>, asset_style: &str) -> String {
    let overridden: Vec<String> = declarations(asset_style)
        .map(|(prop, _)| prop.to_ascii_lowercase())
        .collect();
    declarations(existing.unwrap_or_default())
        .filter(|(prop, _)| !overridden.contains(&prop.to_ascii_lowercase()))
        .chain(declarations(asset_style))
        .map(|(prop, value)| format!("{prop}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn add_classes<D: Document>(doc: &mut D, el: &D::Node, classes: Option<&str>) {
    for class in classes.unwrap_or_default().split_whitespace() {
        doc.add_class(el, class);
    }
}

fn with_image_defaults(style: Option<&str>) -> String {
    let style = style.unwrap_or_default().trim().trim_end_matches(';').trim();
    let declared: Vec<String> = declarations(style)
        .map(|(prop, _)| prop.to_ascii_lowercase())
        .collect();

    let mut parts: Vec<String> = if style.is_empty() {
        Vec::new()
    } else {
        vec![style.to_string()]
    };
    for (prop, value) in IMAGE_DEFAULT_STYLE {
        if !declared.iter().any(|d| d == prop) {
            parts.push(format!("{prop}: {value}"));
        }
    }
    parts.join("; ")
}

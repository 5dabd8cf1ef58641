//! URL codec
//!
//! A state travels in the `view` query parameter as compact JSON
//! (`{"t":[toggles],"g":[[group,tab],...]}`), base64url encoded without
//! padding. Only toggles and tab selections survive the trip.
//!
//! Writing the token goes through [`History`] replacement, so sharing a view
//! never adds navigation entries or reloads the page.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::constants::url::VIEW_PARAM;
use crate::error::{Error, Result};
use crate::types::State;

#[derive(Serialize)]
struct CompactState<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    t: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    g: Vec<(&'a str, &'a str)>,
}

/// Encode `state` into a query-safe token.
///
/// Returns `None` when there is nothing to encode, so an uncustomized view
/// leaves no parameter behind.
pub fn encode(state: &State, include_tabs: bool) -> Option<String> {
    let compact = CompactState {
        t: state.toggles.iter().map(String::as_str).collect(),
        g: if include_tabs {
            state.tabs.iter().map(|(g, t)| (g.as_str(), t.as_str())).collect()
        } else {
            Vec::new()
        },
    };
    if compact.t.is_empty() && compact.g.is_empty() {
        return None;
    }

    match serde_json::to_string(&compact) {
        Ok(json) => Some(URL_SAFE_NO_PAD.encode(json.as_bytes())),
        Err(err) => {
            warn!(error = %err, "Failed to encode state");
            None
        }
    }
}

/// Decode a token produced by [`encode`] (or by older standard-alphabet,
/// padded encoders). Malformed input is logged and treated as no state.
pub fn decode(token: &str) -> Option<State> {
    match try_decode(token) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(token = %token, error = %e, "Failed to decode view state");
            None
        }
    }
}

/// Strict form of [`decode`]: reports why the token was rejected
pub fn try_decode(token: &str) -> Result<State> {
    let normalized: String = token
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| Error::Decode(format!("invalid base64: {e}")))?;
    let compact: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Decode(format!("invalid JSON: {e}")))?;
    let Value::Object(fields) = compact else {
        return Err(Error::Decode("compact state is not an object".to_string()));
    };

    let mut state = State::default();
    if let Some(Value::Array(toggles)) = fields.get("t") {
        for toggle in toggles {
            match toggle.as_str() {
                Some(t) => {
                    state.toggles.insert(t.to_string());
                }
                None => debug!(value = %toggle, "Skipping non-string toggle in token"),
            }
        }
    }
    if let Some(Value::Array(groups)) = fields.get("g") {
        for pair in groups {
            if let Some([Value::String(group), Value::String(tab)]) =
                pair.as_array().map(Vec::as_slice)
            {
                state.tabs.insert(group.clone(), tab.clone());
            } else {
                debug!(value = %pair, "Skipping malformed tab pair in token");
            }
        }
    }
    Ok(state)
}

/// Extract the raw token from a full URL
pub fn token_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .inspect_err(|e| warn!(url = %url, error = %e, "Unparsable page URL"))
        .ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == VIEW_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// `url` with the view parameter replaced by `token` (or removed when `None`).
/// Other query pairs, the path and the fragment are preserved.
pub fn url_with_token(url: &str, token: Option<&str>) -> Option<String> {
    let mut parsed = Url::parse(url)
        .inspect_err(|e| warn!(url = %url, error = %e, "Unparsable page URL"))
        .ok()?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != VIEW_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed.set_query(None);
    if !kept.is_empty() || token.is_some() {
        let mut pairs = parsed.query_pairs_mut();
        pairs.extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(token) = token {
            pairs.append_pair(VIEW_PARAM, token);
        }
    }
    Some(parsed.to_string())
}

/// The page URL as seen by the engine
pub trait History {
    fn current_url(&self) -> String;

    /// Replace the current entry without navigating
    fn replace_url(&mut self, url: &str);
}

/// History kept in memory; used by tests and the CLI
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    url: String,
    replacements: usize,
}

impl MemoryHistory {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            replacements: 0,
        }
    }

    /// How many times the URL was actually rewritten
    pub fn replacements(&self) -> usize {
        self.replacements
    }

    /// Simulate a back/forward navigation to `url`
    pub fn navigate(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("http://localhost/")
    }
}

impl History for MemoryHistory {
    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn replace_url(&mut self, url: &str) {
        self.url = url.to_string();
        self.replacements += 1;
    }
}

impl<H: History + ?Sized> History for std::rc::Rc<std::cell::RefCell<H>> {
    fn current_url(&self) -> String {
        self.borrow().current_url()
    }

    fn replace_url(&mut self, url: &str) {
        self.borrow_mut().replace_url(url);
    }
}

/// Reads and writes the view token on the page URL
pub struct UrlSync {
    history: Box<dyn History>,
    include_tabs: bool,
}

impl UrlSync {
    pub fn new(history: Box<dyn History>, include_tabs: bool) -> Self {
        Self { history, include_tabs }
    }

    pub fn current_url(&self) -> String {
        self.history.current_url()
    }

    /// State carried by the current URL, if any
    pub fn state_from_url(&self) -> Option<State> {
        token_from_url(&self.history.current_url()).and_then(|token| decode(&token))
    }

    /// Put `state`'s token on the URL (removing it if the state encodes to nothing)
    pub fn write(&mut self, state: &State) {
        let token = encode(state, self.include_tabs);
        self.replace_token(token.as_deref());
    }

    /// Remove any token from the URL
    pub fn clear(&mut self) {
        self.replace_token(None);
    }

    /// Current URL carrying `state`'s token; does not touch history
    pub fn shareable_url(&self, state: &State) -> Option<String> {
        let token = encode(state, self.include_tabs);
        url_with_token(&self.history.current_url(), token.as_deref())
    }

    fn replace_token(&mut self, token: Option<&str>) {
        let current = self.history.current_url();
        if let Some(next) = url_with_token(&current, token)
            && next != current
        {
            debug!(url = %next, "Replacing page URL");
            self.history.replace_url(&next);
        }
    }
}

//! Intercepted request model.
//!
//! A [`Request`] carries only what classification and forwarding need:
//! method, absolute URL, request mode, headers and body.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Fetch request mode, as reported by the browser in `Sec-Fetch-Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page load (address bar, link, back/forward).
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

impl RequestMode {
    /// Parse a `Sec-Fetch-Mode` header value.
    ///
    /// Returns `None` for values outside the four fetch modes (e.g. `websocket`).
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => Some(Self::Navigate),
            "same-origin" => Some(Self::SameOrigin),
            "no-cors" => Some(Self::NoCors),
            "cors" => Some(Self::Cors),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::SameOrigin => "same-origin",
            Self::NoCors => "no-cors",
            Self::Cors => "cors",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, upper case.
    pub method: String,
    /// Absolute request URL.
    pub url: Url,
    pub mode: RequestMode,
    /// Request headers in arrival order; names are lower case.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    /// Create a request with the given method and URL, in `same-origin` mode.
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url,
            mode: RequestMode::SameOrigin,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// A sub-resource `GET`.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A top-level navigation `GET`.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_mode(RequestMode::Navigate)
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// URL path, the only part of the URL classification looks at.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Key under which a response to this request is cached.
    pub fn cache_key(&self) -> String {
        crate::cache::key::cache_key(&self.url)
    }
}

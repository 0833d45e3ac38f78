//! Request and response model shared by the interceptor, the cache, and the network layer.
//!
//! Header names are stored lowercase. Bodies travel over the host bridge as
//! hex strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where the requested resource will be used by the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    Worker,
    Frame,
    Iframe,
    Audio,
    Video,
    #[default]
    Empty,
}

/// Request mode as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// An outgoing request from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    /// Absolute or origin-relative URL.
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub mode: RequestMode,
}

fn default_method() -> String {
    "GET".into()
}

impl Request {
    /// A plain GET request with no destination.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: default_method(),
            url: url.into(),
            headers: BTreeMap::new(),
            destination: Destination::Empty,
            mode: RequestMode::Cors,
        }
    }

    /// A top-level document navigation.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self { destination: Destination::Document, mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the request loads a top-level document. Frame navigations
    /// also use `navigate` mode but do not count.
    pub fn is_navigation(&self) -> bool {
        self.destination == Destination::Document
    }
}

/// Response type as classified by the fetching side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response with CORS.
    Cors,
    /// Synthesized by the worker.
    #[default]
    Default,
    Error,
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Default => "default",
            ResponseType::Error => "error",
            ResponseType::Opaque => "opaque",
        }
    }

    /// Parse the stored lowercase form. Unknown values map to `Default`.
    pub fn parse(s: &str) -> Self {
        match s {
            "basic" => ResponseType::Basic,
            "cors" => ResponseType::Cors,
            "error" => ResponseType::Error,
            "opaque" => ResponseType::Opaque,
            _ => ResponseType::Default,
        }
    }
}

/// A full response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, with = "hex")]
    pub body: Vec<u8>,
    #[serde(default, rename = "type")]
    pub response_type: ResponseType,
    /// Final URL after redirects; empty for synthesized responses.
    #[serde(default)]
    pub url: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text(status).to_string(),
            headers: BTreeMap::new(),
            body: body.into(),
            response_type: ResponseType::Default,
            url: String::new(),
        }
    }

    /// A synthesized `text/html` response with status 200.
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body).with_header("content-type", "text/html")
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Status in the 200-299 range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Exactly 200 and same-origin: the only shape written at runtime.
    pub fn is_storable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }
}

fn status_text(status: u16) -> &'static str {
    ::http::StatusCode::from_u16(status).ok().and_then(|s| s.canonical_reason()).unwrap_or_default()
}

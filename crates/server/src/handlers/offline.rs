//! Built-in offline page for navigations that cannot be served at all.

use haven_core::Response;

/// Heading text that identifies the offline page.
pub const OFFLINE_MARKER: &str = "Offline mode";

const OFFLINE_HTML: &str = include_str!("../../assets/offline.html");

/// The offline page as a 200 `text/html` response. Needs no network or cache.
pub fn page() -> Response {
    Response::html(OFFLINE_HTML)
}

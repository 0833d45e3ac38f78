//! Structured request identity for cache entries.

use sha2::{Digest, Sha256};
use url::Url;

/// Identity of a cached request: method plus canonical absolute URL.
///
/// The same key in two named stores addresses two distinct entries; the
/// store name is always part of the storage primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: Url,
}

impl CacheKey {
    /// Build a key from a method and an absolute URL. The fragment is dropped.
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url }
    }

    /// Key for a plain GET of `url`.
    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Stable SHA-256 hex digest used as the entry identity inside a store.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }
}

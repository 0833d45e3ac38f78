//! Network layer behind the interceptor.
//!
//! ### Network seam
//! - The `Network` trait is the only way the worker reaches the network, so
//!   handlers can be exercised against a recording mock.
//!
//! ### FetchClient
//! - reqwest with rustls, transparent gzip/brotli/deflate.
//! - Any HTTP status is a successful fetch; only transport failures are errors.
//! - Responses from the application origin are `basic`, others `cors`.
//! - Max redirects: 5
//! - Max body bytes: configurable (default 10MB)

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Method, header};

pub use self::url::{UrlError, is_same_origin, resolve};

use ::url::Url;
use haven_core::{Error, Request, Response, ResponseType, WorkerConfig};

/// Performs a network fetch for an intercepted request.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request`, whose URL is already absolute.
    ///
    /// Returns `Err` only when no response could be obtained at all.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "haven-worker/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Application origin used to classify responses.
    pub origin: Url,
}

impl FetchConfig {
    /// Derive the client configuration from the worker configuration.
    pub fn from_worker(config: &WorkerConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            origin,
        })
    }
}

/// reqwest-backed `Network` implementation.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn classify(&self, final_url: &Url) -> ResponseType {
        if is_same_origin(final_url, &self.config.origin) { ResponseType::Basic } else { ResponseType::Cors }
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::Network(format!("{}: {}", request.url, e))
            }
        })?;

        if let Some(len) = response.content_length()
            && exceeds_limit(len, self.config.max_bytes)
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = collect_headers(response.headers());

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if exceeds_limit(bytes.len() as u64, self.config.max_bytes) {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
            response_type: self.classify(&final_url),
            url: final_url.to_string(),
        })
    }
}

/// Length check done in `u64`; a `usize` cast truncates on 32-bit targets.
fn exceeds_limit(len: u64, max_bytes: usize) -> bool {
    len > max_bytes as u64
}

fn collect_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

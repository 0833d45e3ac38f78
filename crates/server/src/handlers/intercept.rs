//! Fetch interception and cache-population policy.
//!
//! Cache-first: a stored entry is authoritative until its store is retired
//! by a version bump. There is no TTL and no revalidation.
//!
//! 1. Non-GET or excluded URL: pass through, no cache read or write.
//! 2. Combined cache hit: serve it, no network.
//! 3. Miss: fetch. A 200 same-origin response whose URL matches a
//!    cacheable pattern is also written to the dynamic store.
//! 4. Network failure: navigations get the cached root document or the
//!    offline page; anything else gets a last-resort cache lookup or fails.

use haven_client::resolve;
use haven_core::{CacheKey, Error, Request, Response, WorkerConfig};

use super::offline;
use crate::handler::Worker;
use crate::outcome::{FetchDecision, ResponseSource};

/// Whether the URL contains any exclusion pattern.
pub fn is_excluded(config: &WorkerConfig, url: &str) -> bool {
    config.exclude_patterns.iter().any(|pattern| url.contains(pattern.as_str()))
}

/// Whether a fresh network response for this URL is worth storing.
pub fn is_cacheable(config: &WorkerConfig, url: &str) -> bool {
    config.cacheable_patterns.iter().any(|pattern| url.contains(pattern.as_str()))
}

/// Decide how an outgoing request is answered.
pub async fn intercept(worker: &Worker, mut request: Request) -> FetchDecision {
    if !request.is_get() {
        return FetchDecision::Passthrough;
    }

    let url = match resolve(worker.origin(), &request.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "not intercepting unresolvable url");
            return FetchDecision::Passthrough;
        }
    };

    if is_excluded(worker.config(), url.as_str()) {
        tracing::trace!(url = %url, "excluded from cache");
        return FetchDecision::Passthrough;
    }

    request.url = url.to_string();
    let key = CacheKey::new(&request.method, &url);

    if let Some(response) = lookup(worker, &key).await {
        tracing::debug!(url = %url, "serving from cache");
        return FetchDecision::respond(ResponseSource::Cache, response);
    }

    match worker.network().fetch(&request).await {
        Ok(response) => {
            if response.is_storable() && is_cacheable(worker.config(), url.as_str()) {
                store(worker, &key, &response).await;
            }
            FetchDecision::respond(ResponseSource::Network, response)
        }
        Err(error) => offline_fallback(worker, &request, &key, &error).await,
    }
}

/// Combined lookup; a storage failure counts as a miss.
async fn lookup(worker: &Worker, key: &CacheKey) -> Option<Response> {
    worker.cache().match_any(key).await.unwrap_or_else(|e| {
        tracing::warn!(url = %key.url(), error = %e, "cache lookup failed");
        None
    })
}

/// Write a copy into the dynamic store. The caller keeps the original.
async fn store(worker: &Worker, key: &CacheKey, response: &Response) {
    let cache_name = &worker.config().dynamic_cache_name;
    match worker.cache().put(cache_name, key, response).await {
        Ok(()) => tracing::info!(url = %key.url(), cache = %cache_name, "cached new resource"),
        Err(e) => tracing::warn!(url = %key.url(), cache = %cache_name, error = %e, "failed to cache resource"),
    }
}

async fn offline_fallback(worker: &Worker, request: &Request, key: &CacheKey, error: &Error) -> FetchDecision {
    tracing::warn!(url = %request.url, error = %error, "network fetch failed");

    if request.is_navigation() {
        let root = match resolve(worker.origin(), &worker.config().root_document) {
            Ok(url) => lookup(worker, &CacheKey::get(&url)).await,
            Err(e) => {
                tracing::warn!(error = %e, "root document url does not resolve");
                None
            }
        };

        return match root {
            Some(response) => FetchDecision::respond(ResponseSource::RootDocument, response),
            None => FetchDecision::respond(ResponseSource::OfflinePage, offline::page()),
        };
    }

    match lookup(worker, key).await {
        Some(response) => FetchDecision::respond(ResponseSource::FallbackCache, response),
        None => FetchDecision::failed(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockNetwork, ORIGIN, worker_over, worker_with};
    use async_trait::async_trait;
    use haven_client::Network;
    use haven_core::{CacheDb, Destination, RequestMode, ResponseType};
    use std::sync::Arc;
    use url::Url;

    /// Fails every fetch, but only after another writer has stored the
    /// requested resource.
    struct StoredWhileFetching {
        cache: CacheDb,
        response: Response,
    }

    #[async_trait]
    impl Network for StoredWhileFetching {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let url = Url::parse(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            self.cache.put(DYNAMIC, &CacheKey::get(&url), &self.response).await?;
            Err(Error::Network("connection reset".into()))
        }
    }

    const DYNAMIC: &str = "request-system-v1.0.0";
    const STATIC: &str = "request-system-static-v1.0.0";

    fn same_origin(body: &str) -> Response {
        Response::new(200, body.to_string())
            .with_type(ResponseType::Basic)
            .with_header("content-type", "text/plain")
    }

    fn key(path: &str) -> CacheKey {
        CacheKey::get(&Url::parse(ORIGIN).unwrap().join(path).unwrap())
    }

    #[test]
    fn test_exclusion_patterns() {
        let config = WorkerConfig::default();
        assert!(is_excluded(&config, "https://app.example/admin/users"));
        assert!(is_excluded(&config, "https://www.gstatic.com/firebasejs/10.7.1/firebase-app.js"));
        assert!(is_excluded(&config, "https://firestore.googleapis.com/v1/docs"));
        assert!(!is_excluded(&config, "https://app.example/index.html"));
    }

    #[test]
    fn test_cacheable_patterns() {
        let config = WorkerConfig::default();
        assert!(is_cacheable(&config, "https://app.example/index.html"));
        assert!(is_cacheable(&config, "https://app.example/app.js"));
        assert!(is_cacheable(&config, "https://app.example/style.css?v=2"));
        assert!(!is_cacheable(&config, "https://app.example/icon-192.png"));
        assert!(!is_cacheable(&config, "https://app.example/api/requests"));
    }

    #[tokio::test]
    async fn test_non_get_never_intervenes() {
        let network = Arc::new(MockNetwork::new());
        let worker = worker_with(network.clone()).await;
        worker.cache().put(DYNAMIC, &key("/app.js"), &same_origin("cached")).await.unwrap();

        for method in ["POST", "PUT", "DELETE", "HEAD"] {
            let request = Request { method: method.into(), ..Request::get("/app.js") };
            assert_eq!(intercept(&worker, request).await, FetchDecision::Passthrough);
        }
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_excluded_get_touches_no_cache() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&format!("{ORIGIN}/admin/panel.js"), same_origin("fresh"));
        let worker = worker_with(network.clone()).await;
        worker.cache().put(DYNAMIC, &key("/admin/panel.js"), &same_origin("stale")).await.unwrap();

        let decision = intercept(&worker, Request::get("/admin/panel.js")).await;
        assert_eq!(decision, FetchDecision::Passthrough);
        assert_eq!(network.calls(), 0);
        assert_eq!(worker.cache().keys(DYNAMIC).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&format!("{ORIGIN}/app.js"), same_origin("fresh"));
        let worker = worker_with(network.clone()).await;
        worker.cache().put(STATIC, &key("/app.js"), &same_origin("cached")).await.unwrap();

        let decision = intercept(&worker, Request::get("/app.js")).await;
        assert_eq!(decision.source(), Some(ResponseSource::Cache));
        assert_eq!(decision.response().unwrap().body, b"cached");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_stores_exactly_one_copy() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&format!("{ORIGIN}/app.js"), same_origin("console.log(1)"));
        let worker = worker_with(network.clone()).await;

        let decision = intercept(&worker, Request::get("/app.js")).await;
        assert_eq!(decision.source(), Some(ResponseSource::Network));
        assert_eq!(decision.response().unwrap().body, b"console.log(1)");
        assert_eq!(network.calls(), 1);

        assert_eq!(worker.cache().keys(DYNAMIC).await.unwrap(), vec![format!("{ORIGIN}/app.js")]);
        assert!(!worker.cache().has_cache(STATIC).await.unwrap());

        let stored = worker.cache().match_in(DYNAMIC, &key("/app.js")).await.unwrap().unwrap();
        assert_eq!(stored.body, b"console.log(1)");
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&format!("{ORIGIN}/index.html"), same_origin("<h1>home</h1>"));
        let worker = worker_with(network.clone()).await;

        intercept(&worker, Request::get("/index.html")).await;
        let decision = intercept(&worker, Request::get("/index.html")).await;

        assert_eq!(decision.source(), Some(ResponseSource::Cache));
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_cacheable_url_not_stored() {
        let network = Arc::new(MockNetwork::new());
        network.respond(&format!("{ORIGIN}/icon-512.png"), same_origin("png"));
        let worker = worker_with(network.clone()).await;

        let decision = intercept(&worker, Request::get("/icon-512.png")).await;
        assert_eq!(decision.source(), Some(ResponseSource::Network));
        assert!(worker.cache().keys(DYNAMIC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cross_origin_or_non_200_not_stored() {
        let network = Arc::new(MockNetwork::new());
        network.respond("https://cdn.example/lib.js", same_origin("lib").with_type(ResponseType::Cors));
        network.respond(&format!("{ORIGIN}/missing.js"), Response::new(404, "nope").with_type(ResponseType::Basic));
        let worker = worker_with(network.clone()).await;

        let cors = intercept(&worker, Request::get("https://cdn.example/lib.js")).await;
        assert_eq!(cors.response().unwrap().body, b"lib");

        let missing = intercept(&worker, Request::get("/missing.js")).await;
        assert_eq!(missing.response().unwrap().status, 404);

        assert!(worker.cache().keys(DYNAMIC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_navigation_without_root_gets_offline_page() {
        let network = Arc::new(MockNetwork::new());
        let worker = worker_with(network.clone()).await;

        let decision = intercept(&worker, Request::navigate("/requests/42")).await;
        assert_eq!(decision.source(), Some(ResponseSource::OfflinePage));

        let response = decision.response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("text/html"));
        assert!(String::from_utf8_lossy(&response.body).contains(offline::OFFLINE_MARKER));
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_cached_root() {
        let network = Arc::new(MockNetwork::new());
        let worker = worker_with(network.clone()).await;
        worker.cache().put(STATIC, &key("/index.html"), &same_origin("<h1>shell</h1>")).await.unwrap();

        let decision = intercept(&worker, Request::navigate("/requests/42")).await;
        assert_eq!(decision.source(), Some(ResponseSource::RootDocument));
        assert_eq!(decision.response().unwrap().body, b"<h1>shell</h1>");
    }

    #[tokio::test]
    async fn test_offline_subresource_without_cache_fails() {
        let network = Arc::new(MockNetwork::new());
        network.fail(&format!("{ORIGIN}/data.json"), "connection reset");
        let worker = worker_with(network.clone()).await;

        let decision = intercept(&worker, Request::get("/data.json")).await;
        let FetchDecision::Failed { code, message } = decision else { panic!("expected failure") };
        assert_eq!(code, -32010);
        assert!(message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_offline_frame_navigation_is_not_given_the_shell() {
        let network = Arc::new(MockNetwork::new());
        let worker = worker_with(network.clone()).await;
        worker.cache().put(STATIC, &key("/index.html"), &same_origin("<h1>shell</h1>")).await.unwrap();

        let request = Request { destination: Destination::Iframe, mode: RequestMode::Navigate, ..Request::get("/embed/report") };
        let decision = intercept(&worker, request).await;
        assert!(matches!(decision, FetchDecision::Failed { .. }), "got {decision:?}");
    }

    #[tokio::test]
    async fn test_fallback_lookup_serves_entry_stored_during_fetch() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(StoredWhileFetching { cache: cache.clone(), response: same_origin("late copy") });
        let worker = worker_over(cache, network);

        let decision = intercept(&worker, Request::get("/report.css")).await;
        assert_eq!(decision.source(), Some(ResponseSource::FallbackCache));
        assert_eq!(decision.response().unwrap().body, b"late copy");
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_counts_as_miss() {
        let dir = std::env::temp_dir().join(format!("haven-intercept-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.sqlite");
        let _ = std::fs::remove_file(&path);

        let network = Arc::new(MockNetwork::new());
        network.respond(&format!("{ORIGIN}/app.js"), same_origin("fresh"));
        let cache = CacheDb::open(&path).await.unwrap();
        let worker = worker_over(cache, network.clone());
        worker.cache().put(STATIC, &key("/app.js"), &same_origin("stale")).await.unwrap();

        let raw = tokio_rusqlite::rusqlite::Connection::open(&path).unwrap();
        raw.execute("UPDATE cache_entries SET headers_json = 'not json'", []).unwrap();
        drop(raw);
        assert!(worker.cache().match_any(&key("/app.js")).await.is_err());

        let decision = intercept(&worker, Request::get("/app.js")).await;
        assert_eq!(decision.source(), Some(ResponseSource::Network));
        assert_eq!(decision.response().unwrap().body, b"fresh");
        assert_eq!(network.calls(), 1);
    }
}

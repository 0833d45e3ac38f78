//! Test doubles shared by the handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use haven_client::Network;
use haven_core::{CacheDb, Error, Request, Response, WorkerConfig};

use crate::handler::Worker;

pub const ORIGIN: &str = "https://app.example";

/// Network with canned per-URL results. Unknown URLs fail like an
/// unreachable host.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Result<Response, String>>>,
    requested: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), Ok(response));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requested.lock().unwrap().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url.clone());

        match self.routes.lock().unwrap().get(&request.url) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(Error::Network(message.clone())),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

/// A worker with default configuration, the test origin, and an in-memory cache.
pub async fn worker_with(network: Arc<dyn Network>) -> Worker {
    worker_over(CacheDb::open_in_memory().await.unwrap(), network)
}

/// Like `worker_with`, over a cache the test opened itself.
pub fn worker_over(cache: CacheDb, network: Arc<dyn Network>) -> Worker {
    let config = WorkerConfig { origin: ORIGIN.to_string(), ..Default::default() };
    Worker::new(Arc::new(config), cache, network).unwrap()
}

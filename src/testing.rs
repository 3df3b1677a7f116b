//! In-memory upstream for exercising the resolver and chart pipeline
//! without network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::Upstream;
use crate::error::EvolutionError;

#[derive(Default)]
pub struct FakeUpstream {
    bodies: HashMap<String, Vec<u8>>,
    failing: HashMap<String, EvolutionError>,
    delay: Option<Duration>,
    requests: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`; a trailing slash on either side is ignored.
    pub fn with_json(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(canonical(url), body.as_bytes().to_vec());
        self
    }

    pub fn with_failure(mut self, url: &str, error: EvolutionError) -> Self {
        self.failing.insert(canonical(url), error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.get(&canonical(url)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.values().sum())
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, EvolutionError> {
        let key = canonical(url);
        if let Ok(mut requests) = self.requests.lock() {
            *requests.entry(key.clone()).or_default() += 1;
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.failing.get(&key) {
            return Err(error.clone());
        }
        self.bodies
            .get(&key)
            .cloned()
            .ok_or_else(|| EvolutionError::NotFound(url.to_string()))
    }
}

fn canonical(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

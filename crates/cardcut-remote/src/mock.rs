use crate::{Fetcher, RemoteError};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory fetcher that serves preloaded bodies and records every call.
///
/// Unknown URLs fail with [`RemoteError::NotFound`], mirroring a 404.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: &str, body: &[u8]) {
        self.bodies.insert(url.to_owned(), body.to_vec());
    }

    /// Every URL requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn fetch_count_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|u| *u == url).count())
            .unwrap_or_default()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_owned());
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(url.to_owned()))
    }
}

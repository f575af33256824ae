//! Fetching sprite sheets and sub-manifests for cardcut.
//!
//! This crate provides the [`Fetcher`] seam (fetch bytes or fail), its HTTP
//! implementation on top of `ureq`, an in-memory [`mock::MemoryFetcher`] for
//! tests and offline runs, the remote manifest configuration, and the
//! fetch-if-absent transfers that fill the local caches.

pub mod config;
pub mod http;
pub mod mock;
pub mod transfer;

pub use config::{RemoteConfig, DEFAULT_MANIFEST_BASE};
pub use http::HttpFetcher;
pub use mock::MemoryFetcher;
pub use transfer::{ensure_manifest, ensure_sprite, ManifestTransfer, Transfer};

/// `User-Agent` sent on every HTTP request.
pub const USER_AGENT: &str = concat!("cardcut/", env!("CARGO_PKG_VERSION"));

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(#[from] cardcut_store::StoreError),
    #[error("remote config error: {0}")]
    Config(String),
}

/// Fetch the body at a URL, or fail.
///
/// Any non-success status is an error; there is no retry.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        (**self).fetch(url)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for Box<T> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        (**self).fetch(url)
    }
}

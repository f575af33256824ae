use crate::layout::DataLayout;
use crate::{write_atomic, StoreError};
use std::path::PathBuf;

/// Content-addressed cache of downloaded sprite sheets.
///
/// Entries are keyed by the blake3 digest of the source URL, so the cache
/// path of a sheet is a pure function of its URL regardless of which card
/// refers to it. Cached content is never re-validated against the remote.
pub struct SpriteCache {
    layout: DataLayout,
}

impl SpriteCache {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    /// Stable cache key for a sheet URL.
    pub fn key(url: &str) -> String {
        blake3::hash(url.as_bytes()).to_hex().to_string()
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.layout
            .sprite_cache_dir()
            .join(format!("{}.jpg", Self::key(url)))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.path_for(url).is_file()
    }

    /// Store downloaded sheet bytes and return the cache path.
    pub fn put(&self, url: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        let dest = self.path_for(url);
        write_atomic(&self.layout.sprite_cache_dir(), &dest, data)?;
        tracing::debug!("cached sheet {url} -> {}", dest.display());
        Ok(dest)
    }
}

use crate::{Fetcher, RemoteConfig, RemoteError};
use cardcut_schema::RefPath;
use cardcut_store::{ManifestCache, SpriteCache};
use std::path::PathBuf;

/// Outcome of a fetch-if-absent transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub path: PathBuf,
    /// `false` when the cache already held the entry.
    pub fetched: bool,
}

/// Make sure the sheet at `url` is in the sprite cache.
///
/// Fetches only when no cache entry exists. The local path is returned
/// either way. A failed fetch leaves the cache untouched.
pub fn ensure_sprite(
    cache: &SpriteCache,
    fetcher: &dyn Fetcher,
    url: &str,
) -> Result<Transfer, RemoteError> {
    if cache.contains(url) {
        tracing::debug!("sheet cached: {url}");
        return Ok(Transfer {
            path: cache.path_for(url),
            fetched: false,
        });
    }
    if url.trim().is_empty() {
        return Err(RemoteError::Config("sheet URL is empty".to_owned()));
    }

    tracing::info!("downloading sheet {url}");
    let data = fetcher.fetch(url)?;
    let path = cache.put(url, &data)?;
    Ok(Transfer {
        path,
        fetched: true,
    })
}

/// A sub-manifest document, either read from the cache or freshly fetched.
#[derive(Debug, Clone)]
pub struct ManifestTransfer {
    pub data: Vec<u8>,
    pub path: PathBuf,
    pub fetched: bool,
}

/// Read a referenced manifest from the cache, fetching and persisting it
/// verbatim on a miss.
pub fn ensure_manifest(
    cache: &ManifestCache,
    fetcher: &dyn Fetcher,
    config: &RemoteConfig,
    reference: &RefPath,
) -> Result<ManifestTransfer, RemoteError> {
    let path = cache.path_for(reference)?;
    if let Some(data) = cache.get(reference)? {
        tracing::debug!("manifest cached: {reference}");
        return Ok(ManifestTransfer {
            data,
            path,
            fetched: false,
        });
    }

    let url = config.reference_url(reference)?;
    tracing::info!("downloading manifest {url}");
    let data = fetcher.fetch(&url)?;
    let path = cache.put(reference, &data)?;
    Ok(ManifestTransfer {
        data,
        path,
        fetched: true,
    })
}

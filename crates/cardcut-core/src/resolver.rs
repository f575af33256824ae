use crate::CoreError;
use cardcut_remote::{ensure_manifest, Fetcher, RemoteConfig};
use cardcut_schema::{parse_manifest_file, parse_manifest_slice, Manifest, RefPath};
use cardcut_store::{DataLayout, ManifestCache};
use std::path::Path;
use tracing::{debug, info};

/// Loads the root save file from disk and referenced sub-manifests from the
/// manifest cache or the remote object repository.
pub struct ManifestResolver<'a> {
    cache: ManifestCache,
    config: &'a RemoteConfig,
    fetcher: &'a dyn Fetcher,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(layout: DataLayout, config: &'a RemoteConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            cache: ManifestCache::new(layout),
            config,
            fetcher,
        }
    }

    /// Read and parse a local save file. The root is never cached.
    pub fn load_root(&self, path: &Path) -> Result<Manifest, CoreError> {
        info!("loading manifest {}", path.display());
        Ok(parse_manifest_file(path)?)
    }

    /// Resolve a reference against the cache, fetching it on a miss.
    ///
    /// A cached document is trusted as-is; there is no expiry.
    pub fn load_reference(&self, reference: &RefPath) -> Result<Manifest, CoreError> {
        let transfer = ensure_manifest(&self.cache, self.fetcher, self.config, reference)?;
        if !transfer.fetched {
            debug!("using cached manifest {}", transfer.path.display());
        }
        Ok(parse_manifest_slice(&transfer.data)?)
    }
}

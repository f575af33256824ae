use crate::layout::DataLayout;
use crate::{write_atomic, StoreError};
use cardcut_schema::RefPath;
use std::fs;
use std::path::PathBuf;

/// Cache of remote sub-manifests, keyed by reference path.
///
/// Entries never expire: a manifest fetched once stays valid for the
/// lifetime of the data root.
pub struct ManifestCache {
    layout: DataLayout,
}

impl ManifestCache {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    /// Flatten a reference path into a single file name.
    ///
    /// Path separators become `_`; a leading separator is dropped. Empty
    /// references and references containing `..` are rejected so a cache
    /// entry can never land outside the cache directory.
    pub fn cache_name(reference: &RefPath) -> Result<String, StoreError> {
        let trimmed = reference.trim().trim_start_matches(['/', '\\']);
        if trimmed.is_empty() || trimmed.split(['/', '\\']).any(|seg| seg == "..") {
            return Err(StoreError::InvalidReference(reference.to_string()));
        }
        Ok(trimmed.replace(['/', '\\'], "_"))
    }

    pub fn path_for(&self, reference: &RefPath) -> Result<PathBuf, StoreError> {
        Ok(self
            .layout
            .manifest_cache_dir()
            .join(Self::cache_name(reference)?))
    }

    /// Cached bytes for `reference`, or `None` if it was never fetched.
    pub fn get(&self, reference: &RefPath) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(reference)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    /// Persist a fetched manifest verbatim.
    pub fn put(&self, reference: &RefPath, data: &[u8]) -> Result<PathBuf, StoreError> {
        let dest = self.path_for(reference)?;
        write_atomic(&self.layout.manifest_cache_dir(), &dest, data)?;
        Ok(dest)
    }
}

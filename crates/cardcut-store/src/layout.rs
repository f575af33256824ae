use crate::StoreError;
use std::fs;
use std::path::PathBuf;

/// Directory layout under a cardcut data root.
///
/// ```text
/// <root>/sprite_cache/    downloaded sheets, one per distinct URL
/// <root>/manifest_cache/  fetched sub-manifests, one per reference path
/// <root>/cards/           extracted card images
/// <root>/.lock            single-runner lock
/// ```
///
/// Subdirectories are created on [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn sprite_cache_dir(&self) -> PathBuf {
        self.root.join("sprite_cache")
    }

    #[inline]
    pub fn manifest_cache_dir(&self) -> PathBuf {
        self.root.join("manifest_cache")
    }

    #[inline]
    pub fn cards_dir(&self) -> PathBuf {
        self.root.join("cards")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.sprite_cache_dir())?;
        fs::create_dir_all(self.manifest_cache_dir())?;
        fs::create_dir_all(self.cards_dir())?;
        Ok(())
    }
}

//! On-disk state for cardcut: the data-root layout, the content-addressed
//! sprite-sheet cache, the manifest cache, and the extracted card files.
//!
//! Every file this crate publishes is written to a temporary file in the
//! destination directory, synced, and renamed into place, so a reader never
//! observes a partially written cache entry or card.

pub mod cards;
pub mod layout;
pub mod manifests;
pub mod sprites;

pub use cards::CardStore;
pub use layout::DataLayout;
pub use manifests::ManifestCache;
pub use sprites::SpriteCache;

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee that a rename survives a crash until the parent
/// directory itself has been synced.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Write `data` to `dest` through a temporary file in `dir`.
///
/// `dest` either does not exist or holds all of `data`; there is no
/// intermediate state visible under that name.
pub(crate) fn write_atomic(dir: &Path, dest: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid manifest reference: '{0}'")]
    InvalidReference(String),
    #[error("invalid card id: '{0}'")]
    InvalidCardId(String),
}

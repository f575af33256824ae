//! Core extraction engine for cardcut.
//!
//! This crate ties together save-file parsing, the on-disk caches, and the
//! remote fetcher into the [`Pipeline`]: resolve the root manifest and every
//! sub-manifest it references, download each sprite sheet once, and cut every
//! card face into its own PNG. It also provides the grid arithmetic, the run
//! lock that keeps two runners off one data root, and interrupt handling.

pub mod concurrency;
pub mod extract;
pub mod grid;
pub mod pipeline;
pub mod resolver;

pub use concurrency::{install_signal_handler, shutdown_requested, RunLock};
pub use extract::{
    CardError, CardNode, ExtractOutcome, ExtractReport, Extractor, FaceOutcome, PassKind,
};
pub use grid::{cell_rect, deck_id, grid_index, CellRect, GeometryError, GridSpec};
pub use pipeline::{Pipeline, ReferenceReport, RunReport};
pub use resolver::ManifestResolver;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] cardcut_schema::ManifestError),
    #[error("{0}")]
    Traverse(#[from] cardcut_schema::TraverseError),
    #[error("store error: {0}")]
    Store(#[from] cardcut_store::StoreError),
    #[error("remote error: {0}")]
    Remote(#[from] cardcut_remote::RemoteError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interrupted")]
    Interrupted,
}

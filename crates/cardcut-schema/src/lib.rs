//! Save-file parsing, card metadata, and object tree traversal for cardcut.
//!
//! This crate defines the schema layer: the subset of the Tabletop Simulator
//! save format the extractor reads (`Manifest`, `ObjectNode`,
//! `SheetDescriptor`), lazily-parsed card metadata (`CardMetadata`), the
//! recursive card walk (`traverse`), and discovery of the player-card bag and
//! of references to remote sub-manifests.

pub mod manifest;
pub mod metadata;
pub mod traverse;
pub mod types;

pub use manifest::{
    parse_manifest_file, parse_manifest_slice, parse_manifest_str, CustomDeck, Manifest,
    ManifestError, ObjectNode, SheetDescriptor,
};
pub use metadata::CardMetadata;
pub use traverse::{
    classify, find_player_cards, find_references, traverse, try_traverse,
    CardFilter, NodeKind, Reference, ReferenceMarkers, TraverseError, LOCATION_TAG,
    PLAYER_CARDS_NICKNAME,
};
pub use types::{CardIdentity, RefPath};

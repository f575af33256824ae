//! Object tree traversal and discovery of sub-roots inside a manifest.
//!
//! The tree is heterogeneous: every node is classified as a card, a container
//! of further nodes, or something to ignore. [`traverse`] is the single
//! recursive walk; everything that happens to a card happens in the visitor.

use crate::manifest::{Manifest, ObjectNode};
use crate::types::RefPath;
use thiserror::Error;

/// Nickname of the top-level bag holding every player card.
pub const PLAYER_CARDS_NICKNAME: &str = "All Player Cards";

/// Tag that marks encounter locations, whose backs are always fetched.
pub const LOCATION_TAG: &str = "Location";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraverseError {
    #[error("no top-level object named '{0}' in manifest")]
    PlayerCardsNotFound(String),
    #[error("{count} top-level objects named '{name}' in manifest, expected exactly one")]
    AmbiguousPlayerCards { name: String, count: usize },
}

/// Decides which nodes are cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFilter {
    pub name: String,
    /// A card must carry at least one of these tags.
    pub tags: Vec<String>,
}

impl Default for CardFilter {
    fn default() -> Self {
        Self {
            name: "Card".to_owned(),
            tags: vec![
                "PlayerCard".to_owned(),
                "ScenarioCard".to_owned(),
                "Minicard".to_owned(),
            ],
        }
    }
}

impl CardFilter {
    pub fn is_card(&self, node: &ObjectNode) -> bool {
        node.name == self.name && self.tags.iter().any(|t| node.has_tag(t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Card,
    Container(&'a [ObjectNode]),
    Other,
}

pub fn classify<'a>(node: &'a ObjectNode, filter: &CardFilter) -> NodeKind<'a> {
    if filter.is_card(node) {
        return NodeKind::Card;
    }
    match node.contained_objects.as_deref() {
        Some(children) => NodeKind::Container(children),
        None => NodeKind::Other,
    }
}

/// Depth-first, pre-order walk over `nodes` in document order.
///
/// Cards are handed to `visit` and not descended into. Containers are
/// descended into. Everything else is skipped.
pub fn traverse<'a, F>(nodes: &'a [ObjectNode], filter: &CardFilter, visit: &mut F)
where
    F: FnMut(&'a ObjectNode),
{
    for node in nodes {
        match classify(node, filter) {
            NodeKind::Card => visit(node),
            NodeKind::Container(children) => traverse(children, filter, visit),
            NodeKind::Other => {}
        }
    }
}

/// Like [`traverse`], but stops at the first error returned by `visit`.
pub fn try_traverse<'a, F, E>(
    nodes: &'a [ObjectNode],
    filter: &CardFilter,
    visit: &mut F,
) -> Result<(), E>
where
    F: FnMut(&'a ObjectNode) -> Result<(), E>,
{
    for node in nodes {
        match classify(node, filter) {
            NodeKind::Card => visit(node)?,
            NodeKind::Container(children) => try_traverse(children, filter, visit)?,
            NodeKind::Other => {}
        }
    }
    Ok(())
}

/// Locate the unique top-level "All Player Cards" object.
pub fn find_player_cards(manifest: &Manifest) -> Result<&ObjectNode, TraverseError> {
    let mut matches = manifest
        .object_states
        .iter()
        .filter(|o| o.nickname == PLAYER_CARDS_NICKNAME);
    let first = matches
        .next()
        .ok_or_else(|| TraverseError::PlayerCardsNotFound(PLAYER_CARDS_NICKNAME.to_owned()))?;
    let extra = matches.count();
    if extra > 0 {
        return Err(TraverseError::AmbiguousPlayerCards {
            name: PLAYER_CARDS_NICKNAME.to_owned(),
            count: extra + 1,
        });
    }
    Ok(first)
}

/// Substrings that identify objects standing in for remote sub-manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMarkers {
    /// Found in the `GMNotes` of a top-level campaign reference.
    pub campaign: String,
    /// Found in the `Nickname` of a standalone-scenario container.
    pub standalone: String,
}

impl Default for ReferenceMarkers {
    fn default() -> Self {
        Self {
            campaign: "campaigns/".to_owned(),
            standalone: "Standalone Scenarios".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Campaign(RefPath),
    Scenario(RefPath),
}

impl Reference {
    pub fn path(&self) -> &RefPath {
        match self {
            Self::Campaign(p) | Self::Scenario(p) => p,
        }
    }
}

/// Scan the top level of `manifest` for campaign and standalone-scenario
/// references, in document order. Campaigns come first; each path is
/// reported once.
pub fn find_references(manifest: &Manifest, markers: &ReferenceMarkers) -> Vec<Reference> {
    let mut refs: Vec<Reference> = Vec::new();
    let mut push = |reference: Reference| {
        if !refs.iter().any(|r| r.path() == reference.path()) {
            refs.push(reference);
        }
    };

    for state in &manifest.object_states {
        if state.gm_notes.contains(&markers.campaign) {
            push(Reference::Campaign(RefPath::new(state.gm_notes.trim())));
        }
    }

    for state in &manifest.object_states {
        if !state.nickname.contains(&markers.standalone) {
            continue;
        }
        // container -> group -> scenario
        for group in state.children() {
            for scenario in group.children() {
                let path = scenario.gm_notes.trim();
                if !path.is_empty() {
                    push(Reference::Scenario(RefPath::new(path)));
                }
            }
        }
    }

    refs
}

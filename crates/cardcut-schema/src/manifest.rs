use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::ops::Index;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("manifest document must be a JSON object")]
    NotAnObject,
}

/// A parsed save file: the ordered list of top-level object states.
///
/// Only the fields the extractor reads are modelled; everything else in the
/// document is ignored.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Manifest {
    pub object_states: Vec<ObjectNode>,
}

/// One object in the table tree (a card, deck, bag, or anything else).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectNode {
    /// Object type name. Cards are `"Card"`.
    #[serde(default)]
    pub name: String,
    /// Display name shown on the table.
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form notes. Cards carry a JSON metadata blob here; reference
    /// objects carry the path of the sub-manifest they stand for.
    #[serde(default, rename = "GMNotes")]
    pub gm_notes: String,
    #[serde(default)]
    pub custom_deck: CustomDeck,
    #[serde(default, rename = "CardID")]
    pub card_id: Option<u64>,
    #[serde(default)]
    pub sideways_card: bool,
    #[serde(default)]
    pub contained_objects: Option<Vec<ObjectNode>>,
}

/// A sprite sheet as declared in a node's `CustomDeck` table.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SheetDescriptor {
    #[serde(default, rename = "FaceURL")]
    pub face_url: String,
    #[serde(default, rename = "BackURL")]
    pub back_url: String,
    /// Each card has its own back, laid out on the back sheet with the same grid.
    #[serde(default, rename = "UniqueBack")]
    pub unique_back: bool,
    /// Columns.
    #[serde(default, rename = "NumWidth")]
    pub num_width: u32,
    /// Rows.
    #[serde(default, rename = "NumHeight")]
    pub num_height: u32,
}

/// A node's `CustomDeck` table: deck id to sheet, in document order.
///
/// Order matters: when a card's deck id has no entry, the first entry as
/// written in the save file is its sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomDeck(Vec<(String, SheetDescriptor)>);

impl CustomDeck {
    pub fn get(&self, key: &str) -> Option<&SheetDescriptor> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The entry written first in the document.
    pub fn first(&self) -> Option<&SheetDescriptor> {
        self.0.first().map(|(_, v)| v)
    }

    /// Replace the entry for `key`, or append it.
    pub fn insert(&mut self, key: impl Into<String>, sheet: SheetDescriptor) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = sheet,
            None => self.0.push((key, sheet)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<&str> for CustomDeck {
    type Output = SheetDescriptor;

    fn index(&self, key: &str) -> &SheetDescriptor {
        match self.get(key) {
            Some(sheet) => sheet,
            None => panic!("no CustomDeck entry '{key}'"),
        }
    }
}

impl<'de> Deserialize<'de> for CustomDeck {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeckVisitor;

        impl<'de> Visitor<'de> for DeckVisitor {
            type Value = CustomDeck;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of deck ids to sheet descriptors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<CustomDeck, A::Error> {
                let mut deck = CustomDeck::default();
                while let Some((key, sheet)) = map.next_entry::<String, SheetDescriptor>()? {
                    deck.insert(key, sheet);
                }
                Ok(deck)
            }
        }

        deserializer.deserialize_map(DeckVisitor)
    }
}

impl Serialize for CustomDeck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, sheet) in &self.0 {
            map.serialize_entry(key, sheet)?;
        }
        map.end()
    }
}

impl ObjectNode {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Nested objects, or an empty slice when the node is not a container.
    pub fn children(&self) -> &[ObjectNode] {
        self.contained_objects.as_deref().unwrap_or_default()
    }
}

impl Manifest {
    /// Build a manifest from an already-parsed JSON document.
    ///
    /// A full save file has an `ObjectStates` list. A bare object (a bag or
    /// deck saved on its own) becomes a manifest with that single object.
    pub fn from_value(mut value: Value) -> Result<Self, ManifestError> {
        if !value.is_object() {
            return Err(ManifestError::NotAnObject);
        }
        if let Some(states) = value.get_mut("ObjectStates").map(Value::take) {
            return Ok(Self {
                object_states: serde_json::from_value(states)?,
            });
        }
        Ok(Self {
            object_states: vec![serde_json::from_value(value)?],
        })
    }
}

pub fn parse_manifest_slice(input: &[u8]) -> Result<Manifest, ManifestError> {
    let value: Value = serde_json::from_slice(input)?;
    Manifest::from_value(value)
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    parse_manifest_slice(input.as_bytes())
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read(path)?;
    parse_manifest_slice(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_save_file_with_object_states() {
        let input = r#"{
            "SaveName": "Arkham SCE",
            "ObjectStates": [
                {
                    "Name": "Bag",
                    "Nickname": "All Player Cards",
                    "ContainedObjects": [
                        {
                            "Name": "Card",
                            "Nickname": "Roland Banks",
                            "Tags": ["PlayerCard"],
                            "GMNotes": "{\"id\": \"01001\"}",
                            "CardID": 12303,
                            "SidewaysCard": false,
                            "CustomDeck": {
                                "123": {
                                    "FaceURL": "http://example.com/face.jpg",
                                    "BackURL": "http://example.com/back.jpg",
                                    "NumWidth": 10,
                                    "NumHeight": 7,
                                    "BackIsHidden": true,
                                    "UniqueBack": false
                                }
                            }
                        }
                    ]
                }
            ]
        }"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.object_states.len(), 1);
        let bag = &manifest.object_states[0];
        assert_eq!(bag.nickname, "All Player Cards");
        let card = &bag.children()[0];
        assert_eq!(card.name, "Card");
        assert_eq!(card.card_id, Some(12303));
        assert!(card.has_tag("PlayerCard"));
        let sheet = &card.custom_deck["123"];
        assert_eq!(sheet.num_width, 10);
        assert_eq!(sheet.num_height, 7);
        assert!(!sheet.unique_back);
    }

    #[test]
    fn custom_deck_keeps_document_order() {
        let input = r#"{"ObjectStates": [{
            "Name": "Card",
            "CustomDeck": {
                "9": {"FaceURL": "http://example.com/nine.jpg"},
                "10": {"FaceURL": "http://example.com/ten.jpg"},
                "2": {"FaceURL": "http://example.com/two.jpg"}
            }
        }]}"#;
        let manifest = parse_manifest_str(input).unwrap();
        let deck = &manifest.object_states[0].custom_deck;
        assert_eq!(deck.keys().collect::<Vec<_>>(), vec!["9", "10", "2"]);
        assert_eq!(deck.first().unwrap().face_url, "http://example.com/nine.jpg");
        assert_eq!(deck.get("2").unwrap().face_url, "http://example.com/two.jpg");
        assert!(deck.get("3").is_none());

        let back: Value = serde_json::to_value(deck).unwrap();
        assert_eq!(back["10"]["FaceURL"], "http://example.com/ten.jpg");
    }

    #[test]
    fn bare_object_becomes_single_state() {
        let input = r#"{"Name": "Custom_Model_Bag", "Nickname": "The Gathering", "ContainedObjects": []}"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.object_states.len(), 1);
        assert_eq!(manifest.object_states[0].nickname, "The Gathering");
        assert!(manifest.object_states[0].children().is_empty());
    }

    #[test]
    fn missing_optional_fields_default() {
        let manifest = parse_manifest_str(r#"{"ObjectStates": [{"Name": "Table"}]}"#).unwrap();
        let node = &manifest.object_states[0];
        assert!(node.tags.is_empty());
        assert!(node.gm_notes.is_empty());
        assert!(node.custom_deck.is_empty());
        assert_eq!(node.card_id, None);
        assert!(!node.sideways_card);
        assert!(node.contained_objects.is_none());
    }

    #[test]
    fn rejects_non_object_document() {
        assert!(matches!(
            parse_manifest_str("[1, 2, 3]"),
            Err(ManifestError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_manifest_str("{not json"),
            Err(ManifestError::ParseJson(_))
        ));
    }

    #[test]
    fn parse_manifest_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, r#"{"ObjectStates": []}"#).unwrap();
        let manifest = parse_manifest_file(&path).unwrap();
        assert!(manifest.object_states.is_empty());
    }

    #[test]
    fn parse_manifest_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_manifest_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ManifestError::Io(_))));
    }
}

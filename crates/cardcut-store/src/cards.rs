use crate::layout::DataLayout;
use crate::{write_atomic, StoreError};
use cardcut_schema::CardIdentity;
use std::path::{Path, PathBuf};

/// Extracted card images, one PNG per card face.
///
/// Presence of the file is the only completeness test: an existing output
/// is never recomputed.
pub struct CardStore {
    layout: DataLayout,
}

impl CardStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    /// Card ids come from manifest metadata and name a file directly under
    /// `cards/`: anything that could leave that directory is refused.
    pub fn validate_id(id: &CardIdentity) -> Result<(), StoreError> {
        let raw = id.as_str();
        if raw.trim().is_empty()
            || raw.contains(['/', '\\', '\0'])
            || raw.contains("..")
            || Path::new(raw).is_absolute()
        {
            return Err(StoreError::InvalidCardId(raw.to_owned()));
        }
        Ok(())
    }

    pub fn path_for(&self, id: &CardIdentity) -> Result<PathBuf, StoreError> {
        Self::validate_id(id)?;
        Ok(self.layout.cards_dir().join(format!("{id}.png")))
    }

    pub fn exists(&self, id: &CardIdentity) -> Result<bool, StoreError> {
        Ok(self.path_for(id)?.is_file())
    }

    pub fn put(&self, id: &CardIdentity, png: &[u8]) -> Result<PathBuf, StoreError> {
        let dest = self.path_for(id)?;
        write_atomic(&self.layout.cards_dir(), &dest, png)?;
        Ok(dest)
    }

    /// Identities of every extracted card face, sorted.
    pub fn list(&self) -> Result<Vec<CardIdentity>, StoreError> {
        let dir = self.layout.cards_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".png") {
                    if !stem.starts_with('.') {
                        ids.push(CardIdentity::new(stem));
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

use crate::RemoteError;
use cardcut_schema::RefPath;
use serde::{Deserialize, Serialize};

/// Where referenced sub-manifests are downloaded from.
pub const DEFAULT_MANIFEST_BASE: &str =
    "https://raw.githubusercontent.com/chr1z93/loadable-objects/main";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    pub manifest_base: String,
}

impl RemoteConfig {
    pub fn new(manifest_base: &str) -> Self {
        Self {
            manifest_base: manifest_base.trim_end_matches('/').to_owned(),
        }
    }

    /// Absolute URL of a referenced sub-manifest.
    pub fn reference_url(&self, reference: &RefPath) -> Result<String, RemoteError> {
        let path = reference.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(RemoteError::Config(format!(
                "empty manifest reference '{reference}'"
            )));
        }
        Ok(format!("{}/{path}", self.manifest_base))
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_BASE)
    }
}

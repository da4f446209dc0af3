use serde::{Deserialize, Serialize};

use super::{AssetCategory, Platform, Side};

/// Everything m3 knows about a single downloadable asset, apart from its
/// content digests.
///
/// `dependencies` are recorded as vendor project ids; m3 never resolves
/// or orders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Internal identity slug (vendor project slug or id).
    pub id: String,
    /// Human readable name. Unknown for assets discovered on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub file_name: String,
    pub category: AssetCategory,
    #[serde(default)]
    pub side: Side,
    pub platform: Platform,
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl AssetRecord {
    pub fn new(
        id: impl Into<String>,
        file_name: impl Into<String>,
        category: AssetCategory,
        platform: Platform,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            file_name: file_name.into(),
            category,
            side: Side::default(),
            platform,
            download_url: download_url.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, falling back to the file name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.file_name)
    }
}

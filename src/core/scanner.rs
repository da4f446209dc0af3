use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::core::asset::AssetCategory;
use crate::core::error::M3Result;
use crate::core::hashing::{self, DirectoryDigests, HashAlgorithm};
use crate::core::project::ProjectLayout;

/// Builds the disk-side multikey index of each category directory, using
/// the same key layout as [`crate::core::lockfile::Lockfile::index_for`].
#[derive(Debug, Clone)]
pub struct DirectoryStateScanner {
    algorithms: Vec<HashAlgorithm>,
}

impl Default for DirectoryStateScanner {
    fn default() -> Self {
        Self {
            algorithms: HashAlgorithm::ALL.to_vec(),
        }
    }
}

impl DirectoryStateScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan_dir(&self, dir: &Path) -> M3Result<DirectoryDigests> {
        hashing::compute_directory_digests(dir, &self.algorithms)
    }

    /// Scan every category directory of a project.
    pub fn scan(&self, layout: &ProjectLayout) -> M3Result<BTreeMap<AssetCategory, DirectoryDigests>> {
        let mut states = BTreeMap::new();
        for category in AssetCategory::ALL {
            let state = self.scan_dir(layout.dir(category))?;
            info!("Scanned {} {} files", state.index.len(), category);
            states.insert(category, state);
        }
        Ok(states)
    }
}

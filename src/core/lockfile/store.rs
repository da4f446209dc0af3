use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LockfileEntry;
use crate::core::asset::{AssetCategory, AssetKey};
use crate::core::error::{M3Error, M3Result};
use crate::core::hashing::HashAlgorithm;
use crate::core::index::MultiKeyIndex;

pub const LOCKFILE_FILENAME: &str = "m3.lock.json";

/// Declared asset state of a project, keyed by file name.
///
/// Persisted as `m3.lock.json` next to `m3.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, LockfileEntry>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a lockfile, or `None` if there is none at `path`.
    pub fn load(path: &Path) -> M3Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(M3Error::io(path, e)),
        };

        let parsed: Lockfile =
            serde_json::from_str(&raw).map_err(|source| M3Error::MalformedLockfile {
                path: path.to_path_buf(),
                source,
            })?;

        // Rekey on the recorded file name so the map key can never drift
        // from the entry it holds.
        let mut entries = BTreeMap::new();
        for entry in parsed.entries.into_values() {
            let file_name = entry.asset.file_name.clone();
            if entries.insert(file_name.clone(), entry).is_some() {
                return Err(M3Error::MalformedLockfile {
                    path: path.to_path_buf(),
                    source: serde::de::Error::custom(format!(
                        "file name {file_name} is recorded more than once"
                    )),
                });
            }
        }

        debug!("Loaded lockfile {:?}", path);
        Ok(Some(Self {
            updated_at: parsed.updated_at,
            entries,
        }))
    }

    /// Write the lockfile through a temporary sibling and rename it into place.
    pub fn save(&mut self, path: &Path) -> M3Result<()> {
        self.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| M3Error::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, path).map_err(|e| M3Error::io(path, e))?;

        debug!("Saved lockfile with {} entries to {:?}", self.entries.len(), path);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, file_name: &str) -> Option<&LockfileEntry> {
        self.entries.get(file_name)
    }

    pub fn get_mut(&mut self, file_name: &str) -> Option<&mut LockfileEntry> {
        self.entries.get_mut(file_name)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.contains_key(file_name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LockfileEntry> {
        self.entries.values()
    }

    pub fn entries_in(&self, category: AssetCategory) -> impl Iterator<Item = &LockfileEntry> {
        self.entries
            .values()
            .filter(move |entry| entry.asset.category == category)
    }

    /// Insert a new entry; an existing entry with the same file name is a conflict.
    pub fn add(&mut self, entry: LockfileEntry) -> M3Result<()> {
        let file_name = entry.asset.file_name.clone();
        if self.entries.contains_key(&file_name) {
            return Err(M3Error::IdentityConflict(file_name));
        }
        self.entries.insert(file_name, entry);
        Ok(())
    }

    pub fn remove(&mut self, file_name: &str) -> M3Result<LockfileEntry> {
        self.entries
            .remove(file_name)
            .ok_or_else(|| M3Error::NotFound(file_name.to_string()))
    }

    /// Multikey view of one category, values are file names.
    pub fn index_for(&self, category: AssetCategory) -> M3Result<MultiKeyIndex<AssetKey, String>> {
        build_index(self.entries_in(category))
    }

    /// Multikey view across every category.
    pub fn identity_index(&self) -> M3Result<MultiKeyIndex<AssetKey, String>> {
        build_index(self.entries())
    }

    /// Find an entry by file name or by any known digest.
    pub fn find(&self, identifier: &str) -> M3Result<Option<&LockfileEntry>> {
        let index = self.identity_index()?;
        Ok(AssetKey::candidates(identifier)
            .iter()
            .find_map(|key| index.get(key))
            .and_then(|file_name| self.entries.get(file_name)))
    }
}

fn build_index<'a>(
    entries: impl Iterator<Item = &'a LockfileEntry>,
) -> M3Result<MultiKeyIndex<AssetKey, String>> {
    let mut index = MultiKeyIndex::new(HashAlgorithm::ALL.len() + 1);
    for entry in entries {
        index.add(entry.multikey(), entry.asset.file_name.clone())?;
    }
    Ok(index)
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::asset::{asset_multikey, AssetKey, AssetRecord, DigestSet};
use crate::core::error::{M3Error, M3Result};
use crate::core::hashing::{self, HashAlgorithm};
use crate::core::index::MultiKey;

/// One declared asset in the lockfile: the record plus its digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockfileEntry {
    pub asset: AssetRecord,
    #[serde(default)]
    pub hashes: DigestSet,
}

impl LockfileEntry {
    pub fn new(asset: AssetRecord, hashes: DigestSet) -> Self {
        Self { asset, hashes }
    }

    /// Build an entry by hashing a file already on disk.
    pub fn from_file(asset: AssetRecord, path: &Path) -> M3Result<Self> {
        let hashes = hashing::compute_digests(path, &HashAlgorithm::ALL)?;
        Ok(Self { asset, hashes })
    }

    pub fn file_name(&self) -> &str {
        &self.asset.file_name
    }

    pub fn multikey(&self) -> MultiKey<AssetKey> {
        asset_multikey(&self.asset.file_name, &self.hashes, &HashAlgorithm::ALL)
    }

    /// Compute and record every digest that is still unknown.
    ///
    /// Known digests are never recomputed or overwritten. Returns whether
    /// anything was filled in.
    pub fn populate_missing(&mut self, path: &Path) -> M3Result<bool> {
        let unknown = self.hashes.unknown(&HashAlgorithm::ALL);
        if unknown.is_empty() {
            return Ok(false);
        }
        let computed = hashing::compute_digests(path, &unknown)?;
        self.hashes.merge_missing(&computed);
        debug!(
            "Backfilled {} digests for {}",
            unknown.len(),
            self.asset.file_name
        );
        Ok(true)
    }

    /// Recompute one known digest of `path` and fail with
    /// [`M3Error::DigestMismatch`] if it differs.
    pub fn check_integrity(&self, path: &Path) -> M3Result<()> {
        if !path.exists() {
            return Err(M3Error::FileNotFound(path.to_path_buf()));
        }
        let (algorithm, expected) = self
            .hashes
            .preferred()
            .ok_or_else(|| M3Error::Unverifiable(self.asset.file_name.clone()))?;

        let actual = hashing::hash_file(path, algorithm)?;
        if actual != expected {
            return Err(M3Error::DigestMismatch {
                path: path.to_path_buf(),
                algorithm,
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Whether `path` matches the recorded digest.
    pub fn verify(&self, path: &Path) -> M3Result<bool> {
        match self.check_integrity(path) {
            Ok(()) => Ok(true),
            Err(M3Error::DigestMismatch { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

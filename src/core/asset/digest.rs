use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::hashing::HashAlgorithm;

/// Known content digests of an asset, by algorithm.
///
/// An algorithm that is absent from the map is unknown. Values are stored as
/// lowercase hex so comparisons never depend on how a vendor formatted them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<HashAlgorithm, String>")]
pub struct DigestSet(BTreeMap<HashAlgorithm, String>);

impl DigestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.0.get(&algorithm).map(String::as_str)
    }

    pub fn contains(&self, algorithm: HashAlgorithm) -> bool {
        self.0.contains_key(&algorithm)
    }

    /// Record a digest, replacing whatever was there.
    pub fn insert(&mut self, algorithm: HashAlgorithm, hex: impl Into<String>) {
        self.0.insert(algorithm, hex.into().to_ascii_lowercase());
    }

    /// Algorithms from `wanted` that have no digest yet.
    pub fn unknown(&self, wanted: &[HashAlgorithm]) -> Vec<HashAlgorithm> {
        HashAlgorithm::canonical(wanted)
            .into_iter()
            .filter(|alg| !self.contains(*alg))
            .collect()
    }

    /// Fill unknown digests from `other`, keeping every known one.
    pub fn merge_missing(&mut self, other: &DigestSet) {
        for (algorithm, hex) in &other.0 {
            self.0.entry(*algorithm).or_insert_with(|| hex.clone());
        }
    }

    /// First known digest in verification preference order.
    pub fn preferred(&self) -> Option<(HashAlgorithm, &str)> {
        HashAlgorithm::VERIFY_PREFERENCE
            .iter()
            .find_map(|alg| self.get(*alg).map(|hex| (*alg, hex)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HashAlgorithm, &str)> {
        self.0.iter().map(|(alg, hex)| (*alg, hex.as_str()))
    }
}

impl From<BTreeMap<HashAlgorithm, String>> for DigestSet {
    fn from(map: BTreeMap<HashAlgorithm, String>) -> Self {
        map.into_iter().collect()
    }
}

impl FromIterator<(HashAlgorithm, String)> for DigestSet {
    fn from_iter<I: IntoIterator<Item = (HashAlgorithm, String)>>(iter: I) -> Self {
        let mut set = DigestSet::new();
        for (algorithm, hex) in iter {
            set.insert(algorithm, hex);
        }
        set
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::M3Error;

/// Content digest algorithms m3 records for assets.
///
/// Variants are declared in name order, so the derived `Ord` is the
/// canonical order used to lay out multikey tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm, in canonical order.
    pub const ALL: [HashAlgorithm; 3] = [HashAlgorithm::Md5, HashAlgorithm::Sha1, HashAlgorithm::Sha512];

    /// Preference when a single digest is enough to check integrity.
    pub const VERIFY_PREFERENCE: [HashAlgorithm; 3] =
        [HashAlgorithm::Sha512, HashAlgorithm::Sha1, HashAlgorithm::Md5];

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Sort and dedup a caller-supplied algorithm list into canonical order.
    pub fn canonical(algorithms: &[HashAlgorithm]) -> Vec<HashAlgorithm> {
        let mut sorted = algorithms.to_vec();
        sorted.sort();
        sorted.dedup();
        sorted
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = M3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(M3Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_by_name() {
        let order = HashAlgorithm::canonical(&[
            HashAlgorithm::Sha512,
            HashAlgorithm::Md5,
            HashAlgorithm::Sha1,
            HashAlgorithm::Md5,
        ]);
        let names: Vec<_> = order.iter().map(|a| a.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(order, HashAlgorithm::ALL.to_vec());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("SHA1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }
}

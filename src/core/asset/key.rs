use std::fmt;

use super::DigestSet;
use crate::core::hashing::HashAlgorithm;
use crate::core::index::MultiKey;

/// One of the equivalent handles an asset can be addressed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKey {
    FileName(String),
    Digest(HashAlgorithm, String),
    /// Placeholder for a digest not computed yet. Carries the file name so
    /// it stays unique per record and never equals a disk-derived key.
    Pending(HashAlgorithm, String),
}

impl AssetKey {
    pub fn file_name(&self) -> Option<&str> {
        match self {
            AssetKey::FileName(name) => Some(name),
            _ => None,
        }
    }

    /// Every key a user-supplied identifier could stand for.
    pub fn candidates(identifier: &str) -> Vec<AssetKey> {
        let mut keys = vec![AssetKey::FileName(identifier.to_string())];
        let hex = identifier.to_ascii_lowercase();
        keys.extend(
            HashAlgorithm::ALL
                .iter()
                .map(|alg| AssetKey::Digest(*alg, hex.clone())),
        );
        keys
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKey::FileName(name) => write!(f, "{name}"),
            AssetKey::Digest(alg, hex) => write!(f, "{alg}:{hex}"),
            AssetKey::Pending(alg, name) => write!(f, "{alg}:<unknown for {name}>"),
        }
    }
}

/// Build the `(file name, digest...)` tuple for an asset.
///
/// Both the lockfile view and the disk view go through here, so their tuples
/// share one layout and compare equal when the contents match.
pub fn asset_multikey(
    file_name: &str,
    digests: &DigestSet,
    algorithms: &[HashAlgorithm],
) -> MultiKey<AssetKey> {
    let mut keys = vec![AssetKey::FileName(file_name.to_string())];
    for algorithm in HashAlgorithm::canonical(algorithms) {
        keys.push(match digests.get(algorithm) {
            Some(hex) => AssetKey::Digest(algorithm, hex.to_string()),
            None => AssetKey::Pending(algorithm, file_name.to_string()),
        });
    }
    MultiKey::new(keys)
}

/// File name carried by a multikey built with [`asset_multikey`].
pub fn multikey_file_name(multikey: &MultiKey<AssetKey>) -> Option<&str> {
    multikey.nth(0).and_then(AssetKey::file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_layout_ignores_caller_order() {
        let digests: DigestSet = [
            (HashAlgorithm::Sha1, "s1".to_string()),
            (HashAlgorithm::Md5, "m5".to_string()),
            (HashAlgorithm::Sha512, "s5".to_string()),
        ]
        .into_iter()
        .collect();

        let a = asset_multikey("a.jar", &digests, &[HashAlgorithm::Sha512, HashAlgorithm::Md5, HashAlgorithm::Sha1]);
        let b = asset_multikey("a.jar", &digests, &HashAlgorithm::ALL);
        assert_eq!(a, b);
        assert_eq!(multikey_file_name(&a), Some("a.jar"));
        assert_eq!(a.nth(1), Some(&AssetKey::Digest(HashAlgorithm::Md5, "m5".into())));
    }

    #[test]
    fn unknown_digest_becomes_pending() {
        let digests: DigestSet = [(HashAlgorithm::Sha1, "s1".to_string())].into_iter().collect();
        let key = asset_multikey("a.jar", &digests, &HashAlgorithm::ALL);
        assert_eq!(
            key.nth(1),
            Some(&AssetKey::Pending(HashAlgorithm::Md5, "a.jar".into()))
        );
    }

    #[test]
    fn candidates_cover_name_and_digests() {
        let keys = AssetKey::candidates("ABC");
        assert_eq!(keys[0], AssetKey::FileName("ABC".into()));
        assert!(keys.contains(&AssetKey::Digest(HashAlgorithm::Sha1, "abc".into())));
        assert_eq!(keys.len(), 1 + HashAlgorithm::ALL.len());
    }
}

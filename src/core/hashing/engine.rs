use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::Sha512;
use tracing::{debug, warn};

use super::HashAlgorithm;
use crate::core::asset::{asset_multikey, AssetKey, DigestSet};
use crate::core::error::{M3Error, M3Result};
use crate::core::index::MultiKeyIndex;

/// File extensions treated as managed assets inside category directories.
pub const ASSET_EXTENSIONS: [&str; 2] = ["jar", "zip"];

/// A single file that could not be indexed during a directory scan.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: M3Error,
}

/// Result of hashing every asset file in one directory.
#[derive(Debug)]
pub struct DirectoryDigests {
    pub index: MultiKeyIndex<AssetKey, PathBuf>,
    pub failures: Vec<ScanFailure>,
}

/// Hex digest of a file, streamed through the hasher.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> M3Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => stream_digest::<Md5>(path),
        HashAlgorithm::Sha1 => stream_digest::<Sha1>(path),
        HashAlgorithm::Sha512 => stream_digest::<Sha512>(path),
    }
}

fn stream_digest<D: Digest + Write>(path: &Path) -> M3Result<String> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = D::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| M3Error::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn open_error(path: &Path, source: io::Error) -> M3Error {
    if source.kind() == io::ErrorKind::NotFound {
        M3Error::FileNotFound(path.to_path_buf())
    } else {
        M3Error::io(path, source)
    }
}

/// Compute a digest for every requested algorithm, one pass per algorithm.
pub fn compute_digests(path: &Path, algorithms: &[HashAlgorithm]) -> M3Result<DigestSet> {
    let mut digests = DigestSet::new();
    for algorithm in HashAlgorithm::canonical(algorithms) {
        digests.insert(algorithm, hash_file(path, algorithm)?);
    }
    Ok(digests)
}

pub fn is_asset_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ASSET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Hash every asset file directly inside `dir` into a multikey index keyed
/// by `(file name, digest...)` in canonical algorithm order.
///
/// A missing directory yields an empty index. Files that cannot be read, or
/// whose content duplicates an already indexed file, are reported in
/// `failures` instead of aborting the scan.
pub fn compute_directory_digests(
    dir: &Path,
    algorithms: &[HashAlgorithm],
) -> M3Result<DirectoryDigests> {
    let algorithms = HashAlgorithm::canonical(algorithms);
    let mut scan = DirectoryDigests {
        index: MultiKeyIndex::new(algorithms.len() + 1),
        failures: Vec::new(),
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Asset directory {:?} does not exist yet", dir);
            return Ok(scan);
        }
        Err(e) => return Err(M3Error::io(dir, e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| M3Error::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_asset_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                warn!("Skipping asset with non UTF-8 name: {:?}", path);
                continue;
            }
        };

        let outcome = compute_digests(&path, &algorithms).and_then(|digests| {
            let multikey = asset_multikey(&file_name, &digests, &algorithms);
            scan.index.add(multikey, path.clone())
        });

        if let Err(error) = outcome {
            warn!("Could not index {:?}: {}", path, error);
            scan.failures.push(ScanFailure { path, error });
        }
    }

    debug!("Indexed {} assets in {:?}", scan.index.len(), dir);
    Ok(scan)
}

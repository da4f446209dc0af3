mod algorithm;
mod engine;

pub use algorithm::HashAlgorithm;
pub use engine::{
    compute_digests, compute_directory_digests, hash_file, is_asset_file, DirectoryDigests,
    ScanFailure, ASSET_EXTENSIONS,
};

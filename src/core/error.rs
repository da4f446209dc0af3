use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::hashing::HashAlgorithm;

/// Which half of an apply transaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    Staging,
    Swap,
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStage::Staging => write!(f, "staging"),
            TransactionStage::Swap => write!(f, "swap"),
        }
    }
}

/// Central error type for m3.
/// Every module returns `Result<T, M3Error>`.
#[derive(Debug, Error)]
pub enum M3Error {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    },

    #[error("No known digest to verify {0} against")]
    Unverifiable(String),

    // ── Project configuration ───────────────────────────
    #[error("Not an m3 project: no m3.json found from {0:?}")]
    ProjectNotFound(PathBuf),

    #[error("Malformed config at {path:?}: {source}")]
    MalformedConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed lockfile at {path:?}: {source}")]
    MalformedLockfile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid asset paths: {0}")]
    InvalidLayout(String),

    #[error("Unknown asset type: {0}")]
    UnknownCategory(String),

    #[error("Unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    // ── Identity ────────────────────────────────────────
    #[error("{0} already exists in lockfile")]
    IdentityConflict(String),

    #[error("Not a valid identifier: {0}")]
    NotFound(String),

    // ── Multikey index ──────────────────────────────────
    #[error("Key {0} already belongs to another record")]
    DuplicateKey(String),

    #[error("Expected {expected} keys, got {actual}")]
    KeyArity { expected: usize, actual: usize },

    #[error("Multikey {0} does not exist")]
    MultiKeyNotFound(String),

    // ── Transaction ─────────────────────────────────────
    #[error("Transaction {stage} failed at {path:?}: {source}")]
    Transaction {
        stage: TransactionStage,
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Runtime ─────────────────────────────────────────
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience alias used throughout the crate.
pub type M3Result<T> = Result<T, M3Error>;

impl M3Error {
    /// Errors that only fail the asset they belong to; a run keeps going.
    pub fn is_per_asset(&self) -> bool {
        matches!(
            self,
            M3Error::Io { .. }
                | M3Error::FileNotFound(_)
                | M3Error::Http(_)
                | M3Error::DownloadFailed { .. }
                | M3Error::DigestMismatch { .. }
                | M3Error::Unverifiable(_)
                | M3Error::DuplicateKey(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        M3Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        M3Error::Transaction {
            stage: TransactionStage::Staging,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn swap(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        M3Error::Transaction {
            stage: TransactionStage::Swap,
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for M3Error {
    fn from(source: std::io::Error) -> Self {
        M3Error::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_asset_errors_do_not_include_run_fatal_ones() {
        assert!(M3Error::DownloadFailed {
            url: "u".into(),
            status: 503
        }
        .is_per_asset());
        assert!(M3Error::Unverifiable("a.jar".into()).is_per_asset());
        assert!(!M3Error::InvalidLayout("overlap".into()).is_per_asset());
        assert!(!M3Error::swap(
            "mods",
            std::io::Error::new(std::io::ErrorKind::Other, "busy")
        )
        .is_per_asset());
    }
}

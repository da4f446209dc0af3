use std::path::Path;

use crate::core::asset::AssetCategory;
use crate::core::error::M3Error;

/// Declared-versus-disk difference for one category, sorted by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDiff {
    /// Declared in the lockfile but absent or different on disk.
    pub missing: Vec<String>,
    /// On disk but undeclared or different from the declaration.
    pub extra: Vec<String>,
}

impl CategoryDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// One asset that could not be reconciled.
#[derive(Debug)]
pub struct AssetFailure {
    pub category: AssetCategory,
    pub file_name: String,
    pub error: M3Error,
}

impl AssetFailure {
    pub(crate) fn new(category: AssetCategory, file_name: impl Into<String>, error: M3Error) -> Self {
        Self {
            category,
            file_name: file_name.into(),
            error,
        }
    }

    pub(crate) fn from_path(category: AssetCategory, path: &Path, error: M3Error) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(category, file_name, error)
    }
}

#[derive(Debug, Default)]
pub struct DiffReport {
    pub categories: Vec<(AssetCategory, CategoryDiff)>,
    pub failures: Vec<AssetFailure>,
}

impl DiffReport {
    pub fn category(&self, category: AssetCategory) -> Option<&CategoryDiff> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, diff)| diff)
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|(_, diff)| diff.missing.iter().map(String::as_str))
    }

    pub fn extra(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|(_, diff)| diff.extra.iter().map(String::as_str))
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.categories.iter().all(|(_, diff)| diff.is_clean())
    }
}

/// Outcome of an apply run. Per-asset failures never stop the run; they
/// are collected here and reported together at the end.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub installed: Vec<(AssetCategory, String)>,
    /// Declared files already present with the right content.
    pub verified: Vec<(AssetCategory, String)>,
    pub removed: Vec<(AssetCategory, String)>,
    pub failures: Vec<AssetFailure>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_for(&self, file_name: &str) -> Option<&AssetFailure> {
        self.failures.iter().find(|f| f.file_name == file_name)
    }
}

/// Outcome of recording on-disk assets into the lockfile.
#[derive(Debug, Default)]
pub struct FreezeReport {
    pub recorded: Vec<(AssetCategory, String)>,
    pub failures: Vec<AssetFailure>,
}

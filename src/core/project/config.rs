use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::asset::{AssetCategory, Platform};
use crate::core::error::{M3Error, M3Result};
use crate::core::lockfile::LOCKFILE_FILENAME;

pub const CONFIG_FILENAME: &str = "m3.json";

/// Per-category directory overrides, keyed by the category's directory
/// name (`mods`, `resourcepacks`, ...). Missing keys use the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectPaths(BTreeMap<String, PathBuf>);

impl ProjectPaths {
    /// Configured path for `category`, relative to the project root.
    pub fn path_for(&self, category: AssetCategory) -> PathBuf {
        self.0
            .get(category.dir_name())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(category.dir_name()))
    }

    pub fn set(&mut self, category: AssetCategory, path: impl Into<PathBuf>) {
        self.0.insert(category.dir_name().to_string(), path.into());
    }

    fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str).filter(|key| {
            !AssetCategory::ALL
                .iter()
                .any(|category| category.dir_name() == *key)
        })
    }
}

fn default_platform() -> Platform {
    Platform::CurseForge
}

/// The user's `m3.json` project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_platform")]
    pub platform: Platform,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub paths: ProjectPaths,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            platform: default_platform(),
            authors: Vec::new(),
            paths: ProjectPaths::default(),
        }
    }

    pub fn load(path: &Path) -> M3Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                M3Error::ProjectNotFound(path.to_path_buf())
            } else {
                M3Error::io(path, e)
            }
        })?;
        let config: ProjectConfig =
            serde_json::from_str(&raw).map_err(|source| M3Error::MalformedConfig {
                path: path.to_path_buf(),
                source,
            })?;

        for key in config.paths.unknown_keys() {
            warn!("Ignoring unknown asset path key '{}' in {:?}", key, path);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> M3Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| M3Error::io(path, e))
    }
}

/// Walk up from `start` to the first directory holding an `m3.json`.
pub fn find_project_root(start: &Path) -> M3Result<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(CONFIG_FILENAME).is_file() {
            debug!("Found project root at {:?}", dir);
            return Ok(dir.to_path_buf());
        }
    }
    Err(M3Error::ProjectNotFound(start.to_path_buf()))
}

/// Resolved on-disk layout of one project: its root and the absolute
/// directory of every category.
///
/// Category directories are pairwise disjoint and never contain the root,
/// so each can be staged and swapped on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    category_dirs: [PathBuf; 4],
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, paths: &ProjectPaths) -> M3Result<Self> {
        let root = normalize(&root.into());
        let category_dirs =
            AssetCategory::ALL.map(|category| normalize(&root.join(paths.path_for(category))));

        for (i, category) in AssetCategory::ALL.iter().enumerate() {
            let dir = &category_dirs[i];
            if root.starts_with(dir) {
                return Err(M3Error::InvalidLayout(format!(
                    "{} directory {:?} contains the project root",
                    category, dir
                )));
            }
            for (j, other) in AssetCategory::ALL.iter().enumerate().skip(i + 1) {
                let other_dir = &category_dirs[j];
                if dir.starts_with(other_dir) || other_dir.starts_with(dir) {
                    return Err(M3Error::InvalidLayout(format!(
                        "{} directory {:?} overlaps {} directory {:?}",
                        category, dir, other, other_dir
                    )));
                }
            }
        }

        Ok(Self {
            root,
            category_dirs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, category: AssetCategory) -> &Path {
        &self.category_dirs[category as usize]
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_FILENAME)
    }
}

/// Resolve `.` and `..` lexically; the directories may not exist yet.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_default_to_category_dir_names() {
        let mut paths = ProjectPaths::default();
        paths.set(AssetCategory::ShaderPack, "custom/shaders");

        let layout = ProjectLayout::new("/proj", &paths).unwrap();
        assert_eq!(layout.dir(AssetCategory::Mod), Path::new("/proj/mods"));
        assert_eq!(
            layout.dir(AssetCategory::ShaderPack),
            Path::new("/proj/custom/shaders")
        );
        assert_eq!(layout.lockfile_path(), Path::new("/proj/m3.lock.json"));
    }

    #[test]
    fn shared_category_directory_is_rejected() {
        let mut paths = ProjectPaths::default();
        paths.set(AssetCategory::TexturePack, "resourcepacks");
        assert!(matches!(
            ProjectLayout::new("/proj", &paths).unwrap_err(),
            M3Error::InvalidLayout(_)
        ));

        let mut nested = ProjectPaths::default();
        nested.set(AssetCategory::ShaderPack, "./mods/../mods/shaders");
        assert!(matches!(
            ProjectLayout::new("/proj", &nested).unwrap_err(),
            M3Error::InvalidLayout(_)
        ));
    }

    #[test]
    fn category_directory_may_not_contain_root() {
        for dir in [".", "..", "mods/.."] {
            let mut paths = ProjectPaths::default();
            paths.set(AssetCategory::Mod, dir);
            assert!(
                matches!(
                    ProjectLayout::new("/proj/pack", &paths).unwrap_err(),
                    M3Error::InvalidLayout(_)
                ),
                "{dir} was accepted"
            );
        }

        let mut outside = ProjectPaths::default();
        outside.set(AssetCategory::Mod, "../shared-mods");
        let layout = ProjectLayout::new("/proj/pack", &outside).unwrap();
        assert_eq!(layout.dir(AssetCategory::Mod), Path::new("/proj/shared-mods"));
    }

    #[test]
    fn config_parses_minimal_document() {
        let config: ProjectConfig =
            serde_json::from_str(r#"{"name": "pack", "paths": {"mods": "mods-dev"}}"#).unwrap();
        assert_eq!(config.platform, Platform::CurseForge);
        assert_eq!(config.paths.path_for(AssetCategory::Mod), PathBuf::from("mods-dev"));
    }

    #[test]
    fn malformed_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, r#"{"version": 3}"#).unwrap();
        assert!(matches!(
            ProjectConfig::load(&path).unwrap_err(),
            M3Error::MalformedConfig { .. }
        ));
    }

    #[test]
    fn project_root_is_found_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        ProjectConfig::new("pack")
            .save(&dir.path().join(CONFIG_FILENAME))
            .unwrap();
        let nested = dir.path().join("mods").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn missing_project_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_project_root(dir.path()).unwrap_err(),
            M3Error::ProjectNotFound(_)
        ));
    }
}

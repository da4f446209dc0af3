// ─── Remote metadata ───
// Vendor APIs are only consulted when a new asset is added; diff and apply
// work from the lockfile and the disk alone.

mod modrinth;

use async_trait::async_trait;

use crate::core::asset::{AssetCategory, AssetRecord, DigestSet, Platform, Side};
use crate::core::error::{M3Error, M3Result};
use crate::core::lockfile::LockfileEntry;

pub use modrinth::ModrinthClient;

/// Project-level facts about an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub id: String,
    pub slug: String,
    pub title: String,
    /// Vendor project types, most specific first (`"mod"`, `"shader"` ...).
    pub category_hints: Vec<String>,
    pub supported_versions: Vec<String>,
    pub side: Option<Side>,
}

/// One downloadable file of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_id: String,
    pub file_name: String,
    pub download_url: String,
    pub digest_hints: DigestSet,
    pub is_server_pack: bool,
    /// Project ids this file declares as required.
    pub dependencies: Vec<String>,
}

/// Remote metadata collaborator.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn platform(&self) -> Platform;

    async fn project_metadata(&self, project_id: &str) -> M3Result<ProjectMetadata>;

    /// Metadata of `file_id`, or of the newest file of the project when
    /// `file_id` is `None`.
    async fn file_metadata(&self, project_id: &str, file_id: Option<&str>)
        -> M3Result<FileMetadata>;
}

/// Map vendor metadata onto a lockfile entry.
pub fn entry_from_metadata(
    platform: Platform,
    project: &ProjectMetadata,
    file: &FileMetadata,
) -> M3Result<LockfileEntry> {
    let category = project
        .category_hints
        .iter()
        .find_map(|hint| AssetCategory::from_hint(hint))
        .ok_or_else(|| M3Error::UnknownCategory(project.category_hints.join(", ")))?;

    let side = if file.is_server_pack {
        Side::Server
    } else {
        project.side.unwrap_or_default()
    };

    let id = if project.slug.is_empty() {
        project.id.clone()
    } else {
        project.slug.clone()
    };

    let mut asset = AssetRecord::new(id, &file.file_name, category, platform, &file.download_url);
    if !project.title.is_empty() {
        asset = asset.with_name(&project.title);
    }
    asset.side = side;
    asset.dependencies = file.dependencies.clone();

    Ok(LockfileEntry::new(asset, file.digest_hints.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hashing::HashAlgorithm;

    fn project(hints: &[&str]) -> ProjectMetadata {
        ProjectMetadata {
            id: "AANobbMI".into(),
            slug: "sodium".into(),
            title: "Sodium".into(),
            category_hints: hints.iter().map(|h| h.to_string()).collect(),
            supported_versions: vec!["1.20.4".into()],
            side: Some(Side::Client),
        }
    }

    fn file() -> FileMetadata {
        let mut digest_hints = DigestSet::new();
        digest_hints.insert(HashAlgorithm::Sha1, "abc");
        FileMetadata {
            file_id: "v1".into(),
            file_name: "sodium-0.5.jar".into(),
            download_url: "https://cdn.modrinth.com/sodium-0.5.jar".into(),
            digest_hints,
            is_server_pack: false,
            dependencies: vec!["fabric-api".into()],
        }
    }

    #[test]
    fn maps_metadata_into_entry() {
        let entry = entry_from_metadata(Platform::Modrinth, &project(&["mod"]), &file()).unwrap();
        assert_eq!(entry.asset.id, "sodium");
        assert_eq!(entry.asset.display_name(), "Sodium");
        assert_eq!(entry.asset.category, AssetCategory::Mod);
        assert_eq!(entry.asset.side, Side::Client);
        assert_eq!(entry.asset.dependencies, vec!["fabric-api".to_string()]);
        assert_eq!(entry.hashes.get(HashAlgorithm::Sha1), Some("abc"));
    }

    #[test]
    fn server_pack_forces_server_side() {
        let mut server_file = file();
        server_file.is_server_pack = true;
        let entry =
            entry_from_metadata(Platform::CurseForge, &project(&["mod"]), &server_file).unwrap();
        assert_eq!(entry.asset.side, Side::Server);
    }

    #[test]
    fn unsupported_project_type_is_rejected() {
        let err = entry_from_metadata(Platform::Modrinth, &project(&["modpack"]), &file()).unwrap_err();
        assert!(matches!(err, M3Error::UnknownCategory(_)));
    }
}

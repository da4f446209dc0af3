use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use super::{FileMetadata, MetadataSource, ProjectMetadata};
use crate::core::asset::{DigestSet, Platform, Side};
use crate::core::error::{M3Error, M3Result};
use crate::core::hashing::HashAlgorithm;

const MODRINTH_API: &str = "https://api.modrinth.com/v2";

#[derive(Debug, Deserialize)]
struct ModrinthProject {
    id: String,
    slug: String,
    title: String,
    project_type: String,
    #[serde(default)]
    client_side: String,
    #[serde(default)]
    server_side: String,
    #[serde(default)]
    game_versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModrinthVersion {
    id: String,
    #[serde(default)]
    files: Vec<ModrinthFile>,
    #[serde(default)]
    dependencies: Vec<ModrinthDependency>,
}

#[derive(Debug, Deserialize)]
struct ModrinthFile {
    url: String,
    filename: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    hashes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ModrinthDependency {
    project_id: Option<String>,
    dependency_type: String,
}

fn side_from_support(client: &str, server: &str) -> Option<Side> {
    match (client, server) {
        ("required", "unsupported") | ("optional", "unsupported") => Some(Side::Client),
        ("unsupported", "required") | ("unsupported", "optional") => Some(Side::Server),
        ("", "") | ("unknown", "unknown") => None,
        _ => Some(Side::Both),
    }
}

impl ModrinthVersion {
    fn into_file_metadata(self) -> M3Result<FileMetadata> {
        let version_id = self.id;
        let file = self
            .files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
            .ok_or_else(|| M3Error::NotFound(format!("files of version {version_id}")))?;

        let digest_hints: DigestSet = file
            .hashes
            .iter()
            .filter_map(|(alg, hex)| alg.parse::<HashAlgorithm>().ok().map(|a| (a, hex.clone())))
            .collect();

        let dependencies = self
            .dependencies
            .iter()
            .filter(|d| d.dependency_type == "required")
            .filter_map(|d| d.project_id.clone())
            .collect();

        Ok(FileMetadata {
            file_id: version_id,
            file_name: file.filename.clone(),
            download_url: file.url.clone(),
            digest_hints,
            is_server_pack: false,
            dependencies,
        })
    }
}

/// Metadata source backed by the Modrinth v2 API.
pub struct ModrinthClient {
    client: Client,
}

impl ModrinthClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> M3Result<T> {
        let url = format!("{MODRINTH_API}/{path}");
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(M3Error::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(M3Error::DownloadFailed {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataSource for ModrinthClient {
    fn platform(&self) -> Platform {
        Platform::Modrinth
    }

    async fn project_metadata(&self, project_id: &str) -> M3Result<ProjectMetadata> {
        info!("Fetching Modrinth project {}", project_id);
        let project: ModrinthProject = self
            .get_json(&format!("project/{project_id}"), project_id)
            .await?;

        Ok(ProjectMetadata {
            side: side_from_support(&project.client_side, &project.server_side),
            id: project.id,
            slug: project.slug,
            title: project.title,
            category_hints: vec![project.project_type],
            supported_versions: project.game_versions,
        })
    }

    async fn file_metadata(
        &self,
        project_id: &str,
        file_id: Option<&str>,
    ) -> M3Result<FileMetadata> {
        let version = match file_id {
            Some(file_id) => {
                self.get_json::<ModrinthVersion>(&format!("version/{file_id}"), file_id)
                    .await?
            }
            None => {
                let versions: Vec<ModrinthVersion> = self
                    .get_json(&format!("project/{project_id}/version"), project_id)
                    .await?;
                // Modrinth lists versions newest first.
                versions
                    .into_iter()
                    .next()
                    .ok_or_else(|| M3Error::NotFound(format!("versions of {project_id}")))?
            }
        };
        version.into_file_metadata()
    }
}

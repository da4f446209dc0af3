use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{M3Error, M3Result};
use crate::core::http::build_http_client;

/// Download collaborator: write the body behind `url` to `dest`.
///
/// Implementations fail on any non-success status or transport error and
/// report the number of bytes written on success.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> M3Result<u64>;
}

/// Streaming HTTP downloader.
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
}

impl Downloader {
    pub fn new() -> M3Result<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            concurrency: 4,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Download `url` to `dest`, streaming the body to disk chunk by chunk.
    ///
    /// Creates parent directories as needed. The file handle is dropped
    /// before returning so callers can hash or delete the file right away.
    pub async fn download_file(&self, url: &str, dest: &Path) -> M3Result<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| M3Error::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(M3Error::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut written = 0u64;
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| M3Error::io(dest, e))?;
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| M3Error::io(dest, e))?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(|e| M3Error::io(dest, e))?;
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }
}

#[async_trait]
impl Fetch for Downloader {
    async fn fetch(&self, url: &str, dest: &Path) -> M3Result<u64> {
        self.download_file(url, dest).await
    }
}

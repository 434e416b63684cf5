use std::path::{Path, PathBuf};

use ort_bootstrap::{Downloader, ProvisionError};
use tokio::io::AsyncWriteExt;

/// Streams HTTP(S) downloads to disk.
///
/// The body is written to `<dest>.part` and renamed into place once the
/// transfer completes, so an interrupted download never leaves a file that
/// looks finished.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError> {
        tracing::info!("downloading {url}");

        let mut response = self
            .client
            .get(url)
            .header("User-Agent", "ort-bootstrap")
            .send()
            .await
            .map_err(|e| ProvisionError::Download(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProvisionError::Download(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part = partial_path(dest);
        let mut file = tokio::fs::File::create(&part).await?;
        let mut written = 0u64;

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(ProvisionError::Download(format!(
                        "failed to read body of {url}: {e}"
                    )));
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&part, dest).await?;

        tracing::debug!("wrote {written} bytes to {}", dest.display());
        Ok(written)
    }
}

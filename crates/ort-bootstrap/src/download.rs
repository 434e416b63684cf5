use std::path::Path;

use crate::error::ProvisionError;

/// Downloads a remote file to a local path.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, creating parent directories as needed.
    /// Returns the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError>;
}

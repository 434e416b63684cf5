use std::path::PathBuf;

use ort_bootstrap::{Downloader, ProvisionError};

use crate::checksum::HashAlgorithm;

/// A download pinned to a SHA-256 digest and cached at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedArtifact {
    pub url: String,
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// The cached file already matched its pin.
    Cached,
    Downloaded,
}

/// Make sure `artifact.path` holds the pinned file.
///
/// A cached file with the right digest is reused. Otherwise the file is
/// downloaded once and verified; a mismatch after download is fatal and
/// the bad file is removed so nothing downstream can extract it.
pub async fn ensure_artifact(
    downloader: &dyn Downloader,
    artifact: &PinnedArtifact,
) -> Result<ArtifactStatus, ProvisionError> {
    if HashAlgorithm::Sha256.file_matches(&artifact.path, &artifact.sha256)? {
        tracing::info!("{} exists and matches its checksum", artifact.path.display());
        return Ok(ArtifactStatus::Cached);
    }
    if artifact.path.exists() {
        tracing::warn!(
            "{} does not match its checksum, downloading again",
            artifact.path.display()
        );
    }

    downloader.download(&artifact.url, &artifact.path).await?;

    if let Err(e) = HashAlgorithm::Sha256.verify(&artifact.path, &artifact.sha256) {
        let _ = tokio::fs::remove_file(&artifact.path).await;
        return Err(e);
    }
    Ok(ArtifactStatus::Downloaded)
}

pub mod archive;
pub mod artifact;
pub mod checksum;
pub mod client;

pub use archive::extract_zip;
pub use artifact::{ArtifactStatus, PinnedArtifact, ensure_artifact};
pub use checksum::{HashAlgorithm, sha1_file, sha256_file};
pub use client::HttpDownloader;

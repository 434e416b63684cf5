use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use ort_bootstrap::ProvisionError;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Digest algorithms used by pinned artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Lowercase hex digest of a file, read in a streaming fashion.
    pub fn digest_file(&self, path: &Path) -> io::Result<String> {
        let mut reader = BufReader::new(File::open(path)?);
        match self {
            HashAlgorithm::Sha1 => hash_reader::<Sha1>(&mut reader),
            HashAlgorithm::Sha256 => hash_reader::<Sha256>(&mut reader),
        }
    }

    /// Whether `path` exists and hashes to `expected`. A missing file is
    /// simply not a match.
    pub fn file_matches(&self, path: &Path, expected: &str) -> io::Result<bool> {
        match self.digest_file(path) {
            Ok(actual) => Ok(actual.eq_ignore_ascii_case(expected.trim())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn verify(&self, path: &Path, expected: &str) -> Result<(), ProvisionError> {
        let actual = self.digest_file(path)?;
        if actual.eq_ignore_ascii_case(expected.trim()) {
            Ok(())
        } else {
            Err(ProvisionError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.trim().to_ascii_lowercase(),
                actual,
            })
        }
    }
}

fn hash_reader<D: Digest + io::Write>(reader: &mut impl io::Read) -> io::Result<String> {
    let mut hasher = D::new();
    io::copy(reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    HashAlgorithm::Sha256.digest_file(path)
}

pub fn sha1_file(path: &Path) -> io::Result<String> {
    HashAlgorithm::Sha1.digest_file(path)
}

use std::path::PathBuf;

/// Errors that abort a provisioning flow.
///
/// Nothing here is retried: each variant is reported once and the process
/// stops with [`ProvisionError::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to install {tool}{}", exit_suffix(.code))]
    InstallFailure { tool: String, code: Option<i32> },

    #[error("`{command}` failed{}", exit_suffix(.code))]
    GitSync { command: String, code: Option<i32> },

    #[error("`{reference}` is neither a tag nor a branch on origin in {}", .path.display())]
    UnresolvableRef { reference: String, path: PathBuf },

    #[error("build for {label} failed{}", exit_suffix(.code))]
    BuildFailure { label: String, code: Option<i32> },

    #[error("program not found: {0}")]
    ProgramNotFound(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionError {
    /// Process exit status for this error. Failing subprocesses propagate
    /// their own non-zero code; everything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InstallFailure { code: Some(code), .. }
            | Self::GitSync { code: Some(code), .. }
            | Self::BuildFailure { code: Some(code), .. }
                if *code != 0 =>
            {
                *code
            }
            _ => 1,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " (terminated by signal)".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failure_propagates_exit_code() {
        let err = ProvisionError::BuildFailure {
            label: "Android arm64-v8a".into(),
            code: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.to_string(),
            "build for Android arm64-v8a failed (exit code 3)"
        );
    }

    #[test]
    fn install_and_git_failures_propagate_exit_code() {
        let install = ProvisionError::InstallFailure {
            tool: "Ninja".into(),
            code: Some(100),
        };
        let git = ProvisionError::GitSync {
            command: "git fetch --all --tags".into(),
            code: Some(128),
        };
        assert_eq!(install.exit_code(), 100);
        assert_eq!(git.exit_code(), 128);
    }

    #[test]
    fn errors_without_code_exit_with_one() {
        let err = ProvisionError::GitSync {
            command: "git fetch --all --tags".into(),
            code: None,
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            ProvisionError::UnsupportedPlatform("Haiku".into()).exit_code(),
            1
        );
    }

    #[test]
    fn checksum_mismatch_names_the_file() {
        let err = ProvisionError::ChecksumMismatch {
            path: PathBuf::from("/tmp/tools.zip"),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch for /tmp/tools.zip: expected aa, got bb"
        );
    }
}

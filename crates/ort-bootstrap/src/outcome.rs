use std::fmt;

/// Result of ensuring a single dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The check command succeeded; nothing was run.
    AlreadyPresent,
    /// The tool was absent and the install command succeeded. PATH changes
    /// only take effect in a new terminal.
    Installed,
    /// The tool was absent and there is no automatic installer for this OS.
    Skipped { reason: String },
    /// The single install attempt exited non-zero.
    Failed { code: Option<i32> },
}

impl InstallOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyPresent => write!(f, "already installed"),
            Self::Installed => write!(f, "installed"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { code: Some(code) } => write!(f, "failed (exit code {code})"),
            Self::Failed { code: None } => write!(f, "failed"),
        }
    }
}

/// Ordered record of every dependency a flow ensured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub entries: Vec<(String, InstallOutcome)>,
}

impl ProvisionReport {
    pub fn push(&mut self, name: impl Into<String>, outcome: InstallOutcome) {
        self.entries.push((name.into(), outcome));
    }

    /// True when anything was installed during this run.
    pub fn needs_restart(&self) -> bool {
        self.entries.iter().any(|(_, outcome)| outcome.is_installed())
    }

    pub fn outcome(&self, name: &str) -> Option<&InstallOutcome> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }
}

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsKind {
    Windows,
    MacOs,
    Linux,
    Unknown,
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsKind::Windows => write!(f, "Windows"),
            OsKind::MacOs => write!(f, "macOS"),
            OsKind::Linux => write!(f, "Linux"),
            OsKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Structured facts about the host, gathered once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub os: OsKind,
    /// Display name reported by the OS (used in diagnostics).
    pub os_name: String,
    /// OS version, e.g. `10.0.22631` on Windows or `14.4` on macOS.
    pub version: String,
    /// `ID` from `/etc/os-release` on Linux.
    pub distro_id: Option<String>,
    /// `VERSION_ID` from `/etc/os-release` on Linux.
    pub distro_version: Option<String>,
}

impl HostFacts {
    pub fn new(os: OsKind, version: impl Into<String>) -> Self {
        Self {
            os,
            os_name: os.to_string(),
            version: version.into(),
            distro_id: None,
            distro_version: None,
        }
    }

    pub fn with_distro(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.distro_id = Some(id.into());
        self.distro_version = Some(version.into());
        self
    }

    pub fn is_windows_10_or_later(&self) -> bool {
        self.os == OsKind::Windows && version_at_least(&self.version, "10")
    }

    pub fn is_supported_ubuntu(&self) -> bool {
        self.os == OsKind::Linux
            && self.distro_id.as_deref() == Some("ubuntu")
            && self
                .distro_version
                .as_deref()
                .is_some_and(|v| version_at_least(v, "22.04"))
    }
}

impl fmt::Display for HostFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.os_name, self.version)?;
        if let (Some(id), Some(version)) = (&self.distro_id, &self.distro_version) {
            write!(f, " [{id} {version}]")?;
        }
        Ok(())
    }
}

/// Read-only view of the machine-global state the flows depend on.
pub trait EnvironmentProbe: Send + Sync {
    fn facts(&self) -> &HostFacts;

    fn env_var(&self, key: &str) -> Option<String>;

    /// Directory for throwaway installer downloads.
    fn temp_dir(&self) -> PathBuf;
}

/// Probe backed by the real host.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    facts: HostFacts,
}

impl SystemProbe {
    pub fn detect() -> Self {
        let info = os_info::get();
        let os = match info.os_type() {
            os_info::Type::Windows => OsKind::Windows,
            os_info::Type::Macos => OsKind::MacOs,
            os_info::Type::Unknown => OsKind::Unknown,
            _ if cfg!(target_os = "linux") => OsKind::Linux,
            _ => OsKind::Unknown,
        };

        let mut facts = HostFacts {
            os,
            os_name: info.os_type().to_string(),
            version: info.version().to_string(),
            distro_id: None,
            distro_version: None,
        };

        if os == OsKind::Linux
            && let Ok(contents) = std::fs::read_to_string("/etc/os-release")
        {
            let release = parse_os_release(&contents);
            facts.distro_id = release.id;
            facts.distro_version = release.version_id;
        }

        tracing::debug!("detected host: {facts}");
        Self { facts }
    }
}

impl EnvironmentProbe for SystemProbe {
    fn facts(&self) -> &HostFacts {
        &self.facts
    }

    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
}

/// `ID` and `VERSION_ID` from an os-release file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub version_id: Option<String>,
}

pub fn parse_os_release(contents: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in contents.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim_matches(|c| c == '"' || c == '\'').to_owned();
        match key {
            "ID" => release.id = Some(value),
            "VERSION_ID" => release.version_id = Some(value),
            _ => {}
        }
    }
    release
}

/// Compare dotted numeric versions component by component.
/// Missing components count as zero; trailing non-digits in a component
/// are ignored (`"11-beta"` reads as `11`).
pub fn version_at_least(actual: &str, minimum: &str) -> bool {
    fn parts(v: &str) -> Vec<u64> {
        v.split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    }

    let actual = parts(actual);
    let minimum = parts(minimum);
    let len = actual.len().max(minimum.len());
    for i in 0..len {
        let a = actual.get(i).copied().unwrap_or(0);
        let m = minimum.get(i).copied().unwrap_or(0);
        if a != m {
            return a > m;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ubuntu_os_release() {
        let contents = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\nID_LIKE=debian\n";
        let release = parse_os_release(contents);
        assert_eq!(release.id.as_deref(), Some("ubuntu"));
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
    }

    #[test]
    fn version_comparison_is_numeric() {
        assert!(version_at_least("22.04", "22.04"));
        assert!(version_at_least("24.04", "22.04"));
        assert!(!version_at_least("20.04", "22.04"));
        assert!(version_at_least("22.10", "22.04"));
        assert!(version_at_least("10.0.22631", "10"));
        assert!(!version_at_least("6.1.7601", "10"));
    }

    #[test]
    fn ubuntu_support_requires_id_and_version() {
        let ubuntu = HostFacts::new(OsKind::Linux, "6.8").with_distro("ubuntu", "22.04");
        assert!(ubuntu.is_supported_ubuntu());

        let old = HostFacts::new(OsKind::Linux, "5.4").with_distro("ubuntu", "20.04");
        assert!(!old.is_supported_ubuntu());

        let fedora = HostFacts::new(OsKind::Linux, "6.8").with_distro("fedora", "40");
        assert!(!fedora.is_supported_ubuntu());
    }

    #[test]
    fn windows_version_gate() {
        assert!(HostFacts::new(OsKind::Windows, "10.0.19045").is_windows_10_or_later());
        assert!(!HostFacts::new(OsKind::Windows, "6.3.9600").is_windows_10_or_later());
        assert!(!HostFacts::new(OsKind::Linux, "10").is_windows_10_or_later());
    }
}

use serde::{Deserialize, Serialize};

use crate::command::CommandSpec;
use crate::error::ProvisionError;
use crate::layout::DepsLayout;
use crate::platform::OsKind;

/// One value per host OS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PerHost {
    pub windows: String,
    pub macos: String,
    pub linux: String,
}

impl PerHost {
    pub fn get(&self, os: OsKind) -> Option<&str> {
        match os {
            OsKind::Windows => Some(&self.windows),
            OsKind::MacOs => Some(&self.macos),
            OsKind::Linux => Some(&self.linux),
            OsKind::Unknown => None,
        }
    }
}

/// Pinned versions and hashes for the Android SDK toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AndroidPins {
    pub repository_url: String,
    pub cmdline_tools_version: String,
    /// SHA-256 of the command-line tools archive.
    pub cmdline_tools_sha256: PerHost,
    /// SHA-1 of the extracted `sdkmanager` launcher.
    pub sdkmanager_sha1: PerHost,
    pub api_level: u32,
    pub platform: String,
    pub build_tools: String,
    pub ndk: String,
}

impl Default for AndroidPins {
    fn default() -> Self {
        Self {
            repository_url: "https://dl.google.com/android/repository".into(),
            cmdline_tools_version: "13114758".into(),
            cmdline_tools_sha256: PerHost {
                windows: "98b565cb657b012dae6794cefc0f66ae1efb4690c699b78a614b4a6a3505b003".into(),
                macos: "5673201e6f3869f418eeed3b5cb6c4be7401502bd0aae1b12a29d164d647a54e".into(),
                linux: "7ec965280a073311c339e571cd5de778b9975026cfcbe79f2b1cdcb1e15317ee".into(),
            },
            sdkmanager_sha1: PerHost {
                windows: "9a61ae445d2f51660ac889524ca136edf214a7f2".into(),
                macos: "188080972337a2d2e081dea295aab5e18d41c344".into(),
                linux: "c6b839ca0a64905e9d5e954e0d3589493b88d6de".into(),
            },
            api_level: 22,
            platform: "android-22".into(),
            build_tools: "22.0.1".into(),
            ndk: "27.2.12479018".into(),
        }
    }
}

impl AndroidPins {
    fn host_tag(os: OsKind) -> Result<&'static str, ProvisionError> {
        match os {
            OsKind::Windows => Ok("win"),
            OsKind::MacOs => Ok("mac"),
            OsKind::Linux => Ok("linux"),
            OsKind::Unknown => Err(ProvisionError::UnsupportedPlatform(
                "the Android command-line tools are only published for Windows, macOS and Linux"
                    .into(),
            )),
        }
    }

    pub fn cmdline_tools_url(&self, os: OsKind) -> Result<String, ProvisionError> {
        Ok(format!(
            "{}/commandlinetools-{}-{}_latest.zip",
            self.repository_url.trim_end_matches('/'),
            Self::host_tag(os)?,
            self.cmdline_tools_version
        ))
    }

    pub fn sdkmanager_file_name(os: OsKind) -> &'static str {
        match os {
            OsKind::Windows => "sdkmanager.bat",
            _ => "sdkmanager",
        }
    }

    /// SDK packages installed into `_deps/android-sdk`.
    pub fn packages(&self) -> Vec<String> {
        vec![
            "platform-tools".to_owned(),
            format!("platforms;{}", self.platform),
            format!("build-tools;{}", self.build_tools),
            format!("ndk;{}", self.ndk),
        ]
    }

    pub fn sdkmanager_install_command(&self, os: OsKind, layout: &DepsLayout) -> CommandSpec {
        let sdkmanager = layout
            .android_cmdline_tools()
            .join("bin")
            .join(Self::sdkmanager_file_name(os));
        CommandSpec::new(sdkmanager.display().to_string())
            .arg("--install")
            .args(self.packages())
            .arg(format!("--sdk_root={}", layout.android_sdk().display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmdline_tools_url_per_host() {
        let pins = AndroidPins::default();
        assert_eq!(
            pins.cmdline_tools_url(OsKind::Linux).unwrap(),
            "https://dl.google.com/android/repository/commandlinetools-linux-13114758_latest.zip"
        );
        assert_eq!(
            pins.cmdline_tools_url(OsKind::Windows).unwrap(),
            "https://dl.google.com/android/repository/commandlinetools-win-13114758_latest.zip"
        );
        assert!(pins.cmdline_tools_url(OsKind::Unknown).is_err());
    }

    #[test]
    fn sdkmanager_installs_pinned_packages() {
        let pins = AndroidPins::default();
        let layout = DepsLayout::new("/p");
        let cmd = pins.sdkmanager_install_command(OsKind::Linux, &layout);
        assert_eq!(
            cmd.program,
            "/p/_deps/android-cmdline-tools/cmdline-tools/bin/sdkmanager"
        );
        assert_eq!(
            cmd.args,
            vec![
                "--install",
                "platform-tools",
                "platforms;android-22",
                "build-tools;22.0.1",
                "ndk;27.2.12479018",
                "--sdk_root=/p/_deps/android-sdk",
            ]
        );
    }

    #[test]
    fn per_host_lookup() {
        let pins = AndroidPins::default();
        assert_eq!(
            pins.sdkmanager_sha1.get(OsKind::MacOs),
            Some("188080972337a2d2e081dea295aab5e18d41c344")
        );
        assert_eq!(pins.sdkmanager_sha1.get(OsKind::Unknown), None);
    }
}

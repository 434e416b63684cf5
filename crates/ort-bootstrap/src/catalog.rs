//! Built-in descriptors for the tools an ONNX Runtime build needs.

use crate::command::CommandSpec;
use crate::descriptor::{DOWNLOADED_FILE, DependencyDescriptor, InstallAction};
use crate::error::ProvisionError;
use crate::platform::{HostFacts, OsKind};

pub const WINGET_BUNDLE_URL: &str = "https://aka.ms/getwinget";
pub const HOMEBREW_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

pub fn winget() -> DependencyDescriptor {
    let launch = CommandSpec::new("powershell").args([
        "-NoProfile".to_owned(),
        "-Command".to_owned(),
        format!("Add-AppxPackage -Path '{DOWNLOADED_FILE}'"),
    ]);
    DependencyDescriptor::new("winget", CommandSpec::new("winget").arg("--version"))
        .on(
            OsKind::Windows,
            InstallAction::Download {
                url: WINGET_BUNDLE_URL.into(),
                file_name: "winget.msixbundle".into(),
                launch: Some(launch),
            },
        )
        .failure_message("Install App Installer from the Microsoft Store and re-run")
}

pub fn homebrew() -> DependencyDescriptor {
    let script = format!("/bin/bash -c \"$(curl -fsSL {HOMEBREW_INSTALL_URL})\"");
    DependencyDescriptor::new("Homebrew", CommandSpec::new("brew").arg("--version"))
        .on(
            OsKind::MacOs,
            InstallAction::Command(CommandSpec::new("/bin/bash").args(["-c", script.as_str()])),
        )
        .failure_message("See https://brew.sh for manual installation")
}

pub fn cmake() -> DependencyDescriptor {
    DependencyDescriptor::new("CMake", CommandSpec::new("cmake").arg("--version"))
        .on(OsKind::Windows, InstallAction::winget("Kitware.CMake"))
        .on(OsKind::Linux, InstallAction::apt("cmake"))
        .on(OsKind::MacOs, InstallAction::brew_cask("cmake-app"))
        .failure_message("Please install CMake manually from https://cmake.org/download/")
}

pub fn ninja() -> DependencyDescriptor {
    DependencyDescriptor::new("Ninja", CommandSpec::new("ninja").arg("--version"))
        .on(OsKind::Windows, InstallAction::winget("Ninja-build.Ninja"))
        .on(OsKind::Linux, InstallAction::apt("ninja-build"))
        .on(OsKind::MacOs, InstallAction::brew("ninja"))
        .failure_message("Please install Ninja manually from https://ninja-build.org/")
}

pub fn java() -> DependencyDescriptor {
    DependencyDescriptor::new("Java", CommandSpec::new("java").arg("-version"))
        .on(
            OsKind::Windows,
            InstallAction::winget("EclipseAdoptium.Temurin.17.JDK"),
        )
        .on(OsKind::Linux, InstallAction::apt("openjdk-17-jdk"))
        .on(OsKind::MacOs, InstallAction::brew_cask("temurin"))
        .failure_message("Please install a Java 17 JDK manually from https://adoptium.net/")
}

pub fn build_essential() -> DependencyDescriptor {
    DependencyDescriptor::new(
        "build-essential",
        CommandSpec::new("dpkg").args(["-s", "build-essential"]),
    )
    .on(OsKind::Linux, InstallAction::apt("build-essential"))
}

pub fn xcode_command_line_tools() -> DependencyDescriptor {
    DependencyDescriptor::new(
        "Xcode Command Line Tools",
        CommandSpec::new("xcode-select").arg("-p"),
    )
    .on(
        OsKind::MacOs,
        InstallAction::Command(CommandSpec::new("xcode-select").arg("--install")),
    )
}

/// Descriptors ensured by `install-build-tools`, in install order. The
/// Visual Studio components on Windows are handled by [`crate::msvc`].
pub fn build_tools_for(os: OsKind) -> Vec<DependencyDescriptor> {
    let mut tools = vec![cmake(), ninja(), java()];
    match os {
        OsKind::Linux => tools.push(build_essential()),
        OsKind::MacOs => tools.push(xcode_command_line_tools()),
        OsKind::Windows | OsKind::Unknown => {}
    }
    tools
}

/// The package manager the host needs before anything else can be
/// installed. Hosts outside the supported set are rejected up front.
pub fn package_manager_for(facts: &HostFacts) -> Result<Vec<DependencyDescriptor>, ProvisionError> {
    match facts.os {
        OsKind::Windows if facts.is_windows_10_or_later() => Ok(vec![winget()]),
        OsKind::Windows => Err(ProvisionError::UnsupportedPlatform(format!(
            "Windows 10 or later is required (host is {facts})"
        ))),
        OsKind::Linux if facts.is_supported_ubuntu() => Ok(Vec::new()),
        OsKind::Linux => Err(ProvisionError::UnsupportedPlatform(format!(
            "Ubuntu 22.04 or later is required (host is {facts})"
        ))),
        OsKind::MacOs => Ok(vec![homebrew()]),
        OsKind::Unknown => Err(ProvisionError::UnsupportedPlatform(format!(
            "unsupported operating system: {facts}"
        ))),
    }
}

use anyhow::{Context, Result};
use ort_bootstrap::{MsvcCheck, OsKind, ProvisionReport, Resolver, catalog};

use super::{Host, print_report};

/// Ensure the build toolchain. The caller decides what a non-empty
/// install set means for the exit status.
pub async fn run(host: Host<'_>) -> Result<ProvisionReport> {
    let os = host.probe.facts().os;
    let tools = catalog::build_tools_for(os);

    let report = Resolver::new(host.runner, host.probe)
        .with_downloader(host.downloader)
        .ensure_all(&tools)
        .await
        .context("failed to install build tools")?;
    print_report(&report);

    if os == OsKind::Windows {
        let info = MsvcCheck::new(host.runner, host.probe)
            .with_downloader(host.downloader)
            .ensure()
            .await
            .context("Visual Studio 2022 is not ready")?;
        println!(
            "Visual Studio 2022 installation path: {}",
            info.installation_path
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use ort_bootstrap::test_support::{FakeDownloader, FakeProbe, FakeRunner};
    use ort_bootstrap::{CommandOutput, HostFacts, InstallOutcome, ProvisionError};

    use super::*;

    #[tokio::test]
    async fn installs_missing_tools_and_reports_restart() {
        let runner = FakeRunner::new()
            .missing("ninja")
            .respond("dpkg -s build-essential", CommandOutput::exit(1));
        let probe = FakeProbe::new(HostFacts::new(OsKind::Linux, "6.8").with_distro("ubuntu", "24.04"));
        let downloader = FakeDownloader::new(Vec::new());
        let host = Host {
            runner: &runner,
            probe: &probe,
            downloader: &downloader,
        };

        let report = run(host).await.unwrap();

        assert!(report.needs_restart());
        assert_eq!(report.outcome("CMake"), Some(&InstallOutcome::AlreadyPresent));
        assert_eq!(report.outcome("Ninja"), Some(&InstallOutcome::Installed));
        assert_eq!(report.outcome("build-essential"), Some(&InstallOutcome::Installed));
        assert!(runner.ran("sudo apt-get install -y ninja-build"));
        assert!(runner.ran("sudo apt-get install -y build-essential"));
        assert!(!runner.ran("sudo apt-get install -y cmake"));
    }

    #[tokio::test]
    async fn windows_without_visual_studio_fails() {
        let temp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let probe = FakeProbe::new(HostFacts::new(OsKind::Windows, "10.0.22631"))
            .with_env("ProgramFiles(x86)", temp.path().display().to_string())
            .with_temp_dir(temp.path());
        let downloader = FakeDownloader::new(b"MZ".to_vec());
        let host = Host {
            runner: &runner,
            probe: &probe,
            downloader: &downloader,
        };

        let err = run(host).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::MissingPrerequisite(_))
        ));
        assert!(runner.ran("cmake --version"));
    }
}

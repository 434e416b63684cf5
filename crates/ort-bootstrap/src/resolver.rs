use crate::command::{CommandRunner, OutputMode};
use crate::descriptor::{DependencyDescriptor, InstallAction};
use crate::download::Downloader;
use crate::error::ProvisionError;
use crate::outcome::{InstallOutcome, ProvisionReport};
use crate::platform::EnvironmentProbe;

/// Checks for a dependency and, when it is absent, makes exactly one
/// attempt to install it with the host OS's installer.
pub struct Resolver<'a> {
    runner: &'a dyn CommandRunner,
    probe: &'a dyn EnvironmentProbe,
    downloader: Option<&'a dyn Downloader>,
}

impl<'a> Resolver<'a> {
    pub fn new(runner: &'a dyn CommandRunner, probe: &'a dyn EnvironmentProbe) -> Self {
        Self {
            runner,
            probe,
            downloader: None,
        }
    }

    /// Enables [`InstallAction::Download`] installers.
    pub fn with_downloader(mut self, downloader: &'a dyn Downloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Runs the check command. A missing program or a non-zero exit both
    /// mean "absent".
    pub async fn is_present(&self, descriptor: &DependencyDescriptor) -> Result<bool, ProvisionError> {
        match self.runner.run(&descriptor.check, OutputMode::Quiet).await {
            Ok(output) => Ok(output.success()),
            Err(ProvisionError::ProgramNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn ensure(
        &self,
        descriptor: &DependencyDescriptor,
    ) -> Result<InstallOutcome, ProvisionError> {
        if self.is_present(descriptor).await? {
            tracing::info!("{} is already installed", descriptor.name);
            return Ok(InstallOutcome::AlreadyPresent);
        }

        let os = self.probe.facts().os;
        let action = match descriptor.action_for(os) {
            Some(action) if action.is_automatic() => action,
            Some(InstallAction::Manual { url }) => {
                return Ok(InstallOutcome::Skipped {
                    reason: format!("install it manually from {url}"),
                });
            }
            _ => {
                return Ok(InstallOutcome::Skipped {
                    reason: format!("no installer for {os}"),
                });
            }
        };

        tracing::info!("{} is not installed, installing...", descriptor.name);

        let downloaded = match action {
            InstallAction::Download { url, file_name, .. } => {
                let downloader = self.downloader.ok_or_else(|| {
                    ProvisionError::MissingPrerequisite(format!(
                        "{} needs a download but no downloader is configured",
                        descriptor.name
                    ))
                })?;
                let dest = self.probe.temp_dir().join(file_name);
                downloader.download(url, &dest).await?;
                Some(dest)
            }
            _ => None,
        };

        let Some(command) = action.command(downloaded.as_deref()) else {
            return Ok(InstallOutcome::Skipped {
                reason: "installer produced no command".into(),
            });
        };

        let output = match self.runner.run(&command, OutputMode::Inherit).await {
            Ok(output) => output,
            Err(ProvisionError::ProgramNotFound(program)) => {
                tracing::error!("installer program {program} is not available");
                return Ok(InstallOutcome::Failed { code: None });
            }
            Err(e) => return Err(e),
        };

        if output.success() {
            tracing::info!("{} installed successfully", descriptor.name);
            Ok(InstallOutcome::Installed)
        } else {
            Ok(InstallOutcome::Failed { code: output.code })
        }
    }

    /// Ensure every descriptor in order. The first failed install aborts
    /// the flow; later descriptors are never attempted.
    pub async fn ensure_all(
        &self,
        descriptors: &[DependencyDescriptor],
    ) -> Result<ProvisionReport, ProvisionError> {
        let mut report = ProvisionReport::default();

        for descriptor in descriptors {
            let outcome = self.ensure(descriptor).await?;
            match &outcome {
                InstallOutcome::Failed { code } => {
                    if let Some(message) = &descriptor.failure_message {
                        tracing::error!("failed to install {}. {message}", descriptor.name);
                    }
                    return Err(ProvisionError::InstallFailure {
                        tool: descriptor.name.clone(),
                        code: *code,
                    });
                }
                InstallOutcome::Skipped { reason } if descriptor.required => {
                    let mut message = format!("{} is required: {reason}", descriptor.name);
                    if let Some(hint) = &descriptor.failure_message {
                        message.push_str(". ");
                        message.push_str(hint);
                    }
                    return Err(ProvisionError::UnsupportedPlatform(message));
                }
                InstallOutcome::Skipped { reason } => {
                    tracing::warn!("skipping {}: {reason}", descriptor.name);
                }
                InstallOutcome::AlreadyPresent | InstallOutcome::Installed => {}
            }
            report.push(descriptor.name.clone(), outcome);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::command::{CommandOutput, CommandSpec};
    use crate::platform::{HostFacts, OsKind};
    use crate::test_support::{FakeDownloader, FakeProbe, FakeRunner};

    use super::*;

    fn cmake() -> DependencyDescriptor {
        DependencyDescriptor::new("cmake", CommandSpec::new("cmake").arg("--version"))
            .on(OsKind::Windows, InstallAction::winget("Kitware.CMake"))
            .on(OsKind::Linux, InstallAction::apt("cmake"))
            .on(OsKind::MacOs, InstallAction::brew_cask("cmake-app"))
    }

    fn linux() -> FakeProbe {
        FakeProbe::new(HostFacts::new(OsKind::Linux, "6.8").with_distro("ubuntu", "24.04"))
    }

    #[tokio::test]
    async fn present_tool_is_idempotent() {
        let runner = FakeRunner::new();
        let probe = linux();
        let resolver = Resolver::new(&runner, &probe);

        assert_eq!(resolver.ensure(&cmake()).await.unwrap(), InstallOutcome::AlreadyPresent);
        assert_eq!(resolver.ensure(&cmake()).await.unwrap(), InstallOutcome::AlreadyPresent);

        assert_eq!(runner.calls(), vec!["cmake --version", "cmake --version"]);
    }

    #[tokio::test]
    async fn missing_program_is_installed_with_host_package_manager() {
        let runner = FakeRunner::new().missing("cmake");
        let probe = linux();
        let resolver = Resolver::new(&runner, &probe);

        let outcome = resolver.ensure(&cmake()).await.unwrap();
        assert_eq!(outcome, InstallOutcome::Installed);
        assert_eq!(
            runner.calls(),
            vec!["cmake --version", "sudo apt-get install -y cmake"]
        );
    }

    #[tokio::test]
    async fn non_zero_check_counts_as_absent() {
        let runner = FakeRunner::new().respond("cmake --version", CommandOutput::exit(1));
        let probe = FakeProbe::new(HostFacts::new(OsKind::MacOs, "14.4"));
        let resolver = Resolver::new(&runner, &probe);

        resolver.ensure(&cmake()).await.unwrap();
        assert!(runner.ran("brew install --cask cmake-app"));
    }

    #[tokio::test]
    async fn no_installer_for_os_is_skipped_without_running_anything() {
        let descriptor = DependencyDescriptor::new(
            "build-essential",
            CommandSpec::new("dpkg").args(["-s", "build-essential"]),
        )
        .on(OsKind::Linux, InstallAction::apt("build-essential"));

        let runner = FakeRunner::new().respond("dpkg -s build-essential", CommandOutput::exit(1));
        let probe = FakeProbe::new(HostFacts::new(OsKind::Windows, "10.0.22631"));
        let resolver = Resolver::new(&runner, &probe);

        let outcome = resolver.ensure(&descriptor).await.unwrap();
        assert!(matches!(outcome, InstallOutcome::Skipped { .. }));
        assert_eq!(runner.calls(), vec!["dpkg -s build-essential"]);
    }

    #[tokio::test]
    async fn failed_install_is_reported_once() {
        let runner = FakeRunner::new()
            .missing("cmake")
            .respond("sudo apt-get install -y cmake", CommandOutput::exit(100));
        let probe = linux();
        let resolver = Resolver::new(&runner, &probe);

        let outcome = resolver.ensure(&cmake()).await.unwrap();
        assert_eq!(outcome, InstallOutcome::Failed { code: Some(100) });
        assert_eq!(runner.count("sudo apt-get install -y cmake"), 1);
    }

    #[tokio::test]
    async fn ensure_all_stops_at_first_failure() {
        let ninja = DependencyDescriptor::new("ninja", CommandSpec::new("ninja").arg("--version"))
            .on(OsKind::Linux, InstallAction::apt("ninja-build"));

        let runner = FakeRunner::new()
            .missing("cmake")
            .missing("ninja")
            .respond("sudo apt-get install -y cmake", CommandOutput::exit(1));
        let probe = linux();
        let resolver = Resolver::new(&runner, &probe);

        let err = resolver.ensure_all(&[cmake(), ninja]).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::InstallFailure { ref tool, code: Some(1) } if tool == "cmake"
        ));
        assert!(!runner.ran("ninja --version"));
    }

    #[tokio::test]
    async fn ensure_all_reports_restart_after_install() {
        let runner = FakeRunner::new().missing("ninja");
        let probe = linux();
        let resolver = Resolver::new(&runner, &probe);

        let ninja = DependencyDescriptor::new("ninja", CommandSpec::new("ninja").arg("--version"))
            .on(OsKind::Linux, InstallAction::apt("ninja-build"));

        let report = resolver.ensure_all(&[cmake(), ninja]).await.unwrap();
        assert_eq!(report.outcome("cmake"), Some(&InstallOutcome::AlreadyPresent));
        assert_eq!(report.outcome("ninja"), Some(&InstallOutcome::Installed));
        assert!(report.needs_restart());
    }

    #[tokio::test]
    async fn required_tool_without_installer_aborts() {
        let xcode = DependencyDescriptor::new(
            "xcode-command-line-tools",
            CommandSpec::new("xcode-select").arg("-p"),
        )
        .on(OsKind::MacOs, InstallAction::Manual {
            url: "https://developer.apple.com/xcode/".into(),
        });

        let runner = FakeRunner::new().missing("xcode-select");
        let probe = FakeProbe::new(HostFacts::new(OsKind::MacOs, "14.4"));
        let resolver = Resolver::new(&runner, &probe);

        let err = resolver.ensure_all(&[xcode.clone()]).await.unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedPlatform(_)));

        let report = resolver.ensure_all(&[xcode.optional()]).await.unwrap();
        assert!(!report.needs_restart());
    }

    #[tokio::test]
    async fn download_installer_fetches_then_launches() {
        let winget = DependencyDescriptor::new("winget", CommandSpec::new("winget").arg("--version"))
            .on(OsKind::Windows, InstallAction::Download {
                url: "https://aka.ms/getwinget".into(),
                file_name: "getwinget.msixbundle".into(),
                launch: Some(CommandSpec::new("powershell").args([
                    "-Command",
                    "Add-AppxPackage -Path '{file}'",
                ])),
            });

        let runner = FakeRunner::new().missing("winget");
        let probe = FakeProbe::new(HostFacts::new(OsKind::Windows, "10.0.22631"));
        let downloader = FakeDownloader::new(b"bundle".to_vec());
        let resolver = Resolver::new(&runner, &probe).with_downloader(&downloader);

        let outcome = resolver.ensure(&winget).await.unwrap();
        assert_eq!(outcome, InstallOutcome::Installed);
        assert_eq!(downloader.urls(), vec!["https://aka.ms/getwinget"]);

        let dest = probe.temp_dir().join("getwinget.msixbundle");
        let expected = format!(
            "powershell -Command \"Add-AppxPackage -Path '{}'\"",
            dest.display()
        );
        assert!(runner.ran(&expected), "calls were {:?}", runner.calls());
    }
}

//! Visual Studio 2022 component check for Windows builds.

use std::path::{Path, PathBuf};

use crate::command::{CommandRunner, CommandSpec, OutputMode};
use crate::download::Downloader;
use crate::error::ProvisionError;
use crate::platform::EnvironmentProbe;

pub const VS_COMMUNITY_URL: &str = "https://aka.ms/vs/17/release/vs_community.exe";

/// Visual Studio 2022 is major version 17.
const VS2022_VERSION_RANGE: &str = "[17.0,18.0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VsComponent {
    pub name: &'static str,
    pub id: &'static str,
}

pub const REQUIRED_COMPONENTS: [VsComponent; 7] = [
    VsComponent {
        name: "MSVC v143 - VS 2022 C++ x64/x86 build tools (Latest)",
        id: "Microsoft.VisualStudio.Component.VC.Tools.x86.x64",
    },
    VsComponent {
        name: "MSVC v143 - VS 2022 C++ ARM64/ARM64EC build tools (Latest)",
        id: "Microsoft.VisualStudio.Component.VC.Tools.ARM64",
    },
    VsComponent {
        name: "MSVC v143 - VS 2022 C++ ARM build tools (Latest)",
        id: "Microsoft.VisualStudio.Component.VC.Tools.ARM",
    },
    VsComponent {
        name: "MSVC v143 - VS 2022 C++ x64/x86 Spectre-mitigated libs (Latest)",
        id: "Microsoft.VisualStudio.Component.VC.Runtimes.x86.x64.Spectre",
    },
    VsComponent {
        name: "MSVC v143 - VS 2022 C++ ARM64/ARM64EC Spectre-mitigated libs (Latest)",
        id: "Microsoft.VisualStudio.Component.VC.Runtimes.ARM64.Spectre",
    },
    VsComponent {
        name: "MSVC v143 - VS 2022 C++ ARM Spectre-mitigated libs (Latest)",
        id: "Microsoft.VisualStudio.Component.VC.Runtimes.ARM.Spectre",
    },
    VsComponent {
        name: "C++ CMake tools for Windows",
        id: "Microsoft.VisualStudio.Component.VC.CMake.Project",
    },
];

/// The Visual Studio Installer executables, when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsInstaller {
    pub vswhere: Option<PathBuf>,
    pub setup: Option<PathBuf>,
}

impl VsInstaller {
    /// Looks under `%ProgramFiles(x86)%\Microsoft Visual Studio\Installer`.
    pub fn locate(probe: &dyn EnvironmentProbe) -> Self {
        let Some(program_files) = probe.env_var("ProgramFiles(x86)") else {
            return Self::default();
        };
        let dir = Path::new(&program_files)
            .join("Microsoft Visual Studio")
            .join("Installer");
        let existing = |name: &str| {
            let path = dir.join(name);
            path.is_file().then_some(path)
        };
        Self {
            vswhere: existing("vswhere.exe"),
            setup: existing("setup.exe"),
        }
    }
}

/// Properties of the latest Visual Studio 2022 installation. Empty strings
/// when no installation was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsInstallInfo {
    pub channel_id: String,
    pub product_id: String,
    pub installation_path: String,
}

pub struct MsvcCheck<'a> {
    runner: &'a dyn CommandRunner,
    probe: &'a dyn EnvironmentProbe,
    downloader: Option<&'a dyn Downloader>,
}

impl<'a> MsvcCheck<'a> {
    pub fn new(runner: &'a dyn CommandRunner, probe: &'a dyn EnvironmentProbe) -> Self {
        Self {
            runner,
            probe,
            downloader: None,
        }
    }

    pub fn with_downloader(mut self, downloader: &'a dyn Downloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    async fn query(&self, vswhere: &Path, args: &[&str]) -> Result<String, ProvisionError> {
        let command = CommandSpec::new(vswhere.display().to_string())
            .args(["-latest", "-products", "*"])
            .args(args.iter().copied());
        match self.runner.run(&command, OutputMode::Capture).await {
            Ok(output) => Ok(output.trimmed().unwrap_or_default().to_owned()),
            Err(ProvisionError::ProgramNotFound(_)) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn install_info(&self, vswhere: &Path) -> Result<VsInstallInfo, ProvisionError> {
        let property = |name| {
            [
                "-version",
                VS2022_VERSION_RANGE,
                "-property",
                name,
            ]
        };
        Ok(VsInstallInfo {
            channel_id: self.query(vswhere, &property("channelId")).await?,
            product_id: self.query(vswhere, &property("productId")).await?,
            installation_path: self.query(vswhere, &property("installationPath")).await?,
        })
    }

    /// Components with no installation version reported by `vswhere`.
    pub async fn missing_components(
        &self,
        vswhere: &Path,
    ) -> Result<Vec<VsComponent>, ProvisionError> {
        let mut missing = Vec::new();
        for component in REQUIRED_COMPONENTS {
            let version = self
                .query(
                    vswhere,
                    &["-requires", component.id, "-property", "installationVersion"],
                )
                .await?;
            if version.is_empty() {
                missing.push(component);
            }
        }
        Ok(missing)
    }

    /// Fails with [`ProvisionError::MissingPrerequisite`] after launching
    /// the installer when any required component is absent.
    pub async fn ensure(&self) -> Result<VsInstallInfo, ProvisionError> {
        let installer = VsInstaller::locate(self.probe);

        let (info, missing) = match &installer.vswhere {
            Some(vswhere) => (
                self.install_info(vswhere).await?,
                self.missing_components(vswhere).await?,
            ),
            None => (VsInstallInfo::default(), REQUIRED_COMPONENTS.to_vec()),
        };

        if missing.is_empty() {
            tracing::info!("all required Visual Studio components are installed");
            tracing::info!(
                "Visual Studio 2022 installation path: {}",
                info.installation_path
            );
            return Ok(info);
        }

        let names: Vec<&str> = missing.iter().map(|c| c.name).collect();
        tracing::error!("required Visual Studio components are not installed: {names:?}");

        let setup = match installer.setup {
            Some(setup) => setup,
            None => self.download_installer().await?,
        };
        let modify = modify_command(&setup, &missing, &info);
        let status = self.runner.run(&modify, OutputMode::Inherit).await?;
        if !status.success() {
            tracing::warn!("Visual Studio installer exited with {:?}", status.code);
        }

        Err(ProvisionError::MissingPrerequisite(format!(
            "Visual Studio components were missing ({}); finish the Visual Studio installer and re-run",
            names.join(", ")
        )))
    }

    async fn download_installer(&self) -> Result<PathBuf, ProvisionError> {
        let downloader = self.downloader.ok_or_else(|| {
            ProvisionError::MissingPrerequisite(
                "the Visual Studio installer is missing and no downloader is configured".into(),
            )
        })?;
        let dest = self.probe.temp_dir().join("vs_community.exe");
        tracing::info!("downloading the Visual Studio installer from {VS_COMMUNITY_URL}");
        downloader.download(VS_COMMUNITY_URL, &dest).await?;
        Ok(dest)
    }
}

/// `setup modify --add <id>... --channelId <c> --productId <p>`
pub fn modify_command(setup: &Path, missing: &[VsComponent], info: &VsInstallInfo) -> CommandSpec {
    let mut command = CommandSpec::new(setup.display().to_string()).arg("modify");
    for component in missing {
        command = command.args(["--add", component.id]);
    }
    command.args([
        "--channelId",
        info.channel_id.as_str(),
        "--productId",
        info.product_id.as_str(),
    ])
}

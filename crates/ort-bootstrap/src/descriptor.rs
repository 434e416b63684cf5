use std::path::Path;

use crate::command::CommandSpec;
use crate::platform::OsKind;

/// Native package managers the installer knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Winget,
    Apt,
    Brew,
}

impl PackageManager {
    /// The exact install invocation for a package id.
    pub fn install_command(&self, id: &str, cask: bool) -> CommandSpec {
        match self {
            PackageManager::Winget => {
                CommandSpec::new("winget").args(["install", "--exact", "--id", id])
            }
            PackageManager::Apt => {
                CommandSpec::new("sudo").args(["apt-get", "install", "-y", id])
            }
            PackageManager::Brew => {
                let cmd = CommandSpec::new("brew").arg("install");
                if cask {
                    cmd.args(["--cask", id])
                } else {
                    cmd.arg(id)
                }
            }
        }
    }
}

/// Placeholder replaced by the downloaded file's path in
/// [`InstallAction::Download`] launch commands.
pub const DOWNLOADED_FILE: &str = "{file}";

/// How a dependency gets installed on one OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAction {
    Package {
        manager: PackageManager,
        id: String,
        cask: bool,
    },
    /// Run an installer command as-is.
    Command(CommandSpec),
    /// Download `url` to a temporary `file_name`, then run it. With
    /// `launch` unset the downloaded file is executed directly; otherwise
    /// `launch` runs with every [`DOWNLOADED_FILE`] argument replaced.
    Download {
        url: String,
        file_name: String,
        launch: Option<CommandSpec>,
    },
    /// No automatic installer; the user installs from `url`.
    Manual { url: String },
}

impl InstallAction {
    pub fn winget(id: impl Into<String>) -> Self {
        Self::Package {
            manager: PackageManager::Winget,
            id: id.into(),
            cask: false,
        }
    }

    pub fn apt(id: impl Into<String>) -> Self {
        Self::Package {
            manager: PackageManager::Apt,
            id: id.into(),
            cask: false,
        }
    }

    pub fn brew(id: impl Into<String>) -> Self {
        Self::Package {
            manager: PackageManager::Brew,
            id: id.into(),
            cask: false,
        }
    }

    pub fn brew_cask(id: impl Into<String>) -> Self {
        Self::Package {
            manager: PackageManager::Brew,
            id: id.into(),
            cask: true,
        }
    }

    /// Whether this action can run without the user.
    pub fn is_automatic(&self) -> bool {
        !matches!(self, Self::Manual { .. })
    }

    /// The command that performs the install, given where a
    /// [`InstallAction::Download`] payload landed. `None` for manual actions.
    pub fn command(&self, downloaded: Option<&Path>) -> Option<CommandSpec> {
        match self {
            Self::Package { manager, id, cask } => Some(manager.install_command(id, *cask)),
            Self::Command(cmd) => Some(cmd.clone()),
            Self::Download { launch, .. } => {
                let file = downloaded?.display().to_string();
                match launch {
                    None => Some(CommandSpec::new(file)),
                    Some(launch) => {
                        let mut cmd = launch.clone();
                        for arg in &mut cmd.args {
                            *arg = arg.replace(DOWNLOADED_FILE, &file);
                        }
                        Some(cmd)
                    }
                }
            }
            Self::Manual { .. } => None,
        }
    }
}

/// Declarative description of one external tool: how to detect it and how
/// to install it on each OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub name: String,
    pub check: CommandSpec,
    pub actions: Vec<(OsKind, InstallAction)>,
    pub failure_message: Option<String>,
    /// A required dependency with no installer for the host aborts the flow.
    pub required: bool,
}

impl DependencyDescriptor {
    pub fn new(name: impl Into<String>, check: CommandSpec) -> Self {
        Self {
            name: name.into(),
            check,
            actions: Vec::new(),
            failure_message: None,
            required: true,
        }
    }

    /// Register the installer for `os`, replacing any earlier one.
    pub fn on(mut self, os: OsKind, action: InstallAction) -> Self {
        self.actions.retain(|(existing, _)| *existing != os);
        self.actions.push((os, action));
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn action_for(&self, os: OsKind) -> Option<&InstallAction> {
        self.actions
            .iter()
            .find(|(candidate, _)| *candidate == os)
            .map(|(_, action)| action)
    }
}

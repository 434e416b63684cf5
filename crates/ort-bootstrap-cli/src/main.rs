mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ort_bootstrap::{
    AndroidAbi, BuildTarget, DepsLayout, EnvironmentProbe, ProvisionError, SystemProbe,
    SystemRunner, WindowsArch,
};
use ort_bootstrap_fetch::HttpDownloader;
use tracing_subscriber::EnvFilter;

use crate::commands::Host;

#[derive(Parser)]
#[command(name = "ort-bootstrap")]
#[command(about = "Provision a build machine and build ONNX Runtime from source")]
struct Cli {
    /// Configuration file (defaults to ~/.config/ort-bootstrap/bootstrap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log every command that is run
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the OS version and make sure winget, apt or Homebrew is usable
    EnsurePackageManager,
    /// Install CMake, Ninja, Java and the native compiler toolchain
    InstallBuildTools,
    /// Clone or update source repositories under <root>/_deps
    DownloadSources {
        /// Project root directory
        root: PathBuf,
        /// Repositories to fetch (opencl, onnxruntime, or any configured feature)
        #[arg(required = true)]
        features: Vec<String>,
    },
    /// Download the Android command-line tools and install the SDK packages
    DownloadAndroidSdk {
        /// Project root directory
        root: PathBuf,
    },
    /// Build and install ONNX Runtime
    Build {
        #[command(subcommand)]
        target: BuildCommand,
    },
}

#[derive(Subcommand)]
enum BuildCommand {
    /// Windows desktop builds, one per architecture
    Windows {
        root: PathBuf,
        /// Architectures to build (all when omitted)
        #[arg(long = "arch", value_enum)]
        arches: Vec<WindowsArchArg>,
    },
    /// DirectML builds for x64 and ARM64
    Dml { root: PathBuf },
    Linux {
        root: PathBuf,
        #[arg(long)]
        build_shared_lib: bool,
    },
    /// macOS universal or iOS build
    Apple {
        root: PathBuf,
        #[arg(long)]
        ios: bool,
        #[arg(long)]
        use_coreml: bool,
        #[arg(long)]
        build_shared_lib: bool,
    },
    Android {
        root: PathBuf,
        /// ABIs to build (all when omitted)
        #[arg(long = "arch", value_enum)]
        abis: Vec<AndroidAbiArg>,
        #[arg(long)]
        nnapi: bool,
        /// Disable NEON on armeabi-v7a
        #[arg(long)]
        no_neon: bool,
        #[arg(long)]
        build_shared_lib: bool,
    },
    /// WebAssembly build
    Web { root: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum WindowsArchArg {
    X86,
    X64,
    Arm64,
    Arm64ec,
    Arm32,
}

impl From<WindowsArchArg> for WindowsArch {
    fn from(arg: WindowsArchArg) -> Self {
        match arg {
            WindowsArchArg::X86 => WindowsArch::X86,
            WindowsArchArg::X64 => WindowsArch::X64,
            WindowsArchArg::Arm64 => WindowsArch::Arm64,
            WindowsArchArg::Arm64ec => WindowsArch::Arm64Ec,
            WindowsArchArg::Arm32 => WindowsArch::Arm32,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AndroidAbiArg {
    #[value(name = "arm64-v8a")]
    Arm64V8a,
    #[value(name = "armeabi-v7a")]
    ArmeabiV7a,
}

impl From<AndroidAbiArg> for AndroidAbi {
    fn from(arg: AndroidAbiArg) -> Self {
        match arg {
            AndroidAbiArg::Arm64V8a => AndroidAbi::Arm64V8a,
            AndroidAbiArg::ArmeabiV7a => AndroidAbi::ArmeabiV7a,
        }
    }
}

impl BuildCommand {
    fn into_target(self) -> (PathBuf, BuildTarget) {
        match self {
            BuildCommand::Windows { root, arches } => (
                root,
                BuildTarget::Windows {
                    arches: arches.into_iter().map(Into::into).collect(),
                },
            ),
            BuildCommand::Dml { root } => (root, BuildTarget::DirectMl),
            BuildCommand::Linux {
                root,
                build_shared_lib,
            } => (
                root,
                BuildTarget::Linux {
                    shared: build_shared_lib,
                },
            ),
            BuildCommand::Apple {
                root,
                ios,
                use_coreml,
                build_shared_lib,
            } => (
                root,
                BuildTarget::Apple {
                    ios,
                    coreml: use_coreml,
                    shared: build_shared_lib,
                },
            ),
            BuildCommand::Android {
                root,
                abis,
                nnapi,
                no_neon,
                build_shared_lib,
            } => {
                let abis = if abis.is_empty() {
                    vec![AndroidAbi::Arm64V8a, AndroidAbi::ArmeabiV7a]
                } else {
                    abis.into_iter().map(Into::into).collect()
                };
                (
                    root,
                    BuildTarget::Android {
                        abis,
                        nnapi,
                        no_neon,
                        shared: build_shared_lib,
                    },
                )
            }
            BuildCommand::Web { root } => (root, BuildTarget::Web),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "ort_bootstrap=debug"
    } else {
        "ort_bootstrap=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn layout_for(root: &Path) -> Result<DepsLayout> {
    let root = std::path::absolute(root)
        .with_context(|| format!("invalid project root: {}", root.display()))?;
    Ok(DepsLayout::new(root))
}

/// The subprocess exit code when a provisioning step failed, otherwise 1.
fn exit_status(err: &anyhow::Error) -> u8 {
    let code = err
        .chain()
        .find_map(|e| e.downcast_ref::<ProvisionError>())
        .map_or(1, ProvisionError::exit_code);
    u8::try_from(code).unwrap_or(1)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let app_config = config::load_config(cli.config.as_deref());
    let runner = SystemRunner;
    let probe = SystemProbe::detect();
    let downloader = HttpDownloader::new();
    let host = Host {
        runner: &runner,
        probe: &probe,
        downloader: &downloader,
    };
    tracing::debug!("host: {}", probe.facts());

    match cli.command {
        Command::EnsurePackageManager => {
            commands::package_manager::run(host).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::InstallBuildTools => {
            let report = commands::build_tools::run(host).await?;
            if report.needs_restart() {
                println!(
                    "Build tools were installed. Restart your terminal so PATH changes take effect, then re-run."
                );
                return Ok(ExitCode::FAILURE);
            }
            println!("All build tools are installed.");
            Ok(ExitCode::SUCCESS)
        }
        Command::DownloadSources { root, features } => {
            let layout = layout_for(&root)?;
            commands::sources::run(&runner, &layout, &app_config.repositories(), &features)
                .await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::DownloadAndroidSdk { root } => {
            let layout = layout_for(&root)?;
            commands::android_sdk::run(host, &layout, &app_config.android).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Build { target } => {
            let (root, target) = target.into_target();
            let layout = layout_for(&root)?;
            commands::build::run(&runner, &probe, &layout, &app_config.android, &target)
                .await
                .with_context(|| format!("{} build failed", target.platform_name()))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_android_build() {
        let cli = Cli::try_parse_from([
            "ort-bootstrap",
            "build",
            "android",
            "/work",
            "--arch",
            "armeabi-v7a",
            "--no-neon",
            "--nnapi",
        ])
        .unwrap();
        let Command::Build { target } = cli.command else {
            panic!("expected build");
        };
        let (root, target) = target.into_target();
        assert_eq!(root, PathBuf::from("/work"));
        assert_eq!(
            target,
            BuildTarget::Android {
                abis: vec![AndroidAbi::ArmeabiV7a],
                nnapi: true,
                no_neon: true,
                shared: false,
            }
        );
    }

    #[test]
    fn parses_windows_arches() {
        let cli = Cli::try_parse_from([
            "ort-bootstrap",
            "-v",
            "build",
            "windows",
            "C:/src",
            "--arch",
            "arm64ec",
            "--arch",
            "x86",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Build { target } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(
            target.into_target().1,
            BuildTarget::Windows {
                arches: vec![WindowsArch::Arm64Ec, WindowsArch::X86],
            }
        );
    }

    #[test]
    fn download_sources_requires_a_feature() {
        assert!(Cli::try_parse_from(["ort-bootstrap", "download-sources", "/work"]).is_err());
    }

    #[test]
    fn exit_status_uses_build_code() {
        let err = anyhow::Error::new(ProvisionError::BuildFailure {
            label: "Linux (shared)".into(),
            code: Some(2),
        })
        .context("Linux build failed");
        assert_eq!(exit_status(&err), 2);

        let other = anyhow::anyhow!("unknown feature");
        assert_eq!(exit_status(&other), 1);
    }
}

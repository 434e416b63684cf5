use std::fmt;
use std::path::{Path, PathBuf};

use crate::android::AndroidPins;
use crate::command::{CommandRunner, CommandSpec, OutputMode};
use crate::error::ProvisionError;
use crate::layout::{DepsLayout, relative_path};
use crate::platform::{HostFacts, OsKind};

const COMMON_FLAGS: &[&str] = &[
    "--parallel",
    "--compile_no_warning_as_error",
    "--skip_submodule_sync",
    "--skip_tests",
];

const VS2022_GENERATOR: &str = "Visual Studio 17 2022";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowsArch {
    X86,
    X64,
    Arm64,
    Arm64Ec,
    Arm32,
}

impl WindowsArch {
    pub const ALL: [WindowsArch; 5] = [
        WindowsArch::X64,
        WindowsArch::X86,
        WindowsArch::Arm32,
        WindowsArch::Arm64,
        WindowsArch::Arm64Ec,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WindowsArch::X86 => "x86",
            WindowsArch::X64 => "x64",
            WindowsArch::Arm64 => "arm64",
            WindowsArch::Arm64Ec => "arm64ec",
            WindowsArch::Arm32 => "arm32",
        }
    }

    /// Architecture switches for the build script. DirectML has no 32-bit
    /// ARM build, so `arm32` goes without it.
    fn flags(&self) -> &'static [&'static str] {
        match self {
            WindowsArch::X64 => &["--use_dml"],
            WindowsArch::X86 => &["--x86", "--use_dml"],
            WindowsArch::Arm32 => &["--arm"],
            WindowsArch::Arm64 => &["--arm64", "--use_dml"],
            WindowsArch::Arm64Ec => &["--arm64ec", "--use_dml"],
        }
    }
}

impl fmt::Display for WindowsArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AndroidAbi {
    Arm64V8a,
    ArmeabiV7a,
}

impl AndroidAbi {
    pub fn name(&self) -> &'static str {
        match self {
            AndroidAbi::Arm64V8a => "arm64-v8a",
            AndroidAbi::ArmeabiV7a => "armeabi-v7a",
        }
    }
}

impl fmt::Display for AndroidAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A platform build of ONNX Runtime and its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    Windows {
        arches: Vec<WindowsArch>,
    },
    DirectMl,
    Linux {
        shared: bool,
    },
    Apple {
        ios: bool,
        coreml: bool,
        shared: bool,
    },
    Android {
        abis: Vec<AndroidAbi>,
        nnapi: bool,
        no_neon: bool,
        shared: bool,
    },
    Web,
}

impl BuildTarget {
    pub fn platform_name(&self) -> &'static str {
        match self {
            BuildTarget::Windows { .. } => "Windows",
            BuildTarget::DirectMl => "Windows-DirectML",
            BuildTarget::Linux { .. } => "Linux",
            BuildTarget::Apple { ios: true, .. } => "iOS",
            BuildTarget::Apple { ios: false, .. } => "macOS",
            BuildTarget::Android { .. } => "Android",
            BuildTarget::Web => "WebAssembly",
        }
    }

    /// Refuse targets whose toolchain only exists on another host.
    pub fn check_host(&self, facts: &HostFacts) -> Result<(), ProvisionError> {
        match self {
            BuildTarget::Windows { .. } | BuildTarget::DirectMl
                if !facts.is_windows_10_or_later() =>
            {
                Err(ProvisionError::UnsupportedPlatform(format!(
                    "{} builds require Windows 10 or later (host is {facts})",
                    self.platform_name()
                )))
            }
            BuildTarget::Apple { .. } if facts.os != OsKind::MacOs => {
                Err(ProvisionError::UnsupportedPlatform(format!(
                    "{} builds require macOS (host is {facts})",
                    self.platform_name()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One run of the upstream build script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub label: String,
    pub command: CommandSpec,
    pub install_dir: PathBuf,
}

/// Turns a [`BuildTarget`] into build-script invocations.
pub struct BuildPlanner<'a> {
    layout: &'a DepsLayout,
    host: OsKind,
    android: &'a AndroidPins,
}

impl<'a> BuildPlanner<'a> {
    pub fn new(layout: &'a DepsLayout, host: OsKind, android: &'a AndroidPins) -> Self {
        Self {
            layout,
            host,
            android,
        }
    }

    pub fn build_script(&self) -> PathBuf {
        let name = if self.host == OsKind::Windows {
            "build.bat"
        } else {
            "build.sh"
        };
        self.layout.onnxruntime_src().join(name)
    }

    /// The source tree and its build script must already be in place.
    pub fn verify_sources(&self) -> Result<PathBuf, ProvisionError> {
        let src = self.layout.onnxruntime_src();
        if !src.is_dir() {
            return Err(ProvisionError::MissingPrerequisite(format!(
                "ONNX Runtime source path does not exist: {}",
                src.display()
            )));
        }
        let script = self.build_script();
        if !script.is_file() {
            return Err(ProvisionError::MissingPrerequisite(format!(
                "build script not found: {}",
                script.display()
            )));
        }
        Ok(script)
    }

    pub fn plan(&self, target: &BuildTarget) -> Vec<BuildInvocation> {
        match target {
            BuildTarget::Windows { arches } => self.plan_windows(arches),
            BuildTarget::DirectMl => self.plan_directml(),
            BuildTarget::Linux { shared } => self.plan_linux(*shared),
            BuildTarget::Apple { ios, coreml, shared } => self.plan_apple(*ios, *coreml, *shared),
            BuildTarget::Android {
                abis,
                nnapi,
                no_neon,
                shared,
            } => self.plan_android(abis, *nnapi, *no_neon, *shared),
            BuildTarget::Web => self.plan_web(),
        }
    }

    fn invocation(
        &self,
        label: String,
        mut args: Vec<String>,
        defines: Vec<(&str, String)>,
        install_dir: PathBuf,
    ) -> BuildInvocation {
        if !defines.is_empty() {
            args.push("--cmake_extra_defines".to_owned());
            args.extend(defines.into_iter().map(|(k, v)| format!("{k}={v}")));
        }
        let script = self.build_script();
        let command = CommandSpec::new(script.display().to_string())
            .args(args)
            .current_dir(self.layout.onnxruntime_src());
        BuildInvocation {
            label,
            command,
            install_dir,
        }
    }

    fn plan_windows(&self, arches: &[WindowsArch]) -> Vec<BuildInvocation> {
        let arches = if arches.is_empty() {
            &WindowsArch::ALL[..]
        } else {
            arches
        };

        arches
            .iter()
            .map(|arch| {
                let build_dir = self.layout.build_dir("Windows").join(arch.name());
                let install_dir = self.layout.install_dir("Windows").join(arch.name());

                let mut args = release_args(&["--cmake_generator", VS2022_GENERATOR]);
                args.push("--build_shared_lib".into());
                args.extend(arch.flags().iter().map(|f| f.to_string()));
                args.extend(build_dir_args(&build_dir));

                let prefix = relative_path(&install_dir, &build_dir);
                let defines = vec![
                    ("CMAKE_C_FLAGS", "/Qspectre".to_owned()),
                    ("CMAKE_CXX_FLAGS", "/Qspectre".to_owned()),
                    ("CMAKE_INSTALL_PREFIX", prefix.display().to_string()),
                ];
                self.invocation(format!("Windows {arch}"), args, defines, install_dir)
            })
            .collect()
    }

    fn plan_directml(&self) -> Vec<BuildInvocation> {
        [("x64", "x64", &[][..]), ("arm64", "ARM64", &["--arm64"][..])]
            .into_iter()
            .map(|(arch, dir_name, arch_flags)| {
                let build_dir = self.layout.build_dir("Windows-DirectML").join(dir_name);
                let install_dir = self.layout.install_dir("Windows-DirectML").join(dir_name);

                let mut args = release_args(&["--cmake_generator", VS2022_GENERATOR]);
                args.extend(["--use_dml".to_owned(), "--build_shared_lib".to_owned()]);
                args.extend(arch_flags.iter().map(|f| f.to_string()));
                args.extend(build_dir_args(&build_dir));

                // Visual Studio generators install from the Release subdirectory.
                let prefix = relative_path(&install_dir, &build_dir.join("Release"));
                let defines = vec![
                    ("CMAKE_C_FLAGS", "/Qspectre".to_owned()),
                    ("CMAKE_CXX_FLAGS", "/Qspectre".to_owned()),
                    ("CMAKE_INSTALL_PREFIX", prefix.display().to_string()),
                ];
                self.invocation(format!("DirectML {arch}"), args, defines, install_dir)
            })
            .collect()
    }

    fn plan_linux(&self, shared: bool) -> Vec<BuildInvocation> {
        let variant = if shared { "shared" } else { "static" };
        let build_dir = self.layout.build_dir("Linux").join(variant);
        let install_dir = self.layout.install_dir("Linux").join(variant);

        let mut args = release_args(&["--cmake_generator", "Ninja"]);
        if shared {
            args.push("--build_shared_lib".into());
        }
        args.extend(build_dir_args(&build_dir));

        let defines = vec![("CMAKE_INSTALL_PREFIX", install_dir.display().to_string())];
        vec![self.invocation(format!("Linux ({variant})"), args, defines, install_dir)]
    }

    fn plan_apple(&self, ios: bool, coreml: bool, shared: bool) -> Vec<BuildInvocation> {
        let platform = if ios { "iOS" } else { "macOS" };
        let build_dir = self.layout.build_dir(platform);
        let install_dir = self.layout.install_dir(platform);

        let mut args = release_args(&["--use_xcode"]);
        let mut defines = Vec::new();
        if shared {
            args.push("--build_shared_lib".into());
        }
        if ios {
            args.extend(
                [
                    "--ios",
                    "--apple_sysroot",
                    "iphoneos",
                    "--osx_arch",
                    "arm64",
                    "--apple_deploy_target",
                    "15.0",
                ]
                .map(String::from),
            );
        } else {
            args.extend(["--apple_deploy_target", "11.0"].map(String::from));
            defines.push(("CMAKE_OSX_ARCHITECTURES", "arm64;x86_64".to_owned()));
        }
        if coreml {
            args.push("--use_coreml".into());
        }
        args.extend(["--build_dir".to_owned(), build_dir.display().to_string()]);
        defines.push(("CMAKE_INSTALL_PREFIX", install_dir.display().to_string()));

        vec![self.invocation(platform.to_owned(), args, defines, install_dir)]
    }

    fn plan_android(
        &self,
        abis: &[AndroidAbi],
        nnapi: bool,
        no_neon: bool,
        shared: bool,
    ) -> Vec<BuildInvocation> {
        let mut base = vec!["--android".to_owned()];
        base.extend(release_args(&["--cmake_generator", "Ninja"]));
        base.extend([
            "--android_api".to_owned(),
            self.android.api_level.to_string(),
            "--android_sdk_path".to_owned(),
            self.layout.android_sdk().display().to_string(),
            "--android_ndk_path".to_owned(),
            self.layout.android_ndk(&self.android.ndk).display().to_string(),
        ]);
        if shared {
            base.push("--build_shared_lib".into());
        }
        if nnapi {
            base.push("--use_nnapi".into());
        }

        abis.iter()
            .map(|abi| {
                let build_dir = self.layout.build_dir("Android").join(abi.name());
                let install_dir = self.layout.install_dir("Android").join(abi.name());

                let mut args = base.clone();
                args.extend(["--android_abi".to_owned(), abi.name().to_owned()]);
                args.extend(build_dir_args(&build_dir));

                let mut defines = vec![
                    ("CMAKE_INSTALL_PREFIX", install_dir.display().to_string()),
                    ("CMAKE_C_FLAGS_RELEASE", "-O2 -g0".to_owned()),
                    ("CMAKE_CXX_FLAGS_RELEASE", "-O2 -g0".to_owned()),
                    ("CMAKE_SHARED_LINKER_FLAGS_RELEASE", "-s".to_owned()),
                ];
                if no_neon {
                    if *abi == AndroidAbi::ArmeabiV7a {
                        defines.push(("ANDROID_ARM_NEON", "FALSE".to_owned()));
                    } else {
                        tracing::warn!("--no-neon only applies to armeabi-v7a, ignoring it for {abi}");
                    }
                }
                self.invocation(format!("Android {abi}"), args, defines, install_dir)
            })
            .collect()
    }

    fn plan_web(&self) -> Vec<BuildInvocation> {
        let build_dir = self.layout.build_dir("WebAssembly");
        let install_dir = self.layout.install_dir("WebAssembly");

        let mut args: Vec<String> = [
            "--config",
            "MinSizeRel",
            "--enable_wasm_threads",
            "--enable_wasm_simd",
        ]
        .map(String::from)
        .to_vec();
        args.extend(build_dir_args(&build_dir));

        let defines = vec![("CMAKE_INSTALL_PREFIX", install_dir.display().to_string())];
        vec![self.invocation("WebAssembly".to_owned(), args, defines, install_dir)]
    }
}

/// `--config Release`, the generator switches, then the common flags.
fn release_args(generator: &[&str]) -> Vec<String> {
    let mut args = vec!["--config".to_owned(), "Release".to_owned()];
    args.extend(generator.iter().map(|s| s.to_string()));
    args.extend(COMMON_FLAGS.iter().map(|s| s.to_string()));
    args
}

fn build_dir_args(build_dir: &Path) -> [String; 4] {
    [
        "--build_dir".to_owned(),
        build_dir.display().to_string(),
        "--target".to_owned(),
        "install".to_owned(),
    ]
}

/// Run invocations in order. The first failure aborts the rest.
pub async fn run_builds(
    runner: &dyn CommandRunner,
    invocations: &[BuildInvocation],
) -> Result<(), ProvisionError> {
    for invocation in invocations {
        tracing::info!("building ONNX Runtime for {}...", invocation.label);
        let output = match runner.run(&invocation.command, OutputMode::Inherit).await {
            Ok(output) => output,
            Err(ProvisionError::ProgramNotFound(program)) => {
                return Err(ProvisionError::MissingPrerequisite(format!(
                    "build script not found: {program}"
                )));
            }
            Err(e) => return Err(e),
        };
        if !output.success() {
            return Err(ProvisionError::BuildFailure {
                label: invocation.label.clone(),
                code: output.code,
            });
        }
        tracing::info!(
            "ONNX Runtime for {} built and installed to {}",
            invocation.label,
            invocation.install_dir.display()
        );
    }
    Ok(())
}

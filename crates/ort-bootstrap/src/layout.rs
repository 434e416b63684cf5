use std::path::{Component, Path, PathBuf};

/// Paths inside the `_deps` cache under a project root.
///
/// Layout:
/// - `root/_deps/<name>-src` for cloned sources
/// - `root/_deps/onnxruntime-build/<platform>[/<arch>]`
/// - `root/_deps/onnxruntime-install/<platform>[/<arch>]`
/// - `root/_deps/android-sdk`, `root/_deps/android-cmdline-tools`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsLayout {
    root: PathBuf,
}

impl DepsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn deps_dir(&self) -> PathBuf {
        self.root.join("_deps")
    }

    pub fn source_dir(&self, dir_name: &str) -> PathBuf {
        self.deps_dir().join(dir_name)
    }

    pub fn onnxruntime_src(&self) -> PathBuf {
        self.source_dir("onnxruntime-src")
    }

    pub fn build_dir(&self, platform: &str) -> PathBuf {
        self.deps_dir().join("onnxruntime-build").join(platform)
    }

    pub fn install_dir(&self, platform: &str) -> PathBuf {
        self.deps_dir().join("onnxruntime-install").join(platform)
    }

    pub fn android_sdk(&self) -> PathBuf {
        self.deps_dir().join("android-sdk")
    }

    pub fn android_ndk(&self, ndk_version: &str) -> PathBuf {
        self.android_sdk().join("ndk").join(ndk_version)
    }

    pub fn android_cmdline_tools_archive(&self) -> PathBuf {
        self.deps_dir().join("android_commandlinetools.zip")
    }

    pub fn android_cmdline_tools_base(&self) -> PathBuf {
        self.deps_dir().join("android-cmdline-tools")
    }

    /// The `cmdline-tools` directory the archive unpacks into.
    pub fn android_cmdline_tools(&self) -> PathBuf {
        self.android_cmdline_tools_base().join("cmdline-tools")
    }
}

/// `target` expressed relative to `base`, or `target` unchanged when the
/// two share no root (different drives on Windows, or a relative input).
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let has_root = |parts: &[Component]| {
        parts
            .iter()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    };
    if !has_root(&target_parts) || !has_root(&base_parts) {
        return target.to_path_buf();
    }
    if target_parts.first() != base_parts.first() {
        return target.to_path_buf();
    }

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

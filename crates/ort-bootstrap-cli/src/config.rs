use std::path::{Path, PathBuf};

use ort_bootstrap::AndroidPins;
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Repositories added to, or replacing, the built-in ones by feature.
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
    #[serde(default)]
    pub android: AndroidPins,
}

/// A source repository selectable by `download-sources`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoEntry {
    pub feature: String,
    pub url: String,
    #[serde(rename = "ref")]
    pub reference: String,
    /// Directory name under `_deps`. Defaults to `<feature>-src`.
    pub dir: Option<String>,
}

impl RepoEntry {
    pub fn dir_name(&self) -> String {
        self.dir
            .clone()
            .unwrap_or_else(|| format!("{}-src", self.feature))
    }
}

/// Built-in registry of source repositories.
pub fn default_repos() -> Vec<RepoEntry> {
    vec![
        RepoEntry {
            feature: "opencl".into(),
            url: "https://github.com/KhronosGroup/OpenCL-SDK.git".into(),
            reference: "v2024.10.24".into(),
            dir: Some("opencl-src".into()),
        },
        RepoEntry {
            feature: "onnxruntime".into(),
            url: "https://github.com/microsoft/onnxruntime.git".into(),
            reference: "v1.22.1".into(),
            dir: Some("onnxruntime-src".into()),
        },
    ]
}

impl AppConfig {
    /// Built-in repositories with configured entries layered on top. A
    /// configured feature replaces the built-in entry of the same name.
    pub fn repositories(&self) -> Vec<RepoEntry> {
        let mut repos = default_repos();
        for entry in &self.repos {
            match repos.iter_mut().find(|r| r.feature == entry.feature) {
                Some(existing) => *existing = entry.clone(),
                None => repos.push(entry.clone()),
            }
        }
        repos
    }
}

/// Config file path: `~/.config/ort-bootstrap/bootstrap.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ort-bootstrap").join("bootstrap.toml"))
}

/// Load config from `explicit` or the default location, falling back to
/// defaults if the file is missing or unparsable.
pub fn load_config(explicit: Option<&Path>) -> AppConfig {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config_path(),
    };

    if let Some(path) = path {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    tracing::debug!("loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => tracing::warn!(
                    "failed to parse config at {}, using defaults: {e}",
                    path.display()
                ),
            },
            Err(e) if explicit.is_some() => tracing::warn!(
                "could not read config at {}, using defaults: {e}",
                path.display()
            ),
            Err(_) => {}
        }
    }

    AppConfig::default()
}

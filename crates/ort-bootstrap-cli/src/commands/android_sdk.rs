use std::path::PathBuf;

use anyhow::{Context, Result};
use ort_bootstrap::{AndroidPins, DepsLayout, OutputMode, ProvisionError};
use ort_bootstrap_fetch::{HashAlgorithm, PinnedArtifact, ensure_artifact, extract_zip};

use super::Host;

/// Fetch and verify the command-line tools, then install the pinned SDK
/// packages into `_deps/android-sdk`.
pub async fn run(host: Host<'_>, layout: &DepsLayout, pins: &AndroidPins) -> Result<()> {
    let sdkmanager = ensure_cmdline_tools(host, layout, pins).await?;

    tokio::fs::create_dir_all(layout.android_sdk()).await?;
    let os = host.probe.facts().os;
    let install = pins.sdkmanager_install_command(os, layout);
    tracing::info!("installing Android SDK packages with {}", sdkmanager.display());

    let output = host
        .runner
        .run(&install, OutputMode::Inherit)
        .await
        .context("failed to run sdkmanager")?;
    if !output.success() {
        return Err(ProvisionError::InstallFailure {
            tool: "Android SDK packages".into(),
            code: output.code,
        }
        .into());
    }

    println!(
        "Android SDK components installed to {}",
        layout.android_sdk().display()
    );
    Ok(())
}

/// Returns the verified `sdkmanager` path.
async fn ensure_cmdline_tools(
    host: Host<'_>,
    layout: &DepsLayout,
    pins: &AndroidPins,
) -> Result<PathBuf> {
    let os = host.probe.facts().os;
    let (Some(archive_sha256), Some(sdkmanager_sha1)) = (
        pins.cmdline_tools_sha256.get(os),
        pins.sdkmanager_sha1.get(os),
    ) else {
        return Err(ProvisionError::UnsupportedPlatform(format!(
            "no Android command-line tools for {os}"
        ))
        .into());
    };

    let archive = PinnedArtifact {
        url: pins.cmdline_tools_url(os)?,
        path: layout.android_cmdline_tools_archive(),
        sha256: archive_sha256.to_owned(),
    };
    ensure_artifact(host.downloader, &archive)
        .await
        .context("failed to fetch the Android command-line tools")?;

    let sdkmanager = layout
        .android_cmdline_tools()
        .join("bin")
        .join(AndroidPins::sdkmanager_file_name(os));

    if HashAlgorithm::Sha1.file_matches(&sdkmanager, sdkmanager_sha1)? {
        tracing::info!("Android SDK Manager is already installed and verified");
        return Ok(sdkmanager);
    }

    let cmdline_tools = layout.android_cmdline_tools();
    if tokio::fs::try_exists(&cmdline_tools).await? {
        tracing::warn!(
            "removing broken cmdline-tools directory at {}",
            cmdline_tools.display()
        );
        tokio::fs::remove_dir_all(&cmdline_tools).await?;
    }

    tracing::info!("extracting Android command-line tools");
    extract_zip(&archive.path, &layout.android_cmdline_tools_base())?;
    HashAlgorithm::Sha1
        .verify(&sdkmanager, sdkmanager_sha1)
        .context("extracted sdkmanager failed verification")?;

    Ok(sdkmanager)
}

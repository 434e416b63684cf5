use anyhow::{Context, Result};
use ort_bootstrap::catalog;
use ort_bootstrap::{ProvisionReport, Resolver};

use super::{Host, print_report};

/// Validate the host and make sure its package manager is usable.
pub async fn run(host: Host<'_>) -> Result<ProvisionReport> {
    let facts = host.probe.facts();
    tracing::info!("detected {facts}");

    let descriptors = catalog::package_manager_for(facts)?;
    if descriptors.is_empty() {
        println!("{facts} is supported; apt is available.");
        return Ok(ProvisionReport::default());
    }

    let report = Resolver::new(host.runner, host.probe)
        .with_downloader(host.downloader)
        .ensure_all(&descriptors)
        .await
        .context("failed to set up the package manager")?;

    print_report(&report);
    Ok(report)
}

pub mod android_sdk;
pub mod build;
pub mod build_tools;
pub mod package_manager;
pub mod sources;

use ort_bootstrap::{CommandRunner, Downloader, EnvironmentProbe, ProvisionReport};

/// The machine-facing seams every command works through.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub runner: &'a dyn CommandRunner,
    pub probe: &'a dyn EnvironmentProbe,
    pub downloader: &'a dyn Downloader,
}

/// Print one line per ensured dependency to stdout.
pub fn print_report(report: &ProvisionReport) {
    for (name, outcome) in &report.entries {
        println!("{name}: {outcome}");
    }
}

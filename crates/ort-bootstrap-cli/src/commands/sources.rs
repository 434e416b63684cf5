use anyhow::{Context, Result, bail};
use ort_bootstrap::{
    CommandRunner, DepsLayout, RefResolution, RepoSyncTarget, RepoSynchronizer, SyncedRepo,
};

use crate::config::RepoEntry;

/// Pick the configured repositories for `features`, rejecting unknown
/// names before anything touches the disk.
pub fn select<'a>(repos: &'a [RepoEntry], features: &[String]) -> Result<Vec<&'a RepoEntry>> {
    let mut selected = Vec::with_capacity(features.len());
    for feature in features {
        let Some(entry) = repos.iter().find(|r| &r.feature == feature) else {
            let known: Vec<&str> = repos.iter().map(|r| r.feature.as_str()).collect();
            bail!("unknown feature `{feature}` (known: {})", known.join(", "));
        };
        if !selected.iter().any(|e: &&RepoEntry| e.feature == entry.feature) {
            selected.push(entry);
        }
    }
    Ok(selected)
}

/// Clone or update each selected repository under `_deps`.
pub async fn run(
    runner: &dyn CommandRunner,
    layout: &DepsLayout,
    repos: &[RepoEntry],
    features: &[String],
) -> Result<Vec<SyncedRepo>> {
    let selected = select(repos, features)?;
    let sync = RepoSynchronizer::new(runner);
    let mut synced = Vec::with_capacity(selected.len());

    for entry in selected {
        tracing::info!("syncing {} at {}", entry.feature, entry.reference);
        let target = RepoSyncTarget::new(
            &entry.url,
            layout.source_dir(&entry.dir_name()),
            &entry.reference,
        );
        let repo = sync
            .sync(&target)
            .await
            .with_context(|| format!("failed to sync {}", entry.feature))?;

        let how = match repo.resolution {
            RefResolution::Tag => "tag",
            RefResolution::Branch => "branch",
        };
        println!(
            "{} ready at {} ({how} {})",
            entry.feature,
            repo.path.display(),
            entry.reference
        );
        synced.push(repo);
    }

    Ok(synced)
}

#[cfg(test)]
mod tests {
    use ort_bootstrap::CommandOutput;
    use ort_bootstrap::test_support::FakeRunner;

    use super::*;
    use crate::config::default_repos;

    fn features(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let repos = default_repos();
        let err = select(&repos, &features(&["onnxruntime", "cuda"])).unwrap_err();
        assert!(err.to_string().contains("cuda"));
    }

    #[test]
    fn duplicate_features_sync_once() {
        let repos = default_repos();
        let selected = select(&repos, &features(&["opencl", "opencl"])).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[tokio::test]
    async fn clones_into_deps_and_checks_out_tag() {
        let root = tempfile::tempdir().unwrap();
        let layout = DepsLayout::new(root.path());
        let dest = layout.onnxruntime_src();
        let runner = FakeRunner::new().respond(
            "git show-ref --verify --quiet refs/tags/v1.22.1",
            CommandOutput::ok(""),
        );

        let synced = run(&runner, &layout, &default_repos(), &features(&["onnxruntime"]))
            .await
            .unwrap();

        assert_eq!(synced.len(), 1);
        assert_eq!(synced[0].resolution, RefResolution::Tag);
        assert!(runner.ran(&format!(
            "git clone --recursive https://github.com/microsoft/onnxruntime.git {}",
            dest.display()
        )));
        assert!(runner.ran("git checkout --force --detach tags/v1.22.1"));
    }
}

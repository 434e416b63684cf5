use std::path::Path;
use std::process::Command;

use ort_bootstrap::{RefResolution, RepoSyncTarget, RepoSynchronizer, SystemRunner};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=ort", "-c", "user.email=ort@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_owned()
}

/// An upstream with two commits on `main`, tag `v1.0.0` on the first, and
/// a `release` branch on the second.
fn upstream(dir: &Path) -> (String, String) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-b", "main"]);
    std::fs::write(dir.join("README"), "one\n").unwrap();
    git(dir, &["add", "README"]);
    git(dir, &["commit", "-m", "one"]);
    git(dir, &["tag", "v1.0.0"]);
    let tagged = git(dir, &["rev-parse", "HEAD"]);

    std::fs::write(dir.join("README"), "two\n").unwrap();
    git(dir, &["commit", "-am", "two"]);
    git(dir, &["branch", "release"]);
    let head = git(dir, &["rev-parse", "HEAD"]);
    (tagged, head)
}

fn url_of(dir: &Path) -> String {
    dir.display().to_string()
}

#[tokio::test]
async fn tag_checkout_is_detached_and_converges() {
    if !git_available() {
        return;
    }
    let temp = tempfile::tempdir().unwrap();
    let remote = temp.path().join("upstream");
    let (tagged, _) = upstream(&remote);
    let dest = temp.path().join("_deps").join("lib-src");
    let target = RepoSyncTarget::new(url_of(&remote), &dest, "v1.0.0");
    let sync = RepoSynchronizer::new(&SystemRunner);

    let first = sync.sync(&target).await.unwrap();
    assert_eq!(first.resolution, RefResolution::Tag);
    assert!(!first.recloned);
    assert_eq!(git(&dest, &["rev-parse", "HEAD"]), tagged);
    assert_eq!(git(&dest, &["rev-parse", "--abbrev-ref", "HEAD"]), "HEAD");

    // Drift: move the clone to another branch, then sync again.
    git(&dest, &["checkout", "main"]);
    let second = sync.sync(&target).await.unwrap();
    assert_eq!(second.resolution, RefResolution::Tag);
    assert_eq!(git(&dest, &["rev-parse", "HEAD"]), tagged);
    assert_eq!(git(&dest, &["rev-parse", "--abbrev-ref", "HEAD"]), "HEAD");
}

#[tokio::test]
async fn remote_only_branch_becomes_tracking_branch() {
    if !git_available() {
        return;
    }
    let temp = tempfile::tempdir().unwrap();
    let remote = temp.path().join("upstream");
    let (_, head) = upstream(&remote);
    let dest = temp.path().join("clone");
    let sync = RepoSynchronizer::new(&SystemRunner);

    let synced = sync
        .sync(&RepoSyncTarget::new(url_of(&remote), &dest, "release"))
        .await
        .unwrap();

    assert_eq!(synced.resolution, RefResolution::Branch);
    assert_eq!(git(&dest, &["rev-parse", "--abbrev-ref", "HEAD"]), "release");
    assert_eq!(
        git(&dest, &["rev-parse", "--abbrev-ref", "release@{upstream}"]),
        "origin/release"
    );
    assert_eq!(git(&dest, &["rev-parse", "HEAD"]), head);
}

#[tokio::test]
async fn foreign_remote_is_replaced() {
    if !git_available() {
        return;
    }
    let temp = tempfile::tempdir().unwrap();
    let wanted = temp.path().join("wanted");
    let other = temp.path().join("other");
    let (tagged, _) = upstream(&wanted);
    upstream(&other);
    let dest = temp.path().join("clone");
    let sync = RepoSynchronizer::new(&SystemRunner);

    sync.sync(&RepoSyncTarget::new(url_of(&other), &dest, "main"))
        .await
        .unwrap();
    std::fs::write(dest.join("scratch.txt"), "local change").unwrap();

    let synced = sync
        .sync(&RepoSyncTarget::new(url_of(&wanted), &dest, "v1.0.0"))
        .await
        .unwrap();

    assert!(synced.recloned);
    assert!(!dest.join("scratch.txt").exists());
    assert_eq!(git(&dest, &["config", "--get", "remote.origin.url"]), url_of(&wanted));
    assert_eq!(git(&dest, &["rev-parse", "HEAD"]), tagged);
}

#[tokio::test]
async fn unknown_ref_is_an_error() {
    if !git_available() {
        return;
    }
    let temp = tempfile::tempdir().unwrap();
    let remote = temp.path().join("upstream");
    upstream(&remote);
    let dest = temp.path().join("clone");

    let err = RepoSynchronizer::new(&SystemRunner)
        .sync(&RepoSyncTarget::new(url_of(&remote), &dest, "v9.9.9"))
        .await
        .unwrap_err();

    assert!(matches!(err, ort_bootstrap::ProvisionError::UnresolvableRef { .. }));
}

#[tokio::test]
async fn edited_tracked_file_does_not_block_tag_checkout() {
    if !git_available() {
        return;
    }
    let temp = tempfile::tempdir().unwrap();
    let remote = temp.path().join("upstream");
    let (tagged, _) = upstream(&remote);
    let dest = temp.path().join("clone");
    let target = RepoSyncTarget::new(url_of(&remote), &dest, "v1.0.0");
    let sync = RepoSynchronizer::new(&SystemRunner);
    sync.sync(&target).await.unwrap();

    git(&dest, &["checkout", "main"]);
    std::fs::write(dest.join("README"), "edited locally\n").unwrap();

    let synced = sync.sync(&target).await.unwrap();

    assert_eq!(synced.resolution, RefResolution::Tag);
    assert!(!synced.recloned);
    assert_eq!(git(&dest, &["rev-parse", "HEAD"]), tagged);
    assert_eq!(std::fs::read_to_string(dest.join("README")).unwrap(), "one\n");
    assert_eq!(git(&dest, &["status", "--porcelain"]), "");
}

#[tokio::test]
async fn diverged_local_branch_is_reset_to_upstream() {
    if !git_available() {
        return;
    }
    let temp = tempfile::tempdir().unwrap();
    let remote = temp.path().join("upstream");
    let (_, head) = upstream(&remote);
    let dest = temp.path().join("clone");
    let target = RepoSyncTarget::new(url_of(&remote), &dest, "release");
    let sync = RepoSynchronizer::new(&SystemRunner);
    sync.sync(&target).await.unwrap();

    std::fs::write(dest.join("README"), "local commit\n").unwrap();
    git(&dest, &["commit", "-am", "local"]);
    std::fs::write(dest.join("README"), "uncommitted\n").unwrap();
    assert_ne!(git(&dest, &["rev-parse", "HEAD"]), head);

    let synced = sync.sync(&target).await.unwrap();

    assert_eq!(synced.resolution, RefResolution::Branch);
    assert_eq!(git(&dest, &["rev-parse", "--abbrev-ref", "HEAD"]), "release");
    assert_eq!(
        git(&dest, &["rev-parse", "HEAD"]),
        git(&dest, &["rev-parse", "origin/release"])
    );
    assert_eq!(git(&dest, &["rev-parse", "HEAD"]), head);
    assert_eq!(git(&dest, &["status", "--porcelain"]), "");
}

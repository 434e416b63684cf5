use std::path::{Path, PathBuf};

use crate::command::{CommandOutput, CommandRunner, CommandSpec, OutputMode};
use crate::error::ProvisionError;

/// A repository to keep checked out at a pinned ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSyncTarget {
    pub url: String,
    pub path: PathBuf,
    /// Tag or branch name.
    pub reference: String,
}

impl RepoSyncTarget {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>, reference: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            reference: reference.into(),
        }
    }
}

/// How the requested ref was checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefResolution {
    /// Detached HEAD at `refs/tags/<ref>`.
    Tag,
    /// Local branch tracking `origin/<ref>`.
    Branch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedRepo {
    pub path: PathBuf,
    pub resolution: RefResolution,
    /// The existing directory was deleted and cloned again.
    pub recloned: bool,
}

/// What was found at the destination before syncing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LocalState {
    Missing,
    NotARepository,
    ForeignRemote(Option<String>),
    Matching,
}

/// Keeps a local clone pointed at the right remote and checked out at the
/// requested ref, with submodules in step.
pub struct RepoSynchronizer<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> RepoSynchronizer<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub async fn sync(&self, target: &RepoSyncTarget) -> Result<SyncedRepo, ProvisionError> {
        let dest = &target.path;
        let mut recloned = false;

        match self.inspect(target).await? {
            LocalState::Missing => {
                tracing::info!("{} does not exist, cloning {}", dest.display(), target.url);
                self.clone_fresh(target).await?;
            }
            LocalState::NotARepository => {
                tracing::warn!(
                    "{} exists but is not a git repository, removing and recloning",
                    dest.display()
                );
                tokio::fs::remove_dir_all(dest).await?;
                self.clone_fresh(target).await?;
                recloned = true;
            }
            LocalState::ForeignRemote(remote) => {
                tracing::warn!(
                    "remote of {} is {}, expected {}; removing and recloning",
                    dest.display(),
                    remote.as_deref().unwrap_or("<unset>"),
                    target.url
                );
                self.warn_about_local_changes(dest).await;
                tokio::fs::remove_dir_all(dest).await?;
                self.clone_fresh(target).await?;
                recloned = true;
            }
            LocalState::Matching => {
                tracing::info!("{} already tracks {}, updating", dest.display(), target.url);
                self.warn_about_local_changes(dest).await;
                self.git(dest, ["reset", "--hard"]).await?;
            }
        }

        self.git(dest, ["fetch", "--all", "--tags"]).await?;
        let resolution = self.checkout(dest, &target.reference).await?;
        self.git(dest, ["submodule", "update", "--init", "--recursive", "--force"])
            .await?;

        Ok(SyncedRepo {
            path: dest.clone(),
            resolution,
            recloned,
        })
    }

    async fn inspect(&self, target: &RepoSyncTarget) -> Result<LocalState, ProvisionError> {
        let dest = &target.path;
        if !tokio::fs::try_exists(dest).await? {
            return Ok(LocalState::Missing);
        }
        if !tokio::fs::try_exists(dest.join(".git")).await? {
            return Ok(LocalState::NotARepository);
        }

        let remote = self
            .runner
            .run(
                &git(dest, ["config", "--get", "remote.origin.url"]),
                OutputMode::Capture,
            )
            .await?;

        match remote.trimmed() {
            Some(url) if url == target.url => Ok(LocalState::Matching),
            other => Ok(LocalState::ForeignRemote(other.map(str::to_owned))),
        }
    }

    async fn clone_fresh(&self, target: &RepoSyncTarget) -> Result<(), ProvisionError> {
        if let Some(parent) = target.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let cmd = CommandSpec::new("git").args([
            "clone".to_owned(),
            "--recursive".to_owned(),
            target.url.clone(),
            target.path.display().to_string(),
        ]);
        self.checked(&cmd).await.map(drop)
    }

    /// Tag first, then remote branch; anything else cannot be resolved.
    async fn checkout(&self, dest: &Path, reference: &str) -> Result<RefResolution, ProvisionError> {
        if self.ref_exists(dest, &format!("refs/tags/{reference}")).await? {
            tracing::info!("checking out tag {reference}");
            let tag = format!("tags/{reference}");
            self.git(dest, ["checkout", "--force", "--detach", tag.as_str()])
                .await?;
            return Ok(RefResolution::Tag);
        }

        if self
            .ref_exists(dest, &format!("refs/remotes/origin/{reference}"))
            .await?
        {
            tracing::info!("checking out branch {reference} tracking origin/{reference}");
            let upstream = format!("origin/{reference}");
            self.git(
                dest,
                [
                    "checkout",
                    "--force",
                    "-B",
                    reference,
                    "--track",
                    upstream.as_str(),
                ],
            )
            .await?;
            return Ok(RefResolution::Branch);
        }

        Err(ProvisionError::UnresolvableRef {
            reference: reference.to_owned(),
            path: dest.to_path_buf(),
        })
    }

    async fn ref_exists(&self, dest: &Path, full_ref: &str) -> Result<bool, ProvisionError> {
        let output = self
            .runner
            .run(
                &git(dest, ["show-ref", "--verify", "--quiet", full_ref]),
                OutputMode::Quiet,
            )
            .await?;
        Ok(output.success())
    }

    async fn warn_about_local_changes(&self, dest: &Path) {
        let status = self
            .runner
            .run(&git(dest, ["status", "--porcelain"]), OutputMode::Capture)
            .await;
        if let Ok(output) = status
            && let Some(changes) = output.trimmed()
        {
            tracing::warn!(
                "discarding {} locally modified path(s) in {}",
                changes.lines().count(),
                dest.display()
            );
        }
    }

    async fn git<'s, I>(&self, dest: &Path, args: I) -> Result<CommandOutput, ProvisionError>
    where
        I: IntoIterator<Item = &'s str>,
    {
        self.checked(&git(dest, args)).await
    }

    async fn checked(&self, cmd: &CommandSpec) -> Result<CommandOutput, ProvisionError> {
        let output = self.runner.run(cmd, OutputMode::Inherit).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ProvisionError::GitSync {
                command: cmd.to_string(),
                code: output.code,
            })
        }
    }
}

fn git<'s, I>(dest: &Path, args: I) -> CommandSpec
where
    I: IntoIterator<Item = &'s str>,
{
    CommandSpec::new("git").args(args).current_dir(dest)
}

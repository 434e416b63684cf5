pub mod android;
pub mod catalog;
pub mod command;
pub mod descriptor;
pub mod download;
pub mod error;
pub mod layout;
pub mod msvc;
pub mod outcome;
pub mod platform;
pub mod recipe;
pub mod repo;
pub mod resolver;

pub use android::{AndroidPins, PerHost};
pub use command::{CommandOutput, CommandRunner, CommandSpec, OutputMode, SystemRunner};
pub use descriptor::{DependencyDescriptor, InstallAction, PackageManager};
pub use download::Downloader;
pub use error::ProvisionError;
pub use layout::DepsLayout;
pub use msvc::MsvcCheck;
pub use outcome::{InstallOutcome, ProvisionReport};
pub use platform::{EnvironmentProbe, HostFacts, OsKind, SystemProbe};
pub use recipe::{AndroidAbi, BuildInvocation, BuildPlanner, BuildTarget, WindowsArch, run_builds};
pub use repo::{RefResolution, RepoSyncTarget, RepoSynchronizer, SyncedRepo};
pub use resolver::Resolver;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

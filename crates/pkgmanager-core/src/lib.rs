//! Reconciliation engine for pkgmanager.
//!
//! Resolves a platform-aware manifest into one target manager per package,
//! diffs that desired set against what each package manager reports as
//! installed, and plans and executes the install/remove actions that close
//! the gap. The [`Engine`] exposes every command the CLI offers.

pub mod concurrency;
pub mod config;
pub mod diff;
pub mod engine;
pub mod executor;
pub mod inspect;
pub mod plan;
pub mod registry;
pub mod resolver;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use config::Config;
pub use diff::{compute_diff, DiffResult, ManagerDiff, Mismatch, UnreadableManager};
pub use engine::{
    Engine, InstallReport, ListReport, ManagerListing, ManagerOutdated, ManagerResults,
    ManagerSearch, ManagerStatus, OutdatedReport, QueryReport, RemoveReport, SearchReport,
    ShowReport, StatusReport, SyncPlan, UpdateEntry, UpdateReport,
};
pub use executor::{execute, ActionResult, ActionStatus, ExecOptions, SyncReport};
pub use inspect::{inspect, Snapshot};
pub use plan::{plan_clean, plan_sync, Action, ActionKind, ActionReason, SyncOptions, VersionTarget};
pub use registry::{AdapterRegistry, Availability};
pub use resolver::{resolve, resolve_manifest, ResolvedPackage};

use pkgmanager_schema::ManagerType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] pkgmanager_schema::ManifestError),
    #[error("lock error: {0}")]
    Lock(#[from] pkgmanager_schema::LockError),
    #[error("custom package specs: {0}")]
    Spec(#[from] pkgmanager_schema::SpecError),
    #[error("{0}")]
    Adapter(#[from] pkgmanager_adapters::AdapterError),
    #[error("{manager}: {name} has no entry in the lock file")]
    LockEntryMissing { manager: ManagerType, name: String },
    #[error("package '{0}' is not in the manifest; pass --type")]
    PackageNotInManifest(String),
    #[error("package '{0}' is not installed by any available manager")]
    PackageNotFound(String),
    #[error("unknown manager type: {0}")]
    UnknownManagerType(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("lock aborted: listing {manager} failed: {reason}")]
    Aborted { manager: ManagerType, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Errors that mean the inputs themselves are unusable, as opposed to a
    /// package manager failing at runtime.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::Manifest(_)
                | CoreError::Lock(_)
                | CoreError::Spec(_)
                | CoreError::UnknownManagerType(_)
                | CoreError::Config(_)
        )
    }
}

use crate::config::Config;
use crate::diff::{compute_diff, manager_order, DiffResult, UnreadableManager};
use crate::executor::{execute, ActionStatus, ExecOptions, SyncReport};
use crate::inspect::{inspect, Snapshot};
use crate::plan::{plan_clean, plan_sync, Action, SyncOptions};
use crate::registry::{AdapterRegistry, Availability};
use crate::resolver::{resolve, resolve_manifest, ResolvedPackage};
use crate::CoreError;
use pkgmanager_adapters::{
    detect_shell, AdapterError, Backend, CommandOutcome, InstalledPackage, OutdatedPackage,
    PackageDetails, PackageManagerAdapter, SearchHit,
};
use pkgmanager_schema::{
    parse_manifest_file, LockDocument, ManagerType, ManifestDocument, ManifestError, PackageEntry,
    Platform,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub manager: ManagerType,
    pub name: String,
    pub dry_run: bool,
    /// `None` in a dry run.
    pub outcome: Option<CommandOutcome>,
    pub manifest_updated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
    pub manager: ManagerType,
    pub name: String,
    pub dry_run: bool,
    pub outcome: Option<CommandOutcome>,
    /// Section the manifest entry was removed from.
    pub manifest_section: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateEntry {
    pub manager: ManagerType,
    /// `None` when every package of the manager was updated.
    pub name: Option<String>,
    #[serde(flatten)]
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_output: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub dry_run: bool,
    pub entries: Vec<UpdateEntry>,
}

impl UpdateReport {
    pub fn is_success(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|e| matches!(e.status, ActionStatus::Failed { .. }))
    }
}

/// Items one manager type returned for a query.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerResults<T> {
    pub manager: ManagerType,
    pub items: Vec<T>,
}

/// Per-manager results of a read-only query over several manager types.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport<T> {
    pub results: Vec<ManagerResults<T>>,
    /// Managers that do not offer the query.
    pub unsupported: Vec<ManagerType>,
    pub failures: Vec<UnreadableManager>,
}

impl<T> Default for QueryReport<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            unsupported: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> QueryReport<T> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.results.iter().map(|r| r.items.len()).sum()
    }

    fn record(&mut self, manager: ManagerType, result: Result<Vec<T>, AdapterError>) {
        match result {
            Ok(items) => self.results.push(ManagerResults { manager, items }),
            Err(AdapterError::Unsupported { .. }) => self.unsupported.push(manager),
            Err(e) => {
                warn!("{manager}: {e}");
                self.failures.push(UnreadableManager {
                    manager,
                    error: e.to_string(),
                });
            }
        }
    }
}

pub type ManagerListing = ManagerResults<InstalledPackage>;
pub type ManagerSearch = ManagerResults<SearchHit>;
pub type ManagerOutdated = ManagerResults<OutdatedPackage>;
pub type ListReport = QueryReport<InstalledPackage>;
pub type SearchReport = QueryReport<SearchHit>;
pub type OutdatedReport = QueryReport<OutdatedPackage>;

#[derive(Debug, Clone, Serialize)]
pub struct ShowReport {
    pub manager: ManagerType,
    /// Whether the package is in the resolved desired set.
    pub tracked: bool,
    pub details: PackageDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerStatus {
    pub manager: ManagerType,
    pub tool: &'static str,
    pub available: bool,
    /// Entries declared under this type that apply on this platform.
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub manifest_path: PathBuf,
    pub manifest_exists: bool,
    pub lock_path: PathBuf,
    pub lock_exists: bool,
    pub platform: Platform,
    pub shell: String,
    pub managers: Vec<ManagerStatus>,
}

/// The plan a sync would execute, with the inputs it was derived from.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub desired: Vec<ResolvedPackage>,
    pub diff: DiffResult,
    pub actions: Vec<Action>,
}

/// Every command of the tool, over a fixed set of adapters.
///
/// The engine holds no state between calls: each operation reads the manifest
/// (and lock file where relevant), takes a fresh availability snapshot, and
/// writes files back only after the adapters have succeeded.
pub struct Engine<A = Backend> {
    config: Config,
    registry: AdapterRegistry<A>,
    cancelled: fn() -> bool,
}

impl Engine<Backend> {
    /// An engine over the real package managers.
    pub fn new(config: Config) -> Result<Self, CoreError> {
        let adapter_config = config.adapter_config()?;
        let registry = AdapterRegistry::system(&adapter_config);
        Ok(Self::with_registry(config, registry))
    }
}

impl<A: PackageManagerAdapter> Engine<A> {
    pub fn with_registry(config: Config, registry: AdapterRegistry<A>) -> Self {
        Self {
            config,
            registry,
            cancelled: crate::concurrency::shutdown_requested,
        }
    }

    /// Replace the interrupt check polled before each action.
    #[must_use]
    pub fn with_cancel_check(mut self, cancelled: fn() -> bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry<A> {
        &self.registry
    }

    pub fn load_manifest(&self) -> Result<ManifestDocument, CoreError> {
        debug!("loading manifest {}", self.config.manifest_path.display());
        Ok(parse_manifest_file(&self.config.manifest_path)?)
    }

    /// The manifest, or an empty one when the file does not exist yet.
    fn load_manifest_or_empty(&self) -> Result<ManifestDocument, CoreError> {
        match parse_manifest_file(&self.config.manifest_path) {
            Ok(doc) => Ok(doc),
            Err(ManifestError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no manifest at {}", self.config.manifest_path.display());
                Ok(ManifestDocument::empty())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The lock file, or `None` when it does not exist.
    pub fn load_lock(&self) -> Result<Option<LockDocument>, CoreError> {
        if !self.config.lock_path.exists() {
            return Ok(None);
        }
        Ok(Some(LockDocument::read_from_file(&self.config.lock_path)?))
    }

    pub fn availability(&self) -> Availability {
        self.registry.availability()
    }

    pub fn desired(&self, manifest: &ManifestDocument, availability: &Availability) -> Vec<ResolvedPackage> {
        resolve_manifest(manifest, self.config.platform, availability)
    }

    fn available_adapter(&self, manager: ManagerType) -> Result<&A, CoreError> {
        self.registry
            .get(manager)
            .filter(|a| a.is_available())
            .ok_or_else(|| AdapterError::ManagerUnavailable(manager).into())
    }

    fn exec_options(&self, dry_run: bool, continue_on_error: bool, jobs: usize) -> ExecOptions {
        ExecOptions {
            dry_run,
            continue_on_error,
            jobs: if jobs == 0 { self.config.jobs } else { jobs },
            cancelled: self.cancelled,
        }
    }

    /// Compute what a sync would do without executing anything.
    ///
    /// Only manager types that hold desired packages are listed.
    pub fn plan_sync(&self, options: &SyncOptions) -> Result<SyncPlan, CoreError> {
        let manifest = self.load_manifest()?;
        let lock = if options.locked {
            let lock = self.load_lock()?.ok_or_else(|| {
                CoreError::Config(format!(
                    "--locked requires a lock file, none at {}",
                    self.config.lock_path.display()
                ))
            })?;
            Some(lock)
        } else {
            None
        };

        let availability = self.availability();
        let desired = self.desired(&manifest, &availability);
        let managers: Vec<ManagerType> = manager_order(&desired, &Snapshot::default())
            .into_iter()
            .filter(|m| selected(&options.types, *m))
            .collect();
        let snapshot = inspect(&self.registry, &availability, &managers, &desired);
        let diff = compute_diff(&desired, &snapshot, lock.as_ref(), &options.types);
        let actions = plan_sync(&diff, &desired, lock.as_ref(), options);
        debug!(
            "sync plan: {} desired, {} missing, {} actions",
            desired.len(),
            diff.missing_count(),
            actions.len()
        );
        Ok(SyncPlan {
            desired,
            diff,
            actions,
        })
    }

    /// Install whatever the manifest wants and the system lacks.
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncReport, CoreError> {
        let plan = self.plan_sync(options)?;
        info!(
            "syncing {} packages ({} actions, dry_run={})",
            plan.desired.len(),
            plan.actions.len(),
            options.dry_run
        );
        let exec = self.exec_options(options.dry_run, options.continue_on_error, options.jobs);
        let mut report = execute(&self.registry, plan.actions, &exec);
        report.unreadable = plan
            .diff
            .unreadable
            .into_iter()
            .map(|u| (u.manager, u.error))
            .collect();
        Ok(report)
    }

    /// Install one package and record it in the manifest.
    pub fn install(&self, manager: ManagerType, name: &str, dry_run: bool) -> Result<InstallReport, CoreError> {
        let mut manifest = self.load_manifest_or_empty()?;
        let adapter = self.available_adapter(manager)?;
        if dry_run {
            return Ok(InstallReport {
                manager,
                name: name.to_owned(),
                dry_run,
                outcome: None,
                manifest_updated: false,
            });
        }

        info!("{manager}: installing {name}");
        let outcome = adapter.install(name, None)?;
        let manifest_updated = manifest.add_entry(manager, name)?;
        if manifest_updated {
            manifest.write_to_file(&self.config.manifest_path)?;
            debug!("added {name} to {}", self.config.manifest_path.display());
        }
        Ok(InstallReport {
            manager,
            name: name.to_owned(),
            dry_run,
            outcome: Some(outcome),
            manifest_updated,
        })
    }

    /// Uninstall one package and, unless `keep`, drop its manifest entry.
    ///
    /// Without `manager` the type comes from the manifest entry's fallback chain.
    pub fn remove(
        &self,
        name: &str,
        manager: Option<ManagerType>,
        keep: bool,
        dry_run: bool,
    ) -> Result<RemoveReport, CoreError> {
        let mut manifest = self.load_manifest_or_empty()?;
        let entry = declaring_entry(&manifest, name, manager);
        let manager = match (manager, entry) {
            (Some(m), _) => m,
            (None, Some(entry)) => resolve(&entry.chain(), &self.availability())
                .ok_or_else(|| CoreError::PackageNotInManifest(name.to_owned()))?,
            (None, None) => return Err(CoreError::PackageNotInManifest(name.to_owned())),
        };
        let declared = entry.map(PackageEntry::declared);
        let adapter = self.available_adapter(manager)?;
        if dry_run {
            return Ok(RemoveReport {
                manager,
                name: name.to_owned(),
                dry_run,
                outcome: None,
                manifest_section: None,
            });
        }

        info!("{manager}: removing {name}");
        let outcome = adapter.remove(name)?;
        let manifest_section = match declared {
            Some(declared) if !keep => {
                let section = manifest.remove_entry(name, Some(declared))?;
                if section.is_some() {
                    manifest.write_to_file(&self.config.manifest_path)?;
                }
                section
            }
            _ => None,
        };
        Ok(RemoveReport {
            manager,
            name: name.to_owned(),
            dry_run,
            outcome: Some(outcome),
            manifest_section,
        })
    }

    /// Update one package, or every package of the selected managers.
    ///
    /// A named package's type comes from `manager`, then the manifest, then
    /// whichever available manager reports it installed.
    pub fn update(
        &self,
        name: Option<&str>,
        manager: Option<ManagerType>,
        dry_run: bool,
    ) -> Result<UpdateReport, CoreError> {
        let manifest = self.load_manifest_or_empty()?;
        let availability = self.availability();

        let targets: Vec<(ManagerType, Option<&str>)> = match name {
            Some(name) => {
                let manager = match manager {
                    Some(m) => m,
                    None => self.detect_manager(&manifest, &availability, name)?,
                };
                vec![(manager, Some(name))]
            }
            None => {
                let managers = match manager {
                    Some(m) => vec![m],
                    None => manager_order(&self.desired(&manifest, &availability), &Snapshot::default()),
                };
                managers.into_iter().map(|m| (m, None)).collect()
            }
        };

        let mut report = UpdateReport {
            dry_run,
            entries: Vec::new(),
        };
        for (manager, name) in targets {
            let entry = |status, raw_output| UpdateEntry {
                manager,
                name: name.map(str::to_owned),
                status,
                raw_output,
            };
            if (self.cancelled)() {
                report.entries.push(entry(ActionStatus::Cancelled, String::new()));
                continue;
            }
            let adapter = match self.available_adapter(manager) {
                Ok(adapter) => adapter,
                Err(e) if name.is_none() => {
                    debug!("{manager}: skipping update: {e}");
                    report.entries.push(entry(ActionStatus::Skipped, String::new()));
                    continue;
                }
                Err(e) => return Err(e),
            };
            if dry_run {
                report.entries.push(entry(ActionStatus::Planned, String::new()));
                continue;
            }
            info!("{manager}: updating {}", name.unwrap_or("all packages"));
            let done = match adapter.update(name) {
                Ok(outcome) if outcome.success => entry(
                    ActionStatus::Succeeded {
                        message: outcome.message,
                    },
                    outcome.raw_output,
                ),
                Ok(outcome) => entry(
                    ActionStatus::Failed {
                        error: outcome.message,
                    },
                    outcome.raw_output,
                ),
                Err(AdapterError::Unsupported { .. }) if name.is_none() => {
                    debug!("{manager}: bulk update unsupported");
                    entry(ActionStatus::Skipped, String::new())
                }
                Err(e) => {
                    warn!("{manager}: update failed: {e}");
                    entry(ActionStatus::Failed { error: e.to_string() }, String::new())
                }
            };
            report.entries.push(done);
        }
        Ok(report)
    }

    fn detect_manager(
        &self,
        manifest: &ManifestDocument,
        availability: &Availability,
        name: &str,
    ) -> Result<ManagerType, CoreError> {
        if let Some((_, entry)) = manifest.find_entry(name) {
            if let Some(manager) = resolve(&entry.chain(), availability) {
                return Ok(manager);
            }
        }
        for manager in availability.available() {
            if self.registry.get(manager).is_some_and(|a| a.check(name)) {
                debug!("{name} found installed under {manager}");
                return Ok(manager);
            }
        }
        Err(CoreError::PackageNotFound(name.to_owned()))
    }

    /// Installed packages of the selected managers, flagged tracked or not.
    pub fn list(&self, types: &[ManagerType]) -> Result<ListReport, CoreError> {
        let manifest = self.load_manifest_or_empty()?;
        let availability = self.availability();
        let desired = self.desired(&manifest, &availability);
        let snapshot = inspect(&self.registry, &availability, &selected_types(types), &desired);

        let mut report = ListReport::default();
        for (manager, packages) in snapshot.listed() {
            let mut items = packages.to_vec();
            items.sort_by(|a, b| a.name.cmp(&b.name));
            report.results.push(ManagerListing { manager, items });
        }
        report.failures = failures_of(&snapshot);
        Ok(report)
    }

    /// Pin the installed versions of every desired package and write the lock file.
    ///
    /// Any manager that cannot be listed aborts the operation before anything
    /// is written. With a type filter, pins of other managers already in the
    /// lock file are kept.
    pub fn lock(&self, types: &[ManagerType]) -> Result<LockDocument, CoreError> {
        let manifest = self.load_manifest()?;
        let availability = self.availability();
        let desired = self.desired(&manifest, &availability);
        let managers = selected_types(types);
        let snapshot = inspect(&self.registry, &availability, &managers, &desired).into_complete()?;

        let mut fresh = LockDocument::new();
        for pkg in desired.iter().filter(|p| managers.contains(&p.manager)) {
            if let Some(installed) = snapshot.find(pkg.manager, &pkg.name) {
                fresh.insert(pkg.manager, &pkg.name, &installed.version);
            }
        }

        let lock = if types.is_empty() {
            fresh
        } else {
            let mut existing = self.load_lock()?.unwrap_or_default();
            existing.merge_from(fresh, &managers);
            existing
        };
        lock.write_to_file(&self.config.lock_path)?;
        info!(
            "locked {} packages to {}",
            lock.len(),
            self.config.lock_path.display()
        );
        Ok(lock)
    }

    /// Compare manifest and system; lock-aware when a lock file exists.
    pub fn diff(&self, types: &[ManagerType]) -> Result<DiffResult, CoreError> {
        let manifest = self.load_manifest()?;
        let lock = self.load_lock()?;
        let availability = self.availability();
        let desired = self.desired(&manifest, &availability);
        let snapshot = inspect(&self.registry, &availability, &selected_types(types), &desired);
        Ok(compute_diff(&desired, &snapshot, lock.as_ref(), types))
    }

    pub fn status(&self) -> Result<StatusReport, CoreError> {
        let manifest = self.load_manifest_or_empty()?;
        let availability = self.availability();
        let managers = ManagerType::ALL
            .iter()
            .map(|m| ManagerStatus {
                manager: *m,
                tool: m.tool(),
                available: availability.is_available(*m),
                entries: manifest.entry_count(*m, self.config.platform),
            })
            .collect();
        Ok(StatusReport {
            manifest_path: self.config.manifest_path.clone(),
            manifest_exists: self.config.manifest_path.exists(),
            lock_path: self.config.lock_path.clone(),
            lock_exists: self.config.lock_path.exists(),
            platform: self.config.platform,
            shell: detect_shell(),
            managers,
        })
    }

    /// Details of an installed package.
    ///
    /// Without `manager`, the manifest's resolution is tried first, then every
    /// available manager in canonical order.
    pub fn show(&self, name: &str, manager: Option<ManagerType>) -> Result<Option<ShowReport>, CoreError> {
        let manifest = self.load_manifest_or_empty()?;
        let availability = self.availability();
        let desired = self.desired(&manifest, &availability);

        if let Some(manager) = manager {
            let details = self.available_adapter(manager)?.show(name)?;
            return Ok(details.map(|details| ShowReport {
                manager,
                tracked: is_tracked(&desired, manager, name),
                details,
            }));
        }

        let mut candidates: Vec<ManagerType> = desired
            .iter()
            .filter(|p| p.name == name)
            .map(|p| p.manager)
            .collect();
        let others: Vec<ManagerType> = availability
            .available()
            .filter(|m| !candidates.contains(m))
            .collect();
        candidates.extend(others);

        for manager in candidates {
            let Ok(adapter) = self.available_adapter(manager) else {
                continue;
            };
            match adapter.show(name) {
                Ok(Some(details)) => {
                    return Ok(Some(ShowReport {
                        manager,
                        tracked: is_tracked(&desired, manager, name),
                        details,
                    }))
                }
                Ok(None) => {}
                Err(e) => debug!("{manager}: show {name}: {e}"),
            }
        }
        Ok(None)
    }

    pub fn search(&self, query: &str, types: &[ManagerType]) -> SearchReport {
        let mut report = SearchReport::default();
        for manager in self.available_of(types) {
            if let Some(adapter) = self.registry.get(manager) {
                report.record(manager, adapter.search(query));
            }
        }
        report
    }

    pub fn outdated(&self, types: &[ManagerType]) -> OutdatedReport {
        let mut report = OutdatedReport::default();
        for manager in self.available_of(types) {
            if let Some(adapter) = self.registry.get(manager) {
                report.record(manager, adapter.outdated());
            }
        }
        report
    }

    /// Removals for untracked packages. Nothing is executed; see [`Engine::execute`].
    pub fn plan_clean(&self, types: &[ManagerType]) -> Result<Vec<Action>, CoreError> {
        let manifest = self.load_manifest()?;
        let availability = self.availability();
        let desired = self.desired(&manifest, &availability);
        let snapshot = inspect(&self.registry, &availability, &selected_types(types), &desired);
        let diff = compute_diff(&desired, &snapshot, None, types);
        Ok(plan_clean(&diff, types))
    }

    /// Run an already confirmed plan.
    pub fn execute(&self, actions: Vec<Action>, dry_run: bool, continue_on_error: bool) -> SyncReport {
        execute(
            &self.registry,
            actions,
            &self.exec_options(dry_run, continue_on_error, 0),
        )
    }

    /// The installed state of the selected managers rendered as a manifest.
    pub fn export(&self, types: &[ManagerType]) -> ManifestDocument {
        let availability = self.availability();
        let snapshot = inspect(&self.registry, &availability, &selected_types(types), &[]);
        let groups: Vec<(ManagerType, Vec<String>)> = snapshot
            .listed()
            .filter(|(_, packages)| !packages.is_empty())
            .map(|(manager, packages)| {
                let mut names: Vec<String> = packages.iter().map(|p| p.name.clone()).collect();
                names.sort();
                (manager, names)
            })
            .collect();
        ManifestDocument::from_installed(&groups)
    }

    fn available_of(&self, types: &[ManagerType]) -> Vec<ManagerType> {
        let availability = self.availability();
        selected_types(types)
            .into_iter()
            .filter(|m| availability.is_available(*m))
            .collect()
    }
}

fn selected(types: &[ManagerType], manager: ManagerType) -> bool {
    types.is_empty() || types.contains(&manager)
}

/// `types`, or every manager type when empty.
fn selected_types(types: &[ManagerType]) -> Vec<ManagerType> {
    ManagerType::ALL
        .into_iter()
        .filter(|m| selected(types, *m))
        .collect()
}

fn is_tracked(desired: &[ResolvedPackage], manager: ManagerType, name: &str) -> bool {
    desired.iter().any(|p| p.manager == manager && p.name == name)
}

fn failures_of(snapshot: &Snapshot) -> Vec<UnreadableManager> {
    snapshot
        .failures()
        .iter()
        .map(|(manager, e)| UnreadableManager {
            manager: *manager,
            error: e.to_string(),
        })
        .collect()
}

/// The entry named `name` whose chain includes `manager`, or the first entry
/// named `name` when no manager is given.
fn declaring_entry<'a>(
    manifest: &'a ManifestDocument,
    name: &str,
    manager: Option<ManagerType>,
) -> Option<&'a PackageEntry> {
    let Some(manager) = manager else {
        return manifest.find_entry(name).map(|(_, entry)| entry);
    };
    manifest
        .sections()
        .iter()
        .flat_map(|s| s.body.lists.iter())
        .flat_map(|(_, entries)| entries.iter())
        .find(|e| e.name == name && e.accepts(manager))
}

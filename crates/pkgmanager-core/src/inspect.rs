//! Actual-state snapshots: one `list_installed` per manager type.

use crate::registry::{AdapterRegistry, Availability};
use crate::resolver::ResolvedPackage;
use crate::CoreError;
use pkgmanager_adapters::{AdapterError, InstalledPackage, PackageManagerAdapter};
use pkgmanager_schema::ManagerType;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// What each queried manager reported, with tracked flags already set.
#[derive(Debug, Default)]
pub struct Snapshot {
    installed: BTreeMap<ManagerType, Vec<InstalledPackage>>,
    failures: Vec<(ManagerType, AdapterError)>,
}

impl Snapshot {
    pub fn installed(&self, manager: ManagerType) -> &[InstalledPackage] {
        self.installed.get(&manager).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn find(&self, manager: ManagerType, name: &str) -> Option<&InstalledPackage> {
        self.installed(manager).iter().find(|p| p.name == name)
    }

    /// Whether `manager` was listed successfully.
    pub fn was_listed(&self, manager: ManagerType) -> bool {
        self.installed.contains_key(&manager)
    }

    pub fn listed(&self) -> impl Iterator<Item = (ManagerType, &[InstalledPackage])> {
        self.installed.iter().map(|(m, pkgs)| (*m, pkgs.as_slice()))
    }

    pub fn failures(&self) -> &[(ManagerType, AdapterError)] {
        &self.failures
    }

    /// Fail on the first manager that could not be listed.
    pub fn into_complete(self) -> Result<Self, CoreError> {
        match self.failures.first() {
            Some((manager, e)) => Err(CoreError::Aborted {
                manager: *manager,
                reason: e.to_string(),
            }),
            None => Ok(self),
        }
    }
}

/// List every available manager in `managers` once.
///
/// Unavailable managers are skipped: they cannot have anything installed.
/// A listing failure is recorded and the manager left out of the snapshot.
pub fn inspect<A: PackageManagerAdapter>(
    registry: &AdapterRegistry<A>,
    availability: &Availability,
    managers: &[ManagerType],
    desired: &[ResolvedPackage],
) -> Snapshot {
    let wanted: HashSet<(ManagerType, &str)> = desired
        .iter()
        .map(|p| (p.manager, p.name.as_str()))
        .collect();

    let mut snapshot = Snapshot::default();
    for manager in managers {
        if !availability.is_available(*manager) {
            debug!("{manager}: not available, skipping listing");
            continue;
        }
        let Some(adapter) = registry.get(*manager) else {
            continue;
        };
        match adapter.list_installed() {
            Ok(mut packages) => {
                for pkg in &mut packages {
                    pkg.tracked = wanted.contains(&(*manager, pkg.name.as_str()));
                }
                debug!("{manager}: {} installed", packages.len());
                snapshot.installed.insert(*manager, packages);
            }
            Err(e) => {
                warn!("{manager}: listing installed packages failed: {e}");
                snapshot.failures.push((*manager, e));
            }
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmanager_adapters::MockAdapter;

    fn desired(manager: ManagerType, name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_owned(),
            manager,
            section: "general".to_owned(),
            declared: manager,
        }
    }

    #[test]
    fn tracked_flags_follow_desired_set() {
        let registry = AdapterRegistry::new().with(
            MockAdapter::new(ManagerType::Rust)
                .with_installed("ripgrep", "14.1.0")
                .with_installed("bat", "0.24.0"),
        );
        let snapshot = inspect(
            &registry,
            &registry.availability(),
            &[ManagerType::Rust],
            &[desired(ManagerType::Rust, "ripgrep")],
        );
        assert!(snapshot.find(ManagerType::Rust, "ripgrep").unwrap().tracked);
        assert!(!snapshot.find(ManagerType::Rust, "bat").unwrap().tracked);
    }

    #[test]
    fn one_listing_per_manager() {
        let registry = AdapterRegistry::new().with(MockAdapter::new(ManagerType::Go));
        let availability = registry.availability();
        inspect(&registry, &availability, &[ManagerType::Go], &[]);
        assert_eq!(registry.get(ManagerType::Go).unwrap().list_calls(), 1);
    }

    #[test]
    fn unavailable_managers_are_skipped() {
        let registry = AdapterRegistry::new().with(MockAdapter::new(ManagerType::Bun).unavailable());
        let snapshot = inspect(&registry, &registry.availability(), &[ManagerType::Bun], &[]);
        assert!(!snapshot.was_listed(ManagerType::Bun));
        assert!(snapshot.failures().is_empty());
    }

    #[test]
    fn listing_failures_are_recorded() {
        let registry = AdapterRegistry::new()
            .with(MockAdapter::new(ManagerType::Conda).failing_listing())
            .with(MockAdapter::new(ManagerType::Python).with_installed("ruff", "0.4.0"));
        let snapshot = inspect(
            &registry,
            &registry.availability(),
            &[ManagerType::Conda, ManagerType::Python],
            &[],
        );
        assert_eq!(snapshot.failures().len(), 1);
        assert!(snapshot.was_listed(ManagerType::Python));
        assert!(matches!(
            snapshot.into_complete(),
            Err(CoreError::Aborted { manager: ManagerType::Conda, .. })
        ));
    }
}

//! Desired state against actual state, per manager type.

use crate::inspect::Snapshot;
use crate::resolver::ResolvedPackage;
use pkgmanager_adapters::InstalledPackage;
use pkgmanager_schema::{LockDocument, ManagerType};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub name: String,
    pub installed: String,
    pub pinned: String,
}

/// Three disjoint sets for one manager type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerDiff {
    pub manager: ManagerType,
    /// Desired but not installed, in desired-set order.
    pub missing: Vec<String>,
    /// Installed but not desired, sorted by name.
    pub untracked: Vec<InstalledPackage>,
    /// Desired, installed, and at a version other than the lock's.
    pub mismatched: Vec<Mismatch>,
}

impl ManagerDiff {
    fn new(manager: ManagerType) -> Self {
        Self {
            manager,
            missing: Vec::new(),
            untracked: Vec::new(),
            mismatched: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.untracked.is_empty() && self.mismatched.is_empty()
    }
}

/// A manager whose installed set could not be read; it is left out of the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreadableManager {
    pub manager: ManagerType,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// In processing order, see [`manager_order`].
    pub managers: Vec<ManagerDiff>,
    pub unreadable: Vec<UnreadableManager>,
}

impl DiffResult {
    pub fn get(&self, manager: ManagerType) -> Option<&ManagerDiff> {
        self.managers.iter().find(|d| d.manager == manager)
    }

    pub fn is_clean(&self) -> bool {
        self.managers.iter().all(ManagerDiff::is_clean)
    }

    pub fn missing_count(&self) -> usize {
        self.managers.iter().map(|d| d.missing.len()).sum()
    }

    pub fn untracked_count(&self) -> usize {
        self.managers.iter().map(|d| d.untracked.len()).sum()
    }

    pub fn mismatched_count(&self) -> usize {
        self.managers.iter().map(|d| d.mismatched.len()).sum()
    }
}

/// Manager types in the order they are processed.
///
/// Types appear in the order the desired set first mentions them, followed by
/// types that only have untracked packages (canonical order). `custom` always
/// goes last.
pub fn manager_order(desired: &[ResolvedPackage], snapshot: &Snapshot) -> Vec<ManagerType> {
    let mut order: Vec<ManagerType> = Vec::new();
    for pkg in desired {
        if !order.contains(&pkg.manager) {
            order.push(pkg.manager);
        }
    }
    for manager in ManagerType::ALL {
        if !order.contains(&manager) && !snapshot.installed(manager).is_empty() {
            order.push(manager);
        }
    }
    if let Some(pos) = order.iter().position(|m| *m == ManagerType::Custom) {
        let custom = order.remove(pos);
        order.push(custom);
    }
    order
}

/// Compare `desired` with `snapshot`, restricted to `filter` when non-empty.
///
/// Mismatches are only computed when `lock` is given. A package that is both
/// untracked and off its pin is reported as untracked only.
pub fn compute_diff(
    desired: &[ResolvedPackage],
    snapshot: &Snapshot,
    lock: Option<&LockDocument>,
    filter: &[ManagerType],
) -> DiffResult {
    let selected = |m: ManagerType| filter.is_empty() || filter.contains(&m);

    let mut result = DiffResult {
        unreadable: snapshot
            .failures()
            .iter()
            .filter(|(m, _)| selected(*m))
            .map(|(manager, e)| UnreadableManager {
                manager: *manager,
                error: e.to_string(),
            })
            .collect(),
        ..DiffResult::default()
    };
    let unreadable: HashSet<ManagerType> = result.unreadable.iter().map(|u| u.manager).collect();

    for manager in manager_order(desired, snapshot) {
        if !selected(manager) || unreadable.contains(&manager) {
            continue;
        }
        let mut diff = ManagerDiff::new(manager);
        let wanted: Vec<&ResolvedPackage> = desired.iter().filter(|p| p.manager == manager).collect();

        for pkg in &wanted {
            match snapshot.find(manager, &pkg.name) {
                None => diff.missing.push(pkg.name.clone()),
                Some(installed) => {
                    let pinned = lock.and_then(|l| l.pinned(manager, &pkg.name));
                    if let Some(pinned) = pinned.filter(|v| *v != installed.version) {
                        diff.mismatched.push(Mismatch {
                            name: pkg.name.clone(),
                            installed: installed.version.clone(),
                            pinned: pinned.to_owned(),
                        });
                    }
                }
            }
        }

        let wanted_names: HashSet<&str> = wanted.iter().map(|p| p.name.as_str()).collect();
        diff.untracked = snapshot
            .installed(manager)
            .iter()
            .filter(|p| !wanted_names.contains(p.name.as_str()))
            .cloned()
            .collect();
        diff.untracked.sort_by(|a, b| a.name.cmp(&b.name));

        result.managers.push(diff);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::inspect;
    use crate::registry::AdapterRegistry;
    use pkgmanager_adapters::MockAdapter;

    fn want(manager: ManagerType, name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_owned(),
            manager,
            section: "general".to_owned(),
            declared: manager,
        }
    }

    fn snapshot_of(adapters: Vec<MockAdapter>, desired: &[ResolvedPackage]) -> Snapshot {
        let mut registry = AdapterRegistry::new();
        for adapter in adapters {
            registry.insert(adapter);
        }
        inspect(&registry, &registry.availability(), &ManagerType::ALL, desired)
    }

    #[test]
    fn ripgrep_installed_tmux_missing() {
        let desired = vec![want(ManagerType::Brew, "ripgrep"), want(ManagerType::Brew, "tmux")];
        let snapshot = snapshot_of(
            vec![MockAdapter::new(ManagerType::Brew).with_installed("ripgrep", "14.1.0")],
            &desired,
        );
        let diff = compute_diff(&desired, &snapshot, None, &[]);
        let brew = diff.get(ManagerType::Brew).unwrap();
        assert_eq!(brew.missing, vec!["tmux"]);
        assert!(brew.untracked.is_empty());
        assert!(brew.mismatched.is_empty());
    }

    #[test]
    fn missing_and_untracked_are_set_differences() {
        let desired = vec![want(ManagerType::Rust, "bat"), want(ManagerType::Rust, "fd-find")];
        let snapshot = snapshot_of(
            vec![MockAdapter::new(ManagerType::Rust)
                .with_installed("fd-find", "9.0.0")
                .with_installed("zoxide", "0.9.4")
                .with_installed("eza", "0.18.0")],
            &desired,
        );
        let diff = compute_diff(&desired, &snapshot, None, &[]);
        let rust = diff.get(ManagerType::Rust).unwrap();
        assert_eq!(rust.missing, vec!["bat"]);
        let untracked: Vec<_> = rust.untracked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(untracked, vec!["eza", "zoxide"]);
        for name in &rust.missing {
            assert!(!untracked.contains(&name.as_str()));
        }
    }

    #[test]
    fn same_name_under_other_manager_is_not_a_match() {
        let desired = vec![want(ManagerType::Conda, "jq")];
        let snapshot = snapshot_of(
            vec![
                MockAdapter::new(ManagerType::Conda),
                MockAdapter::new(ManagerType::Brew).with_installed("jq", "1.7.1"),
            ],
            &desired,
        );
        let diff = compute_diff(&desired, &snapshot, None, &[]);
        assert_eq!(diff.get(ManagerType::Conda).unwrap().missing, vec!["jq"]);
        assert_eq!(diff.get(ManagerType::Brew).unwrap().untracked.len(), 1);
    }

    #[test]
    fn names_compare_case_sensitively() {
        let desired = vec![want(ManagerType::Python, "Ruff")];
        let snapshot = snapshot_of(
            vec![MockAdapter::new(ManagerType::Python).with_installed("ruff", "0.4.0")],
            &desired,
        );
        let diff = compute_diff(&desired, &snapshot, None, &[]);
        let python = diff.get(ManagerType::Python).unwrap();
        assert_eq!(python.missing, vec!["Ruff"]);
        assert_eq!(python.untracked.len(), 1);
    }

    #[test]
    fn mismatches_only_with_a_lock() {
        let desired = vec![want(ManagerType::Bun, "typescript")];
        let snapshot = snapshot_of(
            vec![MockAdapter::new(ManagerType::Bun)
                .with_installed("typescript", "5.4.5")
                .with_installed("prettier", "3.2.0")],
            &desired,
        );
        let mut lock = LockDocument::new();
        lock.insert(ManagerType::Bun, "typescript", "5.3.0");
        lock.insert(ManagerType::Bun, "prettier", "3.0.0");

        assert!(compute_diff(&desired, &snapshot, None, &[]).get(ManagerType::Bun).unwrap().mismatched.is_empty());

        let diff = compute_diff(&desired, &snapshot, Some(&lock), &[]);
        let bun = diff.get(ManagerType::Bun).unwrap();
        assert_eq!(
            bun.mismatched,
            vec![Mismatch {
                name: "typescript".to_owned(),
                installed: "5.4.5".to_owned(),
                pinned: "5.3.0".to_owned(),
            }]
        );
        // prettier is untracked; it is not also reported as mismatched.
        assert_eq!(bun.untracked[0].name, "prettier");
        assert_eq!(diff.mismatched_count(), 1);
    }

    #[test]
    fn order_follows_manifest_with_custom_last() {
        let desired = vec![
            want(ManagerType::Custom, "fisher"),
            want(ManagerType::Rust, "bat"),
            want(ManagerType::Conda, "jq"),
        ];
        let snapshot = snapshot_of(
            vec![
                MockAdapter::new(ManagerType::Rust),
                MockAdapter::new(ManagerType::Conda),
                MockAdapter::new(ManagerType::Brew).with_installed("wget", "1.24"),
            ],
            &desired,
        );
        assert_eq!(
            manager_order(&desired, &snapshot),
            vec![ManagerType::Rust, ManagerType::Conda, ManagerType::Brew, ManagerType::Custom]
        );
    }

    #[test]
    fn filter_and_unreadable_managers() {
        let desired = vec![want(ManagerType::Rust, "bat"), want(ManagerType::Conda, "jq")];
        let snapshot = snapshot_of(
            vec![
                MockAdapter::new(ManagerType::Rust),
                MockAdapter::new(ManagerType::Conda).failing_listing(),
            ],
            &desired,
        );
        let diff = compute_diff(&desired, &snapshot, None, &[]);
        assert!(diff.get(ManagerType::Conda).is_none());
        assert_eq!(diff.unreadable[0].manager, ManagerType::Conda);

        let only_conda = compute_diff(&desired, &snapshot, None, &[ManagerType::Conda]);
        assert!(only_conda.managers.is_empty());
        assert_eq!(only_conda.unreadable.len(), 1);
    }

    #[test]
    fn unavailable_manager_counts_as_missing() {
        let desired = vec![want(ManagerType::Go, "golang.org/x/tools/gopls")];
        let snapshot = snapshot_of(vec![MockAdapter::new(ManagerType::Go).unavailable()], &desired);
        let diff = compute_diff(&desired, &snapshot, None, &[]);
        assert_eq!(diff.missing_count(), 1);
    }
}

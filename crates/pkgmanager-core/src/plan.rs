//! Turning a diff into an ordered action list.

use crate::diff::DiffResult;
use crate::resolver::ResolvedPackage;
use pkgmanager_schema::{LockDocument, ManagerType};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Install,
    Remove,
    Update,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Install => "install",
            ActionKind::Remove => "remove",
            ActionKind::Update => "update",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionReason {
    Missing,
    Mismatched,
    Forced,
    Untracked,
}

/// Which version an install should land on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "target", content = "version")]
pub enum VersionTarget {
    /// Whatever the manager installs by default.
    Latest,
    Exact(String),
    /// Locked mode with no pin for this package; fails without touching the adapter.
    LockEntryMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub manager: ManagerType,
    pub name: String,
    pub kind: ActionKind,
    pub reason: ActionReason,
    pub version: VersionTarget,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.manager, self.kind, self.name)?;
        if let VersionTarget::Exact(v) = &self.version {
            write!(f, "@{v}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Reinstall every desired package, present or not.
    pub force: bool,
    pub continue_on_error: bool,
    /// Install the lock file's exact versions.
    pub locked: bool,
    /// Only touch these manager types; empty means all.
    pub types: Vec<ManagerType>,
    /// Manager types executed concurrently; 0 and 1 both mean sequential.
    pub jobs: usize,
}

/// Install actions that bring `diff` to a clean state.
///
/// Managers are visited in diff order and packages in desired-set order, so
/// the same manifest, lock, and system state always give the same plan.
pub fn plan_sync(
    diff: &DiffResult,
    desired: &[ResolvedPackage],
    lock: Option<&LockDocument>,
    options: &SyncOptions,
) -> Vec<Action> {
    let selected = |m: ManagerType| options.types.is_empty() || options.types.contains(&m);
    let pinned = |manager: ManagerType, name: &str| match (options.locked, lock) {
        (false, _) => VersionTarget::Latest,
        (true, Some(lock)) => lock
            .pinned(manager, name)
            .map_or(VersionTarget::LockEntryMissing, |v| VersionTarget::Exact(v.to_owned())),
        (true, None) => VersionTarget::LockEntryMissing,
    };

    let mut actions = Vec::new();
    for manager_diff in diff.managers.iter().filter(|d| selected(d.manager)) {
        let manager = manager_diff.manager;
        let missing: HashSet<&str> = manager_diff.missing.iter().map(String::as_str).collect();
        let mismatched: HashSet<&str> = if options.locked {
            manager_diff.mismatched.iter().map(|m| m.name.as_str()).collect()
        } else {
            HashSet::new()
        };

        for pkg in desired.iter().filter(|p| p.manager == manager) {
            let reason = if missing.contains(pkg.name.as_str()) {
                ActionReason::Missing
            } else if mismatched.contains(pkg.name.as_str()) {
                ActionReason::Mismatched
            } else if options.force {
                ActionReason::Forced
            } else {
                continue;
            };
            actions.push(Action {
                manager,
                name: pkg.name.clone(),
                kind: ActionKind::Install,
                reason,
                version: pinned(manager, &pkg.name),
            });
        }
    }
    actions
}

/// Removals for every untracked package of the selected managers.
pub fn plan_clean(diff: &DiffResult, types: &[ManagerType]) -> Vec<Action> {
    diff.managers
        .iter()
        .filter(|d| types.is_empty() || types.contains(&d.manager))
        .flat_map(|d| {
            d.untracked.iter().map(|pkg| Action {
                manager: d.manager,
                name: pkg.name.clone(),
                kind: ActionKind::Remove,
                reason: ActionReason::Untracked,
                version: VersionTarget::Latest,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ManagerDiff, Mismatch};
    use pkgmanager_adapters::InstalledPackage;

    fn want(manager: ManagerType, name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_owned(),
            manager,
            section: "general".to_owned(),
            declared: manager,
        }
    }

    fn diff() -> (DiffResult, Vec<ResolvedPackage>) {
        let desired = vec![
            want(ManagerType::Conda, "jq"),
            want(ManagerType::Conda, "python"),
            want(ManagerType::Conda, "nodejs"),
            want(ManagerType::Rust, "bat"),
        ];
        let diff = DiffResult {
            managers: vec![
                ManagerDiff {
                    manager: ManagerType::Conda,
                    missing: vec!["jq".to_owned(), "nodejs".to_owned()],
                    untracked: vec![InstalledPackage::new(ManagerType::Conda, "zlib", "1.3")],
                    mismatched: vec![Mismatch {
                        name: "python".to_owned(),
                        installed: "3.12.2".to_owned(),
                        pinned: "3.11.9".to_owned(),
                    }],
                },
                ManagerDiff {
                    manager: ManagerType::Rust,
                    missing: vec![],
                    untracked: vec![],
                    mismatched: vec![],
                },
            ],
            unreadable: vec![],
        };
        (diff, desired)
    }

    fn names(actions: &[Action]) -> Vec<String> {
        actions.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn plain_sync_installs_missing_in_order() {
        let (diff, desired) = diff();
        let actions = plan_sync(&diff, &desired, None, &SyncOptions::default());
        assert_eq!(names(&actions), vec!["conda install jq", "conda install nodejs"]);
        assert!(actions.iter().all(|a| a.version == VersionTarget::Latest));
    }

    #[test]
    fn force_reinstalls_everything_selected() {
        let (diff, desired) = diff();
        let options = SyncOptions {
            force: true,
            types: vec![ManagerType::Rust],
            ..SyncOptions::default()
        };
        let actions = plan_sync(&diff, &desired, None, &options);
        assert_eq!(names(&actions), vec!["rust install bat"]);
        assert_eq!(actions[0].reason, ActionReason::Forced);
    }

    #[test]
    fn locked_sync_pins_and_flags_missing_entries() {
        let (diff, desired) = diff();
        let mut lock = LockDocument::new();
        lock.insert(ManagerType::Conda, "jq", "1.7.1");
        lock.insert(ManagerType::Conda, "python", "3.11.9");
        let options = SyncOptions {
            locked: true,
            ..SyncOptions::default()
        };
        let actions = plan_sync(&diff, &desired, Some(&lock), &options);
        assert_eq!(
            names(&actions),
            vec!["conda install jq@1.7.1", "conda install python@3.11.9", "conda install nodejs"]
        );
        assert_eq!(actions[1].reason, ActionReason::Mismatched);
        assert_eq!(actions[2].version, VersionTarget::LockEntryMissing);
    }

    #[test]
    fn clean_removes_untracked_only() {
        let (diff, _) = diff();
        assert_eq!(names(&plan_clean(&diff, &[])), vec!["conda remove zlib"]);
        assert!(plan_clean(&diff, &[ManagerType::Rust]).is_empty());
    }
}

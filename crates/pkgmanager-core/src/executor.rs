//! Running a plan against the adapters.
//!
//! Actions for one backing tool always run one after another on the same
//! worker, so `brew` and `cask` actions share a queue. With `jobs > 1`,
//! different tools run on scoped threads.
//! Nothing is rolled back: a cancelled or aborted run leaves completed
//! actions in place.

use crate::plan::{Action, ActionKind, VersionTarget};
use crate::registry::AdapterRegistry;
use crate::CoreError;
use pkgmanager_adapters::{AdapterError, CommandOutcome, PackageManagerAdapter};
use pkgmanager_schema::ManagerType;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ActionStatus {
    /// Dry run: the action would have been executed.
    Planned,
    Succeeded { message: String },
    Failed { error: String },
    /// Not attempted because an earlier action failed.
    Skipped,
    /// Not attempted because an interrupt was received.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    #[serde(flatten)]
    pub action: Action,
    #[serde(flatten)]
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    /// One entry per planned action, in plan order.
    pub results: Vec<ActionResult>,
    /// Managers whose installed set could not be read, with the reason.
    pub unreadable: Vec<(ManagerType, String)>,
}

impl SyncReport {
    fn count(&self, pred: impl Fn(&ActionStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Succeeded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Skipped))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Cancelled))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, ActionStatus::Failed { .. }))
    }

    /// Nothing failed, was skipped or cancelled, and every manager was readable.
    pub fn is_success(&self) -> bool {
        self.unreadable.is_empty()
            && self.results.iter().all(|r| {
                matches!(r.status, ActionStatus::Planned | ActionStatus::Succeeded { .. })
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    pub dry_run: bool,
    pub continue_on_error: bool,
    pub jobs: usize,
    /// Polled before each action; `true` stops new actions from starting.
    pub cancelled: fn() -> bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            continue_on_error: false,
            jobs: 1,
            cancelled: crate::concurrency::shutdown_requested,
        }
    }
}

/// Execute `actions` in order and report one result per action.
pub fn execute<A: PackageManagerAdapter>(
    registry: &AdapterRegistry<A>,
    actions: Vec<Action>,
    options: &ExecOptions,
) -> SyncReport {
    if options.dry_run {
        return SyncReport {
            dry_run: true,
            results: actions
                .into_iter()
                .map(|action| ActionResult {
                    action,
                    status: ActionStatus::Planned,
                    raw_output: String::new(),
                })
                .collect(),
            unreadable: Vec::new(),
        };
    }

    let groups = group_by_tool(actions);
    let abort = AtomicBool::new(false);
    let mut indexed: Vec<(usize, ActionResult)> = if options.jobs <= 1 || groups.len() <= 1 {
        groups
            .into_iter()
            .flat_map(|group| run_group(registry, group, options, &abort))
            .collect()
    } else {
        run_parallel(registry, groups, options, &abort)
    };
    indexed.sort_by_key(|(index, _)| *index);

    SyncReport {
        dry_run: false,
        results: indexed.into_iter().map(|(_, r)| r).collect(),
        unreadable: Vec::new(),
    }
}

type Group = Vec<(usize, Action)>;

/// Split into one group per backing tool, keeping first-appearance order.
fn group_by_tool(actions: Vec<Action>) -> Vec<Group> {
    let mut groups: Vec<(&'static str, Group)> = Vec::new();
    for (index, action) in actions.into_iter().enumerate() {
        let tool = action.manager.tool();
        match groups.iter_mut().find(|(t, _)| *t == tool) {
            Some((_, group)) => group.push((index, action)),
            None => groups.push((tool, vec![(index, action)])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

fn run_parallel<A: PackageManagerAdapter>(
    registry: &AdapterRegistry<A>,
    groups: Vec<Group>,
    options: &ExecOptions,
    abort: &AtomicBool,
) -> Vec<(usize, ActionResult)> {
    let workers = options.jobs.min(groups.len());
    let queue = Mutex::new(groups.into_iter());
    let results = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                let Some(group) = next else {
                    break;
                };
                let done = run_group(registry, group, options, abort);
                results
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(done);
            });
        }
    });

    results.into_inner().unwrap_or_else(PoisonError::into_inner)
}

fn run_group<A: PackageManagerAdapter>(
    registry: &AdapterRegistry<A>,
    group: Group,
    options: &ExecOptions,
    abort: &AtomicBool,
) -> Vec<(usize, ActionResult)> {
    group
        .into_iter()
        .map(|(index, action)| {
            let status_only = |status| ActionResult {
                action: action.clone(),
                status,
                raw_output: String::new(),
            };
            let result = if (options.cancelled)() {
                status_only(ActionStatus::Cancelled)
            } else if abort.load(Ordering::SeqCst) {
                status_only(ActionStatus::Skipped)
            } else {
                let result = run_one(registry, action.clone());
                if matches!(result.status, ActionStatus::Failed { .. }) && !options.continue_on_error {
                    abort.store(true, Ordering::SeqCst);
                }
                result
            };
            (index, result)
        })
        .collect()
}

fn run_one<A: PackageManagerAdapter>(registry: &AdapterRegistry<A>, action: Action) -> ActionResult {
    info!("{action}");
    let outcome = match &action.version {
        VersionTarget::LockEntryMissing => Err(CoreError::LockEntryMissing {
            manager: action.manager,
            name: action.name.clone(),
        }),
        version => dispatch(registry, &action, version).map_err(CoreError::from),
    };
    match outcome {
        Ok(outcome) if outcome.success => ActionResult {
            action,
            status: ActionStatus::Succeeded {
                message: outcome.message,
            },
            raw_output: outcome.raw_output,
        },
        Ok(outcome) => {
            warn!("{action} failed: {}", outcome.message);
            ActionResult {
                action,
                status: ActionStatus::Failed {
                    error: outcome.message,
                },
                raw_output: outcome.raw_output,
            }
        }
        Err(e) => {
            warn!("{action} failed: {e}");
            let raw_output = match &e {
                CoreError::Adapter(AdapterError::ExternalCommandFailed { stderr, .. }) => stderr.clone(),
                CoreError::Adapter(AdapterError::VersionUnavailable { detail, .. }) => detail.clone(),
                _ => String::new(),
            };
            ActionResult {
                action,
                status: ActionStatus::Failed { error: e.to_string() },
                raw_output,
            }
        }
    }
}

fn dispatch<A: PackageManagerAdapter>(
    registry: &AdapterRegistry<A>,
    action: &Action,
    version: &VersionTarget,
) -> Result<CommandOutcome, AdapterError> {
    let adapter = registry
        .get(action.manager)
        .filter(|a| a.is_available())
        .ok_or(AdapterError::ManagerUnavailable(action.manager))?;
    let exact = match version {
        VersionTarget::Exact(v) => Some(v.as_str()),
        _ => None,
    };
    match action.kind {
        ActionKind::Install => adapter.install(&action.name, exact),
        ActionKind::Remove => adapter.remove(&action.name),
        ActionKind::Update => adapter.update(Some(&action.name)),
    }
}

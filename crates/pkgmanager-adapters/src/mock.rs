use crate::backend::PackageManagerAdapter;
use crate::{
    AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails, SearchHit,
};
use pkgmanager_schema::ManagerType;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// One call the mock received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Install {
        name: String,
        version: Option<String>,
    },
    Remove(String),
    Update(Option<String>),
}

#[derive(Debug, Default)]
struct MockState {
    installed: BTreeMap<String, String>,
    calls: Vec<MockCall>,
    list_calls: usize,
}

/// An in-memory backend with scripted availability, contents and failures.
#[derive(Debug)]
pub struct MockAdapter {
    manager: ManagerType,
    available: bool,
    fail_on: BTreeSet<String>,
    fail_listing: bool,
    /// Version an unpinned install lands at, per package; `1.0.0` otherwise.
    latest: BTreeMap<String, String>,
    /// Versions a pinned install can reach; empty means any.
    offered: BTreeMap<String, BTreeSet<String>>,
    state: Mutex<MockState>,
}

impl MockAdapter {
    pub fn new(manager: ManagerType) -> Self {
        Self {
            manager,
            available: true,
            fail_on: BTreeSet::new(),
            fail_listing: false,
            latest: BTreeMap::new(),
            offered: BTreeMap::new(),
            state: Mutex::new(MockState::default()),
        }
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    #[must_use]
    pub fn with_installed(self, name: &str, version: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.installed.insert(name.to_owned(), version.to_owned());
        }
        self
    }

    /// Make every mutating call for `name` fail.
    #[must_use]
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.insert(name.to_owned());
        self
    }

    #[must_use]
    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    #[must_use]
    pub fn with_latest(mut self, name: &str, version: &str) -> Self {
        self.latest.insert(name.to_owned(), version.to_owned());
        self
    }

    #[must_use]
    pub fn offering(mut self, name: &str, versions: &[&str]) -> Self {
        self.offered.insert(
            name.to_owned(),
            versions.iter().map(|v| (*v).to_owned()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().map(|s| s.list_calls).unwrap_or_default()
    }

    pub fn installed_version(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.installed.get(name).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>, AdapterError> {
        self.state
            .lock()
            .map_err(|e| AdapterError::Io(std::io::Error::other(format!("mutex poisoned: {e}"))))
    }

    fn guard(&self, operation: &str, name: &str) -> Result<(), AdapterError> {
        if !self.available {
            return Err(AdapterError::ManagerUnavailable(self.manager));
        }
        if self.fail_on.contains(name) {
            return Err(AdapterError::ExternalCommandFailed {
                command: format!("mock {operation} {name}"),
                code: 1,
                stderr: format!("{name}: scripted failure"),
            });
        }
        Ok(())
    }

    fn latest_of(&self, name: &str) -> String {
        self.latest
            .get(name)
            .cloned()
            .unwrap_or_else(|| "1.0.0".to_owned())
    }
}

impl PackageManagerAdapter for MockAdapter {
    fn manager_type(&self) -> ManagerType {
        self.manager
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        if !self.available {
            return Err(AdapterError::ManagerUnavailable(self.manager));
        }
        let mut state = self.lock()?;
        state.list_calls += 1;
        if self.fail_listing {
            return Err(AdapterError::ExternalCommandFailed {
                command: "mock list".to_owned(),
                code: 1,
                stderr: "listing failed".to_owned(),
            });
        }
        Ok(state
            .installed
            .iter()
            .map(|(name, version)| InstalledPackage::new(self.manager, name, version))
            .collect())
    }

    fn check(&self, name: &str) -> bool {
        self.installed_version(name).is_some()
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        self.lock()?.calls.push(MockCall::Install {
            name: name.to_owned(),
            version: exact_version.map(str::to_owned),
        });
        self.guard("install", name)?;
        let version = match exact_version {
            Some(v) => {
                let reachable = self.offered.get(name).map_or(true, |set| set.contains(v));
                if !reachable {
                    return Err(AdapterError::version_unavailable(
                        self.manager,
                        name,
                        v,
                        "not offered",
                    ));
                }
                v.to_owned()
            }
            None => self.latest_of(name),
        };
        self.lock()?.installed.insert(name.to_owned(), version.clone());
        Ok(CommandOutcome::ok(format!("installed {name} {version}")))
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.lock()?.calls.push(MockCall::Remove(name.to_owned()));
        self.guard("remove", name)?;
        match self.lock()?.installed.remove(name) {
            Some(_) => Ok(CommandOutcome::ok(format!("removed {name}"))),
            None => Err(AdapterError::ExternalCommandFailed {
                command: format!("mock remove {name}"),
                code: 1,
                stderr: format!("{name} is not installed"),
            }),
        }
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        self.lock()?.calls.push(MockCall::Update(name.map(str::to_owned)));
        self.guard("update", name.unwrap_or_default())?;
        let mut state = self.lock()?;
        let targets: Vec<String> = match name {
            Some(n) => vec![n.to_owned()],
            None => state.installed.keys().cloned().collect(),
        };
        for target in targets {
            if let Some(version) = state.installed.get_mut(&target) {
                *version = self.latest_of(&target);
            }
        }
        Ok(CommandOutcome::ok("updated"))
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        if !self.available {
            return Err(AdapterError::ManagerUnavailable(self.manager));
        }
        Ok(self
            .latest
            .keys()
            .filter(|name| name.contains(query))
            .map(|name| SearchHit {
                name: name.clone(),
                description: format!("mock {}", self.manager),
            })
            .collect())
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        let state = self.lock()?;
        Ok(state
            .installed
            .iter()
            .filter_map(|(name, current)| {
                let latest = self.latest.get(name)?;
                (latest != current).then(|| OutdatedPackage {
                    name: name.clone(),
                    current_version: current.clone(),
                    latest_version: latest.clone(),
                })
            })
            .collect())
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        Ok(self.installed_version(name).map(|version| {
            let mut details = PackageDetails::new(name, version);
            details.summary = format!("mock {} package", self.manager);
            details
        }))
    }
}

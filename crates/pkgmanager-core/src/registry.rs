use pkgmanager_adapters::{AdapterConfig, Backend, PackageManagerAdapter};
use pkgmanager_schema::ManagerType;
use std::collections::BTreeMap;
use tracing::debug;

/// Which manager types were usable when the snapshot was taken.
///
/// Taken once per command so every resolution in that command sees the same
/// answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    available: BTreeMap<ManagerType, bool>,
}

impl Availability {
    pub fn is_available(&self, manager: ManagerType) -> bool {
        self.available.get(&manager).copied().unwrap_or(false)
    }

    pub fn set(&mut self, manager: ManagerType, available: bool) {
        self.available.insert(manager, available);
    }

    pub fn available(&self) -> impl Iterator<Item = ManagerType> + '_ {
        self.available
            .iter()
            .filter(|(_, up)| **up)
            .map(|(manager, _)| *manager)
    }
}

impl FromIterator<(ManagerType, bool)> for Availability {
    fn from_iter<I: IntoIterator<Item = (ManagerType, bool)>>(iter: I) -> Self {
        Self {
            available: iter.into_iter().collect(),
        }
    }
}

/// One adapter per manager type.
///
/// Generic so the engine can run against [`pkgmanager_adapters::MockAdapter`]
/// in tests and against [`Backend`] everywhere else.
#[derive(Debug)]
pub struct AdapterRegistry<A> {
    adapters: BTreeMap<ManagerType, A>,
}

impl<A> Default for AdapterRegistry<A> {
    fn default() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }
}

impl<A: PackageManagerAdapter> AdapterRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under its own manager type, replacing any previous one.
    pub fn insert(&mut self, adapter: A) {
        self.adapters.insert(adapter.manager_type(), adapter);
    }

    #[must_use]
    pub fn with(mut self, adapter: A) -> Self {
        self.insert(adapter);
        self
    }

    pub fn get(&self, manager: ManagerType) -> Option<&A> {
        self.adapters.get(&manager)
    }

    pub fn types(&self) -> impl Iterator<Item = ManagerType> + '_ {
        self.adapters.keys().copied()
    }

    /// Probe every registered adapter once. Unregistered types are unavailable.
    pub fn availability(&self) -> Availability {
        ManagerType::ALL
            .iter()
            .map(|manager| {
                let up = self.adapters.get(manager).is_some_and(|a| a.is_available());
                debug!("{manager}: available={up}");
                (*manager, up)
            })
            .collect()
    }
}

impl AdapterRegistry<Backend> {
    /// The real backends for all ten manager types.
    pub fn system(config: &AdapterConfig) -> Self {
        let mut registry = Self::new();
        for manager in ManagerType::ALL {
            registry.insert(Backend::for_type(manager, config));
        }
        registry
    }
}

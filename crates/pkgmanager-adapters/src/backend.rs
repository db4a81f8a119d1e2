use crate::bun::BunAdapter;
use crate::conda::CondaAdapter;
use crate::custom::CustomAdapter;
use crate::exec::detect_shell;
use crate::go::GoAdapter;
use crate::homebrew::HomebrewAdapter;
use crate::mas::MasAdapter;
use crate::python::PythonAdapter;
use crate::rust::RustAdapter;
use crate::winget::WingetAdapter;
use crate::{
    AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails, SearchHit,
};
use pkgmanager_schema::{CustomSpecs, ManagerType};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Settings shared by every adapter, fixed at construction.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Upper bound on any single external command.
    pub timeout: Duration,
    /// micromamba environment the conda adapter operates on.
    pub conda_env: String,
    pub specs: Arc<CustomSpecs>,
    /// Shell for custom scripts whose spec names none.
    pub default_shell: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            conda_env: "base".to_owned(),
            specs: Arc::new(CustomSpecs::default()),
            default_shell: detect_shell(),
        }
    }
}

/// The capability contract every backend satisfies.
///
/// Failures of the external tool come back as `AdapterError` values; nothing
/// here panics on a tool's behavior.
pub trait PackageManagerAdapter: Send + Sync {
    fn manager_type(&self) -> ManagerType;

    /// Whether the backing tool is on `PATH`.
    fn is_available(&self) -> bool;

    /// Everything the backend has installed. Zero packages is `Ok(vec![])`.
    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError>;

    fn check(&self, name: &str) -> bool {
        match self.list_installed() {
            Ok(installed) => installed.iter().any(|p| p.name == name),
            Err(e) => {
                tracing::debug!("{}: check {name} failed: {e}", self.manager_type());
                false
            }
        }
    }

    /// Install `name`, at exactly `exact_version` when given.
    fn install(&self, name: &str, exact_version: Option<&str>)
        -> Result<CommandOutcome, AdapterError>;

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError>;

    /// Update one package, or everything the backend manages.
    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError>;

    fn search(&self, _query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        Err(AdapterError::unsupported(self.manager_type(), "search"))
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        Err(AdapterError::unsupported(self.manager_type(), "outdated"))
    }

    /// Details for an installed package, `None` when not installed.
    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        Ok(self
            .list_installed()?
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| PackageDetails::new(p.name, p.version)))
    }
}

/// Fail with `VersionUnavailable` unless `name` is now installed at `version`.
///
/// Used after installs on backends whose CLI cannot be asked for a specific
/// version, and as a post-condition on those that can.
pub(crate) fn verify_version<A: PackageManagerAdapter + ?Sized>(
    adapter: &A,
    name: &str,
    version: &str,
) -> Result<(), AdapterError> {
    let installed = adapter.list_installed()?;
    let actual = installed.iter().find(|p| p.name == name).map(|p| p.version.as_str());
    if actual == Some(version) {
        Ok(())
    } else {
        tracing::warn!(
            "{}: wanted {name} {version}, found {}",
            adapter.manager_type(),
            actual.unwrap_or("nothing")
        );
        Err(AdapterError::version_unavailable(
            adapter.manager_type(),
            name,
            version,
            format!("found {}", actual.unwrap_or("nothing")),
        ))
    }
}

/// Refuse a pin before installing when the backend offers another version.
///
/// `offered` is `None` when the backend reported no installable version.
pub(crate) fn require_offered(
    manager: ManagerType,
    name: &str,
    version: &str,
    offered: Option<&str>,
) -> Result<(), AdapterError> {
    match offered {
        Some(offered) if offered == version => Ok(()),
        Some(offered) => Err(AdapterError::version_unavailable(
            manager,
            name,
            version,
            format!("only {offered} is offered"),
        )),
        None => Err(AdapterError::version_unavailable(
            manager,
            name,
            version,
            "no installable version reported",
        )),
    }
}

/// Report a failed pinned install as `VersionUnavailable`, keeping the
/// tool's stderr. Unpinned installs, timeouts and missing tools pass through.
pub(crate) fn pinned_failure<'a>(
    manager: ManagerType,
    name: &'a str,
    exact_version: Option<&'a str>,
) -> impl FnOnce(AdapterError) -> AdapterError + 'a {
    move |err| match (err, exact_version) {
        (AdapterError::ExternalCommandFailed { stderr, .. }, Some(version)) => {
            AdapterError::version_unavailable(manager, name, version, stderr.trim())
        }
        (other, _) => other,
    }
}

/// The closed set of backends.
#[derive(Debug, Clone)]
pub enum Backend {
    Brew(HomebrewAdapter),
    Cask(HomebrewAdapter),
    Mas(MasAdapter),
    Winget(WingetAdapter),
    Conda(CondaAdapter),
    Python(PythonAdapter),
    Rust(RustAdapter),
    Go(GoAdapter),
    Bun(BunAdapter),
    Custom(CustomAdapter),
}

impl Backend {
    pub fn for_type(manager: ManagerType, config: &AdapterConfig) -> Self {
        match manager {
            ManagerType::Brew => Backend::Brew(HomebrewAdapter::formulae(config)),
            ManagerType::Cask => Backend::Cask(HomebrewAdapter::casks(config)),
            ManagerType::Mas => Backend::Mas(MasAdapter::new(config)),
            ManagerType::Winget => Backend::Winget(WingetAdapter::new(config)),
            ManagerType::Conda => Backend::Conda(CondaAdapter::new(config)),
            ManagerType::Python => Backend::Python(PythonAdapter::new(config)),
            ManagerType::Rust => Backend::Rust(RustAdapter::new(config)),
            ManagerType::Go => Backend::Go(GoAdapter::new(config)),
            ManagerType::Bun => Backend::Bun(BunAdapter::new(config)),
            ManagerType::Custom => Backend::Custom(CustomAdapter::new(config)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $a:ident => $call:expr) => {
        match $self {
            Backend::Brew($a) | Backend::Cask($a) => $call,
            Backend::Mas($a) => $call,
            Backend::Winget($a) => $call,
            Backend::Conda($a) => $call,
            Backend::Python($a) => $call,
            Backend::Rust($a) => $call,
            Backend::Go($a) => $call,
            Backend::Bun($a) => $call,
            Backend::Custom($a) => $call,
        }
    };
}

impl PackageManagerAdapter for Backend {
    fn manager_type(&self) -> ManagerType {
        dispatch!(self, a => a.manager_type())
    }

    fn is_available(&self) -> bool {
        dispatch!(self, a => a.is_available())
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        dispatch!(self, a => a.list_installed())
    }

    fn check(&self, name: &str) -> bool {
        dispatch!(self, a => a.check(name))
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        dispatch!(self, a => a.install(name, exact_version))
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        dispatch!(self, a => a.remove(name))
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        dispatch!(self, a => a.update(name))
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        dispatch!(self, a => a.search(query))
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        dispatch!(self, a => a.outdated())
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        dispatch!(self, a => a.show(name))
    }
}

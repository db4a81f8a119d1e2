//! Packages defined by shell snippets in the custom specification document.
//!
//! Scripts run as `<shell> -l -c <script>`; a `check` script exiting 0 means
//! installed. There are no versions, every installed package reports
//! [`CUSTOM_VERSION`].

use crate::backend::{AdapterConfig, PackageManagerAdapter};
use crate::exec::{CommandOutput, Runner};
use crate::{AdapterError, CommandOutcome, InstalledPackage, PackageDetails, SearchHit};
use pkgmanager_schema::{CustomPackageSpec, CustomSpecs, ManagerType};
use std::sync::Arc;
use tracing::{info, warn};

pub const CUSTOM_VERSION: &str = "custom";

#[derive(Debug, Clone)]
pub struct CustomAdapter {
    runner: Runner,
    specs: Arc<CustomSpecs>,
    default_shell: String,
}

impl CustomAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Custom, config.timeout),
            specs: Arc::clone(&config.specs),
            default_shell: config.default_shell.clone(),
        }
    }

    pub fn specs(&self) -> &CustomSpecs {
        &self.specs
    }

    fn spec(&self, name: &str) -> Result<&CustomPackageSpec, AdapterError> {
        self.specs.get(name).ok_or_else(|| AdapterError::UnknownPackage {
            manager: ManagerType::Custom,
            name: name.to_owned(),
        })
    }

    fn shell_for<'a>(&'a self, spec: &'a CustomPackageSpec) -> &'a str {
        spec.shell.as_deref().unwrap_or(&self.default_shell)
    }

    fn run_script(&self, spec: &CustomPackageSpec, script: &str) -> Result<CommandOutput, AdapterError> {
        let shell = self.shell_for(spec);
        self.runner.output(shell, &["-l", "-c", script])
    }

    fn is_installed(&self, spec: &CustomPackageSpec) -> bool {
        let Some(check) = spec.check.as_deref() else {
            return false;
        };
        self.run_script(spec, check).is_ok_and(|out| out.success())
    }

    fn run_install(&self, spec: &CustomPackageSpec) -> Result<CommandOutcome, AdapterError> {
        info!("custom: installing {} with {}", spec.name, self.shell_for(spec));
        let out = self.run_script(spec, &spec.install)?.check()?;
        Ok(out.into_outcome(format!("installed {}", spec.name)))
    }
}

impl PackageManagerAdapter for CustomAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Custom
    }

    fn is_available(&self) -> bool {
        true
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        Ok(self
            .specs
            .iter()
            .filter(|spec| self.is_installed(spec))
            .map(|spec| InstalledPackage::new(ManagerType::Custom, &spec.name, CUSTOM_VERSION))
            .collect())
    }

    fn check(&self, name: &str) -> bool {
        self.specs.get(name).is_some_and(|spec| self.is_installed(spec))
    }

    /// Install missing dependencies first, then the package itself.
    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        if let Some(version) = exact_version.filter(|v| *v != CUSTOM_VERSION) {
            return Err(AdapterError::version_unavailable(
                ManagerType::Custom,
                name,
                version,
                format!("custom packages are always at {CUSTOM_VERSION}"),
            ));
        }
        let spec = self.spec(name)?;

        let deps = self.specs.dependency_order(name);
        for unknown in &deps.unknown {
            warn!("custom: {name} depends on unknown package {unknown}");
        }
        let mut outcome = CommandOutcome::ok(String::new());
        for dep in deps.order {
            if self.is_installed(dep) {
                continue;
            }
            outcome = outcome.then(self.run_install(dep)?);
        }
        Ok(outcome.then(self.run_install(spec)?))
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        let spec = self.spec(name)?;
        let Some(script) = spec.remove.as_deref() else {
            return Err(AdapterError::unsupported(ManagerType::Custom, "remove without a remove script"));
        };
        let out = self.run_script(spec, script)?.check()?;
        Ok(out.into_outcome(format!("removed {name}")))
    }

    /// Re-runs the install script; there is no notion of "all" custom updates.
    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        let Some(name) = name else {
            return Err(AdapterError::unsupported(ManagerType::Custom, "update of all packages"));
        };
        self.run_install(self.spec(name)?)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        let query = query.to_lowercase();
        Ok(self
            .specs
            .iter()
            .filter(|spec| {
                spec.name.to_lowercase().contains(&query)
                    || spec
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query))
            })
            .map(|spec| SearchHit {
                name: spec.name.clone(),
                description: spec.description.clone().unwrap_or_default(),
            })
            .collect())
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        let spec = self.spec(name)?;
        if !self.is_installed(spec) {
            return Ok(None);
        }
        let mut details = PackageDetails::new(name, CUSTOM_VERSION);
        details.summary = spec
            .description
            .clone()
            .unwrap_or_else(|| format!("Custom package ({})", self.shell_for(spec)));
        details.requires.clone_from(&spec.depends);
        Ok(Some(details))
    }
}

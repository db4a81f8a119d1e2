//! Homebrew formulae (`brew`) and casks (`cask`).
//!
//! Both go through the same `brew` binary; casks add `--cask` to every call.

use crate::backend::{
    pinned_failure, require_offered, verify_version, AdapterConfig, PackageManagerAdapter,
};
use crate::exec::{tool_on_path, Runner};
use crate::{
    AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails, SearchHit,
};
use pkgmanager_schema::ManagerType;

#[derive(Debug, Clone)]
pub struct HomebrewAdapter {
    runner: Runner,
    cask: bool,
}

impl HomebrewAdapter {
    pub fn formulae(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Brew, config.timeout),
            cask: false,
        }
    }

    pub fn casks(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Cask, config.timeout),
            cask: true,
        }
    }

    fn kind_flag(&self) -> &'static str {
        if self.cask {
            "--cask"
        } else {
            "--formula"
        }
    }
}

impl PackageManagerAdapter for HomebrewAdapter {
    fn manager_type(&self) -> ManagerType {
        self.runner.manager()
    }

    fn is_available(&self) -> bool {
        tool_on_path("brew")
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run("brew", &["list", self.kind_flag(), "--versions"])?;
        Ok(parse_list_versions(self.manager_type(), &out.stdout))
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        // brew always installs the current bottle, so a pin is checked first.
        if let Some(version) = exact_version {
            let out = self
                .runner
                .run("brew", &["info", "--json=v2", self.kind_flag(), name])
                .map_err(pinned_failure(self.manager_type(), name, exact_version))?;
            let offered = parse_offered_version(&out.stdout, self.cask);
            require_offered(self.manager_type(), name, version, offered.as_deref())?;
        }
        let outcome = self.runner.invoke("brew", &["install", self.kind_flag(), name])?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.runner.invoke("brew", &["uninstall", self.kind_flag(), name])
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        let mut args = vec!["upgrade"];
        if self.cask {
            args.push("--cask");
        }
        args.extend(name);
        if self.cask {
            return self.runner.invoke("brew", &args);
        }
        let refreshed = self.runner.invoke("brew", &["update"])?;
        Ok(refreshed.then(self.runner.invoke("brew", &args)?))
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        let out = self.runner.run("brew", &["search", self.kind_flag(), query])?;
        Ok(parse_search(&out.stdout))
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        let out = self
            .runner
            .run("brew", &["outdated", self.kind_flag(), "--verbose"])?;
        Ok(parse_outdated(&out.stdout))
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        if !self.check(name) {
            return Ok(None);
        }
        let out = self.runner.run("brew", &["info", self.kind_flag(), name])?;
        Ok(Some(parse_info(name, &out.stdout)))
    }
}

/// `brew list --versions`: `name v1 [v2 ...]`, the last version is current.
fn parse_list_versions(manager: ManagerType, output: &str) -> Vec<InstalledPackage> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.last()?;
            Some(InstalledPackage::new(manager, name, version))
        })
        .collect()
}

fn parse_search(output: &str) -> Vec<SearchHit> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("==>") && !l.starts_with("If you meant"))
        .flat_map(str::split_whitespace)
        .map(|name| SearchHit {
            name: name.to_owned(),
            description: String::new(),
        })
        .collect()
}

/// `brew outdated --verbose`: `name (1.0, 1.1) < 1.2` or `name (1.1) != 1.2`.
fn parse_outdated(output: &str) -> Vec<OutdatedPackage> {
    output
        .lines()
        .filter_map(|line| {
            let (name, rest) = line.trim().split_once(' ')?;
            let (_, versions) = rest.split_once('(')?;
            let (installed, tail) = versions.split_once(')')?;
            let current = installed.rsplit(',').next()?.trim();
            let latest = tail
                .trim()
                .trim_start_matches("!=")
                .trim_start_matches('<')
                .trim();
            if latest.is_empty() {
                return None;
            }
            Some(OutdatedPackage {
                name: name.to_owned(),
                current_version: current.to_owned(),
                latest_version: latest.to_owned(),
            })
        })
        .collect()
}

/// `brew info --json=v2`: formulae carry `versions.stable`, casks a bare
/// `version`.
fn parse_offered_version(output: &str, cask: bool) -> Option<String> {
    let info: serde_json::Value = serde_json::from_str(output).ok()?;
    let version = if cask {
        &info["casks"][0]["version"]
    } else {
        &info["formulae"][0]["versions"]["stable"]
    };
    version.as_str().map(str::to_owned)
}

/// `brew info`: a `==> name: stable 1.2.3 (bottled)` header, a description
/// line, then the homepage URL; casks print `==> name: 1.2.3` instead.
fn parse_info(name: &str, output: &str) -> PackageDetails {
    let mut details = PackageDetails::new(name, "unknown");
    let mut lines = output.lines();

    if let Some(header) = lines.next() {
        if let Some((_, rest)) = header.trim_start_matches("==>").split_once(':') {
            let version = rest
                .split_whitespace()
                .map(|t| t.trim_end_matches(','))
                .find(|t| t.starts_with(|c: char| c.is_ascii_digit()));
            if let Some(version) = version {
                details.version = version.to_owned();
            }
        }
    }

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("==>") {
            continue;
        }
        if let Some(license) = line.strip_prefix("License:") {
            details.license = license.trim().to_owned();
        } else if line.starts_with("http") {
            if details.homepage.is_empty() {
                details.homepage = line.to_owned();
            }
        } else if let Some(from) = line.strip_prefix("From:") {
            details.location = from.trim().to_owned();
        } else if details.summary.is_empty() && !line.contains(':') {
            details.summary = line.to_owned();
        } else if let Some(deps) = line.strip_prefix("Required:") {
            details.requires = deps
                .split(',')
                .map(|d| d.trim().trim_end_matches(|c: char| c == '✔' || c == '✘').trim().to_owned())
                .filter(|d| !d.is_empty())
                .collect();
        }
    }
    details
}

use crate::backend::{pinned_failure, verify_version, AdapterConfig, PackageManagerAdapter};
use crate::exec::{tool_on_path, Runner};
use crate::{
    AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails, SearchHit,
};
use pkgmanager_schema::ManagerType;

/// Binary crates installed with `cargo install`.
#[derive(Debug, Clone)]
pub struct RustAdapter {
    runner: Runner,
}

impl RustAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Rust, config.timeout),
        }
    }

    /// `cargo install-update` comes from the `cargo-update` crate.
    fn require_cargo_update(&self, operation: &'static str) -> Result<(), AdapterError> {
        if self.check("cargo-update") {
            Ok(())
        } else {
            tracing::warn!("cargo-update is not installed; run `cargo install cargo-update --locked`");
            Err(AdapterError::unsupported(ManagerType::Rust, operation))
        }
    }
}

impl PackageManagerAdapter for RustAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Rust
    }

    fn is_available(&self) -> bool {
        tool_on_path("cargo")
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run("cargo", &["install", "--list"])?;
        Ok(parse_install_list(&out.stdout)
            .into_iter()
            .map(|c| InstalledPackage::new(ManagerType::Rust, c.name, c.version))
            .collect())
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        let mut args = vec!["install", "--locked", name];
        if let Some(version) = exact_version {
            args.extend(["--version", version]);
        }
        let outcome = self
            .runner
            .invoke("cargo", &args)
            .map_err(pinned_failure(ManagerType::Rust, name, exact_version))?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.runner.invoke("cargo", &["uninstall", name])
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        self.require_cargo_update("update without cargo-update")?;
        self.runner
            .invoke("cargo", &["install-update", name.unwrap_or("-a")])
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        let out = self
            .runner
            .run("cargo", &["search", query, "--limit", "20"])?;
        Ok(out.stdout.lines().filter_map(parse_search_line).collect())
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        self.require_cargo_update("outdated without cargo-update")?;
        let out = self.runner.run("cargo", &["install-update", "-l"])?;
        Ok(parse_update_table(&out.stdout))
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        let out = self.runner.run("cargo", &["install", "--list"])?;
        Ok(parse_install_list(&out.stdout)
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| {
                let mut details = PackageDetails::new(c.name, c.version);
                details.homepage = format!("https://crates.io/crates/{name}");
                details.binaries = c.binaries.iter().map(|b| (*b).to_owned()).collect();
                details
            }))
    }
}

struct InstalledCrate<'a> {
    name: &'a str,
    version: &'a str,
    binaries: Vec<&'a str>,
}

/// `cargo install --list`:
///
/// ```text
/// ripgrep v14.1.0:
///     rg
/// ```
///
/// Crates installed from git append `(https://...)` before the colon.
fn parse_install_list(output: &str) -> Vec<InstalledCrate<'_>> {
    let mut crates: Vec<InstalledCrate<'_>> = Vec::new();
    for line in output.lines() {
        if line.starts_with(char::is_whitespace) {
            if let Some(c) = crates.last_mut() {
                let binary = line.trim();
                if !binary.is_empty() {
                    c.binaries.push(binary);
                }
            }
            continue;
        }
        let Some(header) = line.trim_end().strip_suffix(':') else {
            continue;
        };
        let mut parts = header.split_whitespace();
        let (Some(name), Some(version)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Some(version) = version.strip_prefix('v') else {
            continue;
        };
        crates.push(InstalledCrate {
            name,
            version,
            binaries: Vec::new(),
        });
    }
    crates
}

/// `ripgrep = "14.1.0"    # Fast line-oriented search`
fn parse_search_line(line: &str) -> Option<SearchHit> {
    let (name, rest) = line.split_once(" = ")?;
    let (version, description) = match rest.split_once('#') {
        Some((v, d)) => (v.trim(), d.trim()),
        None => (rest.trim(), ""),
    };
    let version = version.trim_matches('"');
    Some(SearchHit {
        name: name.trim().to_owned(),
        description: if description.is_empty() {
            version.to_owned()
        } else {
            format!("{version} {description}")
        },
    })
}

/// `cargo install-update -l` table; only rows marked `Yes` need an update.
fn parse_update_table(output: &str) -> Vec<OutdatedPackage> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [name, current, latest, "Yes"] => Some(OutdatedPackage {
                    name: (*name).to_owned(),
                    current_version: current.trim_start_matches('v').to_owned(),
                    latest_version: latest.trim_start_matches('v').to_owned(),
                }),
                _ => None,
            }
        })
        .collect()
}

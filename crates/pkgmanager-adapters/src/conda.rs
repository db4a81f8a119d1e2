use crate::backend::{pinned_failure, verify_version, AdapterConfig, PackageManagerAdapter};
use crate::exec::{tool_on_path, Runner};
use crate::{AdapterError, CommandOutcome, InstalledPackage, PackageDetails, SearchHit};
use pkgmanager_schema::ManagerType;
use serde_json::Value;
use std::collections::BTreeSet;

const MICROMAMBA: &str = "micromamba";

/// conda packages through micromamba, confined to one environment.
#[derive(Debug, Clone)]
pub struct CondaAdapter {
    runner: Runner,
    env: String,
}

impl CondaAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Conda, config.timeout),
            env: config.conda_env.clone(),
        }
    }
}

impl PackageManagerAdapter for CondaAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Conda
    }

    fn is_available(&self) -> bool {
        tool_on_path(MICROMAMBA)
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run(MICROMAMBA, &["list", "-n", &self.env])?;
        Ok(parse_list(&out.stdout)
            .into_iter()
            .map(|row| InstalledPackage::new(ManagerType::Conda, row.name, row.version))
            .collect())
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        let spec = match exact_version {
            Some(version) => format!("{name}=={version}"),
            None => name.to_owned(),
        };
        let outcome = self
            .runner
            .invoke(MICROMAMBA, &["install", "-n", &self.env, "-y", &spec])
            .map_err(pinned_failure(ManagerType::Conda, name, exact_version))?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.runner
            .invoke(MICROMAMBA, &["remove", "-n", &self.env, "-y", name])
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        self.runner.invoke(
            MICROMAMBA,
            &["update", "-n", &self.env, "-y", name.unwrap_or("--all")],
        )
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        let out = self.runner.run(MICROMAMBA, &["search", "--json", query])?;
        parse_search_json(&out.stdout).map_err(|e| AdapterError::ExternalCommandFailed {
            command: out.command,
            code: 0,
            stderr: format!("unreadable search output: {e}"),
        })
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        let pattern = format!("^{name}$");
        let out = self
            .runner
            .run(MICROMAMBA, &["list", "-n", &self.env, &pattern])?;
        Ok(parse_list(&out.stdout)
            .into_iter()
            .find(|row| row.name == name)
            .map(|row| {
                let mut details = PackageDetails::new(row.name, row.version);
                details.summary = format!("build: {}", row.build);
                details.location = format!("channel: {}", row.channel);
                details
            }))
    }
}

struct ListRow<'a> {
    name: &'a str,
    version: &'a str,
    build: &'a str,
    channel: &'a str,
}

/// `micromamba list` rows: `name version build channel`. Headers, rules and
/// packages that came from PyPI are skipped.
fn parse_list(output: &str) -> Vec<ListRow<'_>> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('─'))
        .filter(|l| !l.starts_with("List of packages") && !l.starts_with("Name "))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            let channel = parts[parts.len() - 1];
            if channel == "pypi" {
                return None;
            }
            Some(ListRow {
                name: parts[0],
                version: parts[1],
                build: if parts.len() >= 4 { parts[2] } else { "" },
                channel,
            })
        })
        .collect()
}

/// `micromamba search --json`: `{"result": {"pkgs": [{name, version, channel}...]}}`.
/// One hit per package name, newest listed first by micromamba.
fn parse_search_json(output: &str) -> Result<Vec<SearchHit>, serde_json::Error> {
    let doc: Value = serde_json::from_str(output)?;
    let pkgs = doc
        .pointer("/result/pkgs")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut seen = BTreeSet::new();
    Ok(pkgs
        .iter()
        .filter_map(|pkg| {
            let name = pkg.get("name")?.as_str()?;
            if !seen.insert(name.to_owned()) {
                return None;
            }
            let version = pkg.get("version").and_then(Value::as_str).unwrap_or("?");
            let channel = pkg.get("channel").and_then(Value::as_str).unwrap_or("");
            Some(SearchHit {
                name: name.to_owned(),
                description: format!("{version} {channel}").trim().to_owned(),
            })
        })
        .collect())
}

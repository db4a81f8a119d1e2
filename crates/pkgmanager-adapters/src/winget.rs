//! Windows Package Manager driven from WSL through `winget.exe`.
//!
//! winget prints fixed-width tables; columns are separated by runs of two or
//! more spaces. The package name used in manifests is the `Id` column.

use crate::backend::{pinned_failure, verify_version, AdapterConfig, PackageManagerAdapter};
use crate::exec::{tool_on_path, Runner};
use crate::{
    key_values, AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails,
    SearchHit,
};
use pkgmanager_schema::ManagerType;

const WINGET: &str = "winget.exe";
const AGREEMENTS: [&str; 2] = ["--accept-package-agreements", "--accept-source-agreements"];

#[derive(Debug, Clone)]
pub struct WingetAdapter {
    runner: Runner,
}

impl WingetAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Winget, config.timeout),
        }
    }
}

impl PackageManagerAdapter for WingetAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Winget
    }

    fn is_available(&self) -> bool {
        tool_on_path(WINGET)
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run(WINGET, &["list"])?;
        Ok(table_rows(&out.stdout, 3)
            .into_iter()
            .map(|cols| {
                InstalledPackage::new(ManagerType::Winget, cols[1], cols[2])
                    .with_display_name(cols[0])
            })
            .collect())
    }

    /// Matches the Id exactly or the display name case-insensitively.
    fn check(&self, name: &str) -> bool {
        self.list_installed().is_ok_and(|installed| {
            installed.iter().any(|p| {
                p.name == name
                    || p.display_name
                        .as_deref()
                        .is_some_and(|d| d.eq_ignore_ascii_case(name))
            })
        })
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        let mut args = vec!["install", name, "--silent"];
        args.extend(AGREEMENTS);
        if let Some(version) = exact_version {
            args.extend(["--version", version]);
        }
        let outcome = self
            .runner
            .invoke(WINGET, &args)
            .map_err(pinned_failure(ManagerType::Winget, name, exact_version))?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.runner.invoke(WINGET, &["uninstall", name, "--silent"])
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        let mut args = vec!["upgrade", name.unwrap_or("--all"), "--silent"];
        args.extend(AGREEMENTS);
        self.runner.invoke(WINGET, &args)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        let out = self.runner.run(WINGET, &["search", query])?;
        Ok(table_rows(&out.stdout, 3)
            .into_iter()
            .map(|cols| SearchHit {
                name: cols[1].to_owned(),
                description: cols[0].to_owned(),
            })
            .collect())
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        let out = self.runner.run(WINGET, &["upgrade"])?;
        Ok(table_rows(&out.stdout, 4)
            .into_iter()
            .map(|cols| OutdatedPackage {
                name: cols[1].to_owned(),
                current_version: cols[2].to_owned(),
                latest_version: cols[3].to_owned(),
            })
            .collect())
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        if !self.check(name) {
            return Ok(None);
        }
        let out = self.runner.run(WINGET, &["show", name])?;
        Ok(Some(parse_show(name, &out.stdout)))
    }
}

/// Split a table line on runs of two or more spaces.
fn columns(line: &str) -> Vec<&str> {
    let mut cols = Vec::new();
    let mut start = None;
    let mut spaces = 0;
    for (i, c) in line.char_indices() {
        if c == ' ' {
            spaces += 1;
            if spaces == 2 {
                if let Some(s) = start.take() {
                    cols.push(line[s..i - 1].trim());
                }
            }
        } else {
            spaces = 0;
            if start.is_none() {
                start = Some(i);
            }
        }
    }
    if let Some(s) = start {
        cols.push(line[s..].trim());
    }
    cols
}

/// Data rows with at least `min` columns, skipping headers, rules and
/// progress spinner noise.
fn table_rows(output: &str, min: usize) -> Vec<Vec<&str>> {
    output
        .lines()
        .map(|line| line.rsplit('\r').next().unwrap_or(line).trim())
        .filter(|line| {
            !line.is_empty() && !line.starts_with("Name") && !line.starts_with("---")
        })
        .map(columns)
        .filter(|cols| cols.len() >= min)
        .collect()
}

fn parse_show(name: &str, output: &str) -> PackageDetails {
    let mut details = PackageDetails::new(name, "unknown");
    for (key, value) in key_values(output) {
        match key {
            "Version" => details.version = value.to_owned(),
            "Homepage" => details.homepage = value.to_owned(),
            "Description" | "Short Description" if details.summary.is_empty() => {
                details.summary = value.to_owned();
            }
            "License" => details.license = value.to_owned(),
            "Installer Url" => details.location = value.to_owned(),
            _ => {}
        }
    }
    details
}

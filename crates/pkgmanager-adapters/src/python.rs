use crate::backend::{pinned_failure, verify_version, AdapterConfig, PackageManagerAdapter};
use crate::exec::{tool_on_path, Runner};
use crate::{AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails};
use pkgmanager_schema::ManagerType;

/// Python command-line tools installed in isolated environments by `uv tool`.
#[derive(Debug, Clone)]
pub struct PythonAdapter {
    runner: Runner,
}

impl PythonAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Python, config.timeout),
        }
    }
}

impl PackageManagerAdapter for PythonAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Python
    }

    fn is_available(&self) -> bool {
        tool_on_path("uv")
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run("uv", &["tool", "list"])?;
        Ok(parse_tools(&out.stdout)
            .into_iter()
            .map(|t| InstalledPackage::new(ManagerType::Python, t.name, t.version))
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
            .invoke("uv", &["tool", "install", &spec, "--force"])
            .map_err(pinned_failure(ManagerType::Python, name, exact_version))?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.runner.invoke("uv", &["tool", "uninstall", name])
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        self.runner
            .invoke("uv", &["tool", "upgrade", name.unwrap_or("--all")])
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        let out = self.runner.run("uv", &["tool", "list", "--outdated"])?;
        Ok(parse_tools(&out.stdout)
            .into_iter()
            .filter_map(|t| {
                Some(OutdatedPackage {
                    name: t.name.to_owned(),
                    current_version: t.version.to_owned(),
                    latest_version: t.latest?.to_owned(),
                })
            })
            .collect())
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        let out = self.runner.run("uv", &["tool", "list"])?;
        let Some(tool) = parse_tools(&out.stdout).into_iter().find(|t| t.name == name) else {
            return Ok(None);
        };
        let mut details = PackageDetails::new(tool.name, tool.version);
        details.binaries = tool.binaries.iter().map(|b| (*b).to_owned()).collect();
        if let Ok(dir) = self.runner.run("uv", &["tool", "dir"]) {
            details.location = format!("{}/{name}", dir.stdout.trim());
        }
        Ok(Some(details))
    }
}

#[derive(Debug, Default)]
struct Tool<'a> {
    name: &'a str,
    version: &'a str,
    latest: Option<&'a str>,
    binaries: Vec<&'a str>,
}

/// `uv tool list`: `ruff v0.5.0` headers followed by `- ruff` binary lines.
/// With `--outdated` the header gains `[latest: 0.6.1]`.
fn parse_tools(output: &str) -> Vec<Tool<'_>> {
    let mut tools: Vec<Tool<'_>> = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(binary) = line.strip_prefix('-') {
            if let Some(tool) = tools.last_mut() {
                tool.binaries.push(binary.trim());
            }
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(name), Some(version)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Some(version) = version.strip_prefix('v') else {
            continue;
        };
        let latest = line
            .split_once("[latest:")
            .and_then(|(_, rest)| rest.split(']').next())
            .map(|v| v.trim().trim_start_matches('v'));
        tools.push(Tool {
            name,
            version,
            latest,
            binaries: Vec::new(),
        });
    }
    tools
}

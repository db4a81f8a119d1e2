use crate::backend::{pinned_failure, verify_version, AdapterConfig, PackageManagerAdapter};
use crate::exec::{tool_on_path, Runner};
use crate::{key_values, AdapterError, CommandOutcome, InstalledPackage, PackageDetails};
use pkgmanager_schema::ManagerType;

/// Global JavaScript packages managed by `bun add -g`.
#[derive(Debug, Clone)]
pub struct BunAdapter {
    runner: Runner,
}

impl BunAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Bun, config.timeout),
        }
    }
}

impl PackageManagerAdapter for BunAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Bun
    }

    fn is_available(&self) -> bool {
        tool_on_path("bun")
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run("bun", &["pm", "ls", "-g"])?;
        Ok(out
            .stdout
            .lines()
            .filter_map(parse_tree_line)
            .map(|(name, version)| InstalledPackage::new(ManagerType::Bun, name, version))
            .collect())
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        let spec = match exact_version {
            Some(version) => format!("{name}@{version}"),
            None => name.to_owned(),
        };
        let outcome = self
            .runner
            .invoke("bun", &["add", "-g", &spec])
            .map_err(pinned_failure(ManagerType::Bun, name, exact_version))?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        self.runner.invoke("bun", &["remove", "-g", name])
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        let mut args = vec!["update", "-g"];
        args.extend(name);
        self.runner.invoke("bun", &args)
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        let Some(pkg) = self.list_installed()?.into_iter().find(|p| p.name == name) else {
            return Ok(None);
        };
        let mut details = PackageDetails::new(pkg.name, pkg.version);
        details.homepage = format!("https://www.npmjs.com/package/{name}");
        // Registry metadata is best-effort; offline lookups leave the defaults.
        if let Ok(info) = self.runner.output("bun", &["pm", "view", name]) {
            if info.success() {
                fill_registry_info(&mut details, &info.stdout);
            }
        }
        Ok(Some(details))
    }
}

/// `├── typescript@5.4.5` / `└── @biomejs/biome@1.8.0`
fn parse_tree_line(line: &str) -> Option<(&str, &str)> {
    let entry = line
        .trim_start_matches(|c: char| matches!(c, '├' | '└' | '─' | '│') || c.is_whitespace())
        .trim_end();
    let (name, version) = entry.rsplit_once('@')?;
    if name.is_empty() || name.contains(char::is_whitespace) || version.is_empty() {
        return None;
    }
    let version = version.split_whitespace().next()?;
    Some((name, version))
}

fn fill_registry_info(details: &mut PackageDetails, output: &str) {
    for (key, value) in key_values(output) {
        match key.to_ascii_lowercase().as_str() {
            "description" if details.summary.is_empty() => details.summary = value.to_owned(),
            "license" => details.license = value.to_owned(),
            "homepage" => details.homepage = value.to_owned(),
            _ => {}
        }
    }
}

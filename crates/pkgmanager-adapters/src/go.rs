//! Go binaries installed with `go install <module path>@<version>`.
//!
//! Package names are the install paths (`golang.org/x/tools/gopls`). The
//! installed set is recovered from the build info embedded in each binary of
//! the Go bin directory.

use crate::backend::{pinned_failure, verify_version, AdapterConfig, PackageManagerAdapter};
use crate::exec::{tool_on_path, Runner};
use crate::{AdapterError, CommandOutcome, InstalledPackage, PackageDetails};
use pkgmanager_schema::ManagerType;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GoAdapter {
    runner: Runner,
}

impl GoAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Go, config.timeout),
        }
    }

    /// `GOBIN` when set, else the `bin` directory of the first `GOPATH` entry.
    fn bin_dir(&self) -> Result<PathBuf, AdapterError> {
        let gobin = self.runner.run("go", &["env", "GOBIN"])?;
        let gobin = gobin.stdout.trim();
        if !gobin.is_empty() {
            return Ok(PathBuf::from(gobin));
        }
        let gopath = self.runner.run("go", &["env", "GOPATH"])?;
        let first = std::env::split_paths(gopath.stdout.trim())
            .next()
            .unwrap_or_default();
        Ok(first.join("bin"))
    }

    fn binaries(&self) -> Result<(PathBuf, Vec<GoBinary>), AdapterError> {
        let dir = self.bin_dir()?;
        if !dir.is_dir() {
            return Ok((dir, Vec::new()));
        }
        let dir_arg = dir.to_string_lossy().into_owned();
        // Exits non-zero when some file in the directory is not a Go binary.
        let out = self.runner.output("go", &["version", "-m", &dir_arg])?;
        Ok((dir, parse_build_info(&out.stdout)))
    }

    fn go_install(&self, path: &str, version: &str) -> Result<CommandOutcome, AdapterError> {
        let target = format!("{path}@{version}");
        self.runner.invoke("go", &["install", &target])
    }
}

impl PackageManagerAdapter for GoAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Go
    }

    fn is_available(&self) -> bool {
        tool_on_path("go")
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let (_, binaries) = self.binaries()?;
        Ok(binaries
            .into_iter()
            .map(|b| InstalledPackage::new(ManagerType::Go, b.path, b.version))
            .collect())
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        let outcome = self
            .go_install(name, exact_version.unwrap_or("latest"))
            .map_err(pinned_failure(ManagerType::Go, name, exact_version))?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    /// Go has no uninstall; the binary is deleted from the bin directory.
    fn remove(&self, name: &str) -> Result<CommandOutcome, AdapterError> {
        let (dir, binaries) = self.binaries()?;
        let binary = binaries
            .into_iter()
            .find(|b| b.path == name)
            .ok_or_else(|| AdapterError::UnknownPackage {
                manager: ManagerType::Go,
                name: name.to_owned(),
            })?;
        let file = dir.join(&binary.file);
        fs::remove_file(&file)?;
        Ok(CommandOutcome::ok(format!("deleted {}", file.display())))
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        if let Some(name) = name {
            return self.go_install(name, "latest");
        }
        let mut outcome = CommandOutcome::ok("nothing to update");
        for binary in self.list_installed()? {
            outcome = outcome.then(self.go_install(&binary.name, "latest")?);
        }
        Ok(outcome)
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        let (dir, binaries) = self.binaries()?;
        Ok(binaries.into_iter().find(|b| b.path == name).map(|b| {
            let mut details = PackageDetails::new(b.path, b.version);
            details.summary = format!("module {}", b.module);
            details.location = dir.join(&b.file).display().to_string();
            details.homepage = format!("https://pkg.go.dev/{name}");
            details.binaries = vec![b.file];
            details
        }))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct GoBinary {
    file: String,
    path: String,
    module: String,
    version: String,
}

/// `go version -m <dir>`:
///
/// ```text
/// /home/u/go/bin/gopls: go1.22.0
///         path    golang.org/x/tools/gopls
///         mod     golang.org/x/tools/gopls        v0.15.3 h1:...
/// ```
fn parse_build_info(output: &str) -> Vec<GoBinary> {
    let mut binaries = Vec::new();
    let mut current: Option<GoBinary> = None;
    for line in output.lines() {
        if !line.starts_with(char::is_whitespace) {
            binaries.extend(current.take().filter(|b| !b.path.is_empty()));
            if let Some((file, _)) = line.rsplit_once(": ") {
                let file = file.rsplit(['/', '\\']).next().unwrap_or(file);
                current = Some(GoBinary {
                    file: file.to_owned(),
                    path: String::new(),
                    module: String::new(),
                    version: String::new(),
                });
            }
            continue;
        }
        let Some(bin) = current.as_mut() else {
            continue;
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["path", path, ..] => bin.path = (*path).to_owned(),
            ["mod", module, version, ..] => {
                bin.module = (*module).to_owned();
                bin.version = (*version).to_owned();
            }
            _ => {}
        }
    }
    binaries.extend(current.filter(|b| !b.path.is_empty()));
    binaries
}

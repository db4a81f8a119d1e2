//! Mac App Store via `mas`. Package names are numeric app IDs.

use crate::backend::{
    pinned_failure, require_offered, verify_version, AdapterConfig, PackageManagerAdapter,
};
use crate::exec::{tool_on_path, Runner};
use crate::{
    AdapterError, CommandOutcome, InstalledPackage, OutdatedPackage, PackageDetails, SearchHit,
};
use pkgmanager_schema::ManagerType;

#[derive(Debug, Clone)]
pub struct MasAdapter {
    runner: Runner,
}

impl MasAdapter {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            runner: Runner::new(ManagerType::Mas, config.timeout),
        }
    }
}

impl PackageManagerAdapter for MasAdapter {
    fn manager_type(&self) -> ManagerType {
        ManagerType::Mas
    }

    fn is_available(&self) -> bool {
        tool_on_path("mas")
    }

    fn list_installed(&self) -> Result<Vec<InstalledPackage>, AdapterError> {
        let out = self.runner.run("mas", &["list"])?;
        Ok(out
            .stdout
            .lines()
            .filter_map(parse_app_line)
            .map(|app| {
                InstalledPackage::new(ManagerType::Mas, app.id, app.version)
                    .with_display_name(app.title)
            })
            .collect())
    }

    fn install(
        &self,
        name: &str,
        exact_version: Option<&str>,
    ) -> Result<CommandOutcome, AdapterError> {
        // The App Store only serves its current build.
        if let Some(version) = exact_version {
            let out = self
                .runner
                .run("mas", &["info", name])
                .map_err(pinned_failure(ManagerType::Mas, name, exact_version))?;
            let offered = parse_info_version(&out.stdout);
            require_offered(ManagerType::Mas, name, version, offered)?;
        }
        let outcome = self.runner.invoke("mas", &["install", name])?;
        if let Some(version) = exact_version {
            verify_version(self, name, version)?;
        }
        Ok(outcome)
    }

    /// The App Store has no uninstall command; apps are removed in Finder.
    fn remove(&self, _name: &str) -> Result<CommandOutcome, AdapterError> {
        Err(AdapterError::unsupported(ManagerType::Mas, "remove"))
    }

    fn update(&self, name: Option<&str>) -> Result<CommandOutcome, AdapterError> {
        let mut args = vec!["upgrade"];
        args.extend(name);
        self.runner.invoke("mas", &args)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>, AdapterError> {
        let out = self.runner.run("mas", &["search", query])?;
        Ok(out
            .stdout
            .lines()
            .filter_map(parse_app_line)
            .map(|app| SearchHit {
                name: app.id.to_owned(),
                description: app.title.to_owned(),
            })
            .collect())
    }

    fn outdated(&self) -> Result<Vec<OutdatedPackage>, AdapterError> {
        let out = self.runner.run("mas", &["outdated"])?;
        Ok(out.stdout.lines().filter_map(parse_outdated_line).collect())
    }

    fn show(&self, name: &str) -> Result<Option<PackageDetails>, AdapterError> {
        Ok(self
            .list_installed()?
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| {
                let mut details = PackageDetails::new(p.name, p.version);
                details.summary = format!(
                    "Mac App Store: {}",
                    p.display_name.unwrap_or_default()
                );
                details.homepage = format!("https://apps.apple.com/app/id{name}");
                details
            }))
    }
}

struct AppLine<'a> {
    id: &'a str,
    title: &'a str,
    version: &'a str,
}

/// `937984704  Amphetamine  (5.3.2)`; `mas search` prints the same shape.
fn parse_app_line(line: &str) -> Option<AppLine<'_>> {
    let line = line.trim();
    let (id, rest) = line.split_once(char::is_whitespace)?;
    if !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let rest = rest.trim();
    let open = rest.rfind('(')?;
    let version = rest[open + 1..].strip_suffix(')')?.trim();
    let title = rest[..open].trim();
    if title.is_empty() || version.is_empty() {
        return None;
    }
    Some(AppLine { id, title, version })
}

/// First line of `mas info`: `Xcode 15.1 [Free]`.
fn parse_info_version(output: &str) -> Option<&str> {
    let header = output.lines().next()?.trim();
    let header = match header.rfind('[') {
        Some(price) => header[..price].trim_end(),
        None => header,
    };
    let (_, version) = header.rsplit_once(char::is_whitespace)?;
    version
        .starts_with(|c: char| c.is_ascii_digit())
        .then_some(version)
}

/// `497799835 Xcode (15.0 -> 15.1)`
fn parse_outdated_line(line: &str) -> Option<OutdatedPackage> {
    let app = parse_app_line(line)?;
    let (current, latest) = app.version.split_once("->")?;
    Some(OutdatedPackage {
        name: app.id.to_owned(),
        current_version: current.trim().to_owned(),
        latest_version: latest.trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_line_parsed() {
        let app = parse_app_line("937984704  Amphetamine  (5.3.2)").unwrap();
        assert_eq!(app.id, "937984704");
        assert_eq!(app.title, "Amphetamine");
        assert_eq!(app.version, "5.3.2");
    }

    #[test]
    fn titles_with_parentheses_keep_last_group_as_version() {
        let app = parse_app_line("1295203466 Microsoft Remote Desktop (Beta) (10.9.8)").unwrap();
        assert_eq!(app.title, "Microsoft Remote Desktop (Beta)");
        assert_eq!(app.version, "10.9.8");
    }

    #[test]
    fn non_numeric_id_rejected() {
        assert!(parse_app_line("Warning: something (odd)").is_none());
        assert!(parse_app_line("").is_none());
    }

    #[test]
    fn outdated_line_parsed() {
        let pkg = parse_outdated_line("497799835 Xcode (15.0 -> 15.1)").unwrap();
        assert_eq!(pkg.name, "497799835");
        assert_eq!(pkg.current_version, "15.0");
        assert_eq!(pkg.latest_version, "15.1");
    }

    #[test]
    fn info_version_parsed() {
        let info = "Xcode 15.1 [Free]\nBy: Apple\nReleased: 2023-12-11\nMinimum OS: 13.5\nSize: 3.0 GB\nFrom: https://apps.apple.com/us/app/xcode/id497799835\n";
        assert_eq!(parse_info_version(info), Some("15.1"));
        assert_eq!(parse_info_version("Things 3 3.20.1 [$9.99]\n"), Some("3.20.1"));
    }

    #[test]
    fn info_without_version_is_none() {
        assert_eq!(parse_info_version("No results found\n"), None);
        assert_eq!(parse_info_version(""), None);
    }

    #[test]
    fn remove_is_unsupported() {
        let adapter = MasAdapter::new(&AdapterConfig::default());
        assert!(matches!(
            adapter.remove("937984704"),
            Err(AdapterError::Unsupported { operation: "remove", .. })
        ));
    }
}

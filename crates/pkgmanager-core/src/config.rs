//! Process configuration, resolved once at startup.
//!
//! Precedence for each path is flag, then environment variable, then default.
//! The resulting [`Config`] is passed into the engine; nothing below it reads
//! the environment again.

use crate::CoreError;
use pkgmanager_adapters::{backend::DEFAULT_TIMEOUT, detect_platform, detect_shell, AdapterConfig};
use pkgmanager_schema::{CustomSpecs, Platform};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const MANIFEST_ENV: &str = "PACKAGE_CONFIG";
pub const LOCK_ENV: &str = "PACKAGE_LOCK";
pub const SPECS_ENV: &str = "PKGMANAGER_SPECS";
pub const PLATFORM_ENV: &str = "PKGMANAGER_PLATFORM";
pub const TIMEOUT_ENV: &str = "PKGMANAGER_TIMEOUT";

pub const DEFAULT_LOCK_FILE: &str = "packages.lock.yaml";

#[derive(Debug, Clone)]
pub struct Config {
    pub manifest_path: PathBuf,
    pub lock_path: PathBuf,
    /// Custom package specs; `None` uses the bundled document.
    pub specs_path: Option<PathBuf>,
    pub platform: Platform,
    pub command_timeout: Duration,
    pub conda_env: String,
    pub jobs: usize,
}

impl Config {
    /// A configuration for explicit paths with every other setting defaulted.
    pub fn new(manifest_path: impl Into<PathBuf>, platform: Platform) -> Self {
        let manifest_path = manifest_path.into();
        let lock_path = default_lock_path(&manifest_path);
        Self {
            manifest_path,
            lock_path,
            specs_path: None,
            platform,
            command_timeout: DEFAULT_TIMEOUT,
            conda_env: "base".to_owned(),
            jobs: 1,
        }
    }

    pub fn from_env(manifest: Option<PathBuf>, lock: Option<PathBuf>) -> Result<Self, CoreError> {
        Self::from_lookup(manifest, lock, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable lookup.
    pub fn from_lookup(
        manifest: Option<PathBuf>,
        lock: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CoreError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let manifest_path = manifest
            .or_else(|| var(MANIFEST_ENV).map(|v| expand_tilde(&v, &lookup)))
            .unwrap_or_else(|| expand_tilde("~/.config/packages.yaml", &lookup));
        let lock_path = lock
            .or_else(|| var(LOCK_ENV).map(|v| expand_tilde(&v, &lookup)))
            .unwrap_or_else(|| default_lock_path(&manifest_path));
        let specs_path = var(SPECS_ENV).map(|v| expand_tilde(&v, &lookup));

        let platform = match var(PLATFORM_ENV) {
            Some(value) => value.parse::<Platform>()?,
            None => detect_platform(),
        };
        let command_timeout = match var(TIMEOUT_ENV) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    CoreError::Config(format!("{TIMEOUT_ENV} must be a positive number of seconds, got '{value}'"))
                })?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            manifest_path,
            lock_path,
            specs_path,
            platform,
            command_timeout,
            conda_env: "base".to_owned(),
            jobs: 1,
        })
    }

    /// Load the custom specs and build the settings every adapter shares.
    pub fn adapter_config(&self) -> Result<AdapterConfig, CoreError> {
        let specs = CustomSpecs::load(self.specs_path.as_deref())?;
        Ok(AdapterConfig {
            timeout: self.command_timeout,
            conda_env: self.conda_env.clone(),
            specs: Arc::new(specs),
            default_shell: detect_shell(),
        })
    }
}

fn default_lock_path(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE), |dir| dir.join(DEFAULT_LOCK_FILE))
}

fn expand_tilde(path: &str, lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = lookup("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_live_under_home() {
        let config = Config::from_lookup(
            None,
            None,
            lookup(&[("HOME", "/home/u"), (PLATFORM_ENV, "linux")]),
        )
        .unwrap();
        assert_eq!(config.manifest_path, PathBuf::from("/home/u/.config/packages.yaml"));
        assert_eq!(config.lock_path, PathBuf::from("/home/u/.config/packages.lock.yaml"));
        assert_eq!(config.platform, Platform::Linux);
        assert_eq!(config.command_timeout, DEFAULT_TIMEOUT);
        assert!(config.specs_path.is_none());
    }

    #[test]
    fn flags_beat_environment() {
        let config = Config::from_lookup(
            Some(PathBuf::from("/etc/p.yaml")),
            Some(PathBuf::from("/tmp/l.yaml")),
            lookup(&[(MANIFEST_ENV, "/env/p.yaml"), (LOCK_ENV, "/env/l.yaml"), (PLATFORM_ENV, "darwin")]),
        )
        .unwrap();
        assert_eq!(config.manifest_path, PathBuf::from("/etc/p.yaml"));
        assert_eq!(config.lock_path, PathBuf::from("/tmp/l.yaml"));
    }

    #[test]
    fn environment_beats_defaults() {
        let config = Config::from_lookup(
            None,
            None,
            lookup(&[
                ("HOME", "/home/u"),
                (MANIFEST_ENV, "~/dots/packages.yaml"),
                (PLATFORM_ENV, "wsl"),
                (TIMEOUT_ENV, "60"),
                (SPECS_ENV, "/opt/specs.yaml"),
            ]),
        )
        .unwrap();
        assert_eq!(config.manifest_path, PathBuf::from("/home/u/dots/packages.yaml"));
        assert_eq!(config.lock_path, PathBuf::from("/home/u/dots/packages.lock.yaml"));
        assert_eq!(config.platform, Platform::Wsl);
        assert_eq!(config.command_timeout, Duration::from_secs(60));
        assert_eq!(config.specs_path, Some(PathBuf::from("/opt/specs.yaml")));
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let err = Config::from_lookup(None, None, lookup(&[(PLATFORM_ENV, "beos")])).unwrap_err();
        assert!(err.is_configuration());
        let err = Config::from_lookup(
            None,
            None,
            lookup(&[(PLATFORM_ENV, "linux"), (TIMEOUT_ENV, "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn bundled_specs_load() {
        let config = Config::new("/tmp/p.yaml", Platform::Linux);
        let adapter = config.adapter_config().unwrap();
        assert!(!adapter.specs.is_empty());
    }
}

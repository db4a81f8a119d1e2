//! Closed enumerations shared by every layer: manager types and platforms.
//!
//! Both serialize as lowercase strings so they can be used directly as YAML
//! mapping keys in manifests and lock files.

use crate::manifest::ManifestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the ten package manager backends.
///
/// Declaration order is the canonical processing order used whenever no
/// manifest order applies (lock file keys, `status` output, export).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerType {
    Brew,
    Cask,
    Mas,
    Winget,
    Conda,
    Python,
    Rust,
    Go,
    Bun,
    Custom,
}

impl ManagerType {
    pub const ALL: [ManagerType; 10] = [
        ManagerType::Brew,
        ManagerType::Cask,
        ManagerType::Mas,
        ManagerType::Winget,
        ManagerType::Conda,
        ManagerType::Python,
        ManagerType::Rust,
        ManagerType::Go,
        ManagerType::Bun,
        ManagerType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ManagerType::Brew => "brew",
            ManagerType::Cask => "cask",
            ManagerType::Mas => "mas",
            ManagerType::Winget => "winget",
            ManagerType::Conda => "conda",
            ManagerType::Python => "python",
            ManagerType::Rust => "rust",
            ManagerType::Go => "go",
            ManagerType::Bun => "bun",
            ManagerType::Custom => "custom",
        }
    }

    /// The executable whose presence on `PATH` makes this manager available.
    pub fn tool(self) -> &'static str {
        match self {
            ManagerType::Brew | ManagerType::Cask => "brew",
            ManagerType::Mas => "mas",
            ManagerType::Winget => "winget.exe",
            ManagerType::Conda => "micromamba",
            ManagerType::Python => "uv",
            ManagerType::Rust => "cargo",
            ManagerType::Go => "go",
            ManagerType::Bun => "bun",
            ManagerType::Custom => "scripts",
        }
    }

    /// Parse a comma-separated type filter such as `"conda,python"`.
    pub fn parse_list(input: &str) -> Result<Vec<ManagerType>, ManifestError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for ManagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManagerType {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManagerType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ManifestError::UnknownManagerType(s.to_owned()))
    }
}

/// Runtime platform, also used as the closed set of entry platform guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    Linux,
    Wsl,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Wsl => "wsl",
        }
    }

    /// Whether an entry guarded by `self` applies when running on `runtime`.
    ///
    /// WSL is a Linux system, so `linux` guards also admit a WSL runtime; the
    /// reverse does not hold.
    pub fn admits(self, runtime: Platform) -> bool {
        match self {
            Platform::Darwin => runtime == Platform::Darwin,
            Platform::Linux => matches!(runtime, Platform::Linux | Platform::Wsl),
            Platform::Wsl => runtime == Platform::Wsl,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "darwin" | "macos" | "mac" => Ok(Platform::Darwin),
            "linux" => Ok(Platform::Linux),
            "wsl" => Ok(Platform::Wsl),
            other => Err(ManifestError::UnknownPlatform(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_type_string_roundtrip() {
        for t in ManagerType::ALL {
            assert_eq!(t.as_str().parse::<ManagerType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_manager_type_rejected() {
        assert!(matches!(
            "apt".parse::<ManagerType>(),
            Err(ManifestError::UnknownManagerType(name)) if name == "apt"
        ));
    }

    #[test]
    fn parse_type_list_skips_blanks() {
        let types = ManagerType::parse_list("conda, python,,rust").unwrap();
        assert_eq!(
            types,
            vec![ManagerType::Conda, ManagerType::Python, ManagerType::Rust]
        );
        assert!(ManagerType::parse_list("conda,nope").is_err());
    }

    #[test]
    fn manager_type_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&ManagerType::Winget).unwrap();
        assert_eq!(yaml.trim(), "winget");
    }

    #[test]
    fn linux_guard_admits_wsl() {
        assert!(Platform::Linux.admits(Platform::Linux));
        assert!(Platform::Linux.admits(Platform::Wsl));
        assert!(!Platform::Linux.admits(Platform::Darwin));
    }

    #[test]
    fn wsl_and_darwin_guards_are_exact() {
        assert!(Platform::Wsl.admits(Platform::Wsl));
        assert!(!Platform::Wsl.admits(Platform::Linux));
        assert!(Platform::Darwin.admits(Platform::Darwin));
        assert!(!Platform::Darwin.admits(Platform::Wsl));
    }

    #[test]
    fn platform_aliases() {
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!("mac".parse::<Platform>().unwrap(), Platform::Darwin);
        assert!("windows".parse::<Platform>().is_err());
    }
}

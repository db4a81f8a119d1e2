//! Package manager adapters for pkgmanager.
//!
//! This crate is the execution layer: one `PackageManagerAdapter` per backend
//! (Homebrew formulae and casks, mas, winget, micromamba, uv, cargo, go, bun,
//! and shell-script `custom` packages), the closed `Backend` sum type over
//! them, bounded-time subprocess execution, runtime platform and shell
//! detection, and a deterministic `MockAdapter` for tests.

pub mod backend;
pub mod bun;
pub mod conda;
pub mod custom;
pub mod exec;
pub mod go;
pub mod homebrew;
pub mod mas;
pub mod mock;
pub mod platform;
pub mod python;
pub mod rust;
pub mod winget;

pub use backend::{AdapterConfig, Backend, PackageManagerAdapter};
pub use exec::{detect_shell, Runner};
pub use mock::MockAdapter;
pub use platform::detect_platform;

use pkgmanager_schema::ManagerType;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0} is not available on this system")]
    ManagerUnavailable(ManagerType),
    #[error("{manager} cannot provide {name} at version {version}: {detail}")]
    VersionUnavailable {
        manager: ManagerType,
        name: String,
        version: String,
        /// What the backend offered instead, or its stderr.
        detail: String,
    },
    #[error("{manager} does not support {operation}")]
    Unsupported {
        manager: ManagerType,
        operation: &'static str,
    },
    #[error("`{command}` exited with status {code}: {stderr}")]
    ExternalCommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
    #[error("no {manager} package named '{name}'")]
    UnknownPackage { manager: ManagerType, name: String },
    #[error("adapter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    pub fn unsupported(manager: ManagerType, operation: &'static str) -> Self {
        AdapterError::Unsupported { manager, operation }
    }

    pub fn version_unavailable(
        manager: ManagerType,
        name: &str,
        version: &str,
        detail: impl Into<String>,
    ) -> Self {
        AdapterError::VersionUnavailable {
            manager,
            name: name.to_owned(),
            version: version.to_owned(),
            detail: detail.into(),
        }
    }
}

/// A package a backend reports as installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledPackage {
    pub manager: ManagerType,
    pub name: String,
    pub version: String,
    /// Human-readable name when the package name is an ID (mas, winget).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the (manager, name) pair is in the resolved desired set.
    pub tracked: bool,
}

impl InstalledPackage {
    pub fn new(manager: ManagerType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            manager,
            name: name.into(),
            version: version.into(),
            display_name: None,
            tracked: false,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// What crossed the adapter boundary for one mutating call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
    pub raw_output: String,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            raw_output: String::new(),
        }
    }

    /// Concatenate two outcomes of a multi-step operation.
    #[must_use]
    pub fn then(mut self, next: CommandOutcome) -> Self {
        if !next.raw_output.is_empty() {
            if !self.raw_output.is_empty() {
                self.raw_output.push('\n');
            }
            self.raw_output.push_str(&next.raw_output);
        }
        self.success &= next.success;
        self.message = next.message;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub current_version: String,
    pub latest_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageDetails {
    pub name: String,
    pub version: String,
    pub summary: String,
    pub homepage: String,
    pub license: String,
    pub location: String,
    pub requires: Vec<String>,
    pub binaries: Vec<String>,
}

impl PackageDetails {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }
}

/// Split `Key: value` lines into pairs, trimming both sides.
pub(crate) fn key_values(output: &str) -> impl Iterator<Item = (&str, &str)> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim(), v.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_then_accumulates_output() {
        let first = CommandOutcome {
            success: true,
            message: "updated".to_owned(),
            raw_output: "a".to_owned(),
        };
        let second = CommandOutcome {
            success: false,
            message: "upgrade failed".to_owned(),
            raw_output: "b".to_owned(),
        };
        let joined = first.then(second);
        assert!(!joined.success);
        assert_eq!(joined.raw_output, "a\nb");
        assert_eq!(joined.message, "upgrade failed");
    }

    #[test]
    fn key_values_skips_lines_without_colon() {
        let pairs: Vec<_> = key_values("Version: 1.0\nno colon\nHomepage: https://x.y\n").collect();
        assert_eq!(pairs, vec![("Version", "1.0"), ("Homepage", "https://x.y")]);
    }

    #[test]
    fn error_messages_name_the_manager() {
        let err = AdapterError::unsupported(ManagerType::Mas, "remove");
        assert_eq!(err.to_string(), "mas does not support remove");
    }
}

//! Manifest, lock file, and custom package models for pkgmanager.
//!
//! This crate is the schema layer: YAML manifest parsing into typed sections
//! and normalized entries (`ManifestDocument`, `PackageEntry`), the lock file
//! of pinned versions (`LockDocument`), the custom package specification
//! document (`CustomSpecs`), and the closed `ManagerType` / `Platform` sets.
//! Nothing here spawns processes.

pub mod lock;
pub mod manifest;
pub mod specs;
pub mod types;

pub use lock::{LockDocument, LockError};
pub use manifest::{
    home_section, parse_manifest_file, parse_manifest_str, ManifestDocument, ManifestError,
    PackageEntry, Section, SectionBody, SectionKey, CUSTOM_KEY,
};
pub use specs::{CustomPackageSpec, CustomSpecs, DependencyOrder, SpecError, BUNDLED_SPECS};
pub use types::{ManagerType, Platform};

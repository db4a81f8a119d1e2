//! Fallback resolution: bind each manifest entry to exactly one manager type.

use crate::registry::Availability;
use pkgmanager_schema::{ManagerType, ManifestDocument, PackageEntry, Platform};
use serde::Serialize;
use std::collections::HashSet;

/// A manifest entry bound to the manager that will handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub manager: ManagerType,
    /// Section key the entry was declared in, as written.
    pub section: String,
    /// The manager type the entry was listed under.
    pub declared: ManagerType,
}

/// First available manager in `chain`, else its last element.
///
/// `None` only for an empty chain, which manifest parsing never produces.
pub fn resolve(chain: &[ManagerType], availability: &Availability) -> Option<ManagerType> {
    chain
        .iter()
        .copied()
        .find(|manager| availability.is_available(*manager))
        .or_else(|| chain.last().copied())
}

pub fn resolve_entry(
    section: &str,
    entry: &PackageEntry,
    availability: &Availability,
) -> Option<ResolvedPackage> {
    resolve(&entry.chain(), availability).map(|manager| ResolvedPackage {
        name: entry.name.clone(),
        manager,
        section: section.to_owned(),
        declared: entry.declared(),
    })
}

/// The desired set for `platform`, in manifest order.
///
/// Platform guards are applied before resolution. When two entries resolve to
/// the same (manager, name) pair the first one wins.
pub fn resolve_manifest(
    manifest: &ManifestDocument,
    platform: Platform,
    availability: &Availability,
) -> Vec<ResolvedPackage> {
    let mut seen = HashSet::new();
    manifest
        .entries_for(platform)
        .into_iter()
        .filter_map(|(section, entry)| resolve_entry(section, entry, availability))
        .filter(|pkg| seen.insert((pkg.manager, pkg.name.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmanager_schema::parse_manifest_str;
    use pkgmanager_schema::ManagerType::{Brew, Conda, Custom, Python, Rust};

    fn avail(up: &[ManagerType]) -> Availability {
        ManagerType::ALL
            .iter()
            .map(|m| (*m, up.contains(m)))
            .collect()
    }

    #[test]
    fn resolve_table() {
        let cases: &[(&[ManagerType], &[ManagerType], Option<ManagerType>)] = &[
            (&[Brew], &[Brew], Some(Brew)),
            (&[Brew], &[], Some(Brew)),
            (&[Brew, Conda], &[Conda], Some(Conda)),
            (&[Brew, Conda], &[Brew, Conda], Some(Brew)),
            (&[Python, Rust, Conda], &[Conda, Rust], Some(Rust)),
            (&[Python, Rust, Conda], &[], Some(Conda)),
            (&[Custom], &[Custom], Some(Custom)),
            (&[], &[Brew], None),
        ];
        for (chain, up, expected) in cases {
            assert_eq!(resolve(chain, &avail(up)), *expected, "chain {chain:?} with {up:?}");
        }
    }

    #[test]
    fn fallback_chain_in_manifest() {
        let doc = parse_manifest_str("general:\n  python:\n    - ruff:conda\n    - black\n").unwrap();
        let resolved = resolve_manifest(&doc, Platform::Linux, &avail(&[Conda]));
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "ruff");
        assert_eq!(resolved[0].manager, Conda);
        assert_eq!(resolved[0].declared, Python);
        assert_eq!(resolved[0].section, "general");
        // Nothing available: the terminal element, reported later as unavailable.
        assert_eq!(resolved[1].manager, Python);
    }

    #[test]
    fn platform_guard_applies_before_resolution() {
        let doc = parse_manifest_str(
            "general:\n  rust:\n    - name: bottom\n      platform: linux\n    - ripgrep\nmac:\n  brew:\n    - mas\n",
        )
        .unwrap();
        let all = avail(&ManagerType::ALL);

        let darwin: Vec<_> = resolve_manifest(&doc, Platform::Darwin, &all)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(darwin, vec!["ripgrep", "mas"]);

        let linux: Vec<_> = resolve_manifest(&doc, Platform::Linux, &all)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(linux, vec!["bottom", "ripgrep"]);
    }

    #[test]
    fn duplicate_pairs_keep_first() {
        let doc = parse_manifest_str(
            "general:\n  conda:\n    - jq\n  brew:\n    - jq:conda\n",
        )
        .unwrap();
        let resolved = resolve_manifest(&doc, Platform::Linux, &avail(&[Conda]));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].declared, Conda);
    }
}

use crate::lock::write_atomic;
use crate::types::{ManagerType, Platform};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Top-level key holding custom script packages outside any section.
pub const CUSTOM_KEY: &str = "custom";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("manifest root must be a mapping of section names")]
    NotAMapping,
    #[error("invalid section '{section}': {reason}")]
    InvalidSection { section: String, reason: String },
    #[error("invalid entry in {section}.{manager}: {reason}")]
    InvalidEntry {
        section: String,
        manager: ManagerType,
        reason: String,
    },
    #[error("unknown manager type '{0}'")]
    UnknownManagerType(String),
    #[error("unknown platform '{0}', expected one of darwin, linux, wsl")]
    UnknownPlatform(String),
}

/// Which runtimes a manifest section applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKey {
    /// Platform-agnostic: `general` and the top-level `custom` list.
    General,
    Platform(Platform),
    /// Preserved on save, never resolved.
    Unknown(String),
}

impl SectionKey {
    pub fn from_key(key: &str) -> Self {
        match key {
            "general" | CUSTOM_KEY => SectionKey::General,
            other => match other.parse::<Platform>() {
                Ok(platform) => SectionKey::Platform(platform),
                Err(_) => SectionKey::Unknown(other.to_owned()),
            },
        }
    }

    pub fn applies_to(&self, runtime: Platform) -> bool {
        match self {
            SectionKey::General => true,
            SectionKey::Platform(p) => p.admits(runtime),
            SectionKey::Unknown(_) => false,
        }
    }
}

/// The section a newly installed package of `manager` is recorded under.
pub fn home_section(manager: ManagerType) -> &'static str {
    match manager {
        ManagerType::Brew | ManagerType::Cask | ManagerType::Mas => "mac",
        ManagerType::Winget => "wsl",
        ManagerType::Custom => CUSTOM_KEY,
        ManagerType::Conda
        | ManagerType::Python
        | ManagerType::Rust
        | ManagerType::Go
        | ManagerType::Bun => "general",
    }
}

/// A normalized manifest entry.
///
/// All three literal forms (`name`, `name:fallback:...`, `{name, platform}`)
/// collapse into this shape. Entries are only built by parsing, so the
/// fallback chain always starts with the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub platforms: Vec<Platform>,
    declared: ManagerType,
    fallbacks: Vec<ManagerType>,
}

impl PackageEntry {
    pub fn declared(&self) -> ManagerType {
        self.declared
    }

    pub fn fallbacks(&self) -> &[ManagerType] {
        &self.fallbacks
    }

    /// The declared type followed by the fallbacks, in preference order.
    pub fn chain(&self) -> Vec<ManagerType> {
        std::iter::once(self.declared)
            .chain(self.fallbacks.iter().copied())
            .collect()
    }

    /// Whether `manager` appears anywhere in the chain.
    pub fn accepts(&self, manager: ManagerType) -> bool {
        self.declared == manager || self.fallbacks.contains(&manager)
    }

    pub fn applies_to(&self, runtime: Platform) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| p.admits(runtime))
    }

    pub fn parse(section: &str, declared: ManagerType, value: &Value) -> Result<Self, ManifestError> {
        let invalid = |reason: String| ManifestError::InvalidEntry {
            section: section.to_owned(),
            manager: declared,
            reason,
        };

        match value {
            Value::String(raw) => {
                // Custom names are script identifiers and never carry fallbacks.
                if declared == ManagerType::Custom {
                    return Self::bare(raw, declared).ok_or_else(|| invalid("empty package name".to_owned()));
                }
                let mut parts = raw.split(':');
                let name = parts.next().unwrap_or_default().trim();
                if name.is_empty() {
                    return Err(invalid(format!("empty package name in '{raw}'")));
                }
                let mut fallbacks = Vec::new();
                for fallback in parts {
                    let fallback = fallback.trim();
                    if fallback.is_empty() {
                        return Err(invalid(format!("empty fallback in '{raw}'")));
                    }
                    match fallback.parse::<ManagerType>() {
                        Ok(manager) => fallbacks.push(manager),
                        Err(_) => warn!("{section}.{declared}: ignoring unknown fallback '{fallback}' of {name}"),
                    }
                }
                Ok(Self {
                    name: name.to_owned(),
                    platforms: Vec::new(),
                    declared,
                    fallbacks,
                })
            }
            // mas app IDs are commonly written unquoted.
            Value::Number(n) => Ok(Self {
                name: n.to_string(),
                platforms: Vec::new(),
                declared,
                fallbacks: Vec::new(),
            }),
            Value::Mapping(map) => {
                let name = match map.get("name") {
                    Some(Value::String(s)) => s.trim().to_owned(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => return Err(invalid("structured entry needs a string 'name'".to_owned())),
                };
                if name.is_empty() {
                    return Err(invalid("empty package name".to_owned()));
                }
                let guard = map.get("platform").or_else(|| map.get("platforms"));
                let platforms = parse_platforms(guard).map_err(|e| match e {
                    ManifestError::UnknownPlatform(_) => e,
                    other => invalid(other.to_string()),
                })?;
                Ok(Self {
                    name,
                    platforms,
                    declared,
                    fallbacks: Vec::new(),
                })
            }
            other => Err(invalid(format!("unsupported entry form: {other:?}"))),
        }
    }

    fn bare(name: &str, declared: ManagerType) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            platforms: Vec::new(),
            declared,
            fallbacks: Vec::new(),
        })
    }
}

fn parse_platforms(value: Option<&Value>) -> Result<Vec<Platform>, ManifestError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.trim().parse()?]),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().parse(),
                other => Err(ManifestError::UnknownPlatform(format!("{other:?}"))),
            })
            .collect(),
        Some(other) => Err(ManifestError::UnknownPlatform(format!("{other:?}"))),
    }
}

/// Manager type to entries, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionBody {
    pub lists: Vec<(ManagerType, Vec<PackageEntry>)>,
}

impl SectionBody {
    pub fn get(&self, manager: ManagerType) -> &[PackageEntry] {
        self.lists
            .iter()
            .find(|(t, _)| *t == manager)
            .map_or(&[], |(_, entries)| entries.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// The key exactly as written in the file.
    pub name: String,
    pub key: SectionKey,
    pub body: SectionBody,
}

/// A parsed manifest that still owns its raw YAML mapping.
///
/// Mutations edit the raw mapping and re-derive the typed sections, so keys
/// this crate does not understand survive a load/save cycle untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    raw: Mapping,
    sections: Vec<Section>,
}

impl ManifestDocument {
    pub fn from_mapping(raw: Mapping) -> Result<Self, ManifestError> {
        let sections = parse_sections(&raw)?;
        Ok(Self { raw, sections })
    }

    pub fn empty() -> Self {
        Self {
            raw: Mapping::new(),
            sections: Vec::new(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn raw(&self) -> &Mapping {
        &self.raw
    }

    /// Entries that survive platform filtering for `runtime`, in manifest order,
    /// paired with the name of the section that declared them.
    pub fn entries_for(&self, runtime: Platform) -> Vec<(&str, &PackageEntry)> {
        let mut out = Vec::new();
        for section in &self.sections {
            if !section.key.applies_to(runtime) {
                continue;
            }
            for (_, entries) in &section.body.lists {
                for entry in entries {
                    if entry.applies_to(runtime) {
                        out.push((section.name.as_str(), entry));
                    }
                }
            }
        }
        out
    }

    /// First entry named `name` in any recognized section, regardless of platform.
    pub fn find_entry(&self, name: &str) -> Option<(&Section, &PackageEntry)> {
        self.sections.iter().find_map(|section| {
            section
                .body
                .lists
                .iter()
                .flat_map(|(_, entries)| entries.iter())
                .find(|e| e.name == name)
                .map(|e| (section, e))
        })
    }

    pub fn entry_count(&self, manager: ManagerType, runtime: Platform) -> usize {
        self.entries_for(runtime)
            .iter()
            .filter(|(_, e)| e.declared() == manager)
            .count()
    }

    /// Record `name` under `manager` in its home section.
    ///
    /// Returns `false` without touching the document when an entry with the
    /// same name already lists `manager` anywhere in its chain.
    pub fn add_entry(&mut self, manager: ManagerType, name: &str) -> Result<bool, ManifestError> {
        let already = self.sections.iter().any(|s| {
            s.body
                .lists
                .iter()
                .flat_map(|(_, entries)| entries.iter())
                .any(|e| e.name == name && e.accepts(manager))
        });
        if already {
            return Ok(false);
        }

        let entry = Value::String(name.to_owned());
        if manager == ManagerType::Custom {
            let list = self
                .raw
                .entry(Value::String(CUSTOM_KEY.to_owned()))
                .or_insert_with(|| Value::Sequence(Vec::new()));
            push_onto(list, entry, CUSTOM_KEY)?;
        } else {
            let section_name = self.existing_section_for(home_section(manager));
            let section = self
                .raw
                .entry(Value::String(section_name.clone()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if section.is_null() {
                *section = Value::Mapping(Mapping::new());
            }
            let Value::Mapping(body) = section else {
                return Err(ManifestError::InvalidSection {
                    section: section_name,
                    reason: "expected a mapping of manager types".to_owned(),
                });
            };
            let list = body
                .entry(Value::String(manager.as_str().to_owned()))
                .or_insert_with(|| Value::Sequence(Vec::new()));
            push_onto(list, entry, &section_name)?;
        }

        self.sections = parse_sections(&self.raw)?;
        Ok(true)
    }

    /// Remove the first entry named `name`, optionally restricted to entries
    /// declared under `manager`. Returns the section it was removed from.
    pub fn remove_entry(
        &mut self,
        name: &str,
        manager: Option<ManagerType>,
    ) -> Result<Option<String>, ManifestError> {
        let target = self.sections.iter().find_map(|section| {
            section.body.lists.iter().find_map(|(declared, entries)| {
                let matches = manager.map_or(true, |m| m == *declared);
                (matches && entries.iter().any(|e| e.name == name))
                    .then(|| (section.name.clone(), *declared))
            })
        });
        let Some((section_name, declared)) = target else {
            return Ok(None);
        };

        let section_key = Value::String(section_name.clone());
        let list = if section_name == CUSTOM_KEY {
            self.raw.get_mut(&section_key)
        } else {
            self.raw
                .get_mut(&section_key)
                .and_then(Value::as_mapping_mut)
                .and_then(|body| body.get_mut(declared.as_str()))
        };
        if let Some(Value::Sequence(items)) = list {
            if let Some(pos) = items
                .iter()
                .position(|item| raw_entry_name(item, declared).as_deref() == Some(name))
            {
                items.remove(pos);
            }
        }

        self.sections = parse_sections(&self.raw)?;
        Ok(Some(section_name))
    }

    /// Build a manifest describing the given installed packages.
    ///
    /// Typed managers go under `general`, custom packages under the top-level
    /// `custom` list. Names containing `:` use the structured form so they are
    /// not mistaken for fallback chains.
    pub fn from_installed(groups: &[(ManagerType, Vec<String>)]) -> Self {
        let mut raw = Mapping::new();
        let mut general = Mapping::new();
        for (manager, names) in groups {
            let items: Vec<Value> = names
                .iter()
                .map(|name| {
                    if name.contains(':') && *manager != ManagerType::Custom {
                        let mut structured = Mapping::new();
                        structured.insert("name".into(), Value::String(name.clone()));
                        Value::Mapping(structured)
                    } else {
                        Value::String(name.clone())
                    }
                })
                .collect();
            if *manager == ManagerType::Custom {
                raw.insert(CUSTOM_KEY.into(), Value::Sequence(items));
            } else {
                general.insert(manager.as_str().into(), Value::Sequence(items));
            }
        }
        if !general.is_empty() {
            raw.insert("general".into(), Value::Mapping(general));
        }
        // Cannot fail: every key and entry above is well-formed.
        let sections = parse_sections(&raw).unwrap_or_default();
        Self { raw, sections }
    }

    pub fn to_yaml_string(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(&self.raw)?)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let content = self.to_yaml_string()?;
        write_atomic(path.as_ref(), &content)?;
        Ok(())
    }

    /// An existing alias of `preferred` (e.g. `darwin` for `mac`), else `preferred`.
    fn existing_section_for(&self, preferred: &str) -> String {
        let wanted = SectionKey::from_key(preferred);
        self.sections
            .iter()
            .find(|s| s.key == wanted && s.name != CUSTOM_KEY)
            .map_or_else(|| preferred.to_owned(), |s| s.name.clone())
    }
}

fn push_onto(list: &mut Value, entry: Value, section: &str) -> Result<(), ManifestError> {
    if list.is_null() {
        *list = Value::Sequence(Vec::new());
    }
    match list {
        Value::Sequence(items) => {
            items.push(entry);
            Ok(())
        }
        _ => Err(ManifestError::InvalidSection {
            section: section.to_owned(),
            reason: "expected a list of packages".to_owned(),
        }),
    }
}

fn raw_entry_name(item: &Value, declared: ManagerType) -> Option<String> {
    PackageEntry::parse("", declared, item).ok().map(|e| e.name)
}

fn parse_sections(raw: &Mapping) -> Result<Vec<Section>, ManifestError> {
    let mut sections: Vec<Section> = Vec::new();
    for (key, value) in raw {
        let Some(name) = key.as_str() else {
            return Err(ManifestError::InvalidSection {
                section: format!("{key:?}"),
                reason: "section keys must be strings".to_owned(),
            });
        };
        let key = SectionKey::from_key(name);
        if matches!(key, SectionKey::Unknown(_)) {
            sections.push(Section {
                name: name.to_owned(),
                key,
                body: SectionBody::default(),
            });
            continue;
        }

        let body = if name == CUSTOM_KEY {
            SectionBody {
                lists: vec![(ManagerType::Custom, parse_list(name, ManagerType::Custom, value)?)],
            }
        } else {
            parse_body(name, value)?
        };

        // `mac` and `darwin` are the same section; only one may be present.
        if name != CUSTOM_KEY
            && sections
                .iter()
                .any(|s| s.key == key && s.name != CUSTOM_KEY && key != SectionKey::General)
        {
            return Err(ManifestError::InvalidSection {
                section: name.to_owned(),
                reason: "declared more than once under different aliases".to_owned(),
            });
        }

        sections.push(Section {
            name: name.to_owned(),
            key,
            body,
        });
    }
    Ok(sections)
}

fn parse_body(section: &str, value: &Value) -> Result<SectionBody, ManifestError> {
    let map = match value {
        Value::Null => return Ok(SectionBody::default()),
        Value::Mapping(map) => map,
        _ => {
            return Err(ManifestError::InvalidSection {
                section: section.to_owned(),
                reason: "expected a mapping of manager types".to_owned(),
            })
        }
    };
    // Unknown manager keys stay in the raw mapping and are written back on save.
    let mut lists = Vec::with_capacity(map.len());
    for (key, entries) in map {
        let Some(manager) = key.as_str().and_then(|k| k.parse::<ManagerType>().ok()) else {
            warn!("{section}: ignoring unknown manager type {}", key_label(key));
            continue;
        };
        lists.push((manager, parse_list(section, manager, entries)?));
    }
    Ok(SectionBody { lists })
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => format!("'{s}'"),
        other => format!("{other:?}"),
    }
}

fn parse_list(
    section: &str,
    manager: ManagerType,
    value: &Value,
) -> Result<Vec<PackageEntry>, ManifestError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| PackageEntry::parse(section, manager, item))
            .collect(),
        _ => Err(ManifestError::InvalidEntry {
            section: section.to_owned(),
            manager,
            reason: "expected a list of packages".to_owned(),
        }),
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ManifestDocument, ManifestError> {
    let value: Value = serde_yaml::from_str(input)?;
    match value {
        Value::Null => Ok(ManifestDocument::empty()),
        Value::Mapping(raw) => ManifestDocument::from_mapping(raw),
        _ => Err(ManifestError::NotAMapping),
    }
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ManifestDocument, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
mac:
  brew:
    - ripgrep
    - tmux:conda
  cask: [raycast]
  mas: [937984704]
general:
  conda:
    - python
    - name: gcc
      platform: linux
  rust: [miniserve]
dotfiles:
  theme: dracula
custom:
  - fisher
  - name: tpm
    platforms: [darwin, wsl]
"#;

    #[test]
    fn parses_all_entry_forms() {
        let doc = parse_manifest_str(SAMPLE).expect("should parse");
        let mac = &doc.sections()[0];
        assert_eq!(mac.key, SectionKey::Platform(Platform::Darwin));

        let brew = mac.body.get(ManagerType::Brew);
        assert_eq!(brew[0].chain(), vec![ManagerType::Brew]);
        assert_eq!(brew[1].name, "tmux");
        assert_eq!(brew[1].chain(), vec![ManagerType::Brew, ManagerType::Conda]);

        let mas = mac.body.get(ManagerType::Mas);
        assert_eq!(mas[0].name, "937984704");

        let general = &doc.sections()[1];
        let conda = general.body.get(ManagerType::Conda);
        assert_eq!(conda[1].platforms, vec![Platform::Linux]);
        assert_eq!(conda[1].chain(), vec![ManagerType::Conda]);
    }

    #[test]
    fn unknown_sections_are_preserved_not_resolved() {
        let doc = parse_manifest_str(SAMPLE).unwrap();
        let unknown = doc.sections().iter().find(|s| s.name == "dotfiles").unwrap();
        assert_eq!(unknown.key, SectionKey::Unknown("dotfiles".to_owned()));
        assert!(unknown.body.lists.is_empty());

        let out = doc.to_yaml_string().unwrap();
        let reparsed = parse_manifest_str(&out).unwrap();
        assert_eq!(reparsed.raw(), doc.raw());
        assert!(out.contains("theme: dracula"));
    }

    #[test]
    fn platform_filtering_drops_guarded_entries() {
        let doc = parse_manifest_str(SAMPLE).unwrap();

        let on_darwin: Vec<&str> = doc
            .entries_for(Platform::Darwin)
            .iter()
            .map(|(_, e)| e.name.as_str())
            .collect();
        assert!(on_darwin.contains(&"ripgrep"));
        assert!(!on_darwin.contains(&"gcc"));
        assert!(on_darwin.contains(&"tpm"));

        let on_linux: Vec<&str> = doc
            .entries_for(Platform::Linux)
            .iter()
            .map(|(_, e)| e.name.as_str())
            .collect();
        assert!(!on_linux.contains(&"ripgrep"));
        assert!(on_linux.contains(&"gcc"));
        assert!(!on_linux.contains(&"tpm"));
        assert!(on_linux.contains(&"fisher"));
    }

    #[test]
    fn custom_names_do_not_split_on_colon() {
        let doc = parse_manifest_str("custom:\n  - 'weird:name'\n").unwrap();
        let entry = &doc.sections()[0].body.get(ManagerType::Custom)[0];
        assert_eq!(entry.name, "weird:name");
        assert_eq!(entry.chain(), vec![ManagerType::Custom]);
    }

    #[test]
    fn unknown_fallback_types_are_dropped() {
        let doc = parse_manifest_str("general:\n  conda: ['tmux:apt', 'jq:nix:brew']\n").unwrap();
        let conda = doc.sections()[0].body.get(ManagerType::Conda);
        assert_eq!(conda[0].name, "tmux");
        assert_eq!(conda[0].chain(), vec![ManagerType::Conda]);
        assert_eq!(conda[1].chain(), vec![ManagerType::Conda, ManagerType::Brew]);
    }

    #[test]
    fn unknown_manager_keys_are_skipped_and_preserved() {
        let doc = parse_manifest_str("general:\n  conda: [jq]\n  apt: [vim]\n").unwrap();
        let names: Vec<_> = doc.entries_for(Platform::Linux).iter().map(|(_, e)| e.name.clone()).collect();
        assert_eq!(names, vec!["jq".to_owned()]);
        assert_eq!(doc.sections()[0].body.lists.len(), 1);

        let yaml = doc.to_yaml_string().unwrap();
        assert!(yaml.contains("apt"), "{yaml}");
        assert!(yaml.contains("vim"), "{yaml}");
    }

    #[test]
    fn mutations_keep_unknown_manager_keys() {
        let mut doc = parse_manifest_str("general:\n  apt: [vim]\n  conda: [jq]\n").unwrap();
        doc.add_entry(ManagerType::Rust, "bat").unwrap();
        doc.remove_entry("jq", None).unwrap();
        let reparsed = parse_manifest_str(&doc.to_yaml_string().unwrap()).unwrap();
        assert_eq!(reparsed.raw()["general"]["apt"][0].as_str(), Some("vim"));
        assert!(reparsed.find_entry("bat").is_some());
        assert!(reparsed.find_entry("jq").is_none());
    }

    #[test]
    fn rejects_empty_names() {
        assert!(parse_manifest_str("general:\n  conda: [':brew']\n").is_err());
        assert!(parse_manifest_str("general:\n  conda: ['tmux:']\n").is_err());
        assert!(parse_manifest_str("general:\n  conda:\n    - name: ''\n").is_err());
    }

    #[test]
    fn rejects_unknown_platform_guard() {
        let err =
            parse_manifest_str("general:\n  conda:\n    - name: x\n      platform: beos\n").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownPlatform(_)));
    }

    #[test]
    fn rejects_duplicate_platform_aliases() {
        let input = "mac:\n  brew: [a]\ndarwin:\n  brew: [b]\n";
        assert!(matches!(
            parse_manifest_str(input),
            Err(ManifestError::InvalidSection { .. })
        ));
    }

    #[test]
    fn rejects_non_mapping_root() {
        assert!(matches!(
            parse_manifest_str("- a\n- b\n"),
            Err(ManifestError::NotAMapping)
        ));
    }

    #[test]
    fn empty_document_is_empty_manifest() {
        let doc = parse_manifest_str("").unwrap();
        assert!(doc.sections().is_empty());
    }

    #[test]
    fn add_entry_uses_home_section() {
        let mut doc = parse_manifest_str("general:\n  conda: [python]\n").unwrap();
        assert!(doc.add_entry(ManagerType::Brew, "jq").unwrap());
        assert!(doc.add_entry(ManagerType::Rust, "ripgrep").unwrap());
        assert!(doc.add_entry(ManagerType::Custom, "fisher").unwrap());

        let (section, entry) = doc.find_entry("jq").unwrap();
        assert_eq!(section.name, "mac");
        assert_eq!(entry.declared(), ManagerType::Brew);
        assert_eq!(doc.find_entry("ripgrep").unwrap().0.name, "general");
        assert_eq!(doc.find_entry("fisher").unwrap().0.name, CUSTOM_KEY);
    }

    #[test]
    fn add_entry_reuses_alias_section() {
        let mut doc = parse_manifest_str("darwin:\n  brew: [git]\n").unwrap();
        doc.add_entry(ManagerType::Cask, "raycast").unwrap();
        assert_eq!(doc.find_entry("raycast").unwrap().0.name, "darwin");
        assert!(doc.sections().iter().all(|s| s.name != "mac"));
    }

    #[test]
    fn add_entry_is_noop_when_declared() {
        let mut doc = parse_manifest_str("mac:\n  brew: ['tmux:conda']\n").unwrap();
        assert!(!doc.add_entry(ManagerType::Conda, "tmux").unwrap());
        assert!(!doc.add_entry(ManagerType::Brew, "tmux").unwrap());
    }

    #[test]
    fn remove_entry_handles_fallback_and_structured_forms() {
        let input = "general:\n  conda:\n    - 'tmux:brew'\n    - name: gcc\n      platform: linux\n    - python\n";
        let mut doc = parse_manifest_str(input).unwrap();

        assert_eq!(doc.remove_entry("tmux", None).unwrap().as_deref(), Some("general"));
        assert_eq!(doc.remove_entry("gcc", Some(ManagerType::Conda)).unwrap().as_deref(), Some("general"));
        assert_eq!(doc.remove_entry("gcc", None).unwrap(), None);

        let names: Vec<_> = doc.entries_for(Platform::Linux).iter().map(|(_, e)| e.name.clone()).collect();
        assert_eq!(names, vec!["python".to_owned()]);
    }

    #[test]
    fn remove_entry_respects_manager_filter() {
        let mut doc = parse_manifest_str("general:\n  conda: [jq]\n  rust: [jq]\n").unwrap();
        doc.remove_entry("jq", Some(ManagerType::Rust)).unwrap();
        let (_, entry) = doc.find_entry("jq").unwrap();
        assert_eq!(entry.declared(), ManagerType::Conda);
    }

    #[test]
    fn from_installed_uses_structured_form_for_colons() {
        let doc = ManifestDocument::from_installed(&[
            (ManagerType::Winget, vec!["Vendor:App".to_owned()]),
            (ManagerType::Custom, vec!["fisher".to_owned()]),
        ]);
        let reparsed = parse_manifest_str(&doc.to_yaml_string().unwrap()).unwrap();
        let (section, entry) = reparsed.find_entry("Vendor:App").unwrap();
        assert_eq!(section.name, "general");
        assert_eq!(entry.chain(), vec![ManagerType::Winget]);
        assert_eq!(reparsed.find_entry("fisher").unwrap().1.declared(), ManagerType::Custom);
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packages.yaml");
        let doc = parse_manifest_str(SAMPLE).unwrap();
        doc.write_to_file(&path).unwrap();
        let loaded = parse_manifest_file(&path).unwrap();
        assert_eq!(loaded, doc);
    }
}

//! Definitions for `custom` packages: shell snippets to check, install and
//! remove things no package manager ships.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// The specification document compiled into the binary.
pub const BUNDLED_SPECS: &str = include_str!("../data/specs.yaml");

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read custom package specs: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse custom package specs: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("custom package '{0}' has an empty install script")]
    MissingInstall(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomPackageSpec {
    pub name: String,
    pub description: Option<String>,
    pub shell: Option<String>,
    pub check: Option<String>,
    pub install: String,
    pub remove: Option<String>,
    pub depends: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Script(String),
    Full {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        shell: Option<String>,
        #[serde(default)]
        check: Option<String>,
        #[serde(default)]
        install: String,
        #[serde(default)]
        remove: Option<String>,
        #[serde(default)]
        depends: Vec<String>,
    },
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl CustomPackageSpec {
    fn from_raw(name: String, raw: RawSpec) -> Result<Self, SpecError> {
        let spec = match raw {
            RawSpec::Script(install) => Self {
                name,
                description: None,
                shell: None,
                check: None,
                install,
                remove: None,
                depends: Vec::new(),
            },
            RawSpec::Full {
                description,
                shell,
                check,
                install,
                remove,
                depends,
            } => Self {
                name,
                description: non_blank(description),
                shell: non_blank(shell),
                check: non_blank(check),
                install,
                remove: non_blank(remove),
                depends,
            },
        };
        if spec.install.trim().is_empty() {
            return Err(SpecError::MissingInstall(spec.name));
        }
        Ok(spec)
    }
}

/// Dependencies of one package in install order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DependencyOrder<'a> {
    pub order: Vec<&'a CustomPackageSpec>,
    /// Names referenced by `depends` with no spec of their own.
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomSpecs {
    specs: BTreeMap<String, CustomPackageSpec>,
}

impl CustomSpecs {
    pub fn parse_str(input: &str) -> Result<Self, SpecError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: BTreeMap<String, RawSpec> = serde_yaml::from_str(input)?;
        let specs = raw
            .into_iter()
            .map(|(name, raw)| Ok((name.clone(), CustomPackageSpec::from_raw(name, raw)?)))
            .collect::<Result<_, SpecError>>()?;
        Ok(Self { specs })
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        Self::parse_str(&fs::read_to_string(path)?)
    }

    pub fn bundled() -> Result<Self, SpecError> {
        Self::parse_str(BUNDLED_SPECS)
    }

    /// Load from `path` when given, otherwise the bundled document.
    pub fn load(path: Option<&Path>) -> Result<Self, SpecError> {
        match path {
            Some(p) => Self::read_from_file(p),
            None => Self::bundled(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CustomPackageSpec> {
        self.specs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomPackageSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Transitive dependencies of `name`, deepest first, excluding `name`.
    ///
    /// Each package appears once; a cycle back to an already visited package
    /// is cut rather than followed.
    pub fn dependency_order(&self, name: &str) -> DependencyOrder<'_> {
        let mut out = DependencyOrder::default();
        let mut visited = BTreeSet::new();
        visited.insert(name.to_owned());
        if let Some(spec) = self.specs.get(name) {
            self.visit_deps(spec, &mut visited, &mut out);
        }
        out
    }

    fn visit_deps<'a>(
        &'a self,
        spec: &'a CustomPackageSpec,
        visited: &mut BTreeSet<String>,
        out: &mut DependencyOrder<'a>,
    ) {
        for dep in &spec.depends {
            if !visited.insert(dep.clone()) {
                continue;
            }
            match self.specs.get(dep) {
                Some(dep_spec) => {
                    self.visit_deps(dep_spec, visited, out);
                    out.order.push(dep_spec);
                }
                None => out.unknown.push(dep.clone()),
            }
        }
    }
}

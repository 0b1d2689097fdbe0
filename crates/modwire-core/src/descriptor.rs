//! Module descriptors and the requirement/capability clauses they declare.
//!
//! Descriptors arrive already parsed from the collaborator that owns the
//! manifest format. They are immutable once added to a module graph; all
//! resolution state lives beside them, keyed by [`ModuleId`].

use std::collections::HashSet;
use std::fmt;

use modwire_util::errors::{ModwireError, ModwireResult};
use serde::{Deserialize, Serialize};

use crate::attribute::{
    AttrValue, Attributes, BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE,
    VERSION_TYPED_ATTRIBUTES,
};
use crate::version::{Version, VersionRange};

/// Collaborator-assigned, process-unique module identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ModuleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An exported package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportClause {
    pub package: String,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub attributes: Attributes,
    /// Packages the implementation of this package depends on.
    #[serde(default)]
    pub uses: Vec<String>,
    /// Attribute names an importer must explicitly request.
    #[serde(default)]
    pub mandatory: Vec<String>,
    /// Part of a split package; may coexist with other parts of the same name.
    #[serde(default)]
    pub split: bool,
}

impl ExportClause {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: Version::ZERO,
            attributes: Attributes::new(),
            uses: Vec::new(),
            mandatory: Vec::new(),
            split: false,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn uses<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uses.extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn mandatory<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mandatory.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }
}

impl fmt::Display for ExportClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; version={}", self.package, self.version)?;
        for (key, value) in &self.attributes {
            write!(f, "; {key}={value}")?;
        }
        if !self.uses.is_empty() {
            write!(f, "; uses:=\"{}\"", self.uses.join(","))?;
        }
        if !self.mandatory.is_empty() {
            write!(f, "; mandatory:=\"{}\"", self.mandatory.join(","))?;
        }
        Ok(())
    }
}

/// An imported package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportClause {
    pub package: String,
    #[serde(default)]
    pub version_range: VersionRange,
    #[serde(default)]
    pub attributes: Attributes,
    /// Only exports from a module with this symbolic name qualify.
    #[serde(default)]
    pub bundle_symbolic_name: Option<String>,
    /// Only exports from a module whose version is in this range qualify.
    #[serde(default)]
    pub bundle_version: Option<VersionRange>,
    #[serde(default)]
    pub optional: bool,
}

impl ImportClause {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version_range: VersionRange::any(),
            attributes: Attributes::new(),
            bundle_symbolic_name: None,
            bundle_version: None,
            optional: false,
        }
    }

    pub fn version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn from_bundle(mut self, symbolic_name: impl Into<String>) -> Self {
        self.bundle_symbolic_name = Some(symbolic_name.into());
        self
    }

    pub fn bundle_version(mut self, range: VersionRange) -> Self {
        self.bundle_version = Some(range);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the importer explicitly requests the named attribute.
    pub fn specifies(&self, name: &str) -> bool {
        match name {
            BUNDLE_SYMBOLIC_NAME_ATTRIBUTE => {
                self.bundle_symbolic_name.is_some() || self.attributes.contains_key(name)
            }
            BUNDLE_VERSION_ATTRIBUTE => {
                self.bundle_version.is_some() || self.attributes.contains_key(name)
            }
            _ => self.attributes.contains_key(name),
        }
    }
}

impl fmt::Display for ImportClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; version=\"{}\"", self.package, self.version_range)?;
        if let Some(ref name) = self.bundle_symbolic_name {
            write!(f, "; {BUNDLE_SYMBOLIC_NAME_ATTRIBUTE}={name}")?;
        }
        if self.optional {
            f.write_str("; resolution:=optional")?;
        }
        Ok(())
    }
}

/// How a required module's packages propagate to this module's requirers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Reexport,
}

/// A requirement on a whole module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireClause {
    pub symbolic_name: String,
    #[serde(default)]
    pub version_range: VersionRange,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub optional: bool,
}

impl RequireClause {
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            version_range: VersionRange::any(),
            visibility: Visibility::Private,
            optional: false,
        }
    }

    pub fn version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }

    pub fn reexport(mut self) -> Self {
        self.visibility = Visibility::Reexport;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl fmt::Display for RequireClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; bundle-version=\"{}\"", self.symbolic_name, self.version_range)?;
        if self.visibility == Visibility::Reexport {
            f.write_str("; visibility:=reexport")?;
        }
        if self.optional {
            f.write_str("; resolution:=optional")?;
        }
        Ok(())
    }
}

/// The host a fragment attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentHost {
    pub symbolic_name: String,
    #[serde(default)]
    pub version_range: VersionRange,
}

impl FragmentHost {
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            version_range: VersionRange::any(),
        }
    }

    pub fn version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }
}

impl fmt::Display for FragmentHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; bundle-version=\"{}\"", self.symbolic_name, self.version_range)
    }
}

/// A fully parsed module descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    pub symbolic_name: String,
    pub version: Version,
    #[serde(default = "default_manifest_version")]
    pub manifest_version: u32,
    #[serde(default)]
    pub exports: Vec<ExportClause>,
    #[serde(default)]
    pub imports: Vec<ImportClause>,
    #[serde(default)]
    pub requires: Vec<RequireClause>,
    #[serde(default)]
    pub fragment_host: Option<FragmentHost>,
}

fn default_manifest_version() -> u32 {
    2
}

impl ModuleDescriptor {
    pub fn new(id: u64, symbolic_name: impl Into<String>, version: Version) -> Self {
        Self {
            id: ModuleId(id),
            symbolic_name: symbolic_name.into(),
            version,
            manifest_version: default_manifest_version(),
            exports: Vec::new(),
            imports: Vec::new(),
            requires: Vec::new(),
            fragment_host: None,
        }
    }

    pub fn manifest_version(mut self, manifest_version: u32) -> Self {
        self.manifest_version = manifest_version;
        self
    }

    pub fn export(mut self, clause: ExportClause) -> Self {
        self.exports.push(clause);
        self
    }

    pub fn import(mut self, clause: ImportClause) -> Self {
        self.imports.push(clause);
        self
    }

    pub fn require(mut self, clause: RequireClause) -> Self {
        self.requires.push(clause);
        self
    }

    pub fn fragment_of(mut self, host: FragmentHost) -> Self {
        self.fragment_host = Some(host);
        self
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment_host.is_some()
    }

    /// Whether this module declares an export of `package`.
    pub fn exports_package(&self, package: &str) -> bool {
        self.exports.iter().any(|e| e.package == package)
    }

    /// Whether this module declares an import of `package`.
    pub fn imports_package(&self, package: &str) -> bool {
        self.imports.iter().any(|i| i.package == package)
    }

    /// Check the descriptor for structural errors before it enters a graph.
    pub fn validate(&self) -> ModwireResult<()> {
        if self.symbolic_name.trim().is_empty() {
            return Err(self.invalid("symbolic name is empty"));
        }

        let mut exported: HashSet<&str> = HashSet::new();
        for export in &self.exports {
            if export.package.trim().is_empty() {
                return Err(self.invalid("export clause has an empty package name"));
            }
            check_version_typed(self, &export.package, &export.attributes)?;
            for name in &export.mandatory {
                let satisfiable = name == BUNDLE_SYMBOLIC_NAME_ATTRIBUTE
                    || name == BUNDLE_VERSION_ATTRIBUTE
                    || export.attributes.contains_key(name);
                if !satisfiable {
                    return Err(self.invalid(format!(
                        "export '{}' marks '{name}' mandatory but does not declare it",
                        export.package
                    )));
                }
            }
            if !exported.insert(&export.package) {
                let all_split = self
                    .exports
                    .iter()
                    .filter(|e| e.package == export.package)
                    .all(|e| e.split);
                if !all_split {
                    return Err(self.invalid(format!(
                        "package '{}' is exported more than once",
                        export.package
                    )));
                }
            }
        }

        let mut imported: HashSet<&str> = HashSet::new();
        for import in &self.imports {
            if import.package.trim().is_empty() {
                return Err(self.invalid("import clause has an empty package name"));
            }
            check_version_typed(self, &import.package, &import.attributes)?;
            if !imported.insert(&import.package) {
                return Err(self.invalid(format!(
                    "package '{}' is imported more than once",
                    import.package
                )));
            }
        }

        for require in &self.requires {
            if require.symbolic_name.trim().is_empty() {
                return Err(self.invalid("require clause has an empty symbolic name"));
            }
        }

        if let Some(ref host) = self.fragment_host {
            if host.symbolic_name.trim().is_empty() {
                return Err(self.invalid("fragment host has an empty symbolic name"));
            }
            if host.symbolic_name == self.symbolic_name
                && host.version_range.is_included(Some(&self.version))
            {
                return Err(self.invalid("fragment names itself as its host"));
            }
        }

        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> ModwireError {
        ModwireError::Descriptor {
            module: format!("{} {}", self.symbolic_name, self.version),
            message: message.into(),
        }
    }
}

fn check_version_typed(
    descriptor: &ModuleDescriptor,
    package: &str,
    attributes: &Attributes,
) -> ModwireResult<()> {
    for key in VERSION_TYPED_ATTRIBUTES {
        if let Some(value) = attributes.get(key) {
            if !value.is_version_like() {
                return Err(descriptor.invalid(format!(
                    "attribute '{key}' on package '{package}' must be a version, got '{value}'"
                )));
            }
        }
    }
    Ok(())
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.symbolic_name, self.version, self.id)
    }
}

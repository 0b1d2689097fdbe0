//! Per-module resolution state, kept beside the immutable descriptors.

use std::fmt;

use modwire_core::descriptor::{ModuleId, Visibility};

/// The `index`-th export clause declared by `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExportRef {
    pub module: ModuleId,
    pub index: usize,
}

/// The `index`-th import clause declared by `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportRef {
    pub module: ModuleId,
    pub index: usize,
}

/// The `index`-th require-module clause declared by `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequireRef {
    pub module: ModuleId,
    pub index: usize,
}

impl fmt::Display for ExportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/export[{}]", self.module, self.index)
    }
}

impl fmt::Display for ImportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/import[{}]", self.module, self.index)
    }
}

impl fmt::Display for RequireRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/require[{}]", self.module, self.index)
    }
}

/// An export together with the module that offers it at runtime. For
/// fragment-declared exports the exporter is the fragment's host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Supplier {
    pub export: ExportRef,
    pub exporter: ModuleId,
}

/// A resolved package import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageWire {
    pub import: ImportRef,
    pub package: String,
    pub supplier: ExportRef,
    pub exporter: ModuleId,
}

impl PackageWire {
    pub fn supplier(&self) -> Supplier {
        Supplier {
            export: self.supplier,
            exporter: self.exporter,
        }
    }
}

/// A resolved require-module clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleWire {
    pub require: RequireRef,
    pub supplier: ModuleId,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStatus {
    #[default]
    Unresolved,
    Resolving,
    Resolved,
}

/// A requirement a module (or fragment) declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirement {
    Import(ImportRef),
    Require(RequireRef),
    /// The fragment-host requirement of the given fragment.
    Host(ModuleId),
}

impl Requirement {
    /// The module that declared this requirement.
    pub fn declarer(&self) -> ModuleId {
        match self {
            Requirement::Import(r) => r.module,
            Requirement::Require(r) => r.module,
            Requirement::Host(id) => *id,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Import(r) => write!(f, "{r}"),
            Requirement::Require(r) => write!(f, "{r}"),
            Requirement::Host(id) => write!(f, "{id}/fragment-host"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsatisfiedReason {
    /// No available module offers a matching capability.
    NoCandidate,
    /// Every candidate combination violates a uses constraint on `package`.
    UsesConflict { package: String },
    /// The fragment's host, or the module declaring the requirement's host,
    /// did not resolve.
    HostUnresolved,
    /// The wiring of the module's cycle did not settle.
    Unstable,
}

/// A requirement that could not be satisfied, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedConstraint {
    pub requirement: Requirement,
    pub reason: UnsatisfiedReason,
}

impl fmt::Display for UnsatisfiedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            UnsatisfiedReason::NoCandidate => write!(f, "{}: no candidate", self.requirement),
            UnsatisfiedReason::UsesConflict { package } => {
                write!(f, "{}: uses conflict on '{package}'", self.requirement)
            }
            UnsatisfiedReason::HostUnresolved => {
                write!(f, "{}: host did not resolve", self.requirement)
            }
            UnsatisfiedReason::Unstable => write!(f, "{}: wiring did not settle", self.requirement),
        }
    }
}

/// Mutable resolution record of one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    pub status: ResolutionStatus,
    /// Declared exports (plus fragment exports for hosts) minus substituted ones.
    pub selected_exports: Vec<ExportRef>,
    /// Declared exports suppressed in favour of an imported supplier.
    pub substituted_exports: Vec<ExportRef>,
    /// Import wires, including those declared by attached fragments.
    pub package_wires: Vec<PackageWire>,
    /// Require-module wires, including those declared by attached fragments.
    pub module_wires: Vec<ModuleWire>,
    /// Set on resolved fragments.
    pub host: Option<ModuleId>,
    /// Attached fragments in attach order.
    pub fragments: Vec<ModuleId>,
    pub unsatisfied: Vec<UnsatisfiedConstraint>,
}

impl ModuleState {
    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }

    /// Drop all wiring and return to `Unresolved`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

//! Module wiring engine: matches package imports and module requirements
//! against exports, attaches fragments, enforces uses constraints, and
//! reports resolution changes incrementally.

pub mod candidates;
pub mod conflict;
pub mod delta;
pub mod graph;
pub mod query;
pub mod resolver;
pub mod shared;
pub mod state;
pub mod uses;
pub mod wiring;

pub use conflict::{ConflictReport, UsesConflict};
pub use delta::{Delta, DeltaKind};
pub use graph::ModuleGraph;
pub use shared::SharedModuleGraph;
pub use state::{
    ExportRef, ImportRef, ModuleWire, PackageWire, RequireRef, Requirement, ResolutionStatus,
    Supplier, UnsatisfiedConstraint, UnsatisfiedReason,
};

//! Uses-constraint conflict reporting.

use std::fmt;

use modwire_core::descriptor::ModuleId;

use crate::state::Supplier;

/// A report of the uses conflicts that left modules unresolved in the
/// last resolve pass.
#[derive(Debug, Default, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<UsesConflict>,
}

/// Two non-equivalent suppliers of one package reachable from `module`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsesConflict {
    pub module: ModuleId,
    pub package: String,
    pub first: Supplier,
    pub second: Supplier,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: UsesConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn for_module(&self, module: ModuleId) -> impl Iterator<Item = &UsesConflict> {
        self.conflicts.iter().filter(move |c| c.module == module)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No uses conflicts.");
        }
        writeln!(f, "Uses conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for UsesConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sees '{}' from both {} ({}) and {} ({})",
            self.module,
            self.package,
            self.first.exporter,
            self.first.export,
            self.second.exporter,
            self.second.export
        )
    }
}

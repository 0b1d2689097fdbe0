//! Change sets reported by resolve passes.

use std::fmt;

use modwire_core::descriptor::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    /// The module became resolved (or was re-resolved after a trigger).
    Resolved,
    /// A previously resolved module is no longer resolved.
    Unresolved,
    /// The module was removed from the graph.
    Removed,
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeltaKind::Resolved => "RESOLVED",
            DeltaKind::Unresolved => "UNRESOLVED",
            DeltaKind::Removed => "REMOVED",
        };
        f.write_str(s)
    }
}

/// Ordered list of status changes, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub changes: Vec<(ModuleId, DeltaKind)>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, module: ModuleId, kind: DeltaKind) {
        self.changes.push((module, kind));
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ModuleId, DeltaKind)> {
        self.changes.iter()
    }

    /// Modules that changed with the given kind, in order.
    pub fn modules(&self, kind: DeltaKind) -> Vec<ModuleId> {
        self.changes
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn kind_of(&self, module: ModuleId) -> Option<DeltaKind> {
        self.changes
            .iter()
            .rev()
            .find(|(id, _)| *id == module)
            .map(|(_, k)| *k)
    }

    /// Move all records of `other` to the end of this delta.
    pub fn append(&mut self, other: &mut Delta) {
        self.changes.append(&mut other.changes);
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            return write!(f, "No changes.");
        }
        writeln!(f, "Changes ({}):", self.changes.len())?;
        for (id, kind) in &self.changes {
            writeln!(f, "  {id} {kind}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_delta() {
        let delta = Delta::new();
        assert!(delta.is_empty());
        assert_eq!(delta.to_string(), "No changes.");
    }

    #[test]
    fn preserves_discovery_order() {
        let mut delta = Delta::new();
        delta.push(ModuleId(5), DeltaKind::Resolved);
        delta.push(ModuleId(1), DeltaKind::Resolved);
        delta.push(ModuleId(3), DeltaKind::Unresolved);
        assert_eq!(delta.modules(DeltaKind::Resolved), [ModuleId(5), ModuleId(1)]);
        assert_eq!(delta.kind_of(ModuleId(3)), Some(DeltaKind::Unresolved));
        assert_eq!(delta.kind_of(ModuleId(9)), None);
        assert!(delta.to_string().contains("#5 RESOLVED"));
    }

    #[test]
    fn append_moves_records() {
        let mut a = Delta::new();
        a.push(ModuleId(1), DeltaKind::Removed);
        let mut b = Delta::new();
        b.push(ModuleId(2), DeltaKind::Resolved);
        a.append(&mut b);
        assert_eq!(a.len(), 2);
        assert!(b.is_empty());
    }
}

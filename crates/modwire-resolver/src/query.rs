//! Read-only queries over resolution state.

use std::collections::HashSet;

use modwire_core::descriptor::{ExportClause, ImportClause, ModuleDescriptor, ModuleId};

use crate::conflict::ConflictReport;
use crate::graph::ModuleGraph;
use crate::state::{
    ExportRef, ImportRef, ModuleState, PackageWire, ResolutionStatus, Supplier,
    UnsatisfiedConstraint,
};
use crate::uses::required_visible;

impl ModuleGraph {
    pub fn module(&self, id: ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(&id)
    }

    /// All registered modules in ID order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    pub fn status(&self, id: ModuleId) -> Option<ResolutionStatus> {
        self.states.get(&id).map(|s| s.status)
    }

    pub fn is_resolved(&self, id: ModuleId) -> bool {
        self.states.get(&id).is_some_and(ModuleState::is_resolved)
    }

    pub fn declared_exports(&self, id: ModuleId) -> Vec<ExportRef> {
        self.modules
            .get(&id)
            .map(|m| {
                (0..m.exports.len())
                    .map(|index| ExportRef { module: id, index })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Exports the module offers, including those of attached fragments.
    /// Empty unless the module is resolved.
    pub fn selected_exports(&self, id: ModuleId) -> &[ExportRef] {
        self.states
            .get(&id)
            .map(|s| s.selected_exports.as_slice())
            .unwrap_or(&[])
    }

    /// Declared exports suppressed because the package is imported from
    /// another module.
    pub fn substituted_exports(&self, id: ModuleId) -> &[ExportRef] {
        self.states
            .get(&id)
            .map(|s| s.substituted_exports.as_slice())
            .unwrap_or(&[])
    }

    /// Package wires of a resolved module, including those declared by its
    /// attached fragments.
    pub fn package_wires_of(&self, id: ModuleId) -> &[PackageWire] {
        self.states
            .get(&id)
            .map(|s| s.package_wires.as_slice())
            .unwrap_or(&[])
    }

    /// Exports visible to a resolved module: what it imports from other
    /// modules, followed by what its required modules expose. Empty for
    /// fragments, whose view is their host's.
    pub fn visible_packages(&self, id: ModuleId) -> Vec<Supplier> {
        let Some(state) = self.states.get(&id).filter(|s| s.is_resolved()) else {
            return Vec::new();
        };
        if state.host.is_some() {
            return Vec::new();
        }

        let mut visible: Vec<Supplier> = Vec::new();
        for wire in &state.package_wires {
            let supplier = wire.supplier();
            if supplier.exporter != id && !visible.contains(&supplier) {
                visible.push(supplier);
            }
        }
        let mut visited = HashSet::from([id]);
        for wire in &state.module_wires {
            required_visible(self, wire.supplier, &mut visited, &mut visible);
        }
        visible.retain(|s| s.exporter != id);
        visible
    }

    /// Requirements that could not be satisfied in the last pass that
    /// included this module.
    pub fn unsatisfied_constraints(&self, id: ModuleId) -> &[UnsatisfiedConstraint] {
        self.states
            .get(&id)
            .map(|s| s.unsatisfied.as_slice())
            .unwrap_or(&[])
    }

    pub fn export(&self, export: ExportRef) -> Option<&ExportClause> {
        self.modules.get(&export.module)?.exports.get(export.index)
    }

    pub fn import(&self, import: ImportRef) -> Option<&ImportClause> {
        self.modules.get(&import.module)?.imports.get(import.index)
    }

    /// The export an import is wired to, if any.
    pub fn supplier(&self, import: ImportRef) -> Option<ExportRef> {
        let owner = self.wiring_owner(import.module)?;
        self.states
            .get(&owner)?
            .package_wires
            .iter()
            .find(|w| w.import == import)
            .map(|w| w.supplier)
    }

    /// Modules wired to the module's require clauses. For a host this
    /// includes the modules its fragments require.
    pub fn required_modules(&self, id: ModuleId) -> Vec<ModuleId> {
        let Some(owner) = self.wiring_owner(id) else {
            return Vec::new();
        };
        let Some(state) = self.states.get(&owner) else {
            return Vec::new();
        };
        let mut required = Vec::new();
        for wire in &state.module_wires {
            if (owner == id || wire.require.module == id) && !required.contains(&wire.supplier) {
                required.push(wire.supplier);
            }
        }
        required
    }

    pub fn host_of(&self, id: ModuleId) -> Option<ModuleId> {
        self.states.get(&id).and_then(|s| s.host)
    }

    pub fn fragments_of(&self, id: ModuleId) -> &[ModuleId] {
        self.states
            .get(&id)
            .map(|s| s.fragments.as_slice())
            .unwrap_or(&[])
    }

    /// Modules directly wired to `id`, in ID order.
    pub fn dependents_of(&self, id: ModuleId) -> Vec<ModuleId> {
        let mut dependents: Vec<ModuleId> = self
            .wiring_graph()
            .dependents_of(id)
            .into_iter()
            .map(|(dependent, _)| dependent)
            .collect();
        dependents.dedup();
        dependents
    }

    /// Uses conflicts that left modules unresolved in the last pass.
    pub fn conflicts(&self) -> &ConflictReport {
        &self.conflicts
    }

    /// Render the wiring below `id` as a tree.
    pub fn wiring_tree(&self, id: ModuleId, max_depth: Option<usize>) -> String {
        self.wiring_graph().print_tree(id, max_depth)
    }

    /// The resolved module holding the wiring of `id`: its host for a
    /// resolved fragment, otherwise the module itself.
    fn wiring_owner(&self, id: ModuleId) -> Option<ModuleId> {
        let state = self.states.get(&id).filter(|s| s.is_resolved())?;
        Some(state.host.unwrap_or(id))
    }
}

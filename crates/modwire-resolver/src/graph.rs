//! The module graph: registered descriptors, their resolution state, and
//! the resolve passes that move modules between states.

use std::collections::{BTreeMap, BTreeSet};

use modwire_core::config::ResolverConfig;
use modwire_core::descriptor::{ModuleDescriptor, ModuleId};
use modwire_util::errors::{ModwireError, ModwireResult};

use crate::conflict::ConflictReport;
use crate::delta::{Delta, DeltaKind};
use crate::resolver::{Outcome, Solver};
use crate::state::{
    ExportRef, ModuleState, ModuleWire, PackageWire, ResolutionStatus, UnsatisfiedConstraint,
};
use crate::uses::WiringView;
use crate::wiring::{DependencyGraph, ModuleNode, WireKind};

/// Arena of module descriptors keyed by [`ModuleId`], with the mutable
/// resolution record of each module kept beside it.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    pub(crate) modules: BTreeMap<ModuleId, ModuleDescriptor>,
    pub(crate) states: BTreeMap<ModuleId, ModuleState>,
    config: ResolverConfig,
    /// Records produced by removals, reported by the next resolve.
    pending: Delta,
    pub(crate) conflicts: ConflictReport,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.modules.contains_key(&id)
    }

    /// Register a descriptor. It starts out unresolved.
    pub fn add_module(&mut self, descriptor: ModuleDescriptor) -> ModwireResult<ModuleId> {
        descriptor.validate()?;
        let id = descriptor.id;
        if let Some(existing) = self.modules.get(&id) {
            return Err(ModwireError::DuplicateModule {
                id: existing.id.0,
                name: existing.symbolic_name.clone(),
                version: existing.version.to_string(),
            });
        }

        tracing::debug!(
            "Added module {} {} ({id})",
            descriptor.symbolic_name,
            descriptor.version
        );
        self.modules.insert(id, descriptor);
        self.states.insert(id, ModuleState::default());
        Ok(id)
    }

    /// Remove a module. Every module transitively wired to it is unwired
    /// and marked unresolved; the records are reported by the next resolve.
    pub fn remove_module(&mut self, id: ModuleId) -> ModwireResult<ModuleDescriptor> {
        if !self.modules.contains_key(&id) {
            return Err(ModwireError::UnknownModule { id: id.0 });
        }
        let dependents = self.wiring_graph().transitive_dependents(&[id]);
        let Some(descriptor) = self.modules.remove(&id) else {
            return Err(ModwireError::UnknownModule { id: id.0 });
        };
        self.states.remove(&id);
        self.pending.push(id, DeltaKind::Removed);

        let mut unresolved = 0;
        for dependent in dependents {
            let Some(state) = self.states.get_mut(&dependent) else {
                continue;
            };
            if state.is_resolved() {
                state.reset();
                self.pending.push(dependent, DeltaKind::Unresolved);
                unresolved += 1;
            }
        }
        tracing::info!(
            "Removed {} {} ({id}); {unresolved} dependent module(s) unresolved",
            descriptor.symbolic_name,
            descriptor.version
        );
        Ok(descriptor)
    }

    /// Resolve every unresolved module. Resolved modules keep their wiring.
    pub fn resolve(&mut self) -> Delta {
        self.run_pass(BTreeSet::new())
    }

    /// Re-resolve `triggers` and every module transitively wired to them,
    /// together with all unresolved modules.
    pub fn resolve_triggered(&mut self, triggers: &[ModuleId]) -> ModwireResult<Delta> {
        if let Some(unknown) = triggers.iter().find(|id| !self.modules.contains_key(id)) {
            return Err(ModwireError::UnknownModule { id: unknown.0 });
        }
        let mut closure: BTreeSet<ModuleId> = triggers.iter().copied().collect();
        closure.extend(self.wiring_graph().transitive_dependents(triggers));
        Ok(self.run_pass(closure))
    }

    fn run_pass(&mut self, closure: BTreeSet<ModuleId>) -> Delta {
        let span = tracing::info_span!("resolve", triggered = closure.len());
        let _enter = span.enter();

        let mut previously_resolved = BTreeSet::new();
        for id in &closure {
            if let Some(state) = self.states.get_mut(id) {
                if state.is_resolved() {
                    previously_resolved.insert(*id);
                }
                state.reset();
            }
        }

        let mut set = BTreeSet::new();
        for (id, state) in self.states.iter_mut() {
            if !state.is_resolved() {
                state.reset();
                state.status = ResolutionStatus::Resolving;
                set.insert(*id);
            }
        }
        if set.is_empty() && self.pending.is_empty() {
            return Delta::new();
        }

        let outcome = Solver::new(&self.modules, &self.states, &self.config, set.clone()).run();
        self.apply(outcome, &set, &previously_resolved)
    }

    fn apply(
        &mut self,
        outcome: Outcome,
        set: &BTreeSet<ModuleId>,
        previously_resolved: &BTreeSet<ModuleId>,
    ) -> Delta {
        let mut delta = Delta::new();
        delta.append(&mut self.pending);

        let mut fragment_unsatisfied: BTreeMap<ModuleId, Vec<UnsatisfiedConstraint>> =
            BTreeMap::new();
        for (unit, wiring) in outcome.wired {
            let Some(state) = self.states.get_mut(&unit) else {
                continue;
            };
            let (own, contributed): (Vec<_>, Vec<_>) = wiring
                .unsatisfied
                .into_iter()
                .partition(|c| c.requirement.declarer() == unit);
            for constraint in contributed {
                fragment_unsatisfied
                    .entry(constraint.requirement.declarer())
                    .or_default()
                    .push(constraint);
            }

            if set.contains(&unit) {
                *state = ModuleState {
                    status: ResolutionStatus::Resolved,
                    selected_exports: wiring.selected_exports,
                    substituted_exports: wiring.substituted_exports,
                    package_wires: wiring.package_wires,
                    module_wires: wiring.module_wires,
                    host: None,
                    fragments: wiring.fragments,
                    unsatisfied: own,
                };
            } else {
                // A resolved host gaining fragments keeps its own wiring
                state.selected_exports = wiring.selected_exports;
                state.substituted_exports.extend(wiring.substituted_exports);
                state.package_wires.extend(wiring.package_wires);
                state.module_wires.extend(wiring.module_wires);
                state.fragments.extend(wiring.fragments);
            }
        }

        for (fragment, host) in outcome.attached {
            if let Some(state) = self.states.get_mut(&fragment) {
                *state = ModuleState {
                    status: ResolutionStatus::Resolved,
                    host: Some(host),
                    unsatisfied: fragment_unsatisfied.remove(&fragment).unwrap_or_default(),
                    ..ModuleState::default()
                };
            }
        }

        for (id, reasons) in outcome.eliminated {
            if let Some(state) = self.states.get_mut(&id) {
                state.reset();
                state.unsatisfied = reasons;
            }
        }
        for id in set {
            if let Some(state) = self.states.get_mut(id) {
                if state.status == ResolutionStatus::Resolving {
                    state.status = ResolutionStatus::Unresolved;
                }
            }
        }
        self.conflicts = outcome.conflicts;

        let mut resolved = 0;
        for id in &outcome.order {
            if self.states.get(id).is_some_and(ModuleState::is_resolved) {
                delta.push(*id, DeltaKind::Resolved);
                resolved += 1;
            } else if previously_resolved.contains(id) {
                delta.push(*id, DeltaKind::Unresolved);
            }
        }
        tracing::info!(
            "Resolve pass over {} module(s): {resolved} resolved, {} unresolved, {} conflict(s)",
            set.len(),
            set.len() - resolved,
            self.conflicts.len()
        );
        delta
    }

    /// Wiring edges between modules: importer to exporter, requirer to
    /// required module, and both directions between fragments and hosts.
    pub(crate) fn wiring_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for module in self.modules.values() {
            graph.add_node(ModuleNode {
                id: module.id,
                symbolic_name: module.symbolic_name.clone(),
                version: module.version.clone(),
            });
        }
        for (id, state) in &self.states {
            if !state.is_resolved() {
                continue;
            }
            for wire in &state.package_wires {
                graph.add_edge(*id, wire.exporter, WireKind::Package(wire.package.clone()));
            }
            for wire in &state.module_wires {
                graph.add_edge(*id, wire.supplier, WireKind::Module);
            }
            if let Some(host) = state.host {
                graph.add_edge(*id, host, WireKind::Host);
                graph.add_edge(host, *id, WireKind::Fragment);
            }
        }
        graph
    }

    fn resolved_state(&self, id: ModuleId) -> Option<&ModuleState> {
        self.states.get(&id).filter(|s| s.is_resolved())
    }
}

impl WiringView for ModuleGraph {
    fn descriptor(&self, id: ModuleId) -> Option<&ModuleDescriptor> {
        self.modules.get(&id)
    }

    fn selected_exports(&self, id: ModuleId) -> Vec<ExportRef> {
        self.resolved_state(id)
            .map(|s| s.selected_exports.clone())
            .unwrap_or_default()
    }

    fn substituted_exports(&self, id: ModuleId) -> Vec<ExportRef> {
        self.resolved_state(id)
            .map(|s| s.substituted_exports.clone())
            .unwrap_or_default()
    }

    fn package_wires(&self, id: ModuleId) -> Vec<PackageWire> {
        self.resolved_state(id)
            .map(|s| s.package_wires.clone())
            .unwrap_or_default()
    }

    fn module_wires(&self, id: ModuleId) -> Vec<ModuleWire> {
        self.resolved_state(id)
            .map(|s| s.module_wires.clone())
            .unwrap_or_default()
    }
}

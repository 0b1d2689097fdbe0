//! One resolution pass over a resolution set.
//!
//! The pass attaches fragments to hosts, groups the resulting units into
//! strongly connected components of the candidate graph and resolves the
//! components suppliers first. Inside a component every member is wired
//! against the current tentative wiring of the others, repeatedly, until a
//! full sweep changes nothing. Each member's wiring is found by depth-first
//! search over its candidate lists with an explicit cursor stack.
//!
//! The solver only reads the module graph. It returns an [`Outcome`] that the
//! graph commits.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use modwire_core::config::ResolverConfig;
use modwire_core::descriptor::{ExportClause, ModuleDescriptor, ModuleId};

use crate::candidates::{
    defer_self_supply, export_matches, host_matches, module_matches, sort_module_candidates,
    sort_package_candidates,
};
use crate::conflict::{ConflictReport, UsesConflict};
use crate::state::{
    ExportRef, ImportRef, ModuleState, ModuleWire, PackageWire, RequireRef, Requirement, Supplier,
    UnsatisfiedConstraint, UnsatisfiedReason,
};
use crate::uses::{find_conflict, WiringView};
use crate::wiring::{DependencyGraph, ModuleNode, WireKind};

/// One candidate for a requirement slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Package(Supplier),
    Module(ModuleId),
    /// Leave an optional requirement unwired.
    Unwired,
}

#[derive(Debug)]
struct Slot {
    requirement: Requirement,
    optional: bool,
    candidates: Vec<Choice>,
    /// A matching export exists but is currently substituted by its owner.
    withheld: bool,
}

impl Slot {
    fn has_candidates(&self) -> bool {
        self.candidates.iter().any(|c| *c != Choice::Unwired)
    }
}

/// Wiring chosen for a unit in the current pass, not yet committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tentative {
    package_wires: Vec<PackageWire>,
    module_wires: Vec<ModuleWire>,
    unsatisfied: Vec<UnsatisfiedConstraint>,
}

/// Why a unit could not be wired. A hard failure cannot be cured by other
/// members of the component changing their wiring.
#[derive(Debug)]
struct Failure {
    constraints: Vec<UnsatisfiedConstraint>,
    conflict: Option<UsesConflict>,
    hard: bool,
}

impl Failure {
    /// The first module other than `unit` whose requirement failed.
    fn failing_fragment(&self, unit: ModuleId) -> Option<ModuleId> {
        self.constraints
            .iter()
            .map(|c| c.requirement.declarer())
            .find(|declarer| *declarer != unit)
    }
}

fn no_candidate(requirement: Requirement) -> UnsatisfiedConstraint {
    UnsatisfiedConstraint {
        requirement,
        reason: UnsatisfiedReason::NoCandidate,
    }
}

/// Final wiring of one unit: a module from the resolution set, or an
/// already resolved host that gained fragments in this pass. For the latter
/// only the fragment contributions are listed, except `selected_exports`
/// which is the host's complete new list.
#[derive(Debug, Clone, Default)]
pub(crate) struct UnitWiring {
    pub selected_exports: Vec<ExportRef>,
    pub substituted_exports: Vec<ExportRef>,
    pub package_wires: Vec<PackageWire>,
    pub module_wires: Vec<ModuleWire>,
    pub fragments: Vec<ModuleId>,
    pub unsatisfied: Vec<UnsatisfiedConstraint>,
}

#[derive(Debug, Default)]
pub(crate) struct Outcome {
    /// Every module of the resolution set, in the order it was processed.
    pub order: Vec<ModuleId>,
    pub wired: BTreeMap<ModuleId, UnitWiring>,
    /// Resolved fragments and their hosts.
    pub attached: BTreeMap<ModuleId, ModuleId>,
    pub eliminated: BTreeMap<ModuleId, Vec<UnsatisfiedConstraint>>,
    pub conflicts: ConflictReport,
}

pub(crate) struct Solver<'g> {
    modules: &'g BTreeMap<ModuleId, ModuleDescriptor>,
    states: &'g BTreeMap<ModuleId, ModuleState>,
    config: &'g ResolverConfig,
    set: BTreeSet<ModuleId>,
    /// Every declared export, by package name.
    providers: HashMap<&'g str, Vec<ExportRef>>,
    eliminated: BTreeMap<ModuleId, Vec<UnsatisfiedConstraint>>,
    attached: BTreeMap<ModuleId, ModuleId>,
    fragments: BTreeMap<ModuleId, Vec<ModuleId>>,
    tentative: BTreeMap<ModuleId, Tentative>,
    order: Vec<ModuleId>,
    conflicts: ConflictReport,
}

impl<'g> Solver<'g> {
    pub fn new(
        modules: &'g BTreeMap<ModuleId, ModuleDescriptor>,
        states: &'g BTreeMap<ModuleId, ModuleState>,
        config: &'g ResolverConfig,
        set: BTreeSet<ModuleId>,
    ) -> Self {
        let mut providers: HashMap<&'g str, Vec<ExportRef>> = HashMap::new();
        for (id, module) in modules {
            for (index, export) in module.exports.iter().enumerate() {
                providers
                    .entry(export.package.as_str())
                    .or_default()
                    .push(ExportRef { module: *id, index });
            }
        }
        Self {
            modules,
            states,
            config,
            set,
            providers,
            eliminated: BTreeMap::new(),
            attached: BTreeMap::new(),
            fragments: BTreeMap::new(),
            tentative: BTreeMap::new(),
            order: Vec::new(),
            conflicts: ConflictReport::new(),
        }
    }

    pub fn run(mut self) -> Outcome {
        self.attach_fragments();
        let units = self.units();
        let graph = self.candidate_graph(&units);
        for component in graph.components() {
            let members = self.order_members(component);
            for &unit in &members {
                self.record_order(unit);
            }
            self.stabilise(&members);
        }
        self.finish(&units)
    }

    // -- availability ------------------------------------------------------

    /// A module whose exports may be wired to: a non-fragment that is either
    /// already resolved or in the set and not yet eliminated.
    fn available(&self, id: ModuleId) -> bool {
        let Some(module) = self.modules.get(&id) else {
            return false;
        };
        if module.is_fragment() || self.eliminated.contains_key(&id) {
            return false;
        }
        self.set.contains(&id) || self.states.get(&id).is_some_and(ModuleState::is_resolved)
    }

    /// Committed state of a resolved module outside the set.
    fn committed(&self, id: ModuleId) -> Option<&'g ModuleState> {
        if self.set.contains(&id) {
            return None;
        }
        self.states.get(&id).filter(|s| s.is_resolved())
    }

    fn is_fixed(&self, id: ModuleId) -> bool {
        self.committed(id).is_some()
    }

    fn live_fragments(&self, host: ModuleId) -> Vec<ModuleId> {
        self.fragments
            .get(&host)
            .into_iter()
            .flatten()
            .copied()
            .filter(|f| !self.eliminated.contains_key(f))
            .collect()
    }

    /// Modules whose requirements are wired as part of `unit`.
    fn declarers(&self, unit: ModuleId) -> Vec<ModuleId> {
        let mut declarers = Vec::new();
        if self.set.contains(&unit) {
            declarers.push(unit);
        }
        declarers.extend(self.live_fragments(unit));
        declarers
    }

    /// The module that offers exports declared by `declarer` at runtime.
    fn owner(&self, declarer: ModuleId) -> Option<ModuleId> {
        let module = self.modules.get(&declarer)?;
        if !module.is_fragment() {
            return Some(declarer);
        }
        if self.set.contains(&declarer) {
            if self.eliminated.contains_key(&declarer) {
                return None;
            }
            return self.attached.get(&declarer).copied();
        }
        self.committed(declarer).and_then(|s| s.host)
    }

    fn export_clause(&self, export: ExportRef) -> Option<&'g ExportClause> {
        self.modules.get(&export.module)?.exports.get(export.index)
    }

    fn import_package(&self, import: ImportRef) -> Option<&'g str> {
        let module = self.modules.get(&import.module)?;
        module.imports.get(import.index).map(|i| i.package.as_str())
    }

    fn unit_imports(&self, unit: ModuleId, package: &str) -> bool {
        self.declarers(unit)
            .iter()
            .filter_map(|d| self.modules.get(d))
            .any(|m| m.imports_package(package))
    }

    // -- exports -----------------------------------------------------------

    fn declared(&self, id: ModuleId) -> Vec<ExportRef> {
        self.modules
            .get(&id)
            .map(|m| {
                (0..m.exports.len())
                    .map(|index| ExportRef { module: id, index })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Exports `unit` offers before substitution: its own (committed
    /// selection for resolved hosts) followed by those of attached fragments.
    fn base_exports(&self, unit: ModuleId) -> Vec<ExportRef> {
        let mut exports = match self.committed(unit) {
            Some(state) => state.selected_exports.clone(),
            None => self.declared(unit),
        };
        for fragment in self.live_fragments(unit) {
            exports.extend(self.declared(fragment));
        }
        exports
    }

    /// Split the base exports of `unit` into selected and substituted, given
    /// the unit's package wires.
    fn exports_of(
        &self,
        unit: ModuleId,
        wires: &[PackageWire],
    ) -> (Vec<ExportRef>, Vec<ExportRef>) {
        let mut selected: Vec<ExportRef> = Vec::new();
        let mut substituted = Vec::new();
        for export in self.base_exports(unit) {
            let Some(clause) = self.export_clause(export) else {
                continue;
            };
            let imported_elsewhere = self.set.contains(&export.module)
                && wires
                    .iter()
                    .any(|w| w.package == clause.package && w.exporter != unit);
            if imported_elsewhere {
                substituted.push(export);
                continue;
            }
            let duplicate = selected.iter().any(|s| {
                self.export_clause(*s)
                    .is_some_and(|c| c.package == clause.package && !(c.split && clause.split))
            });
            if !duplicate {
                selected.push(export);
            }
        }
        (selected, substituted)
    }

    fn package_wires_with(
        &self,
        unit: ModuleId,
        tentative: Option<&Tentative>,
    ) -> Vec<PackageWire> {
        let mut wires = self
            .committed(unit)
            .map(|s| s.package_wires.clone())
            .unwrap_or_default();
        if let Some(t) = tentative {
            wires.extend(t.package_wires.iter().cloned());
        }
        wires
    }

    fn module_wires_with(&self, unit: ModuleId, tentative: Option<&Tentative>) -> Vec<ModuleWire> {
        let mut wires = self
            .committed(unit)
            .map(|s| s.module_wires.clone())
            .unwrap_or_default();
        if let Some(t) = tentative {
            wires.extend(t.module_wires.iter().cloned());
        }
        wires
    }

    /// Exports `unit` currently offers to other modules.
    fn offered(&self, unit: ModuleId) -> Vec<ExportRef> {
        let wires = self.package_wires_with(unit, self.tentative.get(&unit));
        self.exports_of(unit, &wires).0
    }

    // -- fragments and units -----------------------------------------------

    fn attach_fragments(&mut self) {
        let modules = self.modules;
        let pending: Vec<ModuleId> = self
            .set
            .iter()
            .copied()
            .filter(|id| modules.get(id).is_some_and(ModuleDescriptor::is_fragment))
            .collect();

        for fragment in pending {
            let Some(host) = modules.get(&fragment).and_then(|m| m.fragment_host.as_ref()) else {
                continue;
            };
            let mut hosts: Vec<&ModuleDescriptor> = modules
                .values()
                .filter(|m| self.available(m.id) && host_matches(host, m))
                .collect();
            sort_module_candidates(&mut hosts);
            match hosts.first() {
                Some(chosen) => {
                    tracing::debug!("Attaching fragment {fragment} to {}", chosen.id);
                    self.attached.insert(fragment, chosen.id);
                    self.fragments.entry(chosen.id).or_default().push(fragment);
                }
                None => {
                    tracing::debug!("Fragment {fragment} has no host");
                    self.order.push(fragment);
                    self.eliminate(fragment, vec![no_candidate(Requirement::Host(fragment))]);
                }
            }
        }
    }

    fn units(&self) -> Vec<ModuleId> {
        let mut units: BTreeSet<ModuleId> = self
            .set
            .iter()
            .copied()
            .filter(|id| self.available(*id))
            .collect();
        units.extend(
            self.fragments
                .keys()
                .copied()
                .filter(|host| !self.live_fragments(*host).is_empty()),
        );
        units.into_iter().collect()
    }

    fn record_order(&mut self, unit: ModuleId) {
        if self.set.contains(&unit) {
            self.order.push(unit);
        }
        if let Some(fragments) = self.fragments.get(&unit) {
            self.order.extend(fragments.iter().copied());
        }
    }

    /// Edges from each unit to every unit appearing in its candidate lists.
    fn candidate_graph(&self, units: &[ModuleId]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for &unit in units {
            if let Some(module) = self.modules.get(&unit) {
                graph.add_node(ModuleNode {
                    id: unit,
                    symbolic_name: module.symbolic_name.clone(),
                    version: module.version.clone(),
                });
            }
        }
        for &unit in units {
            for slot in self.build_slots(unit) {
                for choice in slot.candidates {
                    let supplier = match choice {
                        Choice::Package(s) => s.exporter,
                        Choice::Module(m) => m,
                        Choice::Unwired => continue,
                    };
                    graph.add_edge(unit, supplier, WireKind::Candidate);
                }
            }
        }
        graph
    }

    /// Order component members by how many of their requirements have
    /// candidates still being resolved, then by ID.
    fn order_members(&self, component: Vec<ModuleId>) -> Vec<ModuleId> {
        let mut keyed: Vec<(usize, ModuleId)> = component
            .into_iter()
            .map(|unit| {
                let open = self
                    .build_slots(unit)
                    .iter()
                    .filter(|slot| {
                        slot.candidates.iter().any(|c| match c {
                            Choice::Package(s) => {
                                s.exporter != unit && self.set.contains(&s.exporter)
                            }
                            Choice::Module(m) => self.set.contains(m),
                            Choice::Unwired => false,
                        })
                    })
                    .count();
                (open, unit)
            })
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, unit)| unit).collect()
    }

    // -- candidate lists ---------------------------------------------------

    /// Requirement slots of `unit`: require-module clauses of the unit then
    /// of its fragments, followed by imports in the same order.
    fn build_slots(&self, unit: ModuleId) -> Vec<Slot> {
        let declarers = self.declarers(unit);
        let own = self.base_exports(unit);
        let mut offered: HashMap<ModuleId, Vec<ExportRef>> = HashMap::new();
        let mut slots = Vec::new();

        for &declarer in &declarers {
            let Some(module) = self.modules.get(&declarer) else {
                continue;
            };
            for (index, require) in module.requires.iter().enumerate() {
                let mut found: Vec<&ModuleDescriptor> = self
                    .modules
                    .values()
                    .filter(|m| m.id != unit && self.available(m.id) && module_matches(require, m))
                    .collect();
                sort_module_candidates(&mut found);
                let mut candidates: Vec<Choice> =
                    found.into_iter().map(|m| Choice::Module(m.id)).collect();
                if require.optional {
                    candidates.push(Choice::Unwired);
                }
                slots.push(Slot {
                    requirement: Requirement::Require(RequireRef {
                        module: declarer,
                        index,
                    }),
                    optional: require.optional,
                    candidates,
                    withheld: false,
                });
            }
        }

        for &declarer in &declarers {
            let Some(module) = self.modules.get(&declarer) else {
                continue;
            };
            for (index, import) in module.imports.iter().enumerate() {
                let mut found: Vec<(Supplier, &ExportClause)> = Vec::new();
                let mut withheld = false;
                for &export in self
                    .providers
                    .get(import.package.as_str())
                    .into_iter()
                    .flatten()
                {
                    let Some(exporter) = self.owner(export.module) else {
                        continue;
                    };
                    if !self.available(exporter) {
                        continue;
                    }
                    let (Some(clause), Some(exporter_module)) =
                        (self.export_clause(export), self.modules.get(&exporter))
                    else {
                        continue;
                    };
                    if !export_matches(import, clause, exporter_module) {
                        continue;
                    }
                    let is_offered = if exporter == unit {
                        own.contains(&export)
                    } else {
                        offered
                            .entry(exporter)
                            .or_insert_with(|| self.offered(exporter))
                            .contains(&export)
                    };
                    if is_offered {
                        found.push((Supplier { export, exporter }, clause));
                    } else {
                        withheld = true;
                    }
                }
                sort_package_candidates(&mut found);

                let mut suppliers: Vec<Supplier> = found.into_iter().map(|(s, _)| s).collect();
                defer_self_supply(
                    &mut suppliers,
                    |s| s.exporter == unit,
                    |s| {
                        self.is_fixed(s.exporter)
                            || !self.unit_imports(s.exporter, &import.package)
                    },
                );
                let mut candidates: Vec<Choice> =
                    suppliers.into_iter().map(Choice::Package).collect();
                if import.optional {
                    candidates.push(Choice::Unwired);
                }
                slots.push(Slot {
                    requirement: Requirement::Import(ImportRef {
                        module: declarer,
                        index,
                    }),
                    optional: import.optional,
                    candidates,
                    withheld,
                });
            }
        }

        slots
    }

    // -- per-unit search ---------------------------------------------------

    /// Find a wiring for `unit` whose uses closure is consistent, trying
    /// candidates in order and backtracking most recent slot first.
    fn solve_unit(&self, unit: ModuleId) -> Result<Tentative, Failure> {
        let slots = self.build_slots(unit);
        let missing: Vec<&Slot> = slots
            .iter()
            .filter(|s| !s.optional && s.candidates.is_empty())
            .collect();
        if !missing.is_empty() {
            return Err(Failure {
                constraints: missing.iter().map(|s| no_candidate(s.requirement)).collect(),
                conflict: None,
                hard: missing.iter().any(|s| !s.withheld),
            });
        }
        if slots.is_empty() {
            return Ok(Tentative::default());
        }

        let mut cursor = vec![0usize; slots.len()];
        let mut level = 0;
        let mut first: Option<(usize, UsesConflict)> = None;
        let mut last_package: Option<String> = None;

        loop {
            let wiring = self.assemble(&slots, &cursor, level, last_package.as_deref());
            match self.check(unit, &wiring, &slots[level + 1..]) {
                None if level + 1 == slots.len() => return Ok(wiring),
                None => level += 1,
                Some(conflict) => {
                    tracing::debug!(
                        "{unit}: uses conflict on '{}' ({} vs {}), backtracking from {}",
                        conflict.package,
                        conflict.first.export,
                        conflict.second.export,
                        slots[level].requirement
                    );
                    last_package = Some(conflict.package.clone());
                    let (blamed, blamed_conflict) = first.get_or_insert((level, conflict)).clone();
                    if !advance(&mut cursor, &mut level, &slots) {
                        return Err(Failure {
                            constraints: vec![UnsatisfiedConstraint {
                                requirement: slots[blamed].requirement,
                                reason: UnsatisfiedReason::UsesConflict {
                                    package: blamed_conflict.package.clone(),
                                },
                            }],
                            conflict: Some(blamed_conflict),
                            hard: false,
                        });
                    }
                }
            }
        }
    }

    /// Build the wiring for the first `upto + 1` slots at the cursor.
    fn assemble(
        &self,
        slots: &[Slot],
        cursor: &[usize],
        upto: usize,
        last_package: Option<&str>,
    ) -> Tentative {
        let mut wiring = Tentative::default();
        for (slot, &pick) in slots.iter().zip(cursor).take(upto + 1) {
            match (slot.requirement, slot.candidates[pick]) {
                (Requirement::Import(import), Choice::Package(supplier)) => {
                    let package = self.import_package(import).unwrap_or_default().to_string();
                    wiring.package_wires.push(PackageWire {
                        import,
                        package,
                        supplier: supplier.export,
                        exporter: supplier.exporter,
                    });
                }
                (Requirement::Require(require), Choice::Module(supplier)) => {
                    let visibility = self
                        .modules
                        .get(&require.module)
                        .and_then(|m| m.requires.get(require.index))
                        .map(|r| r.visibility)
                        .unwrap_or_default();
                    wiring.module_wires.push(ModuleWire {
                        require,
                        supplier,
                        visibility,
                    });
                }
                (requirement, _) => {
                    let reason = if slot.has_candidates() {
                        UnsatisfiedReason::UsesConflict {
                            package: last_package
                                .map(str::to_string)
                                .unwrap_or_else(|| self.requirement_label(requirement)),
                        }
                    } else {
                        UnsatisfiedReason::NoCandidate
                    };
                    wiring.unsatisfied.push(UnsatisfiedConstraint { requirement, reason });
                }
            }
        }
        wiring
    }

    fn requirement_label(&self, requirement: Requirement) -> String {
        match requirement {
            Requirement::Import(import) => {
                self.import_package(import).unwrap_or_default().to_string()
            }
            Requirement::Require(require) => self
                .modules
                .get(&require.module)
                .and_then(|m| m.requires.get(require.index))
                .map(|r| r.symbolic_name.clone())
                .unwrap_or_default(),
            Requirement::Host(id) => id.to_string(),
        }
    }

    /// Uses-check `unit` with `wiring`. Own exports of packages still to be
    /// imported by `rest` are left out of the package space.
    fn check(&self, unit: ModuleId, wiring: &Tentative, rest: &[Slot]) -> Option<UsesConflict> {
        let pending: Vec<&str> = rest
            .iter()
            .filter_map(|s| match s.requirement {
                Requirement::Import(import) => self.import_package(import),
                _ => None,
            })
            .collect();
        let view = SolverView {
            solver: self,
            unit,
            wiring,
            pending: &pending,
        };
        find_conflict(&view, unit)
    }

    /// Solve `unit`, detaching fragments whose own requirements fail.
    fn solve_with_fragments(&mut self, unit: ModuleId) -> Result<Tentative, Failure> {
        loop {
            let failure = match self.solve_unit(unit) {
                Err(failure) => failure,
                ok => return ok,
            };
            let Some(fragment) = failure.failing_fragment(unit) else {
                return Err(failure);
            };
            let reasons: Vec<UnsatisfiedConstraint> = failure
                .constraints
                .into_iter()
                .filter(|c| c.requirement.declarer() == fragment)
                .collect();
            tracing::debug!(
                "Detaching fragment {fragment} from {unit}: {} unsatisfied requirement(s)",
                reasons.len()
            );
            if let Some(conflict) = failure.conflict {
                self.conflicts.add(conflict);
            }
            self.eliminate(fragment, reasons);
        }
    }

    // -- components --------------------------------------------------------

    fn stabilise(&mut self, members: &[ModuleId]) {
        for pass in 1..=self.config.max_passes {
            let eliminated_before = self.eliminated.len();
            let mut changed = false;
            let mut soft: Vec<(ModuleId, Failure)> = Vec::new();

            for &unit in members {
                if self.eliminated.contains_key(&unit) {
                    continue;
                }
                match self.solve_with_fragments(unit) {
                    Ok(wiring) => {
                        if self.tentative.get(&unit) != Some(&wiring) {
                            self.tentative.insert(unit, wiring);
                            changed = true;
                        }
                    }
                    Err(failure) if failure.hard => {
                        tracing::debug!(
                            "{unit} cannot resolve: {} requirement(s) without candidates",
                            failure.constraints.len()
                        );
                        self.eliminate(unit, failure.constraints);
                    }
                    Err(failure) => {
                        if self.tentative.remove(&unit).is_some() {
                            changed = true;
                        }
                        soft.push((unit, failure));
                    }
                }
            }

            changed |= self.eliminated.len() != eliminated_before;
            if changed {
                continue;
            }
            let Some((unit, failure)) = soft.into_iter().next() else {
                tracing::debug!("Component {members:?} settled after {pass} pass(es)");
                return;
            };
            tracing::debug!(
                "{unit} cannot resolve after component settled: {} unsatisfied requirement(s)",
                failure.constraints.len()
            );
            if let Some(conflict) = failure.conflict {
                self.conflicts.add(conflict);
            }
            self.eliminate(unit, failure.constraints);
        }

        tracing::warn!(
            "Wiring of {members:?} did not settle within {} passes; leaving it unresolved",
            self.config.max_passes
        );
        // Reasons are taken before anything is withdrawn, while every member
        // still appears in the others' candidate lists.
        let mut withdrawn: Vec<(ModuleId, Vec<UnsatisfiedConstraint>)> = Vec::new();
        for &unit in members {
            if self.eliminated.contains_key(&unit) {
                continue;
            }
            if self.set.contains(&unit) {
                let reasons = self
                    .build_slots(unit)
                    .iter()
                    .filter(|slot| {
                        slot.candidates.iter().any(|c| match c {
                            Choice::Package(s) => {
                                s.exporter != unit && members.contains(&s.exporter)
                            }
                            Choice::Module(m) => members.contains(m),
                            Choice::Unwired => false,
                        })
                    })
                    .map(|slot| unstable(slot.requirement))
                    .collect();
                withdrawn.push((unit, reasons));
            } else {
                for fragment in self.live_fragments(unit) {
                    withdrawn.push((fragment, vec![unstable(Requirement::Host(fragment))]));
                }
            }
        }
        for (id, reasons) in withdrawn {
            self.eliminate(id, reasons);
        }
    }

    /// Withdraw `id` from this pass, together with its attached fragments.
    fn eliminate(&mut self, id: ModuleId, reasons: Vec<UnsatisfiedConstraint>) {
        self.tentative.remove(&id);
        self.eliminated.insert(id, reasons);

        if let Some(host) = self.attached.get(&id).copied() {
            if let Some(wiring) = self.tentative.get_mut(&host) {
                wiring.package_wires.retain(|w| w.import.module != id);
                wiring.module_wires.retain(|w| w.require.module != id);
                wiring.unsatisfied.retain(|c| c.requirement.declarer() != id);
            }
        }

        for fragment in self.live_fragments(id) {
            self.eliminated.insert(
                fragment,
                vec![UnsatisfiedConstraint {
                    requirement: Requirement::Host(fragment),
                    reason: UnsatisfiedReason::HostUnresolved,
                }],
            );
        }
    }

    fn finish(self, units: &[ModuleId]) -> Outcome {
        let mut wired = BTreeMap::new();
        for &unit in units {
            if self.eliminated.contains_key(&unit) {
                continue;
            }
            let tentative = self.tentative.get(&unit).cloned().unwrap_or_default();
            let wires = self.package_wires_with(unit, Some(&tentative));
            let (selected, substituted) = self.exports_of(unit, &wires);
            for export in &substituted {
                tracing::debug!("{unit}: export {export} substituted");
            }
            wired.insert(
                unit,
                UnitWiring {
                    selected_exports: selected,
                    substituted_exports: substituted,
                    package_wires: tentative.package_wires,
                    module_wires: tentative.module_wires,
                    fragments: self.live_fragments(unit),
                    unsatisfied: tentative.unsatisfied,
                },
            );
        }

        let attached = self
            .attached
            .iter()
            .filter(|(fragment, _)| !self.eliminated.contains_key(fragment))
            .map(|(fragment, host)| (*fragment, *host))
            .collect();

        Outcome {
            order: self.order,
            wired,
            attached,
            eliminated: self.eliminated,
            conflicts: self.conflicts,
        }
    }
}

fn unstable(requirement: Requirement) -> UnsatisfiedConstraint {
    UnsatisfiedConstraint {
        requirement,
        reason: UnsatisfiedReason::Unstable,
    }
}

/// Move the cursor to the next combination, popping exhausted slots.
/// Returns false when every combination has been tried.
fn advance(cursor: &mut [usize], level: &mut usize, slots: &[Slot]) -> bool {
    loop {
        cursor[*level] += 1;
        if cursor[*level] < slots[*level].candidates.len() {
            return true;
        }
        cursor[*level] = 0;
        if *level == 0 {
            return false;
        }
        *level -= 1;
    }
}

/// Wiring as seen during the pass: `unit` with a candidate assignment,
/// other units with their current tentative wiring, resolved modules with
/// their committed wiring.
struct SolverView<'s, 'g> {
    solver: &'s Solver<'g>,
    unit: ModuleId,
    wiring: &'s Tentative,
    pending: &'s [&'s str],
}

impl SolverView<'_, '_> {
    fn tentative(&self, id: ModuleId) -> Option<&Tentative> {
        if id == self.unit {
            Some(self.wiring)
        } else {
            self.solver.tentative.get(&id)
        }
    }

    fn exports(&self, id: ModuleId) -> (Vec<ExportRef>, Vec<ExportRef>) {
        if !self.solver.available(id) {
            return (Vec::new(), Vec::new());
        }
        let wires = self.solver.package_wires_with(id, self.tentative(id));
        let (mut selected, substituted) = self.solver.exports_of(id, &wires);
        if id == self.unit && !self.pending.is_empty() {
            selected.retain(|e| {
                self.solver
                    .export_clause(*e)
                    .is_some_and(|c| !self.pending.contains(&c.package.as_str()))
            });
        }
        (selected, substituted)
    }
}

impl WiringView for SolverView<'_, '_> {
    fn descriptor(&self, id: ModuleId) -> Option<&ModuleDescriptor> {
        self.solver.modules.get(&id)
    }

    fn selected_exports(&self, id: ModuleId) -> Vec<ExportRef> {
        self.exports(id).0
    }

    fn substituted_exports(&self, id: ModuleId) -> Vec<ExportRef> {
        self.exports(id).1
    }

    fn package_wires(&self, id: ModuleId) -> Vec<PackageWire> {
        if !self.solver.available(id) {
            return Vec::new();
        }
        self.solver.package_wires_with(id, self.tentative(id))
    }

    fn module_wires(&self, id: ModuleId) -> Vec<ModuleWire> {
        if !self.solver.available(id) {
            return Vec::new();
        }
        self.solver.module_wires_with(id, self.tentative(id))
    }
}

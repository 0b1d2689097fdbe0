//! Package spaces and uses-constraint consistency checking.
//!
//! The package space of a module is everything it can see by package name:
//! its own selected exports, its import wires (which take precedence), and
//! the exports visible through its require-module wires. The uses closure
//! follows the `uses` directive of every supplier in that space through
//! the exporter's own package space, transitively.

use std::collections::{BTreeMap, HashMap, HashSet};

use modwire_core::descriptor::{ExportClause, ModuleDescriptor, ModuleId, Visibility};

use crate::conflict::UsesConflict;
use crate::state::{ExportRef, ModuleWire, PackageWire, Supplier};

/// Read access to wiring, either committed or tentative.
pub trait WiringView {
    fn descriptor(&self, id: ModuleId) -> Option<&ModuleDescriptor>;

    /// Exports the module offers: declared plus fragment exports, minus substituted.
    fn selected_exports(&self, id: ModuleId) -> Vec<ExportRef>;

    fn substituted_exports(&self, id: ModuleId) -> Vec<ExportRef>;

    fn package_wires(&self, id: ModuleId) -> Vec<PackageWire>;

    fn module_wires(&self, id: ModuleId) -> Vec<ModuleWire>;

    fn export_clause(&self, export: ExportRef) -> Option<&ExportClause> {
        self.descriptor(export.module)?.exports.get(export.index)
    }
}

/// Packages visible to one module, by name.
#[derive(Debug, Clone, Default)]
pub struct PackageSpace {
    pub packages: BTreeMap<String, Vec<Supplier>>,
}

impl PackageSpace {
    pub fn get(&self, package: &str) -> &[Supplier] {
        self.packages.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    fn add(&mut self, package: &str, supplier: Supplier) {
        let entry = self.packages.entry(package.to_string()).or_default();
        if !entry.contains(&supplier) {
            entry.push(supplier);
        }
    }
}

/// Exports visible through a require-module wire to `required`: its selected
/// exports, the suppliers of its substituted exports, and recursively the
/// modules it requires with reexport visibility.
pub fn required_visible<V: WiringView>(
    view: &V,
    required: ModuleId,
    visited: &mut HashSet<ModuleId>,
    out: &mut Vec<Supplier>,
) {
    if !visited.insert(required) {
        return;
    }
    for export in view.selected_exports(required) {
        push_unique(
            out,
            Supplier {
                export,
                exporter: required,
            },
        );
    }

    let wires = view.package_wires(required);
    for substituted in view.substituted_exports(required) {
        let Some(clause) = view.export_clause(substituted) else {
            continue;
        };
        for wire in wires.iter().filter(|w| w.package == clause.package) {
            push_unique(out, wire.supplier());
        }
    }

    for wire in view.module_wires(required) {
        if wire.visibility == Visibility::Reexport {
            required_visible(view, wire.supplier, visited, out);
        }
    }
}

fn push_unique(out: &mut Vec<Supplier>, supplier: Supplier) {
    if !out.contains(&supplier) {
        out.push(supplier);
    }
}

/// Compute the package space of `id`.
pub fn package_space<V: WiringView>(view: &V, id: ModuleId) -> PackageSpace {
    let mut space = PackageSpace::default();

    for export in view.selected_exports(id) {
        if let Some(clause) = view.export_clause(export) {
            space.add(
                &clause.package,
                Supplier {
                    export,
                    exporter: id,
                },
            );
        }
    }

    let wires = view.package_wires(id);
    for wire in &wires {
        space
            .packages
            .insert(wire.package.clone(), vec![wire.supplier()]);
    }

    let mut visible = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(id);
    for wire in view.module_wires(id) {
        required_visible(view, wire.supplier, &mut visited, &mut visible);
    }
    for supplier in visible {
        let Some(clause) = view.export_clause(supplier.export) else {
            continue;
        };
        // Imported packages shadow anything visible through required modules
        if wires.iter().any(|w| w.package == clause.package) {
            continue;
        }
        space.add(&clause.package, supplier);
    }

    space
}

/// Map a substituted export to the supplier its exporter actually wires
/// that package to, so substitutes of one another compare equal.
fn canonical<V: WiringView>(view: &V, supplier: Supplier) -> Supplier {
    if !view
        .substituted_exports(supplier.exporter)
        .contains(&supplier.export)
    {
        return supplier;
    }
    let Some(clause) = view.export_clause(supplier.export) else {
        return supplier;
    };
    view.package_wires(supplier.exporter)
        .into_iter()
        .find(|w| w.package == clause.package)
        .map(|w| w.supplier())
        .unwrap_or(supplier)
}

fn all_split<V: WiringView>(view: &V, suppliers: &[Supplier]) -> bool {
    suppliers
        .iter()
        .all(|s| view.export_clause(s.export).is_some_and(|c| c.split))
}

/// Find the first uses conflict reachable from `id`'s package space.
pub fn find_conflict<V: WiringView>(view: &V, id: ModuleId) -> Option<UsesConflict> {
    let root = package_space(view, id);

    let mut reached: BTreeMap<String, Vec<Supplier>> = BTreeMap::new();
    let mut stack: Vec<Supplier> = Vec::new();
    for (package, suppliers) in &root.packages {
        let mut canon: Vec<Supplier> = Vec::new();
        for supplier in suppliers {
            push_unique(&mut canon, canonical(view, *supplier));
        }
        if canon.len() > 1 && !all_split(view, &canon) {
            return Some(UsesConflict {
                module: id,
                package: package.clone(),
                first: canon[0],
                second: canon[1],
            });
        }
        stack.extend(canon.iter().copied());
        reached.insert(package.clone(), canon);
    }
    // Walk in package-name order
    stack.reverse();

    let mut spaces: HashMap<ModuleId, PackageSpace> = HashMap::new();
    spaces.insert(id, root);
    let mut visited: HashSet<ExportRef> = HashSet::new();

    while let Some(current) = stack.pop() {
        if !visited.insert(current.export) {
            continue;
        }
        let Some(clause) = view.export_clause(current.export) else {
            continue;
        };
        if clause.uses.is_empty() {
            continue;
        }
        let exporter_space = spaces
            .entry(current.exporter)
            .or_insert_with(|| package_space(view, current.exporter))
            .clone();

        for used in &clause.uses {
            for supplier in exporter_space.get(used) {
                let supplier = canonical(view, *supplier);
                let seen = reached.entry(used.clone()).or_default();
                if !seen.contains(&supplier) {
                    if let Some(first) = seen.first().copied() {
                        let mut combined = seen.clone();
                        combined.push(supplier);
                        if !all_split(view, &combined) {
                            return Some(UsesConflict {
                                module: id,
                                package: used.clone(),
                                first,
                                second: supplier,
                            });
                        }
                    }
                    seen.push(supplier);
                }
                stack.push(supplier);
            }
        }
    }

    None
}

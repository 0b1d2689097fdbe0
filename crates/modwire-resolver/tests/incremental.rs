use modwire_core::descriptor::{ExportClause, ImportClause, ModuleDescriptor, ModuleId};
use modwire_core::version::Version;
use modwire_resolver::{DeltaKind, ModuleGraph};
use modwire_util::errors::ModwireError;

/// Module `i` of a chain: exports `p{i}` and imports `p{i-1}`.
fn link(i: u64) -> ModuleDescriptor {
    let mut module = ModuleDescriptor::new(i, format!("m{i}"), Version::new(1, 0, 0))
        .export(ExportClause::new(format!("p{i}")));
    if i > 1 {
        module = module.import(ImportClause::new(format!("p{}", i - 1)));
    }
    module
}

fn chain(len: u64) -> ModuleGraph {
    let mut graph = ModuleGraph::new();
    for i in 1..=len {
        graph.add_module(link(i)).unwrap();
    }
    let delta = graph.resolve();
    assert_eq!(delta.len() as u64, len);
    graph
}

#[test]
fn removal_unresolves_transitive_dependents() {
    let mut graph = chain(4);

    let removed = graph.remove_module(ModuleId(2)).unwrap();
    assert_eq!(removed.symbolic_name, "m2");
    assert!(graph.is_resolved(ModuleId(1)));
    assert!(!graph.is_resolved(ModuleId(3)));
    assert!(!graph.is_resolved(ModuleId(4)));
    assert!(graph.package_wires_of(ModuleId(3)).is_empty());

    let delta = graph.resolve();
    assert_eq!(
        delta.changes,
        vec![
            (ModuleId(2), DeltaKind::Removed),
            (ModuleId(3), DeltaKind::Unresolved),
            (ModuleId(4), DeltaKind::Unresolved),
        ]
    );

    assert!(graph.resolve().is_empty());
}

#[test]
fn re_adding_a_removed_module_restores_resolution() {
    let mut graph = chain(4);
    graph.remove_module(ModuleId(2)).unwrap();
    graph.resolve();

    graph.add_module(link(2)).unwrap();
    let delta = graph.resolve();

    assert_eq!(
        delta.changes,
        vec![
            (ModuleId(2), DeltaKind::Resolved),
            (ModuleId(3), DeltaKind::Resolved),
            (ModuleId(4), DeltaKind::Resolved),
        ]
    );
}

#[test]
fn replacement_supplier_rewires_dependents() {
    let mut graph = ModuleGraph::new();
    graph
        .add_module(
            ModuleDescriptor::new(1, "a", Version::new(1, 0, 0)).export(ExportClause::new("p")),
        )
        .unwrap();
    graph
        .add_module(
            ModuleDescriptor::new(2, "b", Version::new(1, 0, 0)).import(ImportClause::new("p")),
        )
        .unwrap();
    graph.resolve();

    graph.remove_module(ModuleId(1)).unwrap();
    graph
        .add_module(
            ModuleDescriptor::new(3, "a", Version::new(2, 0, 0)).export(ExportClause::new("p")),
        )
        .unwrap();
    let delta = graph.resolve();

    assert_eq!(
        delta.changes,
        vec![
            (ModuleId(1), DeltaKind::Removed),
            (ModuleId(2), DeltaKind::Unresolved),
            (ModuleId(3), DeltaKind::Resolved),
            (ModuleId(2), DeltaKind::Resolved),
        ]
    );
    assert_eq!(delta.kind_of(ModuleId(2)), Some(DeltaKind::Resolved));
    assert_eq!(graph.package_wires_of(ModuleId(2))[0].exporter, ModuleId(3));
}

#[test]
fn trigger_re_resolves_dependents() {
    let mut graph = chain(6);

    let delta = graph.resolve_triggered(&[ModuleId(1)]).unwrap();
    assert_eq!(delta.modules(DeltaKind::Resolved).len(), 6);
    assert_eq!(delta.len(), 6);

    let delta = graph.resolve_triggered(&[ModuleId(6)]).unwrap();
    assert_eq!(delta.changes, vec![(ModuleId(6), DeltaKind::Resolved)]);

    for i in 1..=6 {
        assert!(graph.is_resolved(ModuleId(i)));
    }
}

#[test]
fn trigger_pass_also_resolves_pending_modules() {
    let mut graph = ModuleGraph::new();
    graph
        .add_module(
            ModuleDescriptor::new(1, "lib", Version::new(1, 0, 0)).export(ExportClause::new("p")),
        )
        .unwrap();
    graph
        .add_module(
            ModuleDescriptor::new(2, "app", Version::new(1, 0, 0)).import(ImportClause::new("p")),
        )
        .unwrap();
    graph.resolve();

    graph
        .add_module(
            ModuleDescriptor::new(3, "other", Version::new(1, 0, 0))
                .export(ExportClause::new("q")),
        )
        .unwrap();
    let delta = graph.resolve_triggered(&[ModuleId(2)]).unwrap();

    assert_eq!(delta.kind_of(ModuleId(2)), Some(DeltaKind::Resolved));
    assert_eq!(delta.kind_of(ModuleId(3)), Some(DeltaKind::Resolved));
    assert_eq!(delta.kind_of(ModuleId(1)), None);
}

#[test]
fn unknown_trigger_is_rejected() {
    let mut graph = chain(2);
    let err = graph.resolve_triggered(&[ModuleId(42)]).unwrap_err();
    assert!(matches!(err, ModwireError::UnknownModule { id: 42 }));
    assert!(graph.is_resolved(ModuleId(2)));
}

#[test]
fn removing_unknown_module_leaves_graph_unchanged() {
    let mut graph = chain(2);
    assert!(graph.remove_module(ModuleId(9)).is_err());
    assert_eq!(graph.len(), 2);
    assert!(graph.resolve().is_empty());
}

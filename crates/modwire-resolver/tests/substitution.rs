use modwire_core::descriptor::{
    ExportClause, ImportClause, ModuleDescriptor, ModuleId, RequireClause,
};
use modwire_core::version::Version;
use modwire_resolver::{ExportRef, ImportRef, ModuleGraph};

fn export(module: u64, index: usize) -> ExportRef {
    ExportRef {
        module: ModuleId(module),
        index,
    }
}

fn import(module: u64, index: usize) -> ImportRef {
    ImportRef {
        module: ModuleId(module),
        index,
    }
}

fn visible(graph: &ModuleGraph, id: u64) -> Vec<ExportRef> {
    graph
        .visible_packages(ModuleId(id))
        .iter()
        .map(|s| s.export)
        .collect()
}

/// A module that both exports and imports every package in `packages`.
fn peer(id: u64, name: &str, packages: &[&str]) -> ModuleDescriptor {
    let mut module = ModuleDescriptor::new(id, name, Version::new(1, 0, 0));
    for package in packages {
        module = module
            .export(ExportClause::new(*package))
            .import(ImportClause::new(*package));
    }
    module
}

#[test]
fn peers_substitute_to_lowest_id() {
    let mut graph = ModuleGraph::new();
    graph.add_module(peer(1, "a", &["x"])).unwrap();
    graph.add_module(peer(2, "b", &["x"])).unwrap();
    graph.add_module(peer(3, "c", &["x"])).unwrap();
    graph
        .add_module(
            ModuleDescriptor::new(4, "d", Version::new(1, 0, 0)).require(RequireClause::new("a")),
        )
        .unwrap();

    graph.resolve();

    for id in 1..=4 {
        assert!(graph.is_resolved(ModuleId(id)), "#{id} unresolved");
    }
    // a supplies itself, so nothing is visible to it
    assert!(visible(&graph, 1).is_empty());
    assert_eq!(graph.selected_exports(ModuleId(1)), [export(1, 0)]);
    assert!(graph.substituted_exports(ModuleId(1)).is_empty());

    for id in [2, 3] {
        assert_eq!(visible(&graph, id), vec![export(1, 0)]);
        assert!(graph.selected_exports(ModuleId(id)).is_empty());
        assert_eq!(graph.substituted_exports(ModuleId(id)), [export(id, 0)]);
        assert_eq!(graph.supplier(import(id, 0)), Some(export(1, 0)));
    }

    assert_eq!(visible(&graph, 4), graph.selected_exports(ModuleId(1)).to_vec());
}

#[test]
fn requirers_see_one_supplier_per_package() {
    let mut graph = ModuleGraph::new();
    graph.add_module(peer(1, "a", &["x", "y"])).unwrap();
    graph.add_module(peer(2, "b", &["x", "y"])).unwrap();
    graph.add_module(peer(3, "c", &["x", "y"])).unwrap();
    for (id, name) in [(4, "d"), (5, "e"), (6, "f")] {
        graph
            .add_module(
                ModuleDescriptor::new(id, name, Version::new(1, 0, 0))
                    .require(RequireClause::new("a"))
                    .require(RequireClause::new("b"))
                    .require(RequireClause::new("c")),
            )
            .unwrap();
    }

    let delta = graph.resolve();
    assert_eq!(delta.len(), 6);

    let a_exports = vec![export(1, 0), export(1, 1)];
    assert!(visible(&graph, 1).is_empty());
    assert_eq!(visible(&graph, 2), a_exports);
    assert_eq!(visible(&graph, 3), a_exports);
    for id in 4..=6 {
        assert!(graph.is_resolved(ModuleId(id)));
        assert_eq!(visible(&graph, id), a_exports);
    }
}

#[test]
fn resolved_exporter_preferred_over_self() {
    let mut graph = ModuleGraph::new();
    graph
        .add_module(
            ModuleDescriptor::new(1, "api", Version::new(1, 0, 0))
                .export(ExportClause::new("x").version(Version::new(1, 0, 0))),
        )
        .unwrap();
    graph.resolve();

    graph
        .add_module(
            ModuleDescriptor::new(2, "impl", Version::new(1, 0, 0))
                .export(ExportClause::new("x").version(Version::new(2, 0, 0)))
                .import(ImportClause::new("x")),
        )
        .unwrap();
    graph.resolve();

    assert_eq!(graph.supplier(import(2, 0)), Some(export(1, 0)));
    assert_eq!(graph.substituted_exports(ModuleId(2)), [export(2, 0)]);
    assert!(graph.selected_exports(ModuleId(2)).is_empty());
}

#[test]
fn plain_exporter_preferred_in_same_pass() {
    let mut graph = ModuleGraph::new();
    graph
        .add_module(
            ModuleDescriptor::new(1, "api", Version::new(1, 0, 0))
                .export(ExportClause::new("x").version(Version::new(1, 0, 0))),
        )
        .unwrap();
    graph
        .add_module(
            ModuleDescriptor::new(2, "impl", Version::new(1, 0, 0))
                .export(ExportClause::new("x").version(Version::new(2, 0, 0)))
                .import(ImportClause::new("x")),
        )
        .unwrap();
    graph
        .add_module(
            ModuleDescriptor::new(3, "client", Version::new(1, 0, 0))
                .import(ImportClause::new("x")),
        )
        .unwrap();

    graph.resolve();

    assert_eq!(graph.supplier(import(2, 0)), Some(export(1, 0)));
    // impl's own export is withdrawn, so client ends on the same supplier
    assert_eq!(graph.supplier(import(3, 0)), Some(export(1, 0)));
}

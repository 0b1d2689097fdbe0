use std::thread;

use modwire_core::descriptor::{ExportClause, ImportClause, ModuleDescriptor, ModuleId};
use modwire_core::version::Version;
use modwire_resolver::{ModuleGraph, SharedModuleGraph};

fn module(id: u64, name: &str) -> ModuleDescriptor {
    ModuleDescriptor::new(id, name, Version::new(1, 0, 0))
}

#[test]
fn concurrent_adds_then_resolve() {
    let shared = SharedModuleGraph::default();
    shared
        .add_module(module(1, "lib").export(ExportClause::new("p")))
        .unwrap();

    thread::scope(|s| {
        for i in 2..=9u64 {
            let shared = shared.clone();
            s.spawn(move || {
                shared
                    .add_module(module(i, &format!("app{i}")).import(ImportClause::new("p")))
                    .unwrap();
            });
        }
    });

    let delta = shared.resolve();
    assert_eq!(delta.len(), 9);
    for i in 1..=9 {
        assert!(shared.is_resolved(ModuleId(i)));
    }
}

#[test]
fn readers_run_alongside_resolve() {
    let shared = SharedModuleGraph::from(ModuleGraph::new());
    shared
        .add_module(module(1, "lib").export(ExportClause::new("p")))
        .unwrap();
    shared
        .add_module(module(2, "app").import(ImportClause::new("p")))
        .unwrap();

    thread::scope(|s| {
        let writer = shared.clone();
        s.spawn(move || {
            writer.resolve();
        });
        for _ in 0..4 {
            let reader = shared.clone();
            s.spawn(move || {
                // Either before or after the pass; never half wired
                reader.with_read(|graph| {
                    let resolved = graph.is_resolved(ModuleId(2));
                    assert_eq!(graph.package_wires_of(ModuleId(2)).len(), usize::from(resolved));
                });
            });
        }
    });

    let graph = shared.read();
    assert!(graph.is_resolved(ModuleId(2)));
    assert_eq!(graph.len(), 2);
}

#[test]
fn clones_share_one_graph() {
    let shared = SharedModuleGraph::default();
    let other = shared.clone();
    other.add_module(module(1, "lib")).unwrap();
    shared.resolve();
    assert!(other.is_resolved(ModuleId(1)));
    assert!(other.remove_module(ModuleId(1)).is_ok());
    assert!(shared.read().is_empty());
}

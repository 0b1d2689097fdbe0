//! Candidate-supplier matching and ordering.
//!
//! Matching is pure: it only looks at clauses and descriptors. Which
//! modules are available to match against is the solver's business.

use std::cmp::Reverse;

use modwire_core::attribute::{
    AttrValue, BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE,
    SPECIFICATION_VERSION_ATTRIBUTE, VERSION_ATTRIBUTE,
};
use modwire_core::descriptor::{
    ExportClause, FragmentHost, ImportClause, ModuleDescriptor, RequireClause,
};

use crate::state::Supplier;

/// Whether `export`, offered by `exporter`, satisfies `import`.
pub fn export_matches(
    import: &ImportClause,
    export: &ExportClause,
    exporter: &ModuleDescriptor,
) -> bool {
    if import.package != export.package {
        return false;
    }
    if !import.version_range.is_included(Some(&export.version)) {
        return false;
    }
    if let Some(ref name) = import.bundle_symbolic_name {
        if *name != exporter.symbolic_name {
            return false;
        }
    }
    if let Some(ref range) = import.bundle_version {
        if !range.is_included(Some(&exporter.version)) {
            return false;
        }
    }

    for (key, requested) in &import.attributes {
        let declared = match key.as_str() {
            VERSION_ATTRIBUTE | SPECIFICATION_VERSION_ATTRIBUTE => {
                AttrValue::Version(export.version.clone())
            }
            BUNDLE_SYMBOLIC_NAME_ATTRIBUTE => AttrValue::String(exporter.symbolic_name.clone()),
            BUNDLE_VERSION_ATTRIBUTE => AttrValue::Version(exporter.version.clone()),
            _ => match export.attributes.get(key) {
                Some(value) => value.clone(),
                None => return false,
            },
        };
        if !requested.is_satisfied_by(&declared) {
            return false;
        }
    }

    export.mandatory.iter().all(|name| import.specifies(name))
}

/// Whether `module` satisfies a require-module clause.
pub fn module_matches(require: &RequireClause, module: &ModuleDescriptor) -> bool {
    !module.is_fragment()
        && module.symbolic_name == require.symbolic_name
        && require.version_range.is_included(Some(&module.version))
}

/// Whether `module` can host a fragment declaring `host`.
pub fn host_matches(host: &FragmentHost, module: &ModuleDescriptor) -> bool {
    !module.is_fragment()
        && module.symbolic_name == host.symbolic_name
        && host.version_range.is_included(Some(&module.version))
}

/// Sort package candidates: descending export version, then ascending
/// exporter ID, then declaration order.
pub fn sort_package_candidates(candidates: &mut [(Supplier, &ExportClause)]) {
    candidates.sort_by(|(a, ea), (b, eb)| {
        (Reverse(&ea.version), a.exporter, a.export).cmp(&(
            Reverse(&eb.version),
            b.exporter,
            b.export,
        ))
    });
}

/// Sort module candidates: descending module version, then ascending ID.
pub fn sort_module_candidates(candidates: &mut [&ModuleDescriptor]) {
    candidates.sort_by(|a, b| (Reverse(&a.version), a.id).cmp(&(Reverse(&b.version), b.id)));
}

/// Move self-supplied candidates behind the last preferred external one,
/// keeping the relative order of everything else.
pub fn defer_self_supply<T: Copy>(
    candidates: &mut Vec<T>,
    is_self: impl Fn(&T) -> bool,
    is_preferred_external: impl Fn(&T) -> bool,
) {
    let Some(last_preferred) = candidates
        .iter()
        .rposition(|c| !is_self(c) && is_preferred_external(c))
    else {
        return;
    };
    if !candidates[..last_preferred].iter().any(&is_self) {
        return;
    }
    let (head, tail) = candidates.split_at(last_preferred + 1);
    let mut reordered: Vec<T> = head.iter().copied().filter(|c| !is_self(c)).collect();
    reordered.extend(head.iter().copied().filter(|c| is_self(c)));
    reordered.extend_from_slice(tail);
    *candidates = reordered;
}

#[cfg(test)]
mod tests {
    use super::*;
    use modwire_core::descriptor::ModuleId;
    use modwire_core::version::{Version, VersionRange};

    use crate::state::ExportRef;

    fn module(id: u64, name: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(id, name, Version::new(1, 0, 0))
    }

    #[test]
    fn package_name_and_version_range() {
        let exporter = module(1, "a");
        let export = ExportClause::new("x").version(Version::new(1, 5, 0));
        assert!(export_matches(&ImportClause::new("x"), &export, &exporter));
        assert!(!export_matches(&ImportClause::new("y"), &export, &exporter));
        let ranged =
            ImportClause::new("x").version_range(VersionRange::parse("[2.0,3.0)").unwrap());
        assert!(!export_matches(&ranged, &export, &exporter));
    }

    #[test]
    fn specification_version_attribute_uses_export_version() {
        let exporter = module(1, "a");
        let export = ExportClause::new("servlet").version(Version::new(2, 1, 0));
        let import = ImportClause::new("servlet").attribute(
            SPECIFICATION_VERSION_ATTRIBUTE,
            AttrValue::Version(Version::new(2, 1, 0)),
        );
        assert!(export_matches(&import, &export, &exporter));
        let newer = ImportClause::new("servlet").attribute(
            SPECIFICATION_VERSION_ATTRIBUTE,
            AttrValue::Version(Version::new(2, 2, 0)),
        );
        assert!(!export_matches(&newer, &export, &exporter));
    }

    #[test]
    fn arbitrary_attributes_must_match() {
        let exporter = module(1, "a");
        let export = ExportClause::new("x").attribute("vendor", "acme");
        assert!(export_matches(
            &ImportClause::new("x").attribute("vendor", "acme"),
            &export,
            &exporter
        ));
        assert!(!export_matches(
            &ImportClause::new("x").attribute("vendor", "other"),
            &export,
            &exporter
        ));
        assert!(!export_matches(
            &ImportClause::new("x").attribute("flavor", "mild"),
            &export,
            &exporter
        ));
    }

    #[test]
    fn mandatory_attributes_must_be_requested() {
        let exporter = module(1, "a");
        let export = ExportClause::new("x")
            .attribute("split", "part1")
            .mandatory(["split"]);
        assert!(!export_matches(&ImportClause::new("x"), &export, &exporter));
        assert!(export_matches(
            &ImportClause::new("x").attribute("split", "part1"),
            &export,
            &exporter
        ));
    }

    #[test]
    fn mandatory_bundle_name_satisfied_by_fixed_supplier() {
        let exporter = module(1, "a");
        let export = ExportClause::new("x").mandatory([BUNDLE_SYMBOLIC_NAME_ATTRIBUTE]);
        assert!(!export_matches(&ImportClause::new("x"), &export, &exporter));
        assert!(export_matches(&ImportClause::new("x").from_bundle("a"), &export, &exporter));
        assert!(!export_matches(&ImportClause::new("x").from_bundle("b"), &export, &exporter));
    }

    #[test]
    fn bundle_version_filter() {
        let exporter = module(1, "a");
        let export = ExportClause::new("x");
        let import = ImportClause::new("x").bundle_version(VersionRange::parse("[2.0,)").unwrap());
        assert!(!export_matches(&import, &export, &exporter));
    }

    #[test]
    fn module_and_host_matching_skip_fragments() {
        let host = module(1, "a");
        let fragment = module(2, "a").fragment_of(FragmentHost::new("b"));
        let require = RequireClause::new("a");
        assert!(module_matches(&require, &host));
        assert!(!module_matches(&require, &fragment));
        assert!(host_matches(&FragmentHost::new("a"), &host));
        assert!(!host_matches(&FragmentHost::new("a"), &fragment));
    }

    #[test]
    fn package_candidates_sorted_by_version_then_id() {
        let low = ExportClause::new("x").version(Version::new(1, 0, 0));
        let high = ExportClause::new("x").version(Version::new(2, 0, 0));
        let s = |id: u64| Supplier {
            export: ExportRef {
                module: ModuleId(id),
                index: 0,
            },
            exporter: ModuleId(id),
        };
        let mut candidates = vec![(s(3), &low), (s(1), &low), (s(5), &high)];
        sort_package_candidates(&mut candidates);
        let order: Vec<u64> = candidates.iter().map(|(c, _)| c.exporter.0).collect();
        assert_eq!(order, [5, 1, 3]);
    }

    #[test]
    fn module_candidates_sorted_by_version_then_id() {
        let a = ModuleDescriptor::new(4, "a", Version::new(1, 0, 0));
        let b = ModuleDescriptor::new(2, "a", Version::new(1, 0, 0));
        let c = ModuleDescriptor::new(9, "a", Version::new(3, 0, 0));
        let mut candidates = vec![&a, &b, &c];
        sort_module_candidates(&mut candidates);
        let order: Vec<u64> = candidates.iter().map(|m| m.id.0).collect();
        assert_eq!(order, [9, 2, 4]);
    }

    #[test]
    fn self_supply_deferred_behind_preferred_external() {
        // 1 is self, 2 is a substitutable peer, 3 is a preferred external
        let mut candidates = vec![1, 2, 3, 4];
        defer_self_supply(&mut candidates, |c| *c == 1, |c| *c == 3);
        assert_eq!(candidates, [2, 3, 1, 4]);
    }

    #[test]
    fn self_supply_kept_without_preferred_external() {
        let mut candidates = vec![1, 2, 3];
        defer_self_supply(&mut candidates, |c| *c == 1, |_| false);
        assert_eq!(candidates, [1, 2, 3]);
    }
}

//! Matching attributes carried by export and import clauses.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionRange};

/// Attribute naming the exported package version.
pub const VERSION_ATTRIBUTE: &str = "version";
/// Legacy alias of [`VERSION_ATTRIBUTE`].
pub const SPECIFICATION_VERSION_ATTRIBUTE: &str = "specification-version";
/// Attribute naming the symbolic name of the exporting module.
pub const BUNDLE_SYMBOLIC_NAME_ATTRIBUTE: &str = "bundle-symbolic-name";
/// Attribute naming the version of the exporting module.
pub const BUNDLE_VERSION_ATTRIBUTE: &str = "bundle-version";

/// Attribute keys whose values must be versions or version ranges.
pub const VERSION_TYPED_ATTRIBUTES: [&str; 3] = [
    VERSION_ATTRIBUTE,
    SPECIFICATION_VERSION_ATTRIBUTE,
    BUNDLE_VERSION_ATTRIBUTE,
];

/// Ordered attribute map.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A tagged attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrValue {
    String(String),
    Version(Version),
    Range(VersionRange),
    List(Vec<String>),
}

impl AttrValue {
    pub fn is_version_like(&self) -> bool {
        matches!(self, AttrValue::Version(_) | AttrValue::Range(_))
    }

    /// Whether this value, requested by an importer, is satisfied by the
    /// value an exporter declares under the same key.
    ///
    /// A requested version means "at least"; a requested list must be a
    /// subset of the declared list.
    pub fn is_satisfied_by(&self, declared: &AttrValue) -> bool {
        match (self, declared) {
            (AttrValue::String(a), AttrValue::String(b)) => a == b,
            (AttrValue::String(a), AttrValue::Version(b)) => {
                Version::parse(a).is_ok_and(|a| a == *b)
            }
            (AttrValue::String(a), AttrValue::List(b)) => b.contains(a),
            (AttrValue::Version(a), AttrValue::Version(b)) => a <= b,
            (AttrValue::Version(a), AttrValue::String(b)) => {
                Version::parse(b).is_ok_and(|b| *a <= b)
            }
            (AttrValue::Range(r), AttrValue::Version(b)) => r.is_included(Some(b)),
            (AttrValue::Range(r), AttrValue::String(b)) => {
                Version::parse(b).is_ok_and(|b| r.is_included(Some(&b)))
            }
            (AttrValue::List(a), AttrValue::List(b)) => a.iter().all(|x| b.contains(x)),
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(s) => f.write_str(s),
            AttrValue::Version(v) => write!(f, "{v}"),
            AttrValue::Range(r) => write!(f, "\"{r}\""),
            AttrValue::List(items) => write!(f, "\"{}\"", items.join(",")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<Version> for AttrValue {
    fn from(value: Version) -> Self {
        AttrValue::Version(value)
    }
}

impl From<VersionRange> for AttrValue {
    fn from(value: VersionRange) -> Self {
        AttrValue::Range(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn strings_match_by_equality() {
        let req = AttrValue::from("acme");
        assert!(req.is_satisfied_by(&AttrValue::from("acme")));
        assert!(!req.is_satisfied_by(&AttrValue::from("other")));
    }

    #[test]
    fn range_matches_declared_version() {
        let req = AttrValue::Range(VersionRange::parse("[1.0,2.0)").unwrap());
        assert!(req.is_satisfied_by(&AttrValue::Version(v("1.2"))));
        assert!(!req.is_satisfied_by(&AttrValue::Version(v("2.0"))));
        assert!(req.is_satisfied_by(&AttrValue::from("1.5")));
    }

    #[test]
    fn requested_version_is_a_minimum() {
        let req = AttrValue::Version(v("1.1"));
        assert!(req.is_satisfied_by(&AttrValue::Version(v("1.1"))));
        assert!(req.is_satisfied_by(&AttrValue::Version(v("3"))));
        assert!(!req.is_satisfied_by(&AttrValue::Version(v("1.0"))));
    }

    #[test]
    fn lists_match_as_subsets() {
        let declared = AttrValue::List(vec!["a".into(), "b".into()]);
        assert!(AttrValue::List(vec!["b".into()]).is_satisfied_by(&declared));
        assert!(!AttrValue::List(vec!["c".into()]).is_satisfied_by(&declared));
        assert!(AttrValue::from("a").is_satisfied_by(&declared));
    }

    #[test]
    fn mismatched_tags_do_not_match() {
        let req = AttrValue::List(vec!["a".into()]);
        assert!(!req.is_satisfied_by(&AttrValue::from("a")));
        assert!(!AttrValue::from("x").is_satisfied_by(&AttrValue::Version(v("1"))));
    }
}

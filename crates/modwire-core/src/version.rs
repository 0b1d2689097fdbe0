//! Module version parsing, comparison, and range matching.
//!
//! Versions are `major.minor.micro.qualifier` tuples:
//! - Missing numeric segments default to `0`
//! - Numeric segments compare as numbers
//! - The qualifier compares lexicographically, and an empty qualifier sorts first

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use modwire_util::errors::{ModwireError, ModwireResult};
use serde::{Deserialize, Serialize};

/// A parsed module version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    /// The zero version `0.0.0`, the implicit minimum of every range.
    pub const ZERO: Version = Version::new(0, 0, 0);

    pub const fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    pub fn parse(version: &str) -> ModwireResult<Self> {
        let s = version.trim();
        if s.is_empty() {
            return Ok(Self::ZERO);
        }

        let mut parts = s.splitn(4, '.');
        let mut numeric = [0u64; 3];
        for (slot, name) in numeric.iter_mut().zip(["major", "minor", "micro"]) {
            let Some(part) = parts.next() else {
                break;
            };
            *slot = part.parse::<u64>().map_err(|_| ModwireError::Version {
                input: version.to_string(),
                message: format!("{name} component '{part}' is not a number"),
            })?;
        }
        let qualifier = parts.next().unwrap_or_default();
        if qualifier
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        {
            return Err(ModwireError::Version {
                input: version.to_string(),
                message: format!("qualifier '{qualifier}' contains invalid characters"),
            });
        }

        Ok(Self {
            major: numeric[0],
            minor: numeric[1],
            micro: numeric[2],
            qualifier: qualifier.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ModwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A version range: either "at least" a single version, or an interval with
/// explicit inclusive/exclusive bounds.
///
/// Supports: `1.0` (at least 1.0), `[1.0,2.0)`, `(1.0,2.0]`, `[1.0,]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    pub min: Version,
    pub include_min: bool,
    /// `None` means unbounded above.
    pub max: Option<Version>,
    pub include_max: bool,
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl VersionRange {
    /// Every version, including an absent one.
    pub fn any() -> Self {
        Self::at_least(Version::ZERO)
    }

    /// A single-version range meaning `>= min`.
    pub fn at_least(min: Version) -> Self {
        Self {
            min,
            include_min: true,
            max: None,
            include_max: true,
        }
    }

    /// An interval. A missing minimum is the zero version (inclusive), a
    /// missing maximum is unbounded.
    pub fn interval(
        min: Option<Version>,
        include_min: bool,
        max: Option<Version>,
        include_max: bool,
    ) -> Self {
        match min {
            Some(min) => Self {
                min,
                include_min,
                max,
                include_max,
            },
            None => Self {
                min: Version::ZERO,
                include_min: true,
                max,
                include_max,
            },
        }
    }

    /// The exact range `[v,v]`.
    pub fn exactly(version: Version) -> Self {
        Self {
            min: version.clone(),
            include_min: true,
            max: Some(version),
            include_max: true,
        }
    }

    pub fn parse(spec: &str) -> ModwireResult<Self> {
        let s = spec.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return Ok(Self::at_least(Version::parse(s)?));
        }

        let include_max = if s.ends_with(']') {
            true
        } else if s.ends_with(')') {
            false
        } else {
            return Err(ModwireError::Version {
                input: spec.to_string(),
                message: "range is missing its closing bracket".to_string(),
            });
        };
        let include_min = s.starts_with('[');
        let inner = &s[1..s.len() - 1];

        let Some((lower, upper)) = inner.split_once(',') else {
            return Err(ModwireError::Version {
                input: spec.to_string(),
                message: "interval must have the form [min,max]".to_string(),
            });
        };
        let lower = lower.trim();
        let upper = upper.trim();
        let min = if lower.is_empty() {
            None
        } else {
            Some(Version::parse(lower)?)
        };
        let max = if upper.is_empty() {
            None
        } else {
            Some(Version::parse(upper)?)
        };

        Ok(Self::interval(min, include_min, max, include_max))
    }

    /// A range whose maximum sorts before its minimum includes nothing.
    pub fn is_inverted(&self) -> bool {
        matches!(&self.max, Some(max) if *max < self.min)
    }

    /// Check if a version satisfies this range. An absent version is
    /// treated as the zero version.
    pub fn is_included(&self, version: Option<&Version>) -> bool {
        if self.is_inverted() {
            return false;
        }
        let zero = Version::ZERO;
        let version = version.unwrap_or(&zero);

        let cmp = version.cmp(&self.min);
        if self.include_min {
            if cmp == Ordering::Less {
                return false;
            }
        } else if cmp != Ordering::Greater {
            return false;
        }

        if let Some(ref max) = self.max {
            let cmp = version.cmp(max);
            if self.include_max {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.max {
            None if self.include_min => write!(f, "{}", self.min),
            None => write!(f, "({},]", self.min),
            Some(max) => write!(
                f,
                "{}{},{}{}",
                if self.include_min { '[' } else { '(' },
                self.min,
                max,
                if self.include_max { ']' } else { ')' }
            ),
        }
    }
}

impl FromStr for VersionRange {
    type Err = ModwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

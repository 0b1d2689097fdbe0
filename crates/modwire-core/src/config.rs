use std::path::Path;

use modwire_util::errors::{ModwireError, ModwireResult};
use serde::{Deserialize, Serialize};

/// Resolver tuning, usually loaded from a `modwire.toml` next to the
/// collaborator's module repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Upper bound on stabilisation iterations per strongly connected
    /// component of the candidate graph.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
        }
    }
}

fn default_max_passes() -> usize {
    64
}

impl ResolverConfig {
    /// Load the configuration from `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> ModwireResult<Self> {
        if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|e| ModwireError::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            })?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> ModwireResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ModwireError::Config {
            message: format!("Failed to parse resolver config: {e}"),
        })?;
        if config.max_passes == 0 {
            return Err(ModwireError::Config {
                message: "max-passes must be at least 1".to_string(),
            });
        }
        Ok(config)
    }
}

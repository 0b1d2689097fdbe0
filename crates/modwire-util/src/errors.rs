use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all modwire operations.
///
/// Only invalid input at the boundary is an error. A module that cannot be
/// resolved is reported through resolution state, never through this type.
#[derive(Debug, Error, Diagnostic)]
pub enum ModwireError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A version or version range string could not be parsed.
    #[error("Invalid version '{input}': {message}")]
    #[diagnostic(help("Versions look like `1.2.3` or `1.2.3.qualifier`; ranges like `[1.0,2.0)`"))]
    Version { input: String, message: String },

    /// A module descriptor is structurally invalid and was rejected.
    #[error("Invalid module descriptor '{module}': {message}")]
    #[diagnostic(help("Fix the descriptor before adding it to the module graph"))]
    Descriptor { module: String, message: String },

    /// A module with the same ID is already registered.
    #[error("Module {id} ({name} {version}) is already registered")]
    DuplicateModule {
        id: u64,
        name: String,
        version: String,
    },

    /// The referenced module ID is not registered.
    #[error("Unknown module {id}")]
    UnknownModule { id: u64 },

    /// Resolver configuration could not be loaded.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the resolver configuration file for syntax errors"))]
    Config { message: String },
}

/// Convenience alias for results carrying a [`ModwireError`].
pub type ModwireResult<T> = std::result::Result<T, ModwireError>;

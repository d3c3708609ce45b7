//! Trail error types.

/// Errors raised while building trail specs and catalogs.
#[derive(Debug, thiserror::Error)]
pub enum TrailError {
    /// A spec failed validation.
    #[error("invalid trail spec '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },

    /// Two catalog entries share a name.
    #[error("duplicate trail spec '{0}'")]
    DuplicateName(String),

    /// Failed to read a catalog file.
    #[error("failed to read trail catalog: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to parse a RON catalog.
    #[error("failed to parse trail catalog: {0}")]
    ParseError(#[source] ron::error::SpannedError),
}

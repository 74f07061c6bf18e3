use thiserror::Error;

/// Errors raised by the claim store and the engine plumbing around it.
///
/// Gameplay rejections (overlaps, budgets, ownership) are not errors; they are
/// reported through `ClaimResult` and `ToolOutcome`.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A record reached the store without a field it must carry.
    #[error("missing required field {field} on {entity}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The engine needs a tokio runtime for its background writer.
    #[error("no tokio runtime available for the persistence worker")]
    NoRuntime,

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

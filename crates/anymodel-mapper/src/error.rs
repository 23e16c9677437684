use anymodel_store::StoreError;

/// Errors from mapper operations.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A primary key lookup was called with the wrong number of values.
    /// Caller bug, never retried.
    #[error("expected {expected} primary key value(s), got {got}")]
    PrimaryKeyArity { expected: usize, got: usize },

    /// Delete was called on an entity that holds no identity.
    #[error("cannot delete a transient entity (no identity)")]
    TransientEntity,

    /// A secondary storage alias was registered twice.
    #[error("storage alias \"{0}\" already registered")]
    StorageAliasTaken(String),

    /// A relation field name was declared twice on one mapper.
    #[error("relation \"{0}\" already declared")]
    RelationExists(String),

    /// A relation cascade failed after the owner's own save committed.
    /// The owner stays persisted and clean for its scalar fields; the
    /// relation field stays touched, so retrying the save re-attempts
    /// only the relation.
    #[error("relation \"{field}\" failed to cascade: {source}")]
    PartialCascade {
        field: String,
        #[source]
        source: Box<MapError>,
    },

    /// Error from the storage layer, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for mapper operations.
pub type MapResult<T> = Result<T, MapError>;

use anymodel_types::Identity;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Schema registration hit a table name that is already registered.
    #[error("table \"{0}\" already registered")]
    TableExists(String),

    /// The table was never registered with `add_table`.
    #[error("unknown table \"{0}\"")]
    UnknownTable(String),

    /// An update or delete targeted a row that does not exist. A find
    /// returning nothing is not an error.
    #[error("no row in \"{table}\" for {identity}")]
    NotFound { table: String, identity: Identity },

    /// Error from the SQL driver (connection, schema, statement).
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The backend cannot serve the request as asked.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

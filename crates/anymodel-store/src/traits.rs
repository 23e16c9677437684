use anymodel_types::{Criteria, Identity, Page, Row};

use crate::error::StoreResult;

/// Uniform CRUD contract over a table-shaped backend.
///
/// All implementations must satisfy these invariants:
/// - Matching is an exact-equality AND over all criteria pairs, with the
///   semantics defined by the memory backend.
/// - `insert` assigns any auto-generated key component absent from the
///   values and returns the full identity.
/// - `update` and `delete` fail with `NotFound` when no row matches;
///   `find_one` returns `Ok(None)` instead.
/// - `add_table` is called once per table, before first use.
/// - Every call is one bounded unit of work; no multi-statement
///   transactions are exposed at this layer.
pub trait Storage: Send + Sync {
    /// Declare a table's primary key and scalar fields.
    ///
    /// Fails with `TableExists` if the name was already registered.
    fn add_table(&self, table: &str, primary_key: &[&str], fields: &[&str]) -> StoreResult<()>;

    /// Create the physical schema for every registered table. Invoked once
    /// at startup, never mid-request. No-op for backends without DDL.
    fn setup(&self) -> StoreResult<()>;

    /// Return at most one row matching the criteria.
    ///
    /// Default implementation takes the first row of `find_many`.
    fn find_one(&self, table: &str, criteria: &Criteria) -> StoreResult<Option<Row>> {
        Ok(self
            .find_many(table, criteria, Page::first())?
            .into_iter()
            .next())
    }

    /// Return every row matching the criteria, paginated.
    ///
    /// `limit = Some(0)` yields an empty result. Ordering is
    /// backend-defined unless the backend documents otherwise.
    fn find_many(&self, table: &str, criteria: &Criteria, page: Page) -> StoreResult<Vec<Row>>;

    /// Persist a new row, returning its full identity.
    fn insert(&self, table: &str, values: &Row) -> StoreResult<Identity>;

    /// Apply a partial update to the row matching `identity`.
    fn update(&self, table: &str, identity: &Identity, values: &Row) -> StoreResult<()>;

    /// Remove the row matching `identity`.
    fn delete(&self, table: &str, identity: &Identity) -> StoreResult<()>;
}

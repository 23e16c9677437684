//! Storage backends for the anymodel data mapper.
//!
//! Every backend implements the [`Storage`] trait: CRUD by identity plus
//! flat equality lookup, nothing more. The mapper layer never sees which
//! backend it is talking to.
//!
//! # Backends
//!
//! - [`MemoryStorage`] -- in-process reference implementation; its matching
//!   and pagination semantics are the contract every other backend must
//!   reproduce observably
//! - [`SqliteStorage`] -- production persistence on SQLite via `rusqlite`,
//!   one committed statement per call
//! - [`WriteAheadStorage`] -- tiered composition of a fast short store and
//!   a durable long store with explicit archival
//!
//! # Design Rules
//!
//! 1. A find that matches nothing is `Ok(None)` / an empty vec, never an
//!    error. `NotFound` is reserved for updates and deletes that target a
//!    missing row.
//! 2. Schema registration happens exactly once per table, before first use.
//! 3. Backend errors propagate unchanged; this layer never retries.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;
pub mod write_ahead;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::Storage;
pub use write_ahead::WriteAheadStorage;

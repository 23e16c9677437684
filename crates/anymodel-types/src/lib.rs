//! Foundation types for the anymodel data mapper.
//!
//! This crate defines the vocabulary shared by the storage backends and the
//! mapper layer:
//!
//! - [`Value`] -- a scalar cell (null, integer, or text)
//! - [`Row`] -- a column-to-value mapping, optionally tagged with the
//!   storage tier that served it
//! - [`Identity`] -- the string-encoded primary key of a persisted row
//! - [`Criteria`] / [`Page`] -- flat equality filters and pagination
//! - [`Entity`] / [`MappingState`] -- the contract a mapped domain type
//!   implements so a mapper can track what changed and what is persisted
//!
//! # Design Rules
//!
//! 1. Identity values are always compared string-encoded, so `1` and `"1"`
//!    name the same row regardless of which backend produced them.
//! 2. Rows are data plus transparent metadata: tagging a row with the tier
//!    that served it never changes how lookups behave.
//! 3. Change tracking is explicit: mutators mark fields touched, hydration
//!    does not. There is no reflection over assignment history.

pub mod criteria;
pub mod entity;
pub mod identity;
pub mod row;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use criteria::{Criteria, Page};
pub use entity::{shared, Entity, MappingState, Shared};
pub use identity::Identity;
pub use row::{Row, Tier};
pub use value::Value;

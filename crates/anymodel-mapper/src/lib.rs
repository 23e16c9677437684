//! The anymodel data mapper.
//!
//! A [`Mapper`] binds one entity type to one table: it extracts minimal
//! writes from the entity's touched-field set, hydrates rows back into
//! entities, keeps one live instance per identity through a weak
//! [`IdentityMap`], and wires one-to-many [`OneToMany`] relations into lazy
//! [`Collection`]s.
//!
//! # Design Rules
//!
//! 1. One live entity per (mapper, identity): a `find` for a cached
//!    identity returns the identical shared handle, never a copy.
//! 2. Saves write only fields that are both declared on the mapper and
//!    touched on the entity; unknown fields are never written and never
//!    cleared.
//! 3. Relation cascades are single-level and depth-first; a failure
//!    partway leaves prior saves committed and the relation field touched,
//!    so a retry re-attempts only the relation.
//! 4. The mapper holds no per-entity state beyond the identity map; the
//!    entity's own [`MappingState`](anymodel_types::MappingState) is the
//!    state machine.

pub mod collection;
pub mod error;
pub mod identity_map;
pub mod mapper;
pub mod relation;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export primary types at crate root for ergonomic imports.
pub use collection::{Collection, Loader};
pub use error::{MapError, MapResult};
pub use identity_map::IdentityMap;
pub use mapper::{Found, Mapper, MapperBuilder};
pub use relation::{OneToMany, Relation};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;
use crate::row::Row;
use crate::value::Value;

/// The primary key of a persisted row: ordered pairs of primary key field
/// name and string-encoded value.
///
/// Field order matches the mapper's declared primary key order, and the
/// projection of the encoded values ([`Identity::key`]) is what identity
/// map cache keys are made of. Everything is string-encoded so type
/// mismatches between backends (`1` vs `"1"`) cannot split an identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pairs: Vec<(String, String)>,
}

impl Identity {
    /// Build an identity from ordered (field, encoded value) pairs.
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Single-field identity, the common `("id",)` case.
    pub fn single(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pairs: vec![(field.into(), value.into())],
        }
    }

    /// Project the primary key fields of a row into an identity.
    ///
    /// Missing columns encode as the empty string; backends are expected to
    /// return complete rows, this is not a validation layer.
    pub fn project(primary_key: &[String], row: &Row) -> Self {
        Self {
            pairs: primary_key
                .iter()
                .map(|field| {
                    let encoded = row.get(field).map(Value::encode).unwrap_or_default();
                    (field.clone(), encoded)
                })
                .collect(),
        }
    }

    /// The encoded value tuple, in declared field order. Used as the
    /// identity map cache key.
    pub fn key(&self) -> Vec<String> {
        self.pairs.iter().map(|(_, v)| v.clone()).collect()
    }

    /// The encoded value for one primary key field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Primary key field names, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(f, _)| f.as_str())
    }

    /// Encoded values, in field order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, v)| v.as_str())
    }

    /// Equality criteria matching exactly this identity.
    pub fn to_criteria(&self) -> Criteria {
        self.pairs
            .iter()
            .fold(Criteria::new(), |criteria, (field, value)| {
                criteria.eq(field.clone(), Value::Text(value.clone()))
            })
    }

    /// Number of primary key fields.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` for an identity with no fields.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::row::Row;
use crate::value::Value;

/// Flat lookup criteria: an equality-AND over column/value pairs.
///
/// This is deliberately not a query language. Every backend interprets a
/// `Criteria` the same way: a row matches when every pair compares equal,
/// and an empty criteria matches every row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    terms: Vec<(String, Value)>,
}

impl Criteria {
    /// Empty criteria (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality term.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((column.into(), value.into()));
        self
    }

    /// The equality terms, in insertion order.
    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    /// Reference matching semantics: exact equality on every term.
    ///
    /// A missing column only matches an explicit [`Value::Null`] term.
    pub fn matches(&self, row: &Row) -> bool {
        self.terms.iter().all(|(column, value)| match row.get(column) {
            Some(cell) => cell == value,
            None => value.is_null(),
        })
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` when there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Pagination window for `find_many`.
///
/// `limit: Some(0)` is a valid window and yields an empty result; `offset`
/// counts matching rows to skip, not scanned rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Page {
    /// No pagination: every matching row.
    pub const ALL: Page = Page {
        limit: None,
        offset: 0,
    };

    /// A window with both bounds.
    pub fn new(limit: Option<u64>, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// The first matching row only.
    pub fn first() -> Self {
        Self {
            limit: Some(1),
            offset: 0,
        }
    }

    /// A limit with no offset.
    pub fn limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_criteria_match_everything() {
        assert!(Criteria::new().matches(&Row::new()));
        assert!(Criteria::new().matches(&Row::new().with("id", 1)));
    }

    #[test]
    fn all_terms_must_match() {
        let row = Row::new().with("name", "Batman").with("city", "Gotham");
        assert!(Criteria::new().eq("name", "Batman").matches(&row));
        assert!(Criteria::new()
            .eq("name", "Batman")
            .eq("city", "Gotham")
            .matches(&row));
        assert!(!Criteria::new()
            .eq("name", "Batman")
            .eq("city", "Metropolis")
            .matches(&row));
    }

    #[test]
    fn missing_column_matches_only_null() {
        let row = Row::new().with("name", "Batman");
        assert!(!Criteria::new().eq("sidekick", "Robin").matches(&row));
        assert!(Criteria::new().eq("sidekick", Value::Null).matches(&row));
    }

    #[test]
    fn page_constructors() {
        assert_eq!(Page::ALL, Page::new(None, 0));
        assert_eq!(Page::first(), Page::new(Some(1), 0));
        assert_eq!(Page::limit(3), Page::new(Some(3), 0));
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Which tier of a composite storage served a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// The fast short-term store.
    Short,
    /// The durable long-term archive.
    Long,
}

impl Tier {
    /// Stable label used for diagnostics (entity state store label).
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Short => "short",
            Tier::Long => "long",
        }
    }
}

/// A storage row: column name to scalar value.
///
/// A row may be decorated with metadata about which physical store produced
/// it ([`Row::tagged`]); the decoration is transparent to every data lookup
/// and is never part of equality.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Row {
    columns: BTreeMap<String, Value>,
    #[serde(skip)]
    served_by: Option<Tier>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Look up a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Returns `true` if the column is present.
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Column names, in sorted order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Column/value pairs, in sorted column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row carries no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Overlay another row's columns onto this one (partial update).
    pub fn merge(&mut self, other: &Row) {
        for (column, value) in other.iter() {
            self.columns.insert(column.to_string(), value.clone());
        }
    }

    /// Decorate the row with the tier that served it. Data is unchanged.
    pub fn tagged(mut self, tier: Tier) -> Self {
        self.served_by = Some(tier);
        self
    }

    /// The tier that served this row, if any backend tagged it.
    pub fn served_by(&self) -> Option<Tier> {
        self.served_by
    }
}

// Equality is over data only; the tier tag is diagnostics.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Row {}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row {
            columns: iter.into_iter().collect(),
            served_by: None,
        }
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use anymodel_types::{Criteria, Identity, Page, Row, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::Storage;

/// Separator for composite cache keys; never appears in encoded values.
const KEY_SEP: char = '\u{1f}';

struct MemTable {
    primary_key: Vec<String>,
    rows: Vec<(String, Row)>,
    autoincrement: i64,
}

impl MemTable {
    fn position(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|(k, _)| k == key)
    }
}

/// In-memory, insertion-ordered storage backend.
///
/// Intended for tests and embedding, and it defines the reference matching
/// semantics for every other backend: scan rows in insertion order, apply
/// all criteria as an exact-match AND, skip `offset` matches, stop after
/// `limit` matches. Auto-generated `id` values are stored and compared as
/// strings.
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryStorage {
    /// Create an empty storage with no registered tables.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Number of rows currently held in a table. Zero for unknown tables.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .expect("lock poisoned")
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    fn key_of(identity: &Identity) -> String {
        identity.key().join(&KEY_SEP.to_string())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read().expect("lock poisoned");
        f.debug_struct("MemoryStorage")
            .field("tables", &tables.len())
            .finish()
    }
}

impl Storage for MemoryStorage {
    fn add_table(&self, table: &str, primary_key: &[&str], _fields: &[&str]) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        tables.insert(
            table.to_string(),
            MemTable {
                primary_key: primary_key.iter().map(|f| f.to_string()).collect(),
                rows: Vec::new(),
                autoincrement: 0,
            },
        );
        Ok(())
    }

    fn setup(&self) -> StoreResult<()> {
        Ok(())
    }

    fn find_many(&self, table: &str, criteria: &Criteria, page: Page) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().expect("lock poisoned");
        let mem = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let mut matched = Vec::new();
        let mut to_skip = page.offset;

        for (_, row) in &mem.rows {
            // Checked first so limit = 0 yields nothing at all.
            if let Some(limit) = page.limit {
                if matched.len() as u64 >= limit {
                    break;
                }
            }
            if !criteria.matches(row) {
                continue;
            }
            if to_skip > 0 {
                to_skip -= 1;
                continue;
            }
            matched.push(row.clone());
        }

        Ok(matched)
    }

    fn insert(&self, table: &str, values: &Row) -> StoreResult<Identity> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let mem = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let mut pairs = Vec::with_capacity(mem.primary_key.len());
        for field in &mem.primary_key {
            let encoded = match values.get(field) {
                Some(value) if !value.is_null() => value.encode(),
                _ if field == "id" => {
                    mem.autoincrement += 1;
                    mem.autoincrement.to_string()
                }
                _ => {
                    return Err(StoreError::Unavailable(format!(
                        "cannot generate primary key field \"{field}\" for \"{table}\""
                    )))
                }
            };
            pairs.push((field.clone(), encoded));
        }
        let identity = Identity::new(pairs);

        let mut row = values.clone();
        for (field, encoded) in identity.fields().zip(identity.values()) {
            row.set(field, Value::Text(encoded.to_string()));
        }

        let key = Self::key_of(&identity);
        match mem.position(&key) {
            Some(pos) => mem.rows[pos].1 = row,
            None => mem.rows.push((key, row)),
        }

        debug!(table, %identity, "inserted row");
        Ok(identity)
    }

    fn update(&self, table: &str, identity: &Identity, values: &Row) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let mem = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let key = Self::key_of(identity);
        let pos = mem.position(&key).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            identity: identity.clone(),
        })?;
        mem.rows[pos].1.merge(values);

        debug!(table, %identity, fields = values.len(), "updated row");
        Ok(())
    }

    fn delete(&self, table: &str, identity: &Identity) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let mem = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let key = Self::key_of(identity);
        let pos = mem.position(&key).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            identity: identity.clone(),
        })?;
        mem.rows.remove(pos);

        debug!(table, %identity, "deleted row");
        Ok(())
    }
}

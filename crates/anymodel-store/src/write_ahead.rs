use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anymodel_types::{Criteria, Identity, Page, Row, Tier};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::Storage;

/// Tiered storage pairing a fast short-term store with a durable long-term
/// archive.
///
/// Normal traffic lives entirely in the short store: `find_many`, `insert`,
/// and `update` never touch the long tier. `find_one` is the exception --
/// it checks short first, then long, and tags the returned row with the
/// tier that served it. The long store is populated only by [`archive`],
/// which is expected to run out-of-band (periodic maintenance), never
/// per-request.
///
/// Rows that have been archived are immutable: `delete` and `update`
/// target the short store only and report `NotFound` for long-tier rows.
///
/// [`archive`]: WriteAheadStorage::archive
pub struct WriteAheadStorage {
    short: Arc<dyn Storage>,
    long: Arc<dyn Storage>,
    primary_keys: RwLock<HashMap<String, Vec<String>>>,
}

impl WriteAheadStorage {
    /// Compose a short and a long store.
    pub fn new(short: Arc<dyn Storage>, long: Arc<dyn Storage>) -> Self {
        Self {
            short,
            long,
            primary_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Migrate every row currently in the short store into the long store,
    /// removing it from the short store. Returns the number of rows moved.
    ///
    /// This is the only path that populates the long store.
    pub fn archive(&self, table: &str) -> StoreResult<usize> {
        let primary_key = self
            .primary_keys
            .read()
            .expect("lock poisoned")
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let rows = self.short.find_many(table, &Criteria::new(), Page::ALL)?;
        let moved = rows.len();

        for row in rows {
            let identity = Identity::project(&primary_key, &row);
            self.long.insert(table, &row)?;
            self.short.delete(table, &identity)?;
        }

        debug!(table, moved, "archived short store to long store");
        Ok(moved)
    }
}

impl std::fmt::Debug for WriteAheadStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.primary_keys.read().expect("lock poisoned");
        f.debug_struct("WriteAheadStorage")
            .field("tables", &tables.len())
            .finish()
    }
}

impl Storage for WriteAheadStorage {
    fn add_table(&self, table: &str, primary_key: &[&str], fields: &[&str]) -> StoreResult<()> {
        let mut keys = self.primary_keys.write().expect("lock poisoned");
        if keys.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        keys.insert(
            table.to_string(),
            primary_key.iter().map(|f| f.to_string()).collect(),
        );
        drop(keys);

        self.short.add_table(table, primary_key, fields)?;
        self.long.add_table(table, primary_key, fields)
    }

    fn setup(&self) -> StoreResult<()> {
        self.short.setup()?;
        self.long.setup()
    }

    fn find_one(&self, table: &str, criteria: &Criteria) -> StoreResult<Option<Row>> {
        if let Some(row) = self.short.find_one(table, criteria)? {
            return Ok(Some(row.tagged(Tier::Short)));
        }
        if let Some(row) = self.long.find_one(table, criteria)? {
            return Ok(Some(row.tagged(Tier::Long)));
        }
        Ok(None)
    }

    fn find_many(&self, table: &str, criteria: &Criteria, page: Page) -> StoreResult<Vec<Row>> {
        self.short.find_many(table, criteria, page)
    }

    fn insert(&self, table: &str, values: &Row) -> StoreResult<Identity> {
        self.short.insert(table, values)
    }

    fn update(&self, table: &str, identity: &Identity, values: &Row) -> StoreResult<()> {
        self.short.update(table, identity, values)
    }

    fn delete(&self, table: &str, identity: &Identity) -> StoreResult<()> {
        // Archived rows are immutable; only the short tier serves deletes.
        self.short.delete(table, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use anymodel_types::Value;

    fn tiered() -> (WriteAheadStorage, Arc<MemoryStorage>, Arc<MemoryStorage>) {
        let short = Arc::new(MemoryStorage::new());
        let long = Arc::new(MemoryStorage::new());
        let storage = WriteAheadStorage::new(short.clone(), long.clone());
        storage.add_table("hero", &["id"], &["name"]).unwrap();
        (storage, short, long)
    }

    // -----------------------------------------------------------------------
    // Tier tagging
    // -----------------------------------------------------------------------

    #[test]
    fn fresh_rows_are_served_from_short() {
        let (storage, _, _) = tiered();
        let identity = storage
            .insert("hero", &Row::new().with("name", "Superman"))
            .unwrap();

        let row = storage
            .find_one("hero", &identity.to_criteria())
            .unwrap()
            .unwrap();
        assert_eq!(row.served_by(), Some(Tier::Short));
    }

    #[test]
    fn archive_migrates_rows_to_long() {
        let (storage, short, long) = tiered();
        let identity = storage
            .insert("hero", &Row::new().with("name", "Superman"))
            .unwrap();

        let before = storage
            .find_one("hero", &identity.to_criteria())
            .unwrap()
            .unwrap();

        let moved = storage.archive("hero").unwrap();
        assert_eq!(moved, 1);
        assert_eq!(short.row_count("hero"), 0);
        assert_eq!(long.row_count("hero"), 1);

        // Short-only enumeration no longer sees the row.
        assert!(storage
            .find_many("hero", &Criteria::new(), Page::ALL)
            .unwrap()
            .is_empty());

        // find_one falls through to the long tier with identical data.
        let after = storage
            .find_one("hero", &identity.to_criteria())
            .unwrap()
            .unwrap();
        assert_eq!(after.served_by(), Some(Tier::Long));
        assert_eq!(after.get("name"), before.get("name"));
        assert_eq!(after.get("id"), before.get("id"));
    }

    #[test]
    fn archive_preserves_identities_across_tiers() {
        let (storage, _, _) = tiered();
        let first = storage
            .insert("hero", &Row::new().with("name", "Superman"))
            .unwrap();
        let second = storage
            .insert("hero", &Row::new().with("name", "Batman"))
            .unwrap();

        storage.archive("hero").unwrap();

        let row = storage
            .find_one("hero", &second.to_criteria())
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("Batman".into())));
        let row = storage
            .find_one("hero", &first.to_criteria())
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("Superman".into())));
    }

    // -----------------------------------------------------------------------
    // Archived rows are immutable
    // -----------------------------------------------------------------------

    #[test]
    fn delete_after_archive_is_not_found() {
        let (storage, _, _) = tiered();
        let identity = storage
            .insert("hero", &Row::new().with("name", "Superman"))
            .unwrap();
        storage.archive("hero").unwrap();

        let err = storage.delete("hero", &identity).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn update_after_archive_is_not_found() {
        let (storage, _, _) = tiered();
        let identity = storage
            .insert("hero", &Row::new().with("name", "Superman"))
            .unwrap();
        storage.archive("hero").unwrap();

        let err = storage
            .update("hero", &identity, &Row::new().with("name", "Kal-El"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    // -----------------------------------------------------------------------
    // Registration fan-out
    // -----------------------------------------------------------------------

    #[test]
    fn add_table_registers_both_tiers() {
        let (_, short, long) = tiered();
        // A direct registration on either tier now collides.
        assert!(matches!(
            short.add_table("hero", &["id"], &["name"]).unwrap_err(),
            StoreError::TableExists(_)
        ));
        assert!(matches!(
            long.add_table("hero", &["id"], &["name"]).unwrap_err(),
            StoreError::TableExists(_)
        ));
    }

    #[test]
    fn archive_unknown_table_fails() {
        let (storage, _, _) = tiered();
        assert!(matches!(
            storage.archive("villain").unwrap_err(),
            StoreError::UnknownTable(_)
        ));
    }
}

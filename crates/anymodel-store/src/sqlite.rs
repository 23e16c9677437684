use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use anymodel_types::{Criteria, Identity, Page, Row, Value};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::Storage;

#[derive(Clone)]
struct TableSchema {
    primary_key: Vec<String>,
    fields: Vec<String>,
}

/// SQLite-backed storage.
///
/// Schema registration declares one table per mapped type: a single-field
/// primary key becomes `INTEGER PRIMARY KEY AUTOINCREMENT`, composite keys
/// become a composite `TEXT` primary key, and every other column is `TEXT`.
/// Each CRUD call executes exactly one parameterized statement in its own
/// committed unit of work; driver errors (querying before [`Storage::setup`],
/// connection failures) propagate unchanged.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    schemas: RwLock<HashMap<String, TableSchema>>,
}

impl SqliteStorage {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::with_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::with_connection(Connection::open_in_memory()?))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            schemas: RwLock::new(HashMap::new()),
        }
    }

    fn schema(&self, table: &str) -> StoreResult<TableSchema> {
        self.schemas
            .read()
            .expect("lock poisoned")
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn query(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
        let conn = self.conn.lock().expect("lock poisoned");
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut out = Vec::new();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter().map(to_sql)))?;
        while let Some(r) = rows.next()? {
            let mut row = Row::new();
            for (i, column) in columns.iter().enumerate() {
                row.set(column.clone(), from_sql(r.get_ref(i)?));
            }
            out.push(row);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schemas = self.schemas.read().expect("lock poisoned");
        f.debug_struct("SqliteStorage")
            .field("tables", &schemas.len())
            .finish()
    }
}

impl Storage for SqliteStorage {
    fn add_table(&self, table: &str, primary_key: &[&str], fields: &[&str]) -> StoreResult<()> {
        let mut schemas = self.schemas.write().expect("lock poisoned");
        if schemas.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        schemas.insert(
            table.to_string(),
            TableSchema {
                primary_key: primary_key.iter().map(|f| f.to_string()).collect(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
            },
        );
        Ok(())
    }

    fn setup(&self) -> StoreResult<()> {
        let schemas = self.schemas.read().expect("lock poisoned");
        let conn = self.conn.lock().expect("lock poisoned");

        for (table, schema) in schemas.iter() {
            let mut columns = Vec::new();
            if let [pk] = schema.primary_key.as_slice() {
                columns.push(format!("\"{pk}\" INTEGER PRIMARY KEY AUTOINCREMENT"));
            } else {
                for pk in &schema.primary_key {
                    columns.push(format!("\"{pk}\" TEXT NOT NULL"));
                }
            }
            for field in &schema.fields {
                columns.push(format!("\"{field}\" TEXT"));
            }
            if schema.primary_key.len() > 1 {
                let keys: Vec<String> = schema
                    .primary_key
                    .iter()
                    .map(|f| format!("\"{f}\""))
                    .collect();
                columns.push(format!("PRIMARY KEY ({})", keys.join(", ")));
            }

            let sql = format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" ({})",
                columns.join(", ")
            );
            conn.execute(&sql, [])?;
            debug!(table, "ensured table");
        }
        Ok(())
    }

    fn find_many(&self, table: &str, criteria: &Criteria, page: Page) -> StoreResult<Vec<Row>> {
        let mut sql = format!("SELECT * FROM \"{table}\"");
        let mut params = Vec::new();

        if !criteria.is_empty() {
            let terms: Vec<String> = criteria
                .terms()
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("\"{column}\" = ?{}", i + 1))
                .collect();
            sql.push_str(&format!(" WHERE {}", terms.join(" AND ")));
            params.extend(criteria.terms().iter().map(|(_, value)| value.clone()));
        }

        match (page.limit, page.offset) {
            (Some(limit), offset) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (None, offset) if offset > 0 => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, _) => {}
        }

        self.query(&sql, &params)
    }

    fn insert(&self, table: &str, values: &Row) -> StoreResult<Identity> {
        let schema = self.schema(table)?;

        let rowid = {
            let conn = self.conn.lock().expect("lock poisoned");
            if values.is_empty() {
                conn.execute(&format!("INSERT INTO \"{table}\" DEFAULT VALUES"), [])?;
            } else {
                let columns: Vec<String> =
                    values.columns().map(|c| format!("\"{c}\"")).collect();
                let placeholders: Vec<String> =
                    (1..=values.len()).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "INSERT INTO \"{table}\" ({}) VALUES ({})",
                    columns.join(", "),
                    placeholders.join(", ")
                );
                let params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
                conn.execute(&sql, rusqlite::params_from_iter(params.iter().map(to_sql)))?;
            }
            conn.last_insert_rowid()
        };

        let mut pairs = Vec::with_capacity(schema.primary_key.len());
        for field in &schema.primary_key {
            let encoded = match values.get(field) {
                Some(value) if !value.is_null() => value.encode(),
                _ if schema.primary_key.len() == 1 => rowid.to_string(),
                _ => {
                    return Err(StoreError::Unavailable(format!(
                        "cannot generate primary key field \"{field}\" for \"{table}\""
                    )))
                }
            };
            pairs.push((field.clone(), encoded));
        }
        let identity = Identity::new(pairs);

        debug!(table, %identity, "inserted row");
        Ok(identity)
    }

    fn update(&self, table: &str, identity: &Identity, values: &Row) -> StoreResult<()> {
        if values.is_empty() {
            // Nothing to write, but a missing row is still an error, same
            // as the memory backend.
            let conditions: Vec<String> = identity
                .fields()
                .enumerate()
                .map(|(i, field)| format!("\"{field}\" = ?{}", i + 1))
                .collect();
            let sql = format!(
                "SELECT EXISTS (SELECT 1 FROM \"{table}\" WHERE {})",
                conditions.join(" AND ")
            );
            let params: Vec<Value> =
                identity.values().map(|v| Value::Text(v.to_string())).collect();

            let exists: bool = {
                let conn = self.conn.lock().expect("lock poisoned");
                conn.query_row(
                    &sql,
                    rusqlite::params_from_iter(params.iter().map(to_sql)),
                    |r| r.get(0),
                )?
            };
            if !exists {
                return Err(StoreError::NotFound {
                    table: table.to_string(),
                    identity: identity.clone(),
                });
            }
            return Ok(());
        }

        let assignments: Vec<String> = values
            .columns()
            .enumerate()
            .map(|(i, column)| format!("\"{column}\" = ?{}", i + 1))
            .collect();
        let conditions: Vec<String> = identity
            .fields()
            .enumerate()
            .map(|(i, field)| format!("\"{field}\" = ?{}", values.len() + i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{table}\" SET {} WHERE {}",
            assignments.join(", "),
            conditions.join(" AND ")
        );

        let mut params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
        params.extend(identity.values().map(|v| Value::Text(v.to_string())));

        let affected = {
            let conn = self.conn.lock().expect("lock poisoned");
            conn.execute(&sql, rusqlite::params_from_iter(params.iter().map(to_sql)))?
        };
        if affected == 0 {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                identity: identity.clone(),
            });
        }

        debug!(table, %identity, fields = values.len(), "updated row");
        Ok(())
    }

    fn delete(&self, table: &str, identity: &Identity) -> StoreResult<()> {
        let conditions: Vec<String> = identity
            .fields()
            .enumerate()
            .map(|(i, field)| format!("\"{field}\" = ?{}", i + 1))
            .collect();
        let sql = format!("DELETE FROM \"{table}\" WHERE {}", conditions.join(" AND "));
        let params: Vec<Value> = identity.values().map(|v| Value::Text(v.to_string())).collect();

        let affected = {
            let conn = self.conn.lock().expect("lock poisoned");
            conn.execute(&sql, rusqlite::params_from_iter(params.iter().map(to_sql)))?
        };
        if affected == 0 {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                identity: identity.clone(),
            });
        }

        debug!(table, %identity, "deleted row");
        Ok(())
    }
}

fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Int(n) => rusqlite::types::Value::Integer(*n),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Text(f.to_string()),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

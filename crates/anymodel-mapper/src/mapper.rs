use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anymodel_store::Storage;
use anymodel_types::{shared, Criteria, Entity, Identity, Page, Row, Shared, Value};
use tracing::{debug, trace};

use crate::error::{MapError, MapResult};
use crate::identity_map::IdentityMap;
use crate::relation::Relation;

/// Translates between one entity type and one table.
///
/// The mapper is the only component application code talks to directly.
/// It is stateless with respect to individual entities beyond its weak
/// identity map; the entity's own mapping state is the lifecycle machine.
/// Mappers for related types must exist and be wired through relations
/// before save/find on the owning type can resolve them, which makes
/// cyclic relation graphs unrepresentable.
pub struct Mapper<E: Entity> {
    table: String,
    primary_key: Vec<String>,
    fields: Vec<String>,
    relations: Vec<(String, Box<dyn Relation<E>>)>,
    storage: Arc<dyn Storage>,
    secondary: Mutex<HashMap<String, Arc<dyn Storage>>>,
    cache: IdentityMap<E>,
}

impl<E: Entity> Mapper<E> {
    /// Start building a mapper for the given table name.
    pub fn builder(table: impl Into<String>) -> MapperBuilder<E> {
        MapperBuilder {
            table: table.into(),
            primary_key: vec!["id".to_string()],
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// The mapped table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared primary key field names, in order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Declared scalar field names.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Save an entity: insert when transient, update when persisted.
    ///
    /// Only fields that are both declared on this mapper and touched on
    /// the entity are written, and exactly those are cleared afterwards --
    /// unknown fields are silently ignored, never written, never cleared.
    /// Touched relation fields cascade to their related mapper after the
    /// scalar write; a cascade failure surfaces as
    /// [`MapError::PartialCascade`] with the relation still touched.
    pub fn save(&self, entity: &Shared<E>) -> MapResult<Shared<E>> {
        let mut guard = entity.write().expect("lock poisoned");

        let mut values = Row::new();
        for field in &self.fields {
            if guard.state().is_touched(field) {
                if let Some(value) = guard.field(field) {
                    values.set(field.clone(), value);
                }
            }
        }
        let written: Vec<String> = values.columns().map(str::to_string).collect();

        let identity = match guard.state().identity().cloned() {
            Some(identity) => {
                self.storage.update(&self.table, &identity, &values)?;
                trace!(table = %self.table, %identity, fields = written.len(), "updated");
                identity
            }
            None => {
                let identity = self.storage.insert(&self.table, &values)?;
                for (field, value) in identity.fields().zip(identity.values()) {
                    guard.set_field(field, Value::Text(value.to_string()));
                }
                guard.state_mut().clear_touched(identity.fields());
                guard.state_mut().set_identity(identity.clone());
                trace!(table = %self.table, %identity, "inserted");
                identity
            }
        };
        guard
            .state_mut()
            .clear_touched(written.iter().map(String::as_str));

        for (name, relation) in &self.relations {
            if !guard.state().is_touched(name) {
                continue;
            }
            relation
                .cascade_save(&self.table, &mut guard)
                .map_err(|source| MapError::PartialCascade {
                    field: name.clone(),
                    source: Box::new(source),
                })?;
            guard.state_mut().clear_touched([name.as_str()]);
        }

        let key = identity.key();
        drop(guard);
        debug!(table = %self.table, "saved entity");
        Ok(self.cache.set(key, Arc::clone(entity)))
    }

    /// Find an entity by its primary key values.
    ///
    /// The identity map is consulted first; a hit returns the cached
    /// instance without touching storage. `Ok(None)` when no row matches.
    pub fn find_one(&self, pk: &[Value]) -> MapResult<Option<Shared<E>>> {
        if pk.len() != self.primary_key.len() {
            return Err(MapError::PrimaryKeyArity {
                expected: self.primary_key.len(),
                got: pk.len(),
            });
        }

        let key: Vec<String> = pk.iter().map(Value::encode).collect();
        if let Some(cached) = self.cache.get(&key) {
            trace!(table = %self.table, "identity map hit");
            return Ok(Some(cached));
        }

        let identity = Identity::new(self.primary_key.iter().cloned().zip(key).collect());
        let Some(row) = self.storage.find_one(&self.table, &identity.to_criteria())? else {
            return Ok(None);
        };
        Ok(Some(self.hydrate(row)))
    }

    /// Find every entity matching the criteria.
    ///
    /// Returns a single-pass iterator: each step hydrates one row and
    /// registers it in the identity map. Consuming it exhausts the
    /// underlying result; it is not restartable.
    pub fn find(&self, criteria: Criteria) -> MapResult<Found<'_, E>> {
        let rows = self.storage.find_many(&self.table, &criteria, Page::ALL)?;
        Ok(Found {
            mapper: self,
            rows: rows.into_iter(),
        })
    }

    /// Delete a persisted entity's row and detach the entity.
    ///
    /// A transient entity has no identity to key on; that is a caller bug
    /// and fails with [`MapError::TransientEntity`].
    pub fn delete(&self, entity: &Shared<E>) -> MapResult<()> {
        let mut guard = entity.write().expect("lock poisoned");
        let Some(identity) = guard.state().identity().cloned() else {
            return Err(MapError::TransientEntity);
        };

        self.storage.delete(&self.table, &identity)?;
        self.cache.remove(&identity.key());
        guard.state_mut().detach();

        debug!(table = %self.table, %identity, "deleted entity");
        Ok(())
    }

    /// Register an additional named storage (e.g. a "secondary" replica)
    /// for explicit targeting.
    pub fn add_storage(&self, alias: impl Into<String>, storage: Arc<dyn Storage>) -> MapResult<()> {
        let alias = alias.into();
        let mut secondary = self.secondary.lock().expect("lock poisoned");
        if secondary.contains_key(&alias) {
            return Err(MapError::StorageAliasTaken(alias));
        }
        secondary.insert(alias, storage);
        Ok(())
    }

    /// Look up a registered secondary storage by alias.
    pub fn secondary(&self, alias: &str) -> Option<Arc<dyn Storage>> {
        self.secondary
            .lock()
            .expect("lock poisoned")
            .get(alias)
            .cloned()
    }

    /// Hydrate a storage row into a cached, clean, persisted entity.
    fn hydrate(&self, row: Row) -> Shared<E> {
        let mut entity = E::hydrate(&row);
        for (_, relation) in &self.relations {
            relation.attach(&self.table, &row, &mut entity);
        }
        if let Some(tier) = row.served_by() {
            entity.state_mut().set_store(tier.as_str());
        }

        let identity = Identity::project(&self.primary_key, &row);
        entity.state_mut().set_identity(identity.clone());
        entity.state_mut().set_clean();

        // An instance that is already live for this identity wins over the
        // fresh copy.
        self.cache.get_or_insert(identity.key(), shared(entity))
    }
}

impl<E: Entity> std::fmt::Debug for Mapper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields)
            .field("relations", &self.relations.len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Single-pass iterator over the entities matching a [`Mapper::find`].
pub struct Found<'m, E: Entity> {
    mapper: &'m Mapper<E>,
    rows: std::vec::IntoIter<Row>,
}

impl<E: Entity> Iterator for Found<'_, E> {
    type Item = Shared<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| self.mapper.hydrate(row))
    }
}

/// Builder wiring a [`Mapper`] to its table, fields, relations, and
/// primary storage.
pub struct MapperBuilder<E: Entity> {
    table: String,
    primary_key: Vec<String>,
    fields: Vec<String>,
    relations: Vec<(String, Box<dyn Relation<E>>)>,
}

impl<E: Entity> MapperBuilder<E> {
    /// Override the primary key field names (default `("id",)`).
    pub fn primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the mapped scalar field names.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a relation field.
    pub fn relation(
        mut self,
        field: impl Into<String>,
        relation: impl Relation<E> + 'static,
    ) -> Self {
        self.relations.push((field.into(), Box::new(relation)));
        self
    }

    /// Register the table on the primary storage and finish the mapper.
    pub fn build(self, storage: Arc<dyn Storage>) -> MapResult<Arc<Mapper<E>>> {
        for (i, (name, _)) in self.relations.iter().enumerate() {
            if self.relations[..i].iter().any(|(other, _)| other == name) {
                return Err(MapError::RelationExists(name.clone()));
            }
        }

        let primary_key: Vec<&str> = self.primary_key.iter().map(String::as_str).collect();
        let fields: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        storage.add_table(&self.table, &primary_key, &fields)?;

        Ok(Arc::new(Mapper {
            table: self.table,
            primary_key: self.primary_key,
            fields: self.fields,
            relations: self.relations,
            storage,
            secondary: Mutex::new(HashMap::new()),
            cache: IdentityMap::new(),
        }))
    }
}

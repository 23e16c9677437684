use std::sync::Arc;

use anymodel_types::{Criteria, Entity, Row, Value};

use crate::collection::Collection;
use crate::error::MapResult;
use crate::mapper::Mapper;

/// Declarative link between two mapped types.
///
/// A relation is a pure strategy object: stateless beyond the handle to
/// the related mapper. `attach` wires a lazy collection into a freshly
/// hydrated owner; `cascade_save` persists the owner's related entities
/// through their own mapper.
pub trait Relation<E: Entity>: Send + Sync {
    /// Install an unresolved collection on the entity whose loader will
    /// fetch the entities related to `row` on first access.
    fn attach(&self, owner_table: &str, row: &Row, entity: &mut E);

    /// Persist the owner's related entities. Called by the owner's mapper
    /// after the owner's own scalar save, only when the relation field is
    /// touched. Single-level cascade, depth-first; cyclic relation graphs
    /// are unsupported.
    fn cascade_save(&self, owner_table: &str, owner: &mut E) -> MapResult<()>;
}

/// One-to-many relation using the `"<owner_table>_id"` foreign key
/// convention on the related table.
pub struct OneToMany<E: Entity, R: Entity> {
    related: Arc<Mapper<R>>,
    collection: fn(&mut E) -> &mut Collection<R>,
}

impl<E: Entity, R: Entity> OneToMany<E, R> {
    /// Wire a relation to the related type's mapper and the accessor for
    /// the owner's collection field.
    pub fn new(related: Arc<Mapper<R>>, collection: fn(&mut E) -> &mut Collection<R>) -> Self {
        Self {
            related,
            collection,
        }
    }

    fn foreign_key(owner_table: &str) -> String {
        format!("{owner_table}_id")
    }
}

impl<E: Entity, R: Entity> Relation<E> for OneToMany<E, R> {
    fn attach(&self, owner_table: &str, row: &Row, entity: &mut E) {
        let foreign_key = Self::foreign_key(owner_table);
        let owner_id = row.get("id").map(Value::encode).unwrap_or_default();
        let related = Arc::clone(&self.related);

        *(self.collection)(entity) = Collection::lazy(move || {
            let criteria =
                Criteria::new().eq(foreign_key.clone(), Value::Text(owner_id.clone()));
            Ok(related.find(criteria)?.collect())
        });
    }

    fn cascade_save(&self, owner_table: &str, owner: &mut E) -> MapResult<()> {
        let Some(identity) = owner.state().identity() else {
            // The owner's mapper assigns identity before cascading.
            return Ok(());
        };
        let owner_id = identity.values().next().unwrap_or_default().to_string();
        let foreign_key = Self::foreign_key(owner_table);

        let items = match (self.collection)(owner) {
            Collection::Resolved(items) => items.clone(),
            // An unresolved collection was never touched by the
            // application; there is nothing to cascade.
            Collection::Unresolved(_) => return Ok(()),
        };

        for related in items {
            related
                .write()
                .expect("lock poisoned")
                .set_field(&foreign_key, Value::Text(owner_id.clone()));
            // Already-persisted entities shrink to a minimal update here:
            // their own touched tracking limits what gets written.
            self.related.save(&related)?;
        }
        Ok(())
    }
}

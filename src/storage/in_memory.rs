//! In-memory transactional storage
//!
//! All tables live behind one `RwLock`. Reads run against the live tables;
//! writes run inside [`InMemoryStore::transaction`], which works on a staged
//! copy and swaps it in only when the closure succeeds. An error anywhere in
//! a multi-step operation therefore leaves the store untouched.

use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::{EntityError, StorageError, WorkshopError, WorkshopResult};
use crate::core::query::{Page, QueryParams, paginate};
use crate::core::service::{DataService, Mutation};
use crate::core::store::select;
use crate::entities::customer::Customer;
use crate::entities::mechanic::Mechanic;
use crate::entities::part::Part;
use crate::entities::ticket::ServiceTicket;

/// A many-to-many linking relation of `(ticket_id, other_id)` pairs
///
/// Each pair appears at most once; iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    pairs: IndexSet<(Uuid, Uuid)>,
}

impl LinkTable {
    /// Add a pair; returns false if it was already present
    pub(crate) fn insert(&mut self, left: Uuid, right: Uuid) -> bool {
        self.pairs.insert((left, right))
    }

    /// Remove a pair; returns false if it was absent
    pub(crate) fn remove(&mut self, left: Uuid, right: Uuid) -> bool {
        self.pairs.shift_remove(&(left, right))
    }

    /// Right-hand ids linked to `left`, in link order
    pub(crate) fn rights_of(&self, left: Uuid) -> Vec<Uuid> {
        self.pairs
            .iter()
            .filter(|(l, _)| *l == left)
            .map(|(_, r)| *r)
            .collect()
    }

    /// Number of links per right-hand id
    pub(crate) fn count_by_right(&self) -> IndexMap<Uuid, usize> {
        let mut counts = IndexMap::new();
        for (_, right) in &self.pairs {
            *counts.entry(*right).or_insert(0) += 1;
        }
        counts
    }

    /// Drop every pair whose left side is `left`
    pub(crate) fn remove_left(&mut self, left: Uuid) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|(l, _)| *l != left);
        before - self.pairs.len()
    }

    /// Drop every pair whose right side is `right`
    pub(crate) fn remove_right(&mut self, right: Uuid) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|(_, r)| *r != right);
        before - self.pairs.len()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Every table of the workshop schema
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) customers: IndexMap<Uuid, Customer>,
    pub(crate) mechanics: IndexMap<Uuid, Mechanic>,
    pub(crate) tickets: IndexMap<Uuid, ServiceTicket>,
    pub(crate) parts: IndexMap<Uuid, Part>,
    pub(crate) ticket_mechanics: LinkTable,
    pub(crate) ticket_parts: LinkTable,
}

impl Tables {
    /// Fetch a row or fail with `NotFound`
    pub(crate) fn require<T: Stored>(&self, id: Uuid) -> WorkshopResult<&T> {
        T::table(self)
            .get(&id)
            .ok_or_else(|| WorkshopError::not_found(T::resource_name_singular(), id))
    }

    /// Insert a new row after reference and uniqueness checks
    pub(crate) fn insert_checked<T: Stored>(&mut self, entity: T) -> WorkshopResult<T> {
        entity.check_references(self)?;
        check_unique(T::table(self), &entity)?;
        T::table_mut(self).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    /// Tickets owned by a customer, in creation order
    pub(crate) fn tickets_of(&self, customer_id: Uuid) -> Vec<&ServiceTicket> {
        self.tickets
            .values()
            .filter(|t| t.customer_id == customer_id)
            .collect()
    }
}

/// An entity with a table in [`Tables`]
///
/// Carries the per-table policies: which references must resolve on write
/// and what happens to dependent rows on delete.
pub trait Stored: Entity {
    fn table(tables: &Tables) -> &IndexMap<Uuid, Self>;

    fn table_mut(tables: &mut Tables) -> &mut IndexMap<Uuid, Self>;

    /// Check that every id this row refers to exists
    fn check_references(&self, _tables: &Tables) -> WorkshopResult<()> {
        Ok(())
    }

    /// Detach or refuse dependent rows before this row is removed
    fn before_delete(_id: Uuid, _tables: &mut Tables) -> WorkshopResult<()> {
        Ok(())
    }
}

impl Stored for Customer {
    fn table(tables: &Tables) -> &IndexMap<Uuid, Self> {
        &tables.customers
    }

    fn table_mut(tables: &mut Tables) -> &mut IndexMap<Uuid, Self> {
        &mut tables.customers
    }

    fn before_delete(id: Uuid, tables: &mut Tables) -> WorkshopResult<()> {
        let count = tables.tickets_of(id).len();
        if count > 0 {
            return Err(EntityError::HasDependents {
                entity_type: Self::resource_name_singular().to_string(),
                id,
                dependents: "service tickets".to_string(),
                count,
            }
            .into());
        }
        Ok(())
    }
}

impl Stored for Mechanic {
    fn table(tables: &Tables) -> &IndexMap<Uuid, Self> {
        &tables.mechanics
    }

    fn table_mut(tables: &mut Tables) -> &mut IndexMap<Uuid, Self> {
        &mut tables.mechanics
    }

    fn before_delete(id: Uuid, tables: &mut Tables) -> WorkshopResult<()> {
        let detached = tables.ticket_mechanics.remove_right(id);
        tracing::debug!(mechanic_id = %id, detached, "detached mechanic from tickets");
        Ok(())
    }
}

impl Stored for ServiceTicket {
    fn table(tables: &Tables) -> &IndexMap<Uuid, Self> {
        &tables.tickets
    }

    fn table_mut(tables: &mut Tables) -> &mut IndexMap<Uuid, Self> {
        &mut tables.tickets
    }

    fn check_references(&self, tables: &Tables) -> WorkshopResult<()> {
        tables.require::<Customer>(self.customer_id).map(|_| ())
    }

    fn before_delete(id: Uuid, tables: &mut Tables) -> WorkshopResult<()> {
        tables.ticket_mechanics.remove_left(id);
        tables.ticket_parts.remove_left(id);
        Ok(())
    }
}

impl Stored for Part {
    fn table(tables: &Tables) -> &IndexMap<Uuid, Self> {
        &tables.parts
    }

    fn table_mut(tables: &mut Tables) -> &mut IndexMap<Uuid, Self> {
        &mut tables.parts
    }

    fn before_delete(id: Uuid, tables: &mut Tables) -> WorkshopResult<()> {
        let detached = tables.ticket_parts.remove_right(id);
        tracing::debug!(part_id = %id, detached, "detached part from tickets");
        Ok(())
    }
}

/// Reject a row whose unique fields collide with another row
fn check_unique<T: Entity>(table: &IndexMap<Uuid, T>, entity: &T) -> WorkshopResult<()> {
    for field in T::unique_fields() {
        let Some(value) = entity.field_value(field) else {
            continue;
        };
        let taken = table.values().any(|other| {
            other.id() != entity.id() && other.field_value(field).as_deref() == Some(value.as_str())
        });
        if taken {
            return Err(EntityError::AlreadyExists {
                entity_type: T::resource_name_singular().to_string(),
                field: field.to_string(),
                value,
            }
            .into());
        }
    }
    Ok(())
}

fn poisoned(e: impl std::fmt::Display) -> WorkshopError {
    StorageError::LockPoisoned {
        message: e.to_string(),
    }
    .into()
}

/// Shared handle to the in-memory tables
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure against the live tables
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> WorkshopResult<R>) -> WorkshopResult<R> {
        let tables = self.tables.read().map_err(poisoned)?;
        f(&tables)
    }

    /// Run a closure as one transaction
    ///
    /// The closure mutates a staged copy; the copy replaces the live tables
    /// only if the closure returns `Ok`.
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Tables) -> WorkshopResult<R>,
    ) -> WorkshopResult<R> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let mut staged = tables.clone();
        let result = f(&mut staged)?;
        *tables = staged;
        Ok(result)
    }
}

/// Generic [`DataService`] over one table of an [`InMemoryStore`]
pub struct InMemoryDataService<T> {
    store: InMemoryStore,
    _entity: PhantomData<fn() -> T>,
}

impl<T> InMemoryDataService<T> {
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for InMemoryDataService<T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

#[async_trait]
impl<T: Stored> DataService<T> for InMemoryDataService<T> {
    async fn create(&self, entity: T) -> WorkshopResult<T> {
        let created = self.store.transaction(|tables| tables.insert_checked(entity))?;
        tracing::info!(
            entity = T::resource_name_singular(),
            id = %created.id(),
            "created"
        );
        Ok(created)
    }

    async fn get(&self, id: &Uuid) -> WorkshopResult<Option<T>> {
        self.store.read(|tables| Ok(T::table(tables).get(id).cloned()))
    }

    async fn list(&self, params: &QueryParams) -> WorkshopResult<Page<T>> {
        let rows = self
            .store
            .read(|tables| Ok(T::table(tables).values().cloned().collect::<Vec<_>>()))?;
        tracing::debug!(entity = T::resource_name(), rows = rows.len(), "listing");
        Ok(paginate(select(rows, params), params))
    }

    async fn update(&self, id: &Uuid, mutation: Mutation<T>) -> WorkshopResult<T> {
        let updated = self.store.transaction(|tables| {
            let mut entity = tables.require::<T>(*id)?.clone();
            mutation(&mut entity)?;
            entity.touch();
            entity.check_references(tables)?;
            check_unique(T::table(tables), &entity)?;
            T::table_mut(tables).insert(*id, entity.clone());
            Ok(entity)
        })?;
        tracing::info!(entity = T::resource_name_singular(), id = %id, "updated");
        Ok(updated)
    }

    async fn delete(&self, id: &Uuid) -> WorkshopResult<()> {
        self.store.transaction(|tables| {
            tables.require::<T>(*id)?;
            T::before_delete(*id, tables)?;
            T::table_mut(tables).shift_remove(id);
            Ok(())
        })?;
        tracing::info!(entity = T::resource_name_singular(), id = %id, "deleted");
        Ok(())
    }

    async fn search(&self, field: &str, value: &str) -> WorkshopResult<Vec<T>> {
        self.store.read(|tables| {
            Ok(T::table(tables)
                .values()
                .filter(|e| e.field_value(field).as_deref() == Some(value))
                .cloned()
                .collect())
        })
    }
}

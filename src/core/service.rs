//! Service trait for entity data operations

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::{WorkshopError, WorkshopResult};
use crate::core::query::{Page, QueryParams};

/// A partial update applied to a stored entity
///
/// The closure runs inside the storage transaction against a copy of the
/// record; returning an error discards the change.
pub type Mutation<T> = Box<dyn FnOnce(&mut T) -> WorkshopResult<()> + Send>;

/// Service trait for managing data entities
///
/// Implementations provide CRUD operations for a specific entity type and
/// enforce its unique fields and references.
#[async_trait]
pub trait DataService<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: T) -> WorkshopResult<T>;

    /// Get an entity by ID
    async fn get(&self, id: &Uuid) -> WorkshopResult<Option<T>>;

    /// Get an entity by ID, failing when it does not exist
    async fn fetch(&self, id: &Uuid) -> WorkshopResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| WorkshopError::not_found(T::resource_name_singular(), *id))
    }

    /// List entities in creation order, filtered, sorted and paginated
    async fn list(&self, params: &QueryParams) -> WorkshopResult<Page<T>>;

    /// Apply a partial update to an existing entity
    async fn update(&self, id: &Uuid, mutation: Mutation<T>) -> WorkshopResult<T>;

    /// Delete an entity
    async fn delete(&self, id: &Uuid) -> WorkshopResult<()>;

    /// Search entities by exact field value
    async fn search(&self, field: &str, value: &str) -> WorkshopResult<Vec<T>>;
}

//! Entity registry collecting the routes of every entity

use axum::Router;
use std::collections::{HashMap, HashSet};

use crate::server::host::AppState;

/// Trait that describes how to build routes for an entity
///
/// Each entity (customer, mechanic, ticket, part) implements this trait to
/// contribute its routes. Paths are relative to the `/api` prefix.
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "mechanic")
    fn entity_type(&self) -> &str;

    /// The collection URL segment (e.g., "mechanics", "service-tickets");
    /// `POST` on it creates a record
    fn plural(&self) -> &str;

    /// Build the routes for this entity
    fn build_routes(&self) -> Router<AppState>;
}

/// Registry for all entities in the application
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: HashMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register an entity descriptor
    ///
    /// The entity type name is the key; registering it twice replaces the
    /// first descriptor.
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Merge the routes of every registered entity
    pub fn build_routes(&self) -> Router<AppState> {
        let mut router = Router::new();

        for descriptor in self.descriptors.values() {
            router = router.merge(descriptor.build_routes());
        }

        router
    }

    /// Collection paths of every entity, such as `/service-tickets`
    pub fn collection_paths(&self) -> HashSet<String> {
        self.descriptors
            .values()
            .map(|d| format!("/{}", d.plural()))
            .collect()
    }

    /// Get all registered entity types
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

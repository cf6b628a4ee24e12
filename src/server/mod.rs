//! HTTP server: shared state, entity route registry, middleware and builder

pub mod builder;
pub mod entity_registry;
pub mod host;
pub mod middleware;
pub mod router;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use host::AppState;

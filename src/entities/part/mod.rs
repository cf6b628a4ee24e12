//! Inventory part entity

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::PartDescriptor;
pub use handlers::*;
pub use model::{CreatePart, Part, UpdatePart};

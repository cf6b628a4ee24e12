//! Mechanic entity: workshop staff assigned to service tickets

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::MechanicDescriptor;
pub use handlers::*;
pub use model::{CreateMechanic, Mechanic, RankedMechanic, UpdateMechanic};

//! Customer entity: accounts that own service tickets

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::CustomerDescriptor;
pub use handlers::*;
pub use model::{CreateCustomer, Customer, UpdateCustomer};

//! Workshop entities: models, request payloads, handlers and route descriptors

#[macro_use]
pub mod macros;

pub mod account;
pub mod customer;
pub mod mechanic;
pub mod part;
pub mod ticket;

pub use customer::CustomerDescriptor;
pub use mechanic::MechanicDescriptor;
pub use part::PartDescriptor;
pub use ticket::TicketDescriptor;

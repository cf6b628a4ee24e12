//! Service ticket entity: repair jobs with assigned mechanics and parts

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::TicketDescriptor;
pub use model::{AddParts, CreateTicket, ServiceTicket, TicketEdit, TicketView, UpdateTicket};

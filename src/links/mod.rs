//! Ticket assignment relations (ticket ↔ mechanic, ticket ↔ part)

pub mod handlers;
pub mod service;

pub use service::{AssignmentService, InMemoryAssignmentService};

//! Core module containing the fundamental traits and types of the service

pub mod auth;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod password;
pub mod query;
pub mod service;
pub mod store;
pub mod validation;

pub use auth::{Authenticated, AuthPolicy, Principal, Role, TokenService};
pub use entity::{Account, Entity};
pub use error::{WorkshopError, WorkshopResult};
pub use password::PasswordService;
pub use query::{Page, QueryParams};
pub use service::{DataService, Mutation};

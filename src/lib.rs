//! # Workshop API
//!
//! A REST API for a mechanic workshop: customers, mechanics, service tickets
//! and inventory parts, with bearer-token authentication and paginated lists.
//!
//! ## Features
//!
//! - **Entity Store**: transactional in-memory tables, or a SQLite database
//!   (`sqlite` feature), with uniqueness and referential checks
//! - **Assignments**: idempotent, all-or-nothing mechanic and part
//!   assignment on tickets
//! - **Authentication**: HS256 tokens carrying the caller's id and role,
//!   Argon2id password hashes
//! - **Pagination**: `page`/`per_page` lists with `filter` and `sort`
//! - **Middleware**: response cache and fixed-window rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use workshop::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = WorkshopConfig::from_env()?;
//!     ServerBuilder::from_config(config).serve().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod links;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthPolicy, Authenticated, Authenticator, Principal, Role, TokenService},
        entity::{Account, Entity},
        error::{WorkshopError, WorkshopResult},
        password::PasswordService,
        query::{Page, PageLimit, QueryParams},
        service::{DataService, Mutation},
        validation::ValidatedJson,
    };

    // === Entities ===
    pub use crate::entities::{
        customer::Customer,
        mechanic::{Mechanic, RankedMechanic},
        part::Part,
        ticket::{ServiceTicket, TicketView},
    };

    // === Assignments ===
    pub use crate::links::{AssignmentService, InMemoryAssignmentService};

    // === Storage ===
    pub use crate::storage::{Backend, InMemoryDataService, InMemoryStore};
    #[cfg(feature = "sqlite")]
    pub use crate::storage::{SqliteAssignmentService, SqliteDataService, SqliteStore};

    // === Config ===
    pub use crate::config::WorkshopConfig;

    // === Server ===
    pub use crate::server::{AppState, EntityDescriptor, EntityRegistry, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}

//! Shared application state
//!
//! Every dependency a handler needs is constructed explicitly and handed to
//! the router through [`AppState`]; nothing is global, so each test can build
//! an isolated instance.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRef;

use crate::core::auth::{AccountDirectory, Authenticator, Principal, Role, TokenService};
use crate::core::error::WorkshopResult;
use crate::core::password::PasswordService;
use crate::core::query::PageLimit;
use crate::core::service::DataService;
use crate::entities::customer::Customer;
use crate::entities::mechanic::Mechanic;
use crate::entities::part::Part;
use crate::entities::ticket::ServiceTicket;
use crate::links::service::{AssignmentService, InMemoryAssignmentService};
use crate::storage::{Backend, InMemoryDataService, InMemoryStore};
#[cfg(feature = "sqlite")]
use crate::storage::{SqliteAssignmentService, SqliteDataService, SqliteStore};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub customers: Arc<dyn DataService<Customer>>,
    pub mechanics: Arc<dyn DataService<Mechanic>>,
    pub tickets: Arc<dyn DataService<ServiceTicket>>,
    pub parts: Arc<dyn DataService<Part>>,
    /// Ticket ↔ mechanic and ticket ↔ part relations
    pub assignments: Arc<dyn AssignmentService>,
    pub tokens: Arc<TokenService>,
    pub authenticator: Authenticator,
    pub passwords: PasswordService,
    /// Upper bound for `per_page`
    pub max_per_page: usize,
}

/// The data services of one backend
struct Services {
    customers: Arc<dyn DataService<Customer>>,
    mechanics: Arc<dyn DataService<Mechanic>>,
    tickets: Arc<dyn DataService<ServiceTicket>>,
    parts: Arc<dyn DataService<Part>>,
    assignments: Arc<dyn AssignmentService>,
}

impl Services {
    fn in_memory(store: &InMemoryStore) -> Self {
        Self {
            customers: Arc::new(InMemoryDataService::<Customer>::new(store.clone())),
            mechanics: Arc::new(InMemoryDataService::<Mechanic>::new(store.clone())),
            tickets: Arc::new(InMemoryDataService::<ServiceTicket>::new(store.clone())),
            parts: Arc::new(InMemoryDataService::<Part>::new(store.clone())),
            assignments: Arc::new(InMemoryAssignmentService::new(store.clone())),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(store: &SqliteStore) -> Self {
        Self {
            customers: Arc::new(SqliteDataService::<Customer>::new(store)),
            mechanics: Arc::new(SqliteDataService::<Mechanic>::new(store)),
            tickets: Arc::new(SqliteDataService::<ServiceTicket>::new(store)),
            parts: Arc::new(SqliteDataService::<Part>::new(store)),
            assignments: Arc::new(SqliteAssignmentService::new(store)),
        }
    }
}

/// Resolves token principals against the customer and mechanic tables
struct AccountTables {
    customers: Arc<dyn DataService<Customer>>,
    mechanics: Arc<dyn DataService<Mechanic>>,
}

#[async_trait]
impl AccountDirectory for AccountTables {
    async fn account_exists(&self, principal: &Principal) -> WorkshopResult<bool> {
        Ok(match principal.role {
            Role::Customer => self.customers.get(&principal.id).await?.is_some(),
            Role::Mechanic => self.mechanics.get(&principal.id).await?.is_some(),
        })
    }
}

impl AppState {
    /// Wire every service to one backend
    pub fn new(
        backend: &Backend,
        tokens: TokenService,
        passwords: PasswordService,
        max_per_page: usize,
    ) -> Self {
        let services = match backend {
            Backend::InMemory(store) => Services::in_memory(store),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(store) => Services::sqlite(store),
        };
        let tokens = Arc::new(tokens);
        let accounts = AccountTables {
            customers: services.customers.clone(),
            mechanics: services.mechanics.clone(),
        };
        Self {
            authenticator: Authenticator::new(tokens.clone(), Arc::new(accounts)),
            customers: services.customers,
            mechanics: services.mechanics,
            tickets: services.tickets,
            parts: services.parts,
            assignments: services.assignments,
            tokens,
            passwords,
            max_per_page,
        }
    }
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

impl FromRef<AppState> for PageLimit {
    fn from_ref(state: &AppState) -> Self {
        PageLimit(state.max_per_page)
    }
}

//! ServerBuilder for assembling the workshop API

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use super::entity_registry::{EntityDescriptor, EntityRegistry};
use super::host::AppState;
use super::middleware::{RateLimiters, ResponseCache};
use super::router::build_router;
use crate::config::WorkshopConfig;
use crate::core::auth::TokenService;
use crate::core::password::PasswordService;
use crate::entities::{CustomerDescriptor, MechanicDescriptor, PartDescriptor, TicketDescriptor};
use crate::storage::Backend;

/// Builder for the HTTP application
///
/// Every collaborator (store, token service, hasher, cache, limiters) is
/// constructed here from the configuration and handed to the router.
/// Without an explicit backend, `build` uses fresh in-memory tables and
/// `serve` opens the database named by `database.url`.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::from_config(WorkshopConfig::from_env()?).build()?;
/// ```
pub struct ServerBuilder {
    config: WorkshopConfig,
    backend: Option<Backend>,
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a builder with no entities registered
    pub fn new(config: WorkshopConfig) -> Self {
        Self {
            config,
            backend: None,
            entity_registry: EntityRegistry::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Create a builder with every workshop entity registered
    pub fn from_config(config: WorkshopConfig) -> Self {
        Self::new(config)
            .register_entity(CustomerDescriptor)
            .register_entity(MechanicDescriptor)
            .register_entity(TicketDescriptor)
            .register_entity(PartDescriptor)
    }

    /// Use an already opened store
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn register_entity(mut self, descriptor: impl EntityDescriptor + 'static) -> Self {
        self.entity_registry.register(Box::new(descriptor));
        self
    }

    /// Add routes outside `/api`; they bypass the cache and rate limits
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Construct the shared handler state
    pub fn build_state(&self) -> Result<AppState> {
        let secret = self.config.signing_secret();
        let tokens = TokenService::new(secret.as_bytes());
        let passwords = PasswordService::new(&self.config.password)?;
        let backend = self.backend.clone().unwrap_or_default();
        Ok(AppState::new(
            &backend,
            tokens,
            passwords,
            self.config.pagination.max_per_page,
        ))
    }

    /// Build the router
    pub fn build(self) -> Result<Router> {
        if self.entity_registry.is_empty() {
            anyhow::bail!("no entities registered");
        }

        let state = self.build_state()?;
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(
            self.config.cache.ttl_secs,
        )));
        let limiters = RateLimiters::from_config(
            &self.config.rate_limit,
            self.entity_registry.collection_paths(),
        );

        tracing::debug!(entities = ?self.entity_registry.entity_types(), "building router");
        Ok(build_router(
            state,
            &self.entity_registry,
            cache,
            limiters,
            self.custom_routes,
        ))
    }

    /// Serve the application on the configured address with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C); in-flight requests are allowed to
    /// complete before the process exits.
    pub async fn serve(mut self) -> Result<()> {
        let addr = self.config.bind_addr()?;
        let backend = match self.backend.take() {
            Some(backend) => backend,
            None => Backend::open(&self.config.database).await?,
        };
        tracing::info!(storage = backend.kind(), "storage ready");
        self.backend = Some(backend);
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}


/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

//! Storage implementations
//!
//! [`InMemoryStore`] keeps every table in process memory and is the default.
//! With the `sqlite` feature, [`SqliteStore`] persists to a database file
//! named by `database.url`.

pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::{InMemoryDataService, InMemoryStore, LinkTable, Stored, Tables};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqlTable, SqliteAssignmentService, SqliteDataService, SqliteStore};

use crate::config::DatabaseConfig;

/// The store shared by every service of one application instance
#[derive(Clone)]
pub enum Backend {
    InMemory(InMemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteStore),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::InMemory(InMemoryStore::new())
    }
}

impl Backend {
    /// Open the configured database, or empty in-memory tables without a URL
    pub async fn open(config: &DatabaseConfig) -> anyhow::Result<Self> {
        match config.url.as_deref() {
            None => Ok(Self::default()),
            #[cfg(feature = "sqlite")]
            Some(url) => {
                let store = SqliteStore::connect(url, config.max_connections).await?;
                Ok(Backend::Sqlite(store))
            }
            #[cfg(not(feature = "sqlite"))]
            Some(url) => {
                anyhow::bail!("database url '{url}' needs the `sqlite` feature")
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::InMemory(_) => "in-memory",
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(_) => "sqlite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_without_url_is_in_memory() {
        let backend = Backend::open(&DatabaseConfig::default()).await.unwrap();
        assert_eq!(backend.kind(), "in-memory");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_open_with_url_is_sqlite() {
        let config = DatabaseConfig {
            url: Some("sqlite::memory:".into()),
            max_connections: 1,
        };
        let backend = Backend::open(&config).await.unwrap();
        assert_eq!(backend.kind(), "sqlite");
    }
}

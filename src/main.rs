use anyhow::Result;
use tracing_subscriber::EnvFilter;
use workshop::config::WorkshopConfig;
use workshop::server::ServerBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("workshop=info,tower_http=info")),
        )
        .init();

    let config = WorkshopConfig::from_env()?;
    ServerBuilder::from_config(config).serve().await
}

//! allocation-advisor server entry point.

use allocation_advisor::{api, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("allocation_advisor=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Starting allocation-advisor (cache: {}, ttl: {}h, max: {})",
        if config.cache.enabled { "on" } else { "off" },
        config.cache.ttl.as_secs() / 3600,
        config.cache.max_size
    );

    api::serve(config).await
}

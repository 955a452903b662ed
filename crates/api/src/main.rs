use anyhow::Context;
use tracing::{info, warn};

use stockpool_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    stockpool_observability::init(config.log.format);

    if config.uses_dev_secret() {
        warn!("STOCKPOOL_AUTH__JWT_SECRET not set; using insecure dev default");
    }

    let app = stockpool_api::app::build_app_from_config(&config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %listener.local_addr()?,
        environment = %config.environment,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

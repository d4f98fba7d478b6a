use crate::source::ContentSource;
use crate::{web, Config};
use anyhow::Result;
use std::sync::Arc;

pub async fn run(
    config: Config,
    source: Arc<dyn ContentSource>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = Arc::new(web::AppState::new(config, source)?);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server at http://{}", addr);

    web::serve(state, &addr).await?;

    Ok(())
}

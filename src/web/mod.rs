pub mod cache;
mod error;
mod extractors;
mod handlers;
pub mod pages;
mod routes;
pub mod security;
mod state;

pub use cache::{Lookup, PageCache, RenderedPage};
pub use pages::PageKey;
pub use state::AppState;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Result<Router> {
    let csp = security::content_security_policy(
        &state.config.source.endpoint,
        &state.config.comments.script_src,
    );
    let csp = HeaderValue::from_str(&csp).context("Content-Security-Policy is not a valid header")?;

    Ok(Router::new()
        .merge(routes::public_routes())
        .layer(middleware::from_fn_with_state(
            csp,
            security::apply_security_headers,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Generates the listing and the posts on its first page into the cache.
/// Any failure is fatal, as it would be for a static build.
pub async fn prerender(state: &Arc<AppState>) -> Result<usize> {
    let index = pages::generate(state, &PageKey::Index).await?;
    state.cache.store(&PageKey::Index.path(), index);

    let mut units = JoinSet::new();
    for uid in pages::static_paths(state).await? {
        let state = state.clone();
        units.spawn(async move {
            let key = PageKey::Post(uid);
            let page = pages::generate(&state, &key).await?;
            state.cache.store(&key.path(), page);
            anyhow::Ok(())
        });
    }

    while let Some(result) = units.join_next().await {
        result??;
    }

    Ok(state.cache.len())
}

pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let count = prerender(&state).await?;
    tracing::info!("Pre-rendered {} page(s)", count);

    let app = router(state)?;
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

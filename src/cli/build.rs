use crate::source::ContentSource;
use crate::web::{pages, AppState};
use crate::Config;
use anyhow::{Context, Result};
use axum::http::StatusCode;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

pub async fn run(config: Config, source: Arc<dyn ContentSource>, output_dir: &Path) -> Result<()> {
    let state = Arc::new(AppState::new(config, source)?);

    fs::create_dir_all(output_dir)?;

    tracing::info!("Building static site to {}", output_dir.display());

    build_index(&state, output_dir).await?;
    build_posts(&state, output_dir).await?;
    build_not_found(&state, output_dir)?;

    tracing::info!("Static site build complete");
    Ok(())
}

async fn build_index(state: &AppState, output_dir: &Path) -> Result<()> {
    let page = pages::render_index(state, None).await?;
    fs::write(output_dir.join("index.html"), page.html)?;
    tracing::info!("Built index");
    Ok(())
}

/// Renders every post. Each post is an independent unit; the first failure
/// aborts the build.
async fn build_posts(state: &Arc<AppState>, output_dir: &Path) -> Result<usize> {
    let listing = state
        .listing
        .load_all(None)
        .await
        .context("Failed to load the post collection")?;

    let posts_dir = output_dir.join("post");
    fs::create_dir_all(&posts_dir)?;

    let mut units = JoinSet::new();
    for post in listing.posts {
        if !validate_uid(&post.uid) {
            tracing::warn!("Skipping post with unusable uid '{}'", post.uid);
            continue;
        }

        let state = state.clone();
        let post_dir: PathBuf = posts_dir.join(&post.uid);
        units.spawn(async move {
            let page = pages::render_post(&state, &post.uid, None).await?;
            if page.status == StatusCode::NOT_FOUND {
                tracing::warn!("Post '{}' disappeared during the build", post.uid);
                return anyhow::Ok(false);
            }
            tokio::fs::create_dir_all(&post_dir).await?;
            tokio::fs::write(post_dir.join("index.html"), page.html).await?;
            Ok(true)
        });
    }

    let mut built = 0;
    while let Some(result) = units.join_next().await {
        if result?? {
            built += 1;
        }
    }

    tracing::info!("Built {} posts", built);
    Ok(built)
}

fn build_not_found(state: &AppState, output_dir: &Path) -> Result<()> {
    let html = pages::render_not_found(state)?;
    fs::write(output_dir.join("404.html"), html)?;
    Ok(())
}

/// Uids become directory names, so only slug-like values are accepted.
pub fn validate_uid(uid: &str) -> bool {
    if uid.is_empty() || uid.len() > 200 {
        return false;
    }
    uid.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

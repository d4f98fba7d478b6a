//! Page generation shared by the static build and the server.

use crate::models::PostPage;
use crate::services::comments::{self, WidgetContainer};
use crate::services::dates::Locale;
use crate::services::richtext;
use crate::web::cache::RenderedPage;
use crate::web::state::AppState;
use anyhow::{Context as _, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tera::Context;

/// A generated page: the post listing or one post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKey {
    Index,
    Post(String),
}

impl PageKey {
    pub fn path(&self) -> String {
        match self {
            Self::Index => "/".to_string(),
            Self::Post(uid) => format!("/post/{}", uid),
        }
    }

    pub fn revalidate_after(&self, state: &AppState) -> Duration {
        match self {
            Self::Index => state.config.revalidate.listing(),
            Self::Post(_) => state.config.revalidate.post(),
        }
    }
}

/// Interface strings for the configured locale.
#[derive(Serialize)]
struct Labels {
    load_more: &'static str,
    loading: &'static str,
    load_error: &'static str,
    exit_preview: &'static str,
    minutes: &'static str,
    previous: &'static str,
    next: &'static str,
    not_found: &'static str,
    back_home: &'static str,
}

fn labels(locale: Locale) -> Labels {
    match locale {
        Locale::PtBr => Labels {
            load_more: "Carregar mais posts",
            loading: "Carregando...",
            load_error: "Erro ao carregar mais posts: ",
            exit_preview: "Sair do modo Preview",
            minutes: "min",
            previous: "Post anterior",
            next: "Próximo post",
            not_found: "Post não encontrado",
            back_home: "Voltar para a página inicial",
        },
        Locale::En => Labels {
            load_more: "Load more posts",
            loading: "Loading...",
            load_error: "Error fetching more posts: ",
            exit_preview: "Exit preview mode",
            minutes: "min",
            previous: "Previous post",
            next: "Next post",
            not_found: "Post not found",
            back_home: "Back to the home page",
        },
    }
}

fn make_context(state: &AppState, content_ref: Option<&str>) -> Context {
    let locale = state.dates.locale();

    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    ctx.insert("lang", locale.tag());
    ctx.insert("labels", &labels(locale));
    ctx.insert("months", &locale.month_abbrevs().join(","));
    ctx.insert("timezone", state.dates.timezone().name());
    ctx.insert("preview", &content_ref.is_some());
    ctx.insert("exit_preview_url", &state.config.preview.exit_url);
    ctx
}

pub async fn render_index(state: &AppState, content_ref: Option<&str>) -> Result<RenderedPage> {
    let pagination = state
        .listing
        .load_initial(content_ref)
        .await
        .context("Failed to load the post listing")?;

    let mut ctx = make_context(state, content_ref);
    ctx.insert("posts", &pagination.results);
    ctx.insert("next_page", &pagination.next_page);

    let html = state.templates.render("public/index.html", &ctx)?;
    Ok(RenderedPage::ok(html))
}

/// Renders one post. An unknown uid renders the not-found page with a 404
/// status rather than failing.
pub async fn render_post(
    state: &AppState,
    uid: &str,
    content_ref: Option<&str>,
) -> Result<RenderedPage> {
    let view = match state.detail.assemble(uid, content_ref).await {
        Ok(view) => view,
        Err(e) if e.is_not_found() => {
            tracing::info!("Post '{}' not found", uid);
            return Ok(RenderedPage::not_found(render_not_found(state)?));
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to load post '{}'", uid)),
    };

    let path = PageKey::Post(uid.to_string()).path();
    let mut container = WidgetContainer::new(&path);
    comments::embed(&mut container, &state.config.comments);

    let mut ctx = make_context(state, content_ref);
    ctx.insert("view", &view);
    ctx.insert("comments", &container.html());
    ctx.insert("blocks", &render_blocks(&view.post));

    let html = state.templates.render("public/post.html", &ctx)?;
    Ok(RenderedPage::ok(html))
}

#[derive(Serialize)]
struct BlockView {
    heading: String,
    html: String,
}

fn render_blocks(post: &PostPage) -> Vec<BlockView> {
    post.content
        .iter()
        .map(|block| BlockView {
            heading: block.heading.clone(),
            html: richtext::as_html(&block.body),
        })
        .collect()
}

pub fn render_fallback(state: &AppState) -> Result<String> {
    let ctx = make_context(state, None);
    Ok(state.templates.render("public/fallback.html", &ctx)?)
}

pub fn render_not_found(state: &AppState) -> Result<String> {
    let ctx = make_context(state, None);
    Ok(state.templates.render("public/404.html", &ctx)?)
}

pub async fn generate(state: &AppState, key: &PageKey) -> Result<RenderedPage> {
    match key {
        PageKey::Index => render_index(state, None).await,
        PageKey::Post(uid) => render_post(state, uid, None).await,
    }
}

/// Uids pre-rendered ahead of any request: the posts on the first listing
/// page. Every other post is generated on its first request.
pub async fn static_paths(state: &AppState) -> Result<Vec<String>> {
    let pagination = state.listing.load_initial(None).await?;
    Ok(pagination.results.into_iter().map(|p| p.uid).collect())
}

/// Generates `key` in the background and stores the result. A failed
/// generation keeps whatever copy the cache already holds.
pub fn spawn_generation(state: Arc<AppState>, key: PageKey) {
    let path = key.path();
    if !state.cache.begin_generation(&path) {
        return;
    }

    tokio::spawn(async move {
        match generate(&state, &key).await {
            Ok(page) => {
                tracing::info!("Generated {} ({})", path, page.status);
                state.cache.store(&path, page);
            }
            Err(e) => tracing::warn!("Regeneration of {} failed: {:#}", path, e),
        }
        state.cache.end_generation(&path);
    });
}

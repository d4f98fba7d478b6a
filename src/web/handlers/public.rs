use crate::web::cache::{Lookup, RenderedPage};
use crate::web::error::AppResult;
use crate::web::extractors::PreviewRef;
use crate::web::pages::{self, PageKey};
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;

fn page_response(page: RenderedPage) -> Response {
    (page.status, Html(page.html)).into_response()
}

/// Preview pages always skip the cache; they show unpublished content.
fn preview_response(page: RenderedPage) -> Response {
    (
        page.status,
        [(header::CACHE_CONTROL, "private, no-store")],
        Html(page.html),
    )
        .into_response()
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    PreviewRef(content_ref): PreviewRef,
) -> AppResult<Response> {
    if let Some(ref r) = content_ref {
        let page = pages::render_index(&state, Some(r)).await?;
        return Ok(preview_response(page));
    }

    serve_cached(state, PageKey::Index).await
}

pub async fn post(
    State(state): State<Arc<AppState>>,
    PreviewRef(content_ref): PreviewRef,
    Path(uid): Path<String>,
) -> AppResult<Response> {
    if let Some(ref r) = content_ref {
        let page = pages::render_post(&state, &uid, Some(r)).await?;
        return Ok(preview_response(page));
    }

    serve_cached(state, PageKey::Post(uid)).await
}

async fn serve_cached(state: Arc<AppState>, key: PageKey) -> AppResult<Response> {
    let path = key.path();

    match state.cache.lookup(&path, key.revalidate_after(&state)) {
        Lookup::Fresh(page) => Ok(page_response(page)),
        Lookup::Stale(page) => {
            pages::spawn_generation(state.clone(), key);
            Ok(page_response(page))
        }
        Lookup::Missing => match key {
            PageKey::Index => {
                let page = pages::generate(&state, &key).await?;
                state.cache.store(&path, page.clone());
                Ok(page_response(page))
            }
            PageKey::Post(_) => {
                pages::spawn_generation(state.clone(), key);
                let html = pages::render_fallback(&state)?;
                Ok((
                    StatusCode::OK,
                    [(header::CACHE_CONTROL, "no-store")],
                    Html(html),
                )
                    .into_response())
            }
        },
    }
}

pub async fn exit_preview(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build(state.config.preview.cookie.clone()).path("/");
    (jar.remove(cookie), Redirect::to("/"))
}

pub async fn not_found(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let html = pages::render_not_found(&state)?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

use crate::web::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Content reference of an active preview session: the `ref` query
/// parameter, or else the preview cookie.
pub struct PreviewRef(pub Option<String>);

impl FromRequestParts<Arc<AppState>> for PreviewRef {
    type Rejection = std::convert::Infallible;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let from_query = parts.uri.query().and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "ref")
                .map(|(_, v)| v.into_owned())
        });

        let cookie_name = state.config.preview.cookie.clone();
        let from_cookie = CookieJar::from_headers(&parts.headers)
            .get(&cookie_name)
            .map(|c| c.value().to_string());

        let content_ref = from_query.or(from_cookie).filter(|r| !r.is_empty());
        Box::pin(async move { Ok(PreviewRef(content_ref)) })
    }
}

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response};
use axum::middleware::Next;
use url::Url;

/// Content-Security-Policy for the public pages: inline styles and the
/// load-more script, banner images from any https host, the comments widget
/// and direct fetches of pagination cursors from the content source.
pub fn content_security_policy(source_endpoint: &str, comments_src: &str) -> String {
    let origin = |raw: &str| {
        Url::parse(raw)
            .ok()
            .map(|u| u.origin().ascii_serialization())
            .filter(|o| o != "null")
    };

    let connect = origin(source_endpoint).unwrap_or_default();
    let widget = origin(comments_src).unwrap_or_default();

    format!(
        "default-src 'self'; script-src 'self' 'unsafe-inline' {widget}; style-src 'self' 'unsafe-inline'; img-src 'self' https: data:; connect-src 'self' {connect}; frame-src {widget}; frame-ancestors 'none'; base-uri 'self'",
        widget = widget,
        connect = connect,
    )
}

pub fn security_headers<B>(mut response: Response<B>, csp: &HeaderValue) -> Response<B> {
    let headers = response.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(header::CONTENT_SECURITY_POLICY, csp.clone());

    response
}

pub async fn apply_security_headers(
    axum::extract::State(csp): axum::extract::State<HeaderValue>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let response = next.run(request).await;
    security_headers(response, &csp)
}

use crate::source::SourceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Handler error. Content source outages surface as 502 so a proxy in front
/// can tell them apart from rendering bugs.
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<SourceError>() {
            Some(SourceError::Unavailable(_)) | Some(SourceError::MalformedResponse(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Some(SourceError::NotFound { .. }) => StatusCode::NOT_FOUND,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("Request failed ({}): {:#}", status, self.0);
        let body = match status {
            StatusCode::BAD_GATEWAY => "Content source unavailable",
            StatusCode::NOT_FOUND => "Not found",
            _ => "Internal server error",
        };
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

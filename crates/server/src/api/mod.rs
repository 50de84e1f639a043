pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod movies;
pub mod routes;
pub mod torrents;

pub use routes::create_router;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use moviebox_core::{CatalogError, DetailsError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Unknown ids are 404, everything else is a server error.
pub(crate) fn catalog_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::UnknownMovie(_) => error_response(StatusCode::NOT_FOUND, e),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Unsupported languages are 400, other details failures are 502.
pub(crate) fn details_error(e: DetailsError) -> ApiError {
    match e {
        DetailsError::UnsupportedLanguage(_) => error_response(StatusCode::BAD_REQUEST, e),
        _ => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

/// Run a blocking catalog operation off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .map_err(catalog_error)
}

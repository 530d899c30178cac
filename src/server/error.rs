//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, ApiError>`; any [`vidshelf_common::Error`]
//! converts with `?`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vidshelf_common::Error;

use crate::streaming::range::unsatisfiable_content_range;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct ApiError {
    inner: Error,
}

impl ApiError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::new(Error::from(e))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<Error>() {
            Ok(inner) => Self::new(inner),
            Err(e) => Self::new(Error::internal(format!("{:#}", e))),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            Error::NotFound(_) => "not_found",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::ProbeFailed(_) => "probe_error",
            Error::Database(_) => "database_error",
            Error::Conflict(_) => "conflict",
            Error::Timeout(_) => "timeout",
            Error::Io(_) => "io_error",
            Error::InvalidInput(_) => "validation_error",
            Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Error::RangeNotSatisfiable { size, .. } = &self.inner {
            if let Ok(value) = unsatisfiable_content_range(*size).parse() {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        response
    }
}

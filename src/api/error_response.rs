//! HTTP error response handling for the API
//!
//! Converts domain errors into HTTP responses with the right status code and
//! a JSON body carrying only the generic public message. Diagnostic detail
//! (tool stderr, paths) is logged here, at the job boundary, and goes no
//! further.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Validation(detail) => {
                tracing::debug!(%detail, "rejecting invalid request")
            }
            other => tracing::error!(error = %other, "job failed"),
        }

        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let api_error: ApiError = (&self).into();

        (status_code, Json(api_error)).into_response()
    }
}

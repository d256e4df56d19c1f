//! A single error enum for the whole crate.
//!
//! Adapter handlers return `Result<T, PlasmaError>` and get the right HTTP
//! status for free via `IntoResponse`; startup code matches on the fatal
//! variants directly and maps them to process exit codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum PlasmaError {
    Config(String),
    Bind(std::io::Error),
    Tls(String),
    InvalidEventType(String),
    UpstreamExhausted(String),
    Internal(String),
}

impl fmt::Display for PlasmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlasmaError::Config(msg) => write!(f, "configuration error: {msg}"),
            PlasmaError::Bind(err) => write!(f, "failed to bind listener: {err}"),
            PlasmaError::Tls(msg) => write!(f, "tls error: {msg}"),
            PlasmaError::InvalidEventType(t) => write!(f, "invalid event type: {t}"),
            PlasmaError::UpstreamExhausted(msg) => write!(f, "upstream driver exhausted: {msg}"),
            PlasmaError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PlasmaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlasmaError::Bind(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlasmaError {
    fn from(err: std::io::Error) -> Self {
        PlasmaError::Bind(err)
    }
}

impl IntoResponse for PlasmaError {
    fn into_response(self) -> Response {
        let status = match &self {
            PlasmaError::InvalidEventType(_) => StatusCode::BAD_REQUEST,
            PlasmaError::Config(_) => StatusCode::BAD_REQUEST,
            PlasmaError::Tls(_) | PlasmaError::Bind(_) | PlasmaError::UpstreamExhausted(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PlasmaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

pub type PlasmaResult<T> = Result<T, PlasmaError>;

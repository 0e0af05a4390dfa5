//! Response bodies and error mapping.
//!
//! # Responsibilities
//! - Serialize a resolved route as JSON
//! - Map resolution failures to HTTP status codes
//!
//! # Design Decisions
//! - No route is a 404, a refused token a 403, a failing collaborator a 503
//! - Error bodies carry the request id so logs and clients line up

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolution::collaborators::ContentRecord;
use crate::resolution::error::ResolveError;
use crate::routing::value::ParamMap;

/// The content record that served a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: String,
    pub uri: String,
}

impl ContentSummary {
    pub fn of(record: &dyn ContentRecord) -> Self {
        Self {
            id: record.id().to_string(),
            uri: record.uri().to_string(),
        }
    }
}

/// Body of a successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    pub request_id: Uuid,
    pub handler: String,
    pub params: ParamMap,
    pub content: Option<ContentSummary>,
}

/// Body of a failed resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub request_id: Uuid,
    pub error: String,
    pub message: String,
}

/// A failure ready to be sent to the client.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl HttpError {
    pub fn new(status: StatusCode, request_id: Uuid, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                request_id,
                error: error.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn from_resolve(request_id: Uuid, err: &ResolveError) -> Self {
        let (status, code) = match err {
            ResolveError::NoRoute => (StatusCode::NOT_FOUND, "no_route"),
            ResolveError::InvalidToken(_) => (StatusCode::FORBIDDEN, "invalid_token"),
            ResolveError::Collaborator(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        };
        Self::new(status, request_id, code, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

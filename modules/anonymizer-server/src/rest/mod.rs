//! JSON handlers for the user and IoT feeds, plus the mapping from domain
//! errors to HTTP responses.

pub mod iot;
pub mod user;

use anonymizer_core::{AnonymizerError, FieldViolation, Resource, Violations};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

const STORED: &str = "Stored";
const NOT_FOUND: &str = "Info requested not found";
const MALFORMED: &str = "Request validation failed";
const STORE_FAILED: &str = "Something went wrong storing the data";
const EXTRACT_FAILED: &str = "Something went wrong extracting data";

/// What the handler was doing when storage failed.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Store,
    /// Extraction of the named request
    Extract(&'a str),
}

pub fn stored(resource: Resource) -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({"resource": resource, "status": STORED})),
    )
        .into_response()
}

pub fn error_response(resource: Resource, operation: Operation<'_>, err: &AnonymizerError) -> Response {
    match err {
        AnonymizerError::MalformedRequest(violations) => malformed(resource, violations),
        AnonymizerError::NotFound { resource } => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "detail": {"resource": resource, "status": NOT_FOUND}
            })),
        )
            .into_response(),
        AnonymizerError::Storage { resource, source } => {
            let detail = match operation {
                Operation::Store => {
                    warn!(error = %source, resource = %resource, "Failed to store data");
                    serde_json::json!({"resource": resource, "status": STORE_FAILED})
                }
                Operation::Extract(request) => {
                    warn!(error = %source, resource = %resource, request, "Failed to extract data");
                    serde_json::json!({
                        "resource": resource,
                        "request": request,
                        "status": EXTRACT_FAILED,
                    })
                }
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": detail })),
            )
                .into_response()
        }
    }
}

/// A body that did not deserialize is reported like any other validation failure.
pub fn rejection_response(resource: Resource, rejection: JsonRejection) -> Response {
    let violations = Violations::from(FieldViolation::new(&[], rejection.body_text()));
    malformed(resource, &violations)
}

fn malformed(resource: Resource, violations: &Violations) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({
            "detail": {
                "resource": resource,
                "status": MALFORMED,
                "violations": violations,
            }
        })),
    )
        .into_response()
}

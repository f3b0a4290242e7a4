use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse};

use crate::domain::error::DomainError;
use crate::domain::ports::AuthError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.backoffice.dev/{}", code))
        .with_code(code)
        .with_instance(instance);
    ProblemResponse(problem)
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::NotFound { entity, .. } => from_parts(
            StatusCode::NOT_FOUND,
            "BACKOFFICE_NOT_FOUND",
            &format!("{entity} not found"),
            e.to_string(),
            instance,
        ),
        DomainError::InvalidId { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "BACKOFFICE_INVALID_ID",
            "Invalid id",
            e.to_string(),
            instance,
        ),
        DomainError::Validation { .. } => from_parts(
            StatusCode::BAD_REQUEST,
            "BACKOFFICE_VALIDATION",
            "Validation error",
            e.to_string(),
            instance,
        ),
        DomainError::EmptyUpdate => from_parts(
            StatusCode::BAD_REQUEST,
            "BACKOFFICE_EMPTY_UPDATE",
            "Empty update",
            e.to_string(),
            instance,
        ),
        DomainError::Conflict { .. } => from_parts(
            StatusCode::CONFLICT,
            "BACKOFFICE_CONFLICT",
            "Conflict",
            e.to_string(),
            instance,
        ),
        DomainError::Unauthenticated { .. } => from_parts(
            StatusCode::UNAUTHORIZED,
            "BACKOFFICE_UNAUTHENTICATED",
            "Unauthenticated",
            e.to_string(),
            instance,
        ),
        DomainError::ExternalService { service, .. } => {
            tracing::error!(error = ?e, "External service failure");
            from_parts(
                StatusCode::BAD_GATEWAY,
                "BACKOFFICE_EXTERNAL_SERVICE",
                "External service failure",
                format!("The {service} service did not respond usefully"),
                instance,
            )
        }
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "BACKOFFICE_INTERNAL",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    }
}

pub fn map_auth_error(e: &AuthError, instance: &str) -> ProblemResponse {
    if let AuthError::KeySet(_) = e {
        tracing::error!(error = %e, "Signing keys unavailable");
    }
    from_parts(
        StatusCode::UNAUTHORIZED,
        "BACKOFFICE_UNAUTHENTICATED",
        "Unauthenticated",
        e.to_string(),
        instance,
    )
}

/// Body that failed to parse as the expected JSON document.
pub fn map_json_rejection(rejection: &JsonRejection, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "BACKOFFICE_BAD_BODY",
        "Malformed request body",
        rejection.body_text(),
        instance,
    )
}

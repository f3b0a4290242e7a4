use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use modkit::api::problem::ProblemResponse;
use tracing::debug;

use crate::api::rest::error::{from_parts, map_auth_error};
use crate::contract::IdentityClaims;
use crate::domain::ports::{AuthError, IdentityVerifier};

/// Claims of a caller that presented a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub IdentityClaims);

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::Malformed("authorization header is not ASCII".into()))?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AuthError::Malformed("expected 'Bearer <token>'".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::Malformed("expected 'Bearer <token>'".into()));
    }
    Ok(token.trim())
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_string();
        let verifier = parts
            .extensions
            .get::<Arc<dyn IdentityVerifier>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("Identity verifier is not installed on the router");
                from_parts(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "BACKOFFICE_INTERNAL",
                    "Internal error",
                    "Authentication is not available",
                    &instance,
                )
            })?;

        let token = bearer_token(parts).map_err(|e| map_auth_error(&e, &instance))?;
        match verifier.verify(token).await {
            Ok(claims) => Ok(Authenticated(claims)),
            Err(e) => {
                debug!("Bearer token rejected: {}", e);
                Err(map_auth_error(&e, &instance))
            }
        }
    }
}

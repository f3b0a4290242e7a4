use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// RFC 9457 Problem Details, extended with an application `code`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    title = "Problem",
    description = "RFC 9457 Problem Details for HTTP APIs"
)]
pub struct Problem {
    /// URI reference identifying the problem type.
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Path of the request that failed.
    pub instance: String,
    /// Stable machine-readable code, e.g. `BACKOFFICE_NOT_FOUND`.
    pub code: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

/// Renders a [`Problem`] with its status and `application/problem+json`.
/// 401 responses also carry a `WWW-Authenticate: Bearer` challenge.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = axum::Json(self.0).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        if status == StatusCode::UNAUTHORIZED {
            resp.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(resp: &Response) -> &str {
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    #[test]
    fn conflict_renders_as_problem_json() {
        let problem = Problem::new(StatusCode::CONFLICT, "Conflict", "email already in use")
            .with_code("BACKOFFICE_CONFLICT")
            .with_instance("/users");
        let resp = ProblemResponse::from(problem).into_response();

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(content_type(&resp), APPLICATION_PROBLEM_JSON);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let resp = ProblemResponse::from(Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthenticated",
            "missing bearer token",
        ))
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn serialized_field_names() {
        let p = Problem::new(StatusCode::NOT_FOUND, "Invoice not found", "no such invoice")
            .with_type("https://errors.backoffice.dev/BACKOFFICE_NOT_FOUND")
            .with_code("BACKOFFICE_NOT_FOUND")
            .with_instance("/invoices/abc");
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "type": "https://errors.backoffice.dev/BACKOFFICE_NOT_FOUND",
                "title": "Invoice not found",
                "status": 404,
                "detail": "no such invoice",
                "instance": "/invoices/abc",
                "code": "BACKOFFICE_NOT_FOUND"
            })
        );
    }
}

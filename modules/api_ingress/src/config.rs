use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP ingress configuration (`modules.api_ingress`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiIngressConfig {
    /// Allowed browser origins. Empty disables CORS, `["*"]` allows any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Per-request handler timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

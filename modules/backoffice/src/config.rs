use serde::{Deserialize, Serialize};

/// Configuration for the backoffice module (`modules.backoffice`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackofficeConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

impl Default for BackofficeConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            mail: MailConfig::default(),
            identity: IdentityConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

/// SMTP submission settings. Mail is disabled until both credentials are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    #[serde(default = "default_mail_host")]
    pub host: String,
    #[serde(default = "default_mail_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl MailConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.username.as_deref().filter(|s| !s.trim().is_empty())?;
        let pass = self.password.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((user, pass))
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: default_mail_host(),
            port: default_mail_port(),
            username: None,
            password: None,
            from_name: default_from_name(),
        }
    }
}

/// Identity issuer; tokens are checked against `https://{domain}/.well-known/jwks.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default = "default_jwks_ttl_secs")]
    pub jwks_ttl_secs: u64,
    /// Minimum age of the cached key set before an unknown `kid` may refetch it.
    #[serde(default = "default_jwks_refetch_cooldown_secs")]
    pub jwks_refetch_cooldown_secs: u64,
    /// Overrides the key set location derived from `domain`.
    #[serde(default)]
    pub jwks_url: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            audience: String::new(),
            jwks_ttl_secs: default_jwks_ttl_secs(),
            jwks_refetch_cooldown_secs: default_jwks_refetch_cooldown_secs(),
            jwks_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    #[serde(default = "default_orchestrator_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub saved_item_id: String,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_orchestrator_url(),
            api_key: String::new(),
            user_id: String::new(),
            saved_item_id: String::new(),
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            url: default_transcription_url(),
            api_key: String::new(),
            model_id: default_model_id(),
            language_code: default_language_code(),
        }
    }
}

fn default_page_size() -> u64 {
    100
}

fn default_max_page_size() -> u64 {
    1000
}

fn default_mail_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_mail_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Back Office".to_string()
}

fn default_jwks_ttl_secs() -> u64 {
    600
}

fn default_jwks_refetch_cooldown_secs() -> u64 {
    30
}

fn default_orchestrator_url() -> String {
    "https://api.gumloop.com/api/v1".to_string()
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_transcription_url() -> String {
    "https://api.elevenlabs.io/v1/speech-to-text".to_string()
}

fn default_model_id() -> String {
    "scribe_v2".to_string()
}

fn default_language_code() -> String {
    "eng".to_string()
}

//! Outbound ports. Adapters live under `infra`.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::contract::{Client, Expense, IdentityClaims, Invoice, Job, MailOutcome, User};
use crate::domain::invoice_mail::InvoiceMessage;

/// Outbound invoice mail. Never fails; problems are reported in the outcome.
#[async_trait]
pub trait InvoiceMailer: Send + Sync {
    /// `pdf_base64` is attached as `Invoice-{n}.pdf` when it decodes.
    async fn send_invoice(
        &self,
        message: &InvoiceMessage,
        recipient: Option<&str>,
        pdf_base64: Option<&str>,
    ) -> MailOutcome;

    async fn send_reminder(&self, message: &InvoiceMessage, recipient: Option<&str>)
        -> MailOutcome;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("no signing key for kid '{0}'")]
    UnknownKey(String),
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("key set unavailable: {0}")]
    KeySet(String),
}

/// Bearer token verification against the identity issuer.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError>;
}

/// Decision returned by the orchestrator workflow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentDirective {
    pub to: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AgentDirective {
    pub fn is_for_system(&self) -> bool {
        self.to == "system"
    }
}

/// Workflow orchestrator: one run per message, polled until done.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn run(&self, message: &str) -> anyhow::Result<AgentDirective>;
}

/// One user's records, materialized for analytics.
#[derive(Debug, Clone)]
pub struct AnalyticsSnapshot {
    pub profile: User,
    pub clients: Vec<Client>,
    pub jobs: Vec<Job>,
    pub invoices: Vec<Invoice>,
    pub expenses: Vec<Expense>,
}

/// Read-only query execution over a snapshot. Errors come back as text.
#[async_trait]
pub trait AnalyticsSandbox: Send + Sync {
    async fn run_query(&self, snapshot: &AnalyticsSnapshot, sql: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: AudioUpload) -> anyhow::Result<String>;
}

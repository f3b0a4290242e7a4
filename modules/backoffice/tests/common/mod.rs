#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use sea_orm_migration::MigratorTrait;

use backoffice::contract::{IdentityClaims, MailOutcome, NewUser, User};
use backoffice::domain::invoice_mail::InvoiceMessage;
use backoffice::domain::ports::{
    AgentDirective, AnalyticsSandbox, AnalyticsSnapshot, AudioUpload, AuthError,
    IdentityVerifier, InvoiceMailer, Orchestrator, Transcriber,
};
use backoffice::domain::repo::Repositories;
use backoffice::domain::service::{Integrations, Service, ServiceConfig};
use backoffice::infra::storage::migrations::Migrator;
use backoffice::infra::storage::SeaOrmRecordStore;
use modkit_db::{ConnectOpts, DbHandle};

pub const GOOD_TOKEN: &str = "good-token";
pub const SUBJECT: &str = "auth0|alice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailKind {
    Invoice,
    Reminder,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub kind: MailKind,
    pub invoice_number: String,
    pub recipient: Option<String>,
    pub pdf: Option<String>,
}

/// Records every send attempt. After [`RecordingMailer::fail_sends`] each
/// attempt is still recorded but reports a delivery failure.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn count(&self, kind: MailKind) -> usize {
        self.sent.lock().iter().filter(|m| m.kind == kind).count()
    }

    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn outcome(&self, ok: &str) -> MailOutcome {
        if self.failing.load(Ordering::SeqCst) {
            MailOutcome::failed("SMTP relay refused the message")
        } else {
            MailOutcome::sent(ok)
        }
    }
}

#[async_trait]
impl InvoiceMailer for RecordingMailer {
    async fn send_invoice(
        &self,
        message: &InvoiceMessage,
        recipient: Option<&str>,
        pdf_base64: Option<&str>,
    ) -> MailOutcome {
        self.sent.lock().push(SentMail {
            kind: MailKind::Invoice,
            invoice_number: message.invoice_number.clone(),
            recipient: recipient.map(str::to_string),
            pdf: pdf_base64.map(str::to_string),
        });
        self.outcome("Invoice email sent")
    }

    async fn send_reminder(
        &self,
        message: &InvoiceMessage,
        recipient: Option<&str>,
    ) -> MailOutcome {
        self.sent.lock().push(SentMail {
            kind: MailKind::Reminder,
            invoice_number: message.invoice_number.clone(),
            recipient: recipient.map(str::to_string),
            pdf: None,
        });
        self.outcome("Reminder email sent")
    }
}

/// Replies with queued directives in order; records every prompt it receives.
#[derive(Default)]
pub struct ScriptedOrchestrator {
    pub replies: Mutex<VecDeque<AgentDirective>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedOrchestrator {
    pub fn push(&self, to: &str, query: Option<&str>, message: Option<&str>) {
        self.replies.lock().push_back(AgentDirective {
            to: to.to_string(),
            query: query.map(str::to_string),
            message: message.map(str::to_string),
        });
    }
}

#[async_trait]
impl Orchestrator for ScriptedOrchestrator {
    async fn run(&self, message: &str) -> anyhow::Result<AgentDirective> {
        self.prompts.lock().push(message.to_string());
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("orchestrator timed out"))
    }
}

#[derive(Default)]
pub struct RecordingSandbox {
    pub queries: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl AnalyticsSandbox for RecordingSandbox {
    async fn run_query(&self, snapshot: &AnalyticsSnapshot, sql: &str) -> String {
        self.queries
            .lock()
            .push((sql.to_string(), snapshot.invoices.len()));
        r#"[{"total":42.0}]"#.to_string()
    }
}

pub struct FixedTranscriber(pub Option<String>);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: AudioUpload) -> anyhow::Result<String> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("speech service unavailable"))
    }
}

/// Accepts exactly [`GOOD_TOKEN`] as [`SUBJECT`].
pub struct StaticVerifier;

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        if token == GOOD_TOKEN {
            Ok(IdentityClaims {
                subject: SUBJECT.to_string(),
                email: Some("alice@example.com".to_string()),
            })
        } else {
            Err(AuthError::Rejected("signature mismatch".to_string()))
        }
    }
}

pub struct TestApp {
    pub db: DbHandle,
    pub repos: Repositories,
    pub service: Arc<Service>,
    pub mailer: Arc<RecordingMailer>,
    pub orchestrator: Arc<ScriptedOrchestrator>,
    pub sandbox: Arc<RecordingSandbox>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_transcript(Some("send the invoice".to_string())).await
    }

    pub async fn with_transcript(transcript: Option<String>) -> Self {
        let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
            .await
            .expect("in-memory database");
        Migrator::up(db.seaorm(), None)
            .await
            .expect("migrations apply");

        let repos = Repositories::from_store(Arc::new(SeaOrmRecordStore::new(db.sea())));
        let mailer = Arc::new(RecordingMailer::default());
        let orchestrator = Arc::new(ScriptedOrchestrator::default());
        let sandbox = Arc::new(RecordingSandbox::default());
        let integrations = Integrations {
            mailer: mailer.clone(),
            orchestrator: orchestrator.clone(),
            sandbox: sandbox.clone(),
            transcriber: Arc::new(FixedTranscriber(transcript)),
        };
        let service = Arc::new(Service::new(
            repos.clone(),
            integrations,
            ServiceConfig::default(),
        ));

        Self {
            db,
            repos,
            service,
            mailer,
            orchestrator,
            sandbox,
        }
    }

    pub fn router(&self) -> Router {
        backoffice::api::rest::routes::register_routes(
            Router::new(),
            self.service.clone(),
            Arc::new(StaticVerifier),
        )
        .expect("routes register")
    }

    pub async fn user(&self, business_email: &str) -> User {
        self.service
            .create_user(NewUser {
                first_name: Some("Alice".to_string()),
                business_name: Some("Alice Plumbing".to_string()),
                business_email: business_email.to_string(),
                ..Default::default()
            })
            .await
            .expect("user created")
    }
}

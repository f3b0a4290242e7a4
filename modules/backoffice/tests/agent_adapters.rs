//! Orchestrator, speech-to-text and analytics sandbox adapters.

use chrono::Utc;
use httpmock::prelude::*;
use modkit::TracedClient;
use serde_json::{json, Value};

use backoffice::config::{OrchestratorConfig, TranscriptionConfig};
use backoffice::contract::{
    Client, Expense, Invoice, InvoiceStatus, Job, JobStatus, RecordId, User,
};
use backoffice::domain::ports::{
    AnalyticsSandbox, AnalyticsSnapshot, AudioUpload, Orchestrator, Transcriber,
};
use backoffice::infra::agent::{HttpOrchestrator, SpeechToText, SqliteSandbox};

fn http() -> TracedClient {
    TracedClient::new(reqwest::Client::new())
}

fn orchestrator_config(server: &MockServer, attempts: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        base_url: server.base_url(),
        api_key: "orch-key".to_string(),
        user_id: "orch-user".to_string(),
        saved_item_id: "flow-1".to_string(),
        poll_attempts: attempts,
        poll_interval_ms: 0,
    }
}

#[tokio::test]
async fn orchestrator_starts_run_and_polls_until_done() {
    let server = MockServer::start_async().await;
    let start = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/start_pipeline")
                .query_param("api_key", "orch-key")
                .query_param("user_id", "orch-user")
                .query_param("saved_item_id", "flow-1")
                .header("authorization", "Bearer orch-key");
            then.status(200).json_body(json!({"run_id": "run-1"}));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/get_pl_run")
                .query_param("run_id", "run-1")
                .query_param("user_id", "orch-user");
            then.status(200).json_body(json!({
                "state": "DONE",
                "outputs": {
                    "output": "{\"to\": \"system\", \"query\": \"SELECT COUNT(*) FROM invoices\"}"
                }
            }));
        })
        .await;

    let orchestrator = HttpOrchestrator::new(orchestrator_config(&server, 3), http());
    let directive = orchestrator
        .run("how many invoices?")
        .await
        .expect("run completes");

    assert!(directive.is_for_system());
    assert_eq!(
        directive.query.as_deref(),
        Some("SELECT COUNT(*) FROM invoices")
    );
    assert_eq!(start.hits_async().await, 1);
    assert_eq!(poll.hits_async().await, 1);
}

#[tokio::test]
async fn orchestrator_gives_up_after_poll_attempts() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/start_pipeline");
            then.status(200).json_body(json!({"run_id": "run-2"}));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/get_pl_run");
            then.status(200).json_body(json!({"state": "RUNNING"}));
        })
        .await;

    let orchestrator = HttpOrchestrator::new(orchestrator_config(&server, 3), http());
    let err = orchestrator
        .run("hello")
        .await
        .expect_err("never finishes");

    assert!(err.to_string().contains("timed out"));
    assert_eq!(poll.hits_async().await, 3);
}

#[tokio::test]
async fn orchestrator_start_failure_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/start_pipeline");
            then.status(401).body("bad key");
        })
        .await;

    let orchestrator = HttpOrchestrator::new(orchestrator_config(&server, 3), http());
    assert!(orchestrator.run("hello").await.is_err());
}

fn transcription_config(server: &MockServer, api_key: &str) -> TranscriptionConfig {
    TranscriptionConfig {
        url: server.url("/v1/speech-to-text"),
        api_key: api_key.to_string(),
        model_id: "scribe_v2".to_string(),
        language_code: "eng".to_string(),
    }
}

fn recording() -> AudioUpload {
    AudioUpload {
        file_name: "note.wav".to_string(),
        content_type: Some("audio/wav".to_string()),
        bytes: b"RIFF0000WAVEfmt ".to_vec(),
    }
}

#[tokio::test]
async fn speech_to_text_returns_transcript() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/speech-to-text")
                .header("xi-api-key", "stt-key");
            then.status(200)
                .json_body(json!({"text": "invoice acme for two hours"}));
        })
        .await;

    let stt = SpeechToText::new(transcription_config(&server, "stt-key"), http());
    let text = stt.transcribe(recording()).await.expect("transcribed");

    assert_eq!(text, "invoice acme for two hours");
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn speech_to_text_surfaces_rejections() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/speech-to-text");
            then.status(422).body("unsupported audio");
        })
        .await;

    let stt = SpeechToText::new(transcription_config(&server, "stt-key"), http());
    let err = stt.transcribe(recording()).await.expect_err("rejected");
    assert!(format!("{err:#}").contains("unsupported audio"));
}

#[tokio::test]
async fn speech_to_text_requires_api_key() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/speech-to-text");
            then.status(200).json_body(json!({"text": "never"}));
        })
        .await;

    let stt = SpeechToText::new(transcription_config(&server, " "), http());
    assert!(stt.transcribe(recording()).await.is_err());
    assert_eq!(mock.hits_async().await, 0);
}

fn snapshot() -> AnalyticsSnapshot {
    let now = Utc::now();
    let profile = User {
        id: RecordId::generate(),
        identity_subject: Some("auth0|alice".to_string()),
        first_name: Some("Alice".to_string()),
        last_name: None,
        personal_email: None,
        business_name: Some("Alice Plumbing".to_string()),
        business_email: Some("alice@plumbing.test".to_string()),
        business_phone: None,
        business_address: None,
        business_category: None,
        hourly_rate: Some(85.0),
        last_invoice_number: Some(1002),
        onboarding_complete: true,
        created_at: now,
    };
    let client = Client {
        id: RecordId::generate(),
        user_id: Some(profile.id),
        name: "Acme".to_string(),
        email: None,
        address: None,
        archived: false,
        created_at: now,
    };
    let job = Job {
        id: RecordId::generate(),
        user_id: profile.id,
        client_id: Some(client.id),
        title: "Boiler repair".to_string(),
        status: JobStatus::Completed,
        start_time: Some(now),
        end_time: None,
        location: None,
        invoice_id: None,
        calendar_event_id: None,
        created_at: now,
    };
    let invoice = |number: &str, status: InvoiceStatus, total: f64| Invoice {
        id: RecordId::generate(),
        user_id: profile.id,
        client_id: Some(client.id),
        job_id: Some(job.id),
        invoice_number: number.to_string(),
        invoice_title: None,
        invoice_description: None,
        status,
        issue_date: Some("2026-01-05".to_string()),
        due_date: None,
        line_items: Vec::new(),
        total,
        created_at: now,
    };
    let invoices = vec![
        invoice("INV-1001", InvoiceStatus::Paid, 250.0),
        invoice("INV-1002", InvoiceStatus::Sent, 120.5),
    ];
    let expense = Expense {
        id: RecordId::generate(),
        user_id: profile.id,
        job_id: Some(job.id),
        vendor_name: "Hardware Co".to_string(),
        date: Some(now),
        total_amount: 40.0,
        tax_amount: None,
        currency: "USD".to_string(),
        line_items: Vec::new(),
        receipt_image_url: None,
        created_at: now,
    };
    AnalyticsSnapshot {
        profile,
        clients: vec![client],
        jobs: vec![job],
        invoices,
        expenses: vec![expense],
    }
}

#[tokio::test]
async fn sandbox_answers_select_queries_as_json() {
    let sandbox = SqliteSandbox::default();
    let snapshot = snapshot();

    let out = sandbox
        .run_query(
            &snapshot,
            "SELECT invoiceNumber, total, status FROM invoices ORDER BY total DESC;",
        )
        .await;
    let rows: Value = serde_json::from_str(&out).expect("json rows");
    assert_eq!(
        rows,
        json!([
            {"invoiceNumber": "INV-1001", "total": 250.0, "status": "paid"},
            {"invoiceNumber": "INV-1002", "total": 120.5, "status": "sent"}
        ])
    );

    let out = sandbox
        .run_query(
            &snapshot,
            "WITH billed AS (SELECT total FROM invoices) SELECT COUNT(*) AS n, SUM(total) AS sum FROM billed",
        )
        .await;
    let rows: Value = serde_json::from_str(&out).expect("json rows");
    assert_eq!(rows, json!([{"n": 2, "sum": 370.5}]));

    let out = sandbox
        .run_query(
            &snapshot,
            "SELECT businessName, lastInvoiceNumber, lastName FROM profile",
        )
        .await;
    let rows: Value = serde_json::from_str(&out).expect("json rows");
    assert_eq!(
        rows,
        json!([{"businessName": "Alice Plumbing", "lastInvoiceNumber": 1002, "lastName": null}])
    );
}

#[tokio::test]
async fn sandbox_refuses_writes_and_multiple_statements() {
    let sandbox = SqliteSandbox::default();
    let snapshot = snapshot();

    let out = sandbox.run_query(&snapshot, "DELETE FROM invoices").await;
    assert!(out.starts_with("Query rejected:"), "{out}");

    let out = sandbox
        .run_query(&snapshot, "SELECT 1; DROP TABLE invoices")
        .await;
    assert!(out.starts_with("Query rejected:"), "{out}");

    let out = sandbox.run_query(&snapshot, "   ").await;
    assert!(out.starts_with("Query rejected:"), "{out}");

    // Passes the statement gate but is stopped by the read-only connection.
    let out = sandbox
        .run_query(
            &snapshot,
            "WITH doomed AS (SELECT id FROM invoices) DELETE FROM invoices WHERE id IN (SELECT id FROM doomed)",
        )
        .await;
    assert!(out.starts_with("SQL Error:"), "{out}");
}

#[tokio::test]
async fn sandbox_allows_semicolons_in_string_literals() {
    let sandbox = SqliteSandbox::default();
    let snapshot = snapshot();

    let out = sandbox
        .run_query(&snapshot, "SELECT name FROM clients WHERE name = 'a;b'")
        .await;
    assert_eq!(serde_json::from_str::<Value>(&out).expect("json rows"), json!([]));

    let out = sandbox.run_query(&snapshot, "SELECT 'x;y' AS v;").await;
    assert_eq!(
        serde_json::from_str::<Value>(&out).expect("json rows"),
        json!([{"v": "x;y"}])
    );
}

#[tokio::test]
async fn sandbox_reports_sql_errors_as_text() {
    let sandbox = SqliteSandbox::default();
    let out = sandbox
        .run_query(&snapshot(), "SELECT nope FROM invoices")
        .await;
    assert!(out.starts_with("SQL Error:"), "{out}");
}

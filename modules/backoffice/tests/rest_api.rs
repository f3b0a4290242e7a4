mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{MailKind, TestApp, GOOD_TOKEN};

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn authed(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds")
}

async fn create_user(router: &Router, email: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/api/users",
            json!({"businessEmail": email, "businessName": "Alice Plumbing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn root_and_openapi_are_served() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(&router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["docs"], "/openapi.json");

    let (status, body) = send(&router, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["components"]["schemas"]["InvoiceDto"].is_object());
    for patch_body in [
        "UpdateUserReq",
        "UpdateClientReq",
        "UpdateJobReq",
        "UpdateInvoiceReq",
        "UpdateExpenseReq",
    ] {
        assert!(
            body["components"]["schemas"][patch_body]["properties"].is_object(),
            "{patch_body} schema missing"
        );
    }
}

#[tokio::test]
async fn user_crud_over_http() {
    let app = TestApp::new().await;
    let router = app.router();
    let id = create_user(&router, "owner@example.test").await;

    let (status, body) = send(&router, get(&format!("/api/users/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businessEmail"], "owner@example.test");
    assert_eq!(body["onboardingComplete"], false);

    let (status, body) = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/api/users/{id}"),
            json!({"hourlyRate": 85.0, "businessName": null}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hourlyRate"], 85.0);
    assert!(body["businessName"].is_null());

    let (status, body) = send(&router, get("/api/users?limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = send(
        &router,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/users/{id}"))
            .body(Body::empty())
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("User {id} deleted successfully"));

    let (status, body) = send(&router, get(&format!("/api/users/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "BACKOFFICE_NOT_FOUND");
}

#[tokio::test]
async fn validation_failures_are_problem_details() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(
        &router,
        json_request(Method::POST, "/api/users", json!({"firstName": "No email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BACKOFFICE_VALIDATION");
    assert_eq!(body["status"], 400);

    let (status, body) = send(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/api/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BACKOFFICE_BAD_BODY");

    let (status, body) = send(&router, get("/api/users/not-an-id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BACKOFFICE_INVALID_ID");

    let id = create_user(&router, "dup@example.test").await;
    let (status, body) = send(
        &router,
        json_request(Method::PUT, &format!("/api/users/{id}"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BACKOFFICE_EMPTY_UPDATE");

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/api/users",
            json!({"businessEmail": "dup@example.test"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BACKOFFICE_CONFLICT");
}

#[tokio::test]
async fn invoice_flow_over_http() {
    let app = TestApp::new().await;
    let router = app.router();
    let user_id = create_user(&router, "biz@example.test").await;

    let (status, client) = send(
        &router,
        json_request(
            Method::POST,
            "/api/clients",
            json!({"userId": user_id, "name": "Acme", "email": "billing@acme.test"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let client_id = client["id"].as_str().expect("client id").to_string();

    let (status, invoice) = send(
        &router,
        json_request(
            Method::POST,
            "/api/invoices",
            json!({
                "userId": user_id,
                "clientId": client_id,
                "invoiceTitle": "Boiler repair",
                "dueDate": "2999-12-31",
                "lineItems": [
                    {"description": "Labour", "quantity": 2, "rate": 50, "amount": 100}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{invoice}");
    assert_eq!(invoice["invoiceNumber"], "INV-1001");
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["total"], 100.0);
    assert!(invoice["jobId"].is_string());
    let invoice_id = invoice["id"].as_str().expect("invoice id").to_string();

    let (status, updated) = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/api/invoices/{invoice_id}"),
            json!({"status": "sent", "pdfBase64": "JVBERi0xLjQK"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "sent");
    assert!(updated.get("pdfBase64").is_none());
    assert_eq!(app.mailer.count(MailKind::Invoice), 1);

    let (status, details) =
        send(&router, get(&format!("/api/invoices/{invoice_id}/details"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["client"]["name"], "Acme");
    assert_eq!(details["job"]["invoiceId"], invoice_id.as_str());

    let (status, listed) = send(
        &router,
        get(&format!("/api/invoices?user_id={user_id}&status=sent")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, outcome) = send(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/invoices/{invoice_id}/send-reminder"))
            .body(Body::empty())
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["success"], true);
    assert_eq!(app.mailer.count(MailKind::Reminder), 1);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/invoices/{invoice_id}/printable")))
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let (status, summary) =
        send(&router, get(&format!("/api/clients/{client_id}/summary"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalOutstanding"], 100.0);
    assert_eq!(summary["invoicesByStatus"]["sent"], 1);
}

#[tokio::test]
async fn mail_failures_do_not_fail_invoice_requests() {
    let app = TestApp::new().await;
    let router = app.router();
    let user_id = create_user(&router, "ops@example.test").await;
    app.mailer.fail_sends();

    let (status, draft) = send(
        &router,
        json_request(Method::POST, "/api/invoices", json!({"userId": user_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{draft}");
    let draft_id = draft["id"].as_str().expect("invoice id").to_string();

    let (status, updated) = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/api/invoices/{draft_id}"),
            json!({"status": "sent"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["status"], "sent");
    assert_eq!(app.mailer.count(MailKind::Invoice), 1);

    for due in ["2000-01-01", "2010-05-20"] {
        let (status, body) = send(
            &router,
            json_request(
                Method::POST,
                "/api/invoices",
                json!({"userId": user_id, "status": "sent", "dueDate": due}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, listed) =
        send(&router, get(&format!("/api/invoices?user_id={user_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let overdue = listed
        .as_array()
        .expect("invoice list")
        .iter()
        .filter(|inv| inv["status"] == "overdue")
        .count();
    assert_eq!(overdue, 2);
    assert_eq!(app.mailer.count(MailKind::Reminder), 2);

    let (status, fetched) = send(&router, get(&format!("/api/invoices/{draft_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "sent");
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(&router, get("/api/invoices?status=late")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BACKOFFICE_VALIDATION");
}

#[tokio::test]
async fn expense_summary_by_user() {
    let app = TestApp::new().await;
    let router = app.router();
    let user_id = create_user(&router, "exp@example.test").await;

    for (vendor, total, tax) in [("Fuel", 40.0, 2.0), ("Hardware", 60.0, 5.0)] {
        let (status, body) = send(
            &router,
            json_request(
                Method::POST,
                "/api/expenses",
                json!({
                    "userId": user_id,
                    "vendorName": vendor,
                    "totalAmount": total,
                    "taxAmount": tax,
                    "date": "2026-02-14"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["currency"], "USD");
    }

    let (status, summary) = send(
        &router,
        get(&format!("/api/expenses/summary/by-user/{user_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalExpenses"], 100.0);
    assert_eq!(summary["totalTax"], 7.0);
    assert_eq!(summary["expenseCount"], 2);
}

#[tokio::test]
async fn signed_in_routes_require_a_valid_token() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(
        &router,
        Request::builder()
            .method(Method::POST)
            .uri("/api/users/sync")
            .body(Body::empty())
            .expect("request builds"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "BACKOFFICE_UNAUTHENTICATED");

    let (status, _) = send(
        &router,
        authed(Method::GET, "/api/users/profile", "forged", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_then_profile() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(
        &router,
        authed(Method::GET, "/api/users/profile", GOOD_TOKEN, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "BACKOFFICE_NOT_FOUND");

    let (status, body) = send(
        &router,
        authed(Method::POST, "/api/users/sync", GOOD_TOKEN, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], true);
    assert_eq!(body["onboardingComplete"], false);

    let (status, body) = send(
        &router,
        authed(Method::POST, "/api/users/sync", GOOD_TOKEN, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);

    let (status, body) = send(
        &router,
        authed(
            Method::PUT,
            "/api/users/profile",
            GOOD_TOKEN,
            Some(json!({"businessName": "Alice Plumbing"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businessName"], "Alice Plumbing");
    assert_eq!(body["onboardingComplete"], true);

    let (status, body) = send(
        &router,
        get(&format!("/api/users/by-identity/{}", common::SUBJECT)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businessName"], "Alice Plumbing");
}

#[tokio::test]
async fn agent_chat_over_http() {
    let app = TestApp::new().await;
    let router = app.router();
    app.orchestrator
        .push("user", None, Some("Try the Invoices screen."));

    let (status, body) = send(
        &router,
        authed(
            Method::POST,
            "/api/agent/chat",
            GOOD_TOKEN,
            Some(json!({"message": "where do I send invoices?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Try the Invoices screen.");

    // Nothing scripted: the orchestrator fails.
    let (status, body) = send(
        &router,
        authed(
            Method::POST,
            "/api/agent/chat",
            GOOD_TOKEN,
            Some(json!({"message": "again"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "BACKOFFICE_EXTERNAL_SERVICE");
}

fn multipart_request(field: &str, payload: &[u8]) -> Request<Body> {
    let boundary = "backoffice-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"note.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/agent/chat/voice")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn voice_upload_is_transcribed() {
    let app = TestApp::new().await;
    let router = app.router();

    let (status, body) = send(&router, multipart_request("file", b"RIFF....WAVE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_text"], "send the invoice");
    assert!(body.get("error").is_none());

    let (status, body) = send(&router, multipart_request("audio", b"RIFF....WAVE")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BACKOFFICE_BAD_UPLOAD");
}

#[tokio::test]
async fn failed_transcription_reports_error_field() {
    let app = TestApp::with_transcript(None).await;
    let router = app.router();

    let (status, body) = send(&router, multipart_request("file", b"RIFF....WAVE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_text"], "");
    assert_eq!(body["error"], "Transcription failed");
}

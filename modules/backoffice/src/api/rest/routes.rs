use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::api::rest::{handlers, openapi};
use crate::domain::ports::IdentityVerifier;
use crate::domain::service::Service;

/// Resource routes, mounted under `/api` by [`register_routes`].
fn api_routes() -> Router {
    Router::new()
        // users
        .route("/users", post(handlers::create_user).get(handlers::list_users))
        .route("/users/sync", post(handlers::sync_user))
        .route(
            "/users/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route(
            "/users/by-identity/{subject}",
            get(handlers::get_user_by_identity),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/{id}/summary", get(handlers::user_summary))
        // clients
        .route(
            "/clients",
            post(handlers::create_client).get(handlers::list_clients),
        )
        .route(
            "/clients/{id}",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/clients/{id}/jobs", get(handlers::client_jobs))
        .route("/clients/{id}/invoices", get(handlers::client_invoices))
        .route("/clients/{id}/summary", get(handlers::client_summary))
        // jobs
        .route("/jobs", post(handlers::create_job).get(handlers::list_jobs))
        .route(
            "/jobs/{id}",
            get(handlers::get_job)
                .put(handlers::update_job)
                .delete(handlers::delete_job),
        )
        .route("/jobs/{id}/details", get(handlers::job_details))
        // invoices
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route(
            "/invoices/{id}",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route("/invoices/{id}/printable", get(handlers::printable_invoice))
        .route("/invoices/{id}/send-reminder", post(handlers::send_reminder))
        .route("/invoices/{id}/details", get(handlers::invoice_details))
        // expenses
        .route(
            "/expenses",
            post(handlers::create_expense).get(handlers::list_expenses),
        )
        .route(
            "/expenses/summary/by-user/{user_id}",
            get(handlers::expense_summary),
        )
        .route(
            "/expenses/{id}",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        // agent
        .route("/agent/chat", post(handlers::agent_chat))
        .route("/agent/chat/voice", post(handlers::voice_transcription))
}

/// Mount the module's routes on `router`: `/`, `/openapi.json` and `/api/...`.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    verifier: Arc<dyn IdentityVerifier>,
) -> anyhow::Result<Router> {
    let api = api_routes()
        .layer(Extension(verifier))
        .layer(Extension(service));

    Ok(router
        .route("/", get(handlers::root))
        .route("/openapi.json", get(openapi::openapi_json))
        .nest("/api", api))
}

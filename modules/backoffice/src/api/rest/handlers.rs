use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query},
    http::{StatusCode, Uri},
    response::{Html, Json},
    Extension,
};
use modkit::api::problem::ProblemResponse;
use modkit::api::MessageBody;
use tracing::{error, info, warn};

use crate::api::rest::auth::Authenticated;
use crate::api::rest::dto::{
    path_id, AgentChatReq, AgentReplyDto, ApiInfoDto, ClientDto, ClientListQuery,
    ClientSummaryDto, CreateClientReq, CreateExpenseReq, CreateInvoiceReq, CreateJobReq,
    CreateUserReq, ExpenseDto, ExpenseListQuery, ExpenseSummaryDto, InvoiceDetailsDto,
    InvoiceDto, InvoiceListQuery, JobDetailsDto, JobDto, JobListQuery, MailOutcomeDto, PageQuery,
    SyncUserDto, TranscriptDto, UpdateClientReq, UpdateExpenseReq, UpdateInvoiceReq,
    UpdateJobReq, UpdateUserReq, UserDto, UserSummaryDto,
};
use crate::api::rest::error::{from_parts, map_domain_error, map_json_rejection};
use crate::contract::{
    ClientPatch, ExpensePatch, JobPatch, NewClient, NewExpense, NewInvoice, NewJob, NewUser,
    RecordId,
};
use crate::domain::error::DomainError;
use crate::domain::ports::AudioUpload;
use crate::domain::service::Service;

type ApiResult<T> = Result<T, ProblemResponse>;

fn body<T>(payload: Result<Json<T>, JsonRejection>, uri: &Uri) -> ApiResult<T> {
    match payload {
        Ok(Json(v)) => Ok(v),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            Err(map_json_rejection(&rejection, uri.path()))
        }
    }
}

fn fail(context: &str, e: DomainError, uri: &Uri) -> ProblemResponse {
    error!("{}: {}", context, e);
    map_domain_error(&e, uri.path())
}

fn id_from_path(field: &'static str, raw: &str, uri: &Uri) -> ApiResult<RecordId> {
    path_id(field, raw).map_err(|e| map_domain_error(&e, uri.path()))
}

/// API banner served at `/`.
pub async fn root() -> Json<ApiInfoDto> {
    Json(ApiInfoDto {
        message: "Back-office API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/openapi.json".to_string(),
    })
}

// ===== users =====

/// Create a new user
pub async fn create_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateUserReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    let req = body(payload, &uri)?;
    info!("Creating user");

    let new_user = NewUser::try_from(req).map_err(|e| fail("Invalid user", e, &uri))?;
    match svc.create_user(new_user).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => Err(fail("Failed to create user", e, &uri)),
    }
}

/// List users with optional pagination
pub async fn list_users(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<UserDto>>> {
    info!("Listing users with query: {:?}", query);

    match svc.list_users(svc.page(query.skip, query.limit)).await {
        Ok(users) => Ok(Json(users.into_iter().map(UserDto::from).collect())),
        Err(e) => Err(fail("Failed to list users", e, &uri)),
    }
}

/// Get a specific user by ID
pub async fn get_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserDto>> {
    info!("Getting user with id: {}", id);
    let id = id_from_path("user_id", &id, &uri)?;

    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => Err(fail(&format!("Failed to get user {id}"), e, &uri)),
    }
}

/// Update an existing user
pub async fn update_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserReq>, JsonRejection>,
) -> ApiResult<Json<UserDto>> {
    let req = body(payload, &uri)?;
    info!("Updating user {}", id);
    let id = id_from_path("user_id", &id, &uri)?;

    match svc.update_user(id, req.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => Err(fail(&format!("Failed to update user {id}"), e, &uri)),
    }
}

/// Delete a user by ID
pub async fn delete_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    info!("Deleting user: {}", id);
    let id = id_from_path("user_id", &id, &uri)?;

    match svc.delete_user(id).await {
        Ok(()) => Ok(Json(MessageBody::new(format!("User {id} deleted successfully")))),
        Err(e) => Err(fail(&format!("Failed to delete user {id}"), e, &uri)),
    }
}

/// Totals across the user's clients, jobs, invoices and expenses
pub async fn user_summary(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserSummaryDto>> {
    let id = id_from_path("user_id", &id, &uri)?;

    match svc.user_summary(id).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(e) => Err(fail(&format!("Failed to summarize user {id}"), e, &uri)),
    }
}

/// Find the user record bound to an identity subject
pub async fn get_user_by_identity(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(subject): Path<String>,
) -> ApiResult<Json<UserDto>> {
    info!("Looking up user by identity subject");

    match svc.get_user_by_subject(&subject).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => Err(fail("Failed to look up user by identity", e, &uri)),
    }
}

/// Create the caller's user record on first sign-in
pub async fn sync_user(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Authenticated(claims): Authenticated,
) -> ApiResult<Json<SyncUserDto>> {
    info!("Syncing signed-in user");

    match svc.sync_user(&claims).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => Err(fail("Failed to sync user", e, &uri)),
    }
}

pub async fn get_profile(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Authenticated(claims): Authenticated,
) -> ApiResult<Json<UserDto>> {
    match svc.get_user_by_subject(&claims.subject).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => Err(fail("Failed to load profile", e, &uri)),
    }
}

/// Update the caller's profile and mark onboarding as complete
pub async fn update_profile(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Authenticated(claims): Authenticated,
    payload: Result<Json<UpdateUserReq>, JsonRejection>,
) -> ApiResult<Json<UserDto>> {
    let req = body(payload, &uri)?;
    info!("Updating signed-in user's profile");

    match svc.update_profile(&claims.subject, req.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => Err(fail("Failed to update profile", e, &uri)),
    }
}

// ===== clients =====

pub async fn create_client(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateClientReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ClientDto>)> {
    let req = body(payload, &uri)?;
    info!("Creating client");

    let new_client = NewClient::try_from(req).map_err(|e| fail("Invalid client", e, &uri))?;
    match svc.create_client(new_client).await {
        Ok(client) => Ok((StatusCode::CREATED, Json(ClientDto::from(client)))),
        Err(e) => Err(fail("Failed to create client", e, &uri)),
    }
}

pub async fn list_clients(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<ClientListQuery>,
) -> ApiResult<Json<Vec<ClientDto>>> {
    info!("Listing clients with query: {:?}", query);

    let filter = query.filter().map_err(|e| fail("Invalid client filter", e, &uri))?;
    match svc.list_clients(filter, svc.page(query.skip, query.limit)).await {
        Ok(clients) => Ok(Json(clients.into_iter().map(ClientDto::from).collect())),
        Err(e) => Err(fail("Failed to list clients", e, &uri)),
    }
}

pub async fn get_client(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClientDto>> {
    info!("Getting client with id: {}", id);
    let id = id_from_path("client_id", &id, &uri)?;

    match svc.get_client(id).await {
        Ok(client) => Ok(Json(ClientDto::from(client))),
        Err(e) => Err(fail(&format!("Failed to get client {id}"), e, &uri)),
    }
}

pub async fn update_client(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateClientReq>, JsonRejection>,
) -> ApiResult<Json<ClientDto>> {
    let req = body(payload, &uri)?;
    info!("Updating client {}", id);
    let id = id_from_path("client_id", &id, &uri)?;

    let patch = ClientPatch::try_from(req).map_err(|e| fail("Invalid client update", e, &uri))?;
    match svc.update_client(id, patch).await {
        Ok(client) => Ok(Json(ClientDto::from(client))),
        Err(e) => Err(fail(&format!("Failed to update client {id}"), e, &uri)),
    }
}

pub async fn delete_client(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    info!("Deleting client: {}", id);
    let id = id_from_path("client_id", &id, &uri)?;

    match svc.delete_client(id).await {
        Ok(()) => Ok(Json(MessageBody::new(format!("Client {id} deleted successfully")))),
        Err(e) => Err(fail(&format!("Failed to delete client {id}"), e, &uri)),
    }
}

pub async fn client_jobs(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<JobDto>>> {
    let id = id_from_path("client_id", &id, &uri)?;

    match svc.list_client_jobs(id, svc.page(query.skip, query.limit)).await {
        Ok(jobs) => Ok(Json(jobs.into_iter().map(JobDto::from).collect())),
        Err(e) => Err(fail(&format!("Failed to list jobs of client {id}"), e, &uri)),
    }
}

pub async fn client_invoices(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<InvoiceDto>>> {
    let id = id_from_path("client_id", &id, &uri)?;

    match svc.list_client_invoices(id, svc.page(query.skip, query.limit)).await {
        Ok(invoices) => Ok(Json(invoices.into_iter().map(InvoiceDto::from).collect())),
        Err(e) => Err(fail(&format!("Failed to list invoices of client {id}"), e, &uri)),
    }
}

pub async fn client_summary(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClientSummaryDto>> {
    let id = id_from_path("client_id", &id, &uri)?;

    match svc.client_summary(id).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(e) => Err(fail(&format!("Failed to summarize client {id}"), e, &uri)),
    }
}

// ===== jobs =====

pub async fn create_job(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateJobReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobDto>)> {
    let req = body(payload, &uri)?;
    info!("Creating job");

    let new_job = NewJob::try_from(req).map_err(|e| fail("Invalid job", e, &uri))?;
    match svc.create_job(new_job).await {
        Ok(job) => Ok((StatusCode::CREATED, Json(JobDto::from(job)))),
        Err(e) => Err(fail("Failed to create job", e, &uri)),
    }
}

pub async fn list_jobs(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<Json<Vec<JobDto>>> {
    info!("Listing jobs with query: {:?}", query);

    let filter = query.filter().map_err(|e| fail("Invalid job filter", e, &uri))?;
    match svc.list_jobs(filter, svc.page(query.skip, query.limit)).await {
        Ok(jobs) => Ok(Json(jobs.into_iter().map(JobDto::from).collect())),
        Err(e) => Err(fail("Failed to list jobs", e, &uri)),
    }
}

pub async fn get_job(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobDto>> {
    info!("Getting job with id: {}", id);
    let id = id_from_path("job_id", &id, &uri)?;

    match svc.get_job(id).await {
        Ok(job) => Ok(Json(JobDto::from(job))),
        Err(e) => Err(fail(&format!("Failed to get job {id}"), e, &uri)),
    }
}

pub async fn update_job(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateJobReq>, JsonRejection>,
) -> ApiResult<Json<JobDto>> {
    let req = body(payload, &uri)?;
    info!("Updating job {}", id);
    let id = id_from_path("job_id", &id, &uri)?;

    let patch = JobPatch::try_from(req).map_err(|e| fail("Invalid job update", e, &uri))?;
    match svc.update_job(id, patch).await {
        Ok(job) => Ok(Json(JobDto::from(job))),
        Err(e) => Err(fail(&format!("Failed to update job {id}"), e, &uri)),
    }
}

pub async fn delete_job(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    info!("Deleting job: {}", id);
    let id = id_from_path("job_id", &id, &uri)?;

    match svc.delete_job(id).await {
        Ok(()) => Ok(Json(MessageBody::new(format!("Job {id} deleted successfully")))),
        Err(e) => Err(fail(&format!("Failed to delete job {id}"), e, &uri)),
    }
}

pub async fn job_details(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobDetailsDto>> {
    let id = id_from_path("job_id", &id, &uri)?;

    match svc.job_details(id).await {
        Ok(details) => Ok(Json(details.into())),
        Err(e) => Err(fail(&format!("Failed to load details of job {id}"), e, &uri)),
    }
}

// ===== invoices =====

/// Create an invoice, numbering it and synthesizing its job when needed
pub async fn create_invoice(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateInvoiceReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InvoiceDto>)> {
    let req = body(payload, &uri)?;
    info!("Creating invoice");

    let new_invoice = NewInvoice::try_from(req).map_err(|e| fail("Invalid invoice", e, &uri))?;
    match svc.create_invoice(new_invoice).await {
        Ok(invoice) => Ok((StatusCode::CREATED, Json(InvoiceDto::from(invoice)))),
        Err(e) => Err(fail("Failed to create invoice", e, &uri)),
    }
}

pub async fn list_invoices(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<Json<Vec<InvoiceDto>>> {
    info!("Listing invoices with query: {:?}", query);

    let filter = query.filter().map_err(|e| fail("Invalid invoice filter", e, &uri))?;
    match svc.list_invoices(filter, svc.page(query.skip, query.limit)).await {
        Ok(invoices) => Ok(Json(invoices.into_iter().map(InvoiceDto::from).collect())),
        Err(e) => Err(fail("Failed to list invoices", e, &uri)),
    }
}

pub async fn get_invoice(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDto>> {
    info!("Getting invoice with id: {}", id);
    let id = id_from_path("invoice_id", &id, &uri)?;

    match svc.get_invoice(id).await {
        Ok(invoice) => Ok(Json(InvoiceDto::from(invoice))),
        Err(e) => Err(fail(&format!("Failed to get invoice {id}"), e, &uri)),
    }
}

/// Partial update; moving a draft to `sent` emails the client
pub async fn update_invoice(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateInvoiceReq>, JsonRejection>,
) -> ApiResult<Json<InvoiceDto>> {
    let req = body(payload, &uri)?;
    info!("Updating invoice {}", id);
    let id = id_from_path("invoice_id", &id, &uri)?;

    let (patch, pdf) = req
        .into_parts()
        .map_err(|e| fail("Invalid invoice update", e, &uri))?;
    match svc.update_invoice(id, patch, pdf).await {
        Ok(invoice) => Ok(Json(InvoiceDto::from(invoice))),
        Err(e) => Err(fail(&format!("Failed to update invoice {id}"), e, &uri)),
    }
}

pub async fn delete_invoice(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    info!("Deleting invoice: {}", id);
    let id = id_from_path("invoice_id", &id, &uri)?;

    match svc.delete_invoice(id).await {
        Ok(()) => Ok(Json(MessageBody::new(format!("Invoice {id} deleted successfully")))),
        Err(e) => Err(fail(&format!("Failed to delete invoice {id}"), e, &uri)),
    }
}

/// Invoice rendered as the HTML document that is emailed to the client
pub async fn printable_invoice(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let id = id_from_path("invoice_id", &id, &uri)?;

    match svc.printable_invoice(id).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => Err(fail(&format!("Failed to render invoice {id}"), e, &uri)),
    }
}

pub async fn send_reminder(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MailOutcomeDto>> {
    info!("Sending payment reminder for invoice {}", id);
    let id = id_from_path("invoice_id", &id, &uri)?;

    match svc.send_reminder(id).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => Err(fail(&format!("Failed to remind about invoice {id}"), e, &uri)),
    }
}

pub async fn invoice_details(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDetailsDto>> {
    let id = id_from_path("invoice_id", &id, &uri)?;

    match svc.invoice_details(id).await {
        Ok(details) => Ok(Json(details.into())),
        Err(e) => Err(fail(&format!("Failed to load details of invoice {id}"), e, &uri)),
    }
}

// ===== expenses =====

pub async fn create_expense(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    payload: Result<Json<CreateExpenseReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ExpenseDto>)> {
    let req = body(payload, &uri)?;
    info!("Creating expense");

    let new_expense = NewExpense::try_from(req).map_err(|e| fail("Invalid expense", e, &uri))?;
    match svc.create_expense(new_expense).await {
        Ok(expense) => Ok((StatusCode::CREATED, Json(ExpenseDto::from(expense)))),
        Err(e) => Err(fail("Failed to create expense", e, &uri)),
    }
}

pub async fn list_expenses(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<ExpenseListQuery>,
) -> ApiResult<Json<Vec<ExpenseDto>>> {
    info!("Listing expenses with query: {:?}", query);

    let filter = query.filter().map_err(|e| fail("Invalid expense filter", e, &uri))?;
    match svc.list_expenses(filter, svc.page(query.skip, query.limit)).await {
        Ok(expenses) => Ok(Json(expenses.into_iter().map(ExpenseDto::from).collect())),
        Err(e) => Err(fail("Failed to list expenses", e, &uri)),
    }
}

pub async fn get_expense(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExpenseDto>> {
    info!("Getting expense with id: {}", id);
    let id = id_from_path("expense_id", &id, &uri)?;

    match svc.get_expense(id).await {
        Ok(expense) => Ok(Json(ExpenseDto::from(expense))),
        Err(e) => Err(fail(&format!("Failed to get expense {id}"), e, &uri)),
    }
}

pub async fn update_expense(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateExpenseReq>, JsonRejection>,
) -> ApiResult<Json<ExpenseDto>> {
    let req = body(payload, &uri)?;
    info!("Updating expense {}", id);
    let id = id_from_path("expense_id", &id, &uri)?;

    let patch = ExpensePatch::try_from(req).map_err(|e| fail("Invalid expense update", e, &uri))?;
    match svc.update_expense(id, patch).await {
        Ok(expense) => Ok(Json(ExpenseDto::from(expense))),
        Err(e) => Err(fail(&format!("Failed to update expense {id}"), e, &uri)),
    }
}

pub async fn delete_expense(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    info!("Deleting expense: {}", id);
    let id = id_from_path("expense_id", &id, &uri)?;

    match svc.delete_expense(id).await {
        Ok(()) => Ok(Json(MessageBody::new(format!("Expense {id} deleted successfully")))),
        Err(e) => Err(fail(&format!("Failed to delete expense {id}"), e, &uri)),
    }
}

pub async fn expense_summary(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ExpenseSummaryDto>> {
    let user_id = id_from_path("user_id", &user_id, &uri)?;

    match svc.expense_summary(user_id).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(e) => Err(fail(&format!("Failed to summarize expenses of user {user_id}"), e, &uri)),
    }
}

// ===== agent =====

/// One turn with the analytics agent on behalf of the signed-in user
pub async fn agent_chat(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Authenticated(claims): Authenticated,
    payload: Result<Json<AgentChatReq>, JsonRejection>,
) -> ApiResult<Json<AgentReplyDto>> {
    let req = body(payload, &uri)?;
    info!("Agent chat turn");

    match svc.agent_chat(&claims.subject, &req.message).await {
        Ok(reply) => Ok(Json(AgentReplyDto { reply })),
        Err(e) => Err(fail("Agent chat failed", e, &uri)),
    }
}

/// Transcribe an uploaded recording (multipart field `file`)
pub async fn voice_transcription(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    mut multipart: Multipart,
) -> ApiResult<Json<TranscriptDto>> {
    let bad_upload = |detail: String| {
        from_parts(
            StatusCode::BAD_REQUEST,
            "BACKOFFICE_BAD_UPLOAD",
            "Invalid upload",
            detail,
            uri.path(),
        )
    };

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_upload(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("recording.wav").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| bad_upload(e.body_text()))?;
        upload = Some(AudioUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload = upload.ok_or_else(|| bad_upload("multipart field 'file' is required".into()))?;
    info!(file = %upload.file_name, bytes = upload.bytes.len(), "Transcribing voice input");

    Ok(Json(match svc.transcribe(upload).await {
        Some(text) => TranscriptDto {
            user_text: text,
            error: None,
        },
        None => TranscriptDto {
            user_text: String::new(),
            error: Some("Transcription failed".to_string()),
        },
    }))
}

use axum::Json;
use modkit::api::problem::Problem;
use modkit::api::MessageBody;
use utoipa::OpenApi;

use crate::api::rest::dto;

/// Component schemas of the REST surface.
#[derive(OpenApi)]
#[openapi(
    info(title = "Back-office API", description = "Users, clients, jobs, invoices and expenses"),
    components(schemas(
        Problem,
        MessageBody,
        dto::UserDto,
        dto::CreateUserReq,
        dto::UpdateUserReq,
        dto::SyncUserDto,
        dto::UserSummaryDto,
        dto::ClientDto,
        dto::CreateClientReq,
        dto::UpdateClientReq,
        dto::ClientSummaryDto,
        dto::JobDto,
        dto::CreateJobReq,
        dto::UpdateJobReq,
        dto::JobDetailsDto,
        dto::InvoiceLineItemDto,
        dto::InvoiceDto,
        dto::CreateInvoiceReq,
        dto::UpdateInvoiceReq,
        dto::InvoiceDetailsDto,
        dto::MailOutcomeDto,
        dto::ExpenseLineItemDto,
        dto::ExpenseDto,
        dto::CreateExpenseReq,
        dto::UpdateExpenseReq,
        dto::ExpenseSummaryDto,
        dto::AgentChatReq,
        dto::AgentReplyDto,
        dto::TranscriptDto,
        dto::ApiInfoDto,
    )),
    tags(
        (name = "users"),
        (name = "clients"),
        (name = "jobs"),
        (name = "invoices"),
        (name = "expenses"),
        (name = "agent"),
    )
)]
pub struct BackofficeApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(BackofficeApiDoc::openapi())
}

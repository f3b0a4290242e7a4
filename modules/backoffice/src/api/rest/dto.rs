use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::contract::{
    Client, ClientFilter, ClientPatch, ClientSummary, Expense, ExpenseFilter, ExpenseLineItem,
    ExpensePatch, ExpenseSummary, Invoice, InvoiceDetails, InvoiceFilter, InvoiceLineItem,
    InvoicePatch, InvoiceStatus, Job, JobDetails, JobFilter, JobPatch, JobStatus, MailOutcome,
    NewClient, NewExpense, NewInvoice, NewJob, NewUser, Patch, RecordId, SyncOutcome, User,
    UserPatch, UserSummary,
};
use crate::domain::dates::parse_datetime;
use crate::domain::error::DomainError;

// ===== field conversion helpers =====

fn parse_id(field: &'static str, raw: &str) -> Result<RecordId, DomainError> {
    RecordId::parse(raw).map_err(|_| DomainError::invalid_id(field, raw))
}

fn parse_opt_id(field: &'static str, raw: Option<&str>) -> Result<Option<RecordId>, DomainError> {
    raw.map(|r| parse_id(field, r)).transpose()
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, DomainError> {
    value.ok_or_else(|| DomainError::validation(field, "is required"))
}

fn parse_time(field: &str, raw: &str) -> Result<DateTime<Utc>, DomainError> {
    parse_datetime(raw)
        .ok_or_else(|| DomainError::validation(field, "must be an ISO-8601 date or date-time"))
}

fn parse_opt_time(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, DomainError> {
    raw.map(|r| parse_time(field, r)).transpose()
}

fn parse_job_status(raw: &str) -> Result<JobStatus, DomainError> {
    raw.parse::<JobStatus>()
        .map_err(|e| DomainError::validation("status", e.to_string()))
}

fn parse_invoice_status(raw: &str) -> Result<InvoiceStatus, DomainError> {
    raw.parse::<InvoiceStatus>()
        .map_err(|e| DomainError::validation("status", e.to_string()))
}

// ===== users =====

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub identity_subject: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub personal_email: Option<String>,
    pub business_name: Option<String>,
    pub business_email: Option<String>,
    pub business_phone: Option<String>,
    pub business_address: Option<String>,
    pub business_category: Option<String>,
    pub hourly_rate: Option<f64>,
    pub last_invoice_number: Option<i64>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
}

/// REST DTO for creating a new user
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    pub identity_subject: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub personal_email: Option<String>,
    pub business_name: Option<String>,
    /// Required.
    pub business_email: Option<String>,
    pub business_phone: Option<String>,
    pub business_address: Option<String>,
    pub business_category: Option<String>,
    pub hourly_rate: Option<f64>,
    pub last_invoice_number: Option<i64>,
    #[serde(default)]
    pub onboarding_complete: bool,
}

/// REST DTO for updating a user (partial; `null` clears a field)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserReq {
    #[schema(value_type = Option<String>)]
    pub identity_subject: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub first_name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub last_name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub personal_email: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub business_name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub business_email: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub business_phone: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub business_address: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub business_category: Patch<String>,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate: Patch<f64>,
    #[schema(value_type = Option<i64>)]
    pub last_invoice_number: Patch<i64>,
    #[schema(value_type = Option<bool>)]
    pub onboarding_complete: Patch<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserDto {
    pub user: UserDto,
    pub created: bool,
    pub onboarding_complete: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDto {
    pub user_id: String,
    pub client_count: u64,
    pub job_count: u64,
    pub invoice_count: u64,
    pub expense_count: u64,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub total_expenses: f64,
    pub total_tax: f64,
    pub net_income: f64,
}

/// Paging for lists without filters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            identity_subject: u.identity_subject,
            first_name: u.first_name,
            last_name: u.last_name,
            personal_email: u.personal_email,
            business_name: u.business_name,
            business_email: u.business_email,
            business_phone: u.business_phone,
            business_address: u.business_address,
            business_category: u.business_category,
            hourly_rate: u.hourly_rate,
            last_invoice_number: u.last_invoice_number,
            onboarding_complete: u.onboarding_complete,
            created_at: u.created_at,
        }
    }
}

impl TryFrom<CreateUserReq> for NewUser {
    type Error = DomainError;

    fn try_from(req: CreateUserReq) -> Result<Self, Self::Error> {
        Ok(Self {
            business_email: required("businessEmail", req.business_email)?,
            identity_subject: req.identity_subject,
            first_name: req.first_name,
            last_name: req.last_name,
            personal_email: req.personal_email,
            business_name: req.business_name,
            business_phone: req.business_phone,
            business_address: req.business_address,
            business_category: req.business_category,
            hourly_rate: req.hourly_rate,
            last_invoice_number: req.last_invoice_number,
            onboarding_complete: req.onboarding_complete,
        })
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            identity_subject: req.identity_subject,
            first_name: req.first_name,
            last_name: req.last_name,
            personal_email: req.personal_email,
            business_name: req.business_name,
            business_email: req.business_email,
            business_phone: req.business_phone,
            business_address: req.business_address,
            business_category: req.business_category,
            hourly_rate: req.hourly_rate,
            last_invoice_number: req.last_invoice_number,
            onboarding_complete: req.onboarding_complete,
        }
    }
}

impl From<SyncOutcome> for SyncUserDto {
    fn from(o: SyncOutcome) -> Self {
        let onboarding_complete = o.user.onboarding_complete;
        Self {
            user: o.user.into(),
            created: o.created,
            onboarding_complete,
        }
    }
}

impl From<UserSummary> for UserSummaryDto {
    fn from(s: UserSummary) -> Self {
        Self {
            user_id: s.user_id.to_string(),
            client_count: s.client_count,
            job_count: s.job_count,
            invoice_count: s.invoice_count,
            expense_count: s.expense_count,
            total_billed: s.totals.billed,
            total_paid: s.totals.paid,
            total_outstanding: s.totals.outstanding,
            total_expenses: s.total_expenses,
            total_tax: s.total_tax,
            net_income: s.net_income,
        }
    }
}

// ===== clients =====

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientDto {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientReq {
    /// Required.
    pub user_id: Option<String>,
    /// Required.
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateClientReq {
    #[schema(value_type = Option<String>)]
    pub user_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub email: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub address: Patch<String>,
    #[schema(value_type = Option<bool>)]
    pub archived: Patch<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummaryDto {
    pub client: ClientDto,
    pub jobs_by_status: BTreeMap<String, u64>,
    pub invoices_by_status: BTreeMap<String, u64>,
    pub total_billed: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<String>,
    pub archived: Option<bool>,
}

impl ClientListQuery {
    pub fn filter(&self) -> Result<ClientFilter, DomainError> {
        Ok(ClientFilter {
            user_id: parse_opt_id("user_id", self.user_id.as_deref())?,
            archived: self.archived,
        })
    }
}

impl From<Client> for ClientDto {
    fn from(c: Client) -> Self {
        Self {
            id: c.id.to_string(),
            user_id: c.user_id.map(|id| id.to_string()),
            name: c.name,
            email: c.email,
            address: c.address,
            archived: c.archived,
            created_at: c.created_at,
        }
    }
}

impl TryFrom<CreateClientReq> for NewClient {
    type Error = DomainError;

    fn try_from(req: CreateClientReq) -> Result<Self, Self::Error> {
        let user_id = required("userId", req.user_id)?;
        Ok(Self {
            user_id: parse_id("userId", &user_id)?,
            name: required("name", req.name)?,
            email: req.email,
            address: req.address,
            archived: req.archived,
        })
    }
}

impl TryFrom<UpdateClientReq> for ClientPatch {
    type Error = DomainError;

    fn try_from(req: UpdateClientReq) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: req.user_id.try_map(|s| parse_id("userId", &s))?,
            name: req.name,
            email: req.email,
            address: req.address,
            archived: req.archived,
        })
    }
}

impl From<ClientSummary> for ClientSummaryDto {
    fn from(s: ClientSummary) -> Self {
        Self {
            client: s.client.into(),
            jobs_by_status: s.jobs_by_status,
            invoices_by_status: s.invoices_by_status,
            total_billed: s.totals.billed,
            total_paid: s.totals.paid,
            total_outstanding: s.totals.outstanding,
        }
    }
}

// ===== jobs =====

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub title: String,
    /// `pending`, `in_progress`, `completed` or `cancelled`.
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub invoice_id: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobReq {
    /// Required.
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    /// Required.
    pub title: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub calendar_event_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateJobReq {
    #[schema(value_type = Option<String>)]
    pub user_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub client_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub status: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub start_time: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub end_time: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub location: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub invoice_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub calendar_event_id: Patch<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobDetailsDto {
    pub job: JobDto,
    pub client: Option<ClientDto>,
    pub invoice: Option<InvoiceDto>,
    pub expenses: Vec<ExpenseDto>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub status: Option<String>,
}

impl JobListQuery {
    pub fn filter(&self) -> Result<JobFilter, DomainError> {
        Ok(JobFilter {
            user_id: parse_opt_id("user_id", self.user_id.as_deref())?,
            client_id: parse_opt_id("client_id", self.client_id.as_deref())?,
            status: self.status.as_deref().map(parse_job_status).transpose()?,
        })
    }
}

impl From<Job> for JobDto {
    fn from(j: Job) -> Self {
        Self {
            id: j.id.to_string(),
            user_id: j.user_id.to_string(),
            client_id: j.client_id.map(|id| id.to_string()),
            title: j.title,
            status: j.status.to_string(),
            start_time: j.start_time,
            end_time: j.end_time,
            location: j.location,
            invoice_id: j.invoice_id.map(|id| id.to_string()),
            calendar_event_id: j.calendar_event_id,
            created_at: j.created_at,
        }
    }
}

impl TryFrom<CreateJobReq> for NewJob {
    type Error = DomainError;

    fn try_from(req: CreateJobReq) -> Result<Self, Self::Error> {
        let user_id = required("userId", req.user_id)?;
        Ok(Self {
            user_id: parse_id("userId", &user_id)?,
            client_id: parse_opt_id("clientId", req.client_id.as_deref())?,
            title: required("title", req.title)?,
            status: req
                .status
                .as_deref()
                .map(parse_job_status)
                .transpose()?
                .unwrap_or_default(),
            start_time: parse_opt_time("startTime", req.start_time.as_deref())?,
            end_time: parse_opt_time("endTime", req.end_time.as_deref())?,
            location: req.location,
            calendar_event_id: req.calendar_event_id,
        })
    }
}

impl TryFrom<UpdateJobReq> for JobPatch {
    type Error = DomainError;

    fn try_from(req: UpdateJobReq) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: req.user_id.try_map(|s| parse_id("userId", &s))?,
            client_id: req.client_id.try_map(|s| parse_id("clientId", &s))?,
            title: req.title,
            status: req.status.try_map(|s| parse_job_status(&s))?,
            start_time: req.start_time.try_map(|s| parse_time("startTime", &s))?,
            end_time: req.end_time.try_map(|s| parse_time("endTime", &s))?,
            location: req.location,
            invoice_id: req.invoice_id.try_map(|s| parse_id("invoiceId", &s))?,
            calendar_event_id: req.calendar_event_id,
        })
    }
}

impl From<JobDetails> for JobDetailsDto {
    fn from(d: JobDetails) -> Self {
        Self {
            job: d.job.into(),
            client: d.client.map(Into::into),
            invoice: d.invoice.map(Into::into),
            expenses: d.expenses.into_iter().map(Into::into).collect(),
        }
    }
}

// ===== invoices =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct InvoiceLineItemDto {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub job_id: Option<String>,
    pub invoice_number: String,
    pub invoice_title: Option<String>,
    pub invoice_description: Option<String>,
    /// `draft`, `sent`, `paid`, `overdue` or `cancelled`.
    pub status: String,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub line_items: Vec<InvoiceLineItemDto>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceReq {
    /// Required.
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub job_id: Option<String>,
    /// Assigned as `INV-{n}` from the user's counter when omitted.
    pub invoice_number: Option<String>,
    pub invoice_title: Option<String>,
    pub invoice_description: Option<String>,
    pub status: Option<String>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    #[serde(default)]
    pub line_items: Vec<InvoiceLineItemDto>,
    /// Sum of line item amounts when omitted.
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateInvoiceReq {
    #[schema(value_type = Option<String>)]
    pub user_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub client_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub job_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub invoice_number: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub invoice_title: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub invoice_description: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub status: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub issue_date: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub due_date: Patch<String>,
    #[schema(value_type = Option<Vec<InvoiceLineItemDto>>)]
    pub line_items: Patch<Vec<InvoiceLineItemDto>>,
    #[schema(value_type = Option<f64>)]
    pub total: Patch<f64>,
    /// Attached to the email sent on the draft to sent transition; never stored.
    pub pdf_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceDetailsDto {
    pub invoice: InvoiceDto,
    pub client: Option<ClientDto>,
    pub job: Option<JobDto>,
    pub business: Option<UserDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MailOutcomeDto {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(alias = "status_filter")]
    pub status: Option<String>,
}

impl InvoiceListQuery {
    pub fn filter(&self) -> Result<InvoiceFilter, DomainError> {
        Ok(InvoiceFilter {
            user_id: parse_opt_id("user_id", self.user_id.as_deref())?,
            client_id: parse_opt_id("client_id", self.client_id.as_deref())?,
            status: self.status.as_deref().map(parse_invoice_status).transpose()?,
        })
    }
}

impl From<InvoiceLineItemDto> for InvoiceLineItem {
    fn from(d: InvoiceLineItemDto) -> Self {
        Self {
            description: d.description,
            quantity: d.quantity,
            rate: d.rate,
            amount: d.amount,
        }
    }
}

impl From<InvoiceLineItem> for InvoiceLineItemDto {
    fn from(i: InvoiceLineItem) -> Self {
        Self {
            description: i.description,
            quantity: i.quantity,
            rate: i.rate,
            amount: i.amount,
        }
    }
}

impl From<Invoice> for InvoiceDto {
    fn from(i: Invoice) -> Self {
        Self {
            id: i.id.to_string(),
            user_id: i.user_id.to_string(),
            client_id: i.client_id.map(|id| id.to_string()),
            job_id: i.job_id.map(|id| id.to_string()),
            invoice_number: i.invoice_number,
            invoice_title: i.invoice_title,
            invoice_description: i.invoice_description,
            status: i.status.to_string(),
            issue_date: i.issue_date,
            due_date: i.due_date,
            line_items: i.line_items.into_iter().map(Into::into).collect(),
            total: i.total,
            created_at: i.created_at,
        }
    }
}

impl TryFrom<CreateInvoiceReq> for NewInvoice {
    type Error = DomainError;

    fn try_from(req: CreateInvoiceReq) -> Result<Self, Self::Error> {
        let user_id = required("userId", req.user_id)?;
        Ok(Self {
            user_id: parse_id("userId", &user_id)?,
            client_id: parse_opt_id("clientId", req.client_id.as_deref())?,
            job_id: parse_opt_id("jobId", req.job_id.as_deref())?,
            invoice_number: req.invoice_number.filter(|n| !n.trim().is_empty()),
            invoice_title: req.invoice_title,
            invoice_description: req.invoice_description,
            status: req
                .status
                .as_deref()
                .map(parse_invoice_status)
                .transpose()?
                .unwrap_or_default(),
            issue_date: req.issue_date,
            due_date: req.due_date,
            line_items: req.line_items.into_iter().map(Into::into).collect(),
            total: req.total,
        })
    }
}

impl UpdateInvoiceReq {
    /// Splits the request into the stored patch and the transient PDF attachment.
    pub fn into_parts(self) -> Result<(InvoicePatch, Option<String>), DomainError> {
        let patch = InvoicePatch {
            user_id: self.user_id.try_map(|s| parse_id("userId", &s))?,
            client_id: self.client_id.try_map(|s| parse_id("clientId", &s))?,
            job_id: self.job_id.try_map(|s| parse_id("jobId", &s))?,
            invoice_number: self.invoice_number,
            invoice_title: self.invoice_title,
            invoice_description: self.invoice_description,
            status: self.status.try_map(|s| parse_invoice_status(&s))?,
            issue_date: self.issue_date,
            due_date: self.due_date,
            line_items: self
                .line_items
                .map(|items| items.into_iter().map(Into::into).collect()),
            total: self.total,
        };
        Ok((patch, self.pdf_base64.filter(|s| !s.is_empty())))
    }
}

impl From<InvoiceDetails> for InvoiceDetailsDto {
    fn from(d: InvoiceDetails) -> Self {
        Self {
            invoice: d.invoice.into(),
            client: d.client.map(Into::into),
            job: d.job.map(Into::into),
            business: d.business.map(Into::into),
        }
    }
}

impl From<MailOutcome> for MailOutcomeDto {
    fn from(o: MailOutcome) -> Self {
        Self {
            success: o.success,
            message: o.message,
        }
    }
}

// ===== expenses =====

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseLineItemDto {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDto {
    pub id: String,
    pub user_id: String,
    pub job_id: Option<String>,
    pub vendor_name: String,
    pub date: Option<DateTime<Utc>>,
    pub total_amount: f64,
    pub tax_amount: Option<f64>,
    pub currency: String,
    pub line_items: Vec<ExpenseLineItemDto>,
    pub receipt_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseReq {
    /// Required.
    pub user_id: Option<String>,
    pub job_id: Option<String>,
    /// Required.
    pub vendor_name: Option<String>,
    pub date: Option<String>,
    /// Required.
    pub total_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    /// Defaults to `USD`.
    pub currency: Option<String>,
    #[serde(default)]
    pub line_items: Vec<ExpenseLineItemDto>,
    pub receipt_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateExpenseReq {
    #[schema(value_type = Option<String>)]
    pub user_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub job_id: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub vendor_name: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub date: Patch<String>,
    #[schema(value_type = Option<f64>)]
    pub total_amount: Patch<f64>,
    #[schema(value_type = Option<f64>)]
    pub tax_amount: Patch<f64>,
    #[schema(value_type = Option<String>)]
    pub currency: Patch<String>,
    #[schema(value_type = Option<Vec<ExpenseLineItemDto>>)]
    pub line_items: Patch<Vec<ExpenseLineItemDto>>,
    #[schema(value_type = Option<String>)]
    pub receipt_image_url: Patch<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummaryDto {
    pub user_id: String,
    pub total_expenses: f64,
    pub total_tax: f64,
    pub expense_count: u64,
    pub expenses: Vec<ExpenseDto>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<String>,
    pub job_id: Option<String>,
}

impl ExpenseListQuery {
    pub fn filter(&self) -> Result<ExpenseFilter, DomainError> {
        Ok(ExpenseFilter {
            user_id: parse_opt_id("user_id", self.user_id.as_deref())?,
            job_id: parse_opt_id("job_id", self.job_id.as_deref())?,
        })
    }
}

impl From<ExpenseLineItemDto> for ExpenseLineItem {
    fn from(d: ExpenseLineItemDto) -> Self {
        Self {
            description: d.description,
            quantity: d.quantity,
            unit_price: d.unit_price,
            total: d.total,
        }
    }
}

impl From<ExpenseLineItem> for ExpenseLineItemDto {
    fn from(i: ExpenseLineItem) -> Self {
        Self {
            description: i.description,
            quantity: i.quantity,
            unit_price: i.unit_price,
            total: i.total,
        }
    }
}

impl From<Expense> for ExpenseDto {
    fn from(e: Expense) -> Self {
        Self {
            id: e.id.to_string(),
            user_id: e.user_id.to_string(),
            job_id: e.job_id.map(|id| id.to_string()),
            vendor_name: e.vendor_name,
            date: e.date,
            total_amount: e.total_amount,
            tax_amount: e.tax_amount,
            currency: e.currency,
            line_items: e.line_items.into_iter().map(Into::into).collect(),
            receipt_image_url: e.receipt_image_url,
            created_at: e.created_at,
        }
    }
}

impl TryFrom<CreateExpenseReq> for NewExpense {
    type Error = DomainError;

    fn try_from(req: CreateExpenseReq) -> Result<Self, Self::Error> {
        let user_id = required("userId", req.user_id)?;
        Ok(Self {
            user_id: parse_id("userId", &user_id)?,
            job_id: parse_opt_id("jobId", req.job_id.as_deref())?,
            vendor_name: required("vendorName", req.vendor_name)?,
            date: parse_opt_time("date", req.date.as_deref())?,
            total_amount: required("totalAmount", req.total_amount)?,
            tax_amount: req.tax_amount,
            currency: req.currency,
            line_items: req.line_items.into_iter().map(Into::into).collect(),
            receipt_image_url: req.receipt_image_url,
        })
    }
}

impl TryFrom<UpdateExpenseReq> for ExpensePatch {
    type Error = DomainError;

    fn try_from(req: UpdateExpenseReq) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: req.user_id.try_map(|s| parse_id("userId", &s))?,
            job_id: req.job_id.try_map(|s| parse_id("jobId", &s))?,
            vendor_name: req.vendor_name,
            date: req.date.try_map(|s| parse_time("date", &s))?,
            total_amount: req.total_amount,
            tax_amount: req.tax_amount,
            currency: req.currency,
            line_items: req
                .line_items
                .map(|items| items.into_iter().map(Into::into).collect()),
            receipt_image_url: req.receipt_image_url,
        })
    }
}

impl From<ExpenseSummary> for ExpenseSummaryDto {
    fn from(s: ExpenseSummary) -> Self {
        Self {
            user_id: s.user_id.to_string(),
            total_expenses: s.total_expenses,
            total_tax: s.total_tax,
            expense_count: s.expense_count,
            expenses: s.expenses.into_iter().map(Into::into).collect(),
        }
    }
}

// ===== agent / misc =====

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AgentChatReq {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentReplyDto {
    pub reply: Option<String>,
}

/// Voice transcription result; `error` is set when nothing was transcribed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TranscriptDto {
    pub user_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiInfoDto {
    pub message: String,
    pub version: String,
    pub docs: String,
}

/// Ids in the path are validated the same way as ids in bodies.
pub fn path_id(field: &'static str, raw: &str) -> Result<RecordId, DomainError> {
    parse_id(field, raw)
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Patch, RecordId};

/// Invoice numbering starts after this value when a user has never invoiced.
pub const INVOICE_NUMBER_BASE: i64 = 1000;

// ===== users =====

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: RecordId,
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

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub identity_subject: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub personal_email: Option<String>,
    pub business_name: Option<String>,
    pub business_email: String,
    pub business_phone: Option<String>,
    pub business_address: Option<String>,
    pub business_category: Option<String>,
    pub hourly_rate: Option<f64>,
    pub last_invoice_number: Option<i64>,
    pub onboarding_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub identity_subject: Patch<String>,
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub personal_email: Patch<String>,
    pub business_name: Patch<String>,
    pub business_email: Patch<String>,
    pub business_phone: Patch<String>,
    pub business_address: Patch<String>,
    pub business_category: Patch<String>,
    pub hourly_rate: Patch<f64>,
    pub last_invoice_number: Patch<i64>,
    pub onboarding_complete: Patch<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.identity_subject.is_absent()
            && self.first_name.is_absent()
            && self.last_name.is_absent()
            && self.personal_email.is_absent()
            && self.business_name.is_absent()
            && self.business_email.is_absent()
            && self.business_phone.is_absent()
            && self.business_address.is_absent()
            && self.business_category.is_absent()
            && self.hourly_rate.is_absent()
            && self.last_invoice_number.is_absent()
            && self.onboarding_complete.is_absent()
    }
}

/// Claims extracted from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub user: User,
    pub created: bool,
}

// ===== clients =====

#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: RecordId,
    pub user_id: Option<RecordId>,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub user_id: RecordId,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub archived: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub user_id: Patch<RecordId>,
    pub name: Patch<String>,
    pub email: Patch<String>,
    pub address: Patch<String>,
    pub archived: Patch<bool>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_absent()
            && self.name.is_absent()
            && self.email.is_absent()
            && self.address.is_absent()
            && self.archived.is_absent()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub user_id: Option<RecordId>,
    pub archived: Option<bool>,
}

// ===== jobs =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Counted towards the billed total.
    pub fn is_billed(&self) -> bool {
        !matches!(self, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }

    /// Still awaiting payment.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: RecordId,
    pub user_id: RecordId,
    pub client_id: Option<RecordId>,
    pub title: String,
    pub status: JobStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub invoice_id: Option<RecordId>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: RecordId,
    pub client_id: Option<RecordId>,
    pub title: String,
    pub status: JobStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub calendar_event_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub user_id: Patch<RecordId>,
    pub client_id: Patch<RecordId>,
    pub title: Patch<String>,
    pub status: Patch<JobStatus>,
    pub start_time: Patch<DateTime<Utc>>,
    pub end_time: Patch<DateTime<Utc>>,
    pub location: Patch<String>,
    pub invoice_id: Patch<RecordId>,
    pub calendar_event_id: Patch<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_absent()
            && self.client_id.is_absent()
            && self.title.is_absent()
            && self.status.is_absent()
            && self.start_time.is_absent()
            && self.end_time.is_absent()
            && self.location.is_absent()
            && self.invoice_id.is_absent()
            && self.calendar_event_id.is_absent()
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub user_id: Option<RecordId>,
    pub client_id: Option<RecordId>,
    pub status: Option<JobStatus>,
}

// ===== invoices =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: RecordId,
    pub user_id: RecordId,
    pub client_id: Option<RecordId>,
    pub job_id: Option<RecordId>,
    pub invoice_number: String,
    pub invoice_title: Option<String>,
    pub invoice_description: Option<String>,
    pub status: InvoiceStatus,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub line_items: Vec<InvoiceLineItem>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub user_id: RecordId,
    pub client_id: Option<RecordId>,
    pub job_id: Option<RecordId>,
    pub invoice_number: Option<String>,
    pub invoice_title: Option<String>,
    pub invoice_description: Option<String>,
    pub status: InvoiceStatus,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub line_items: Vec<InvoiceLineItem>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    pub user_id: Patch<RecordId>,
    pub client_id: Patch<RecordId>,
    pub job_id: Patch<RecordId>,
    pub invoice_number: Patch<String>,
    pub invoice_title: Patch<String>,
    pub invoice_description: Patch<String>,
    pub status: Patch<InvoiceStatus>,
    pub issue_date: Patch<String>,
    pub due_date: Patch<String>,
    pub line_items: Patch<Vec<InvoiceLineItem>>,
    pub total: Patch<f64>,
}

impl InvoicePatch {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_absent()
            && self.client_id.is_absent()
            && self.job_id.is_absent()
            && self.invoice_number.is_absent()
            && self.invoice_title.is_absent()
            && self.invoice_description.is_absent()
            && self.status.is_absent()
            && self.issue_date.is_absent()
            && self.due_date.is_absent()
            && self.line_items.is_absent()
            && self.total.is_absent()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub user_id: Option<RecordId>,
    pub client_id: Option<RecordId>,
    pub status: Option<InvoiceStatus>,
}

// ===== expenses =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: RecordId,
    pub user_id: RecordId,
    pub job_id: Option<RecordId>,
    pub vendor_name: String,
    pub date: Option<DateTime<Utc>>,
    pub total_amount: f64,
    pub tax_amount: Option<f64>,
    pub currency: String,
    pub line_items: Vec<ExpenseLineItem>,
    pub receipt_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_id: RecordId,
    pub job_id: Option<RecordId>,
    pub vendor_name: String,
    pub date: Option<DateTime<Utc>>,
    pub total_amount: f64,
    pub tax_amount: Option<f64>,
    pub currency: Option<String>,
    pub line_items: Vec<ExpenseLineItem>,
    pub receipt_image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub user_id: Patch<RecordId>,
    pub job_id: Patch<RecordId>,
    pub vendor_name: Patch<String>,
    pub date: Patch<DateTime<Utc>>,
    pub total_amount: Patch<f64>,
    pub tax_amount: Patch<f64>,
    pub currency: Patch<String>,
    pub line_items: Patch<Vec<ExpenseLineItem>>,
    pub receipt_image_url: Patch<String>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_absent()
            && self.job_id.is_absent()
            && self.vendor_name.is_absent()
            && self.date.is_absent()
            && self.total_amount.is_absent()
            && self.tax_amount.is_absent()
            && self.currency.is_absent()
            && self.line_items.is_absent()
            && self.receipt_image_url.is_absent()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub user_id: Option<RecordId>,
    pub job_id: Option<RecordId>,
}

// ===== paging and read models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: u64,
    pub limit: u64,
}

/// Money totals over a set of invoices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BillingTotals {
    pub billed: f64,
    pub paid: f64,
    pub outstanding: f64,
}

impl BillingTotals {
    pub fn from_invoices<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Self {
        invoices.into_iter().fold(Self::default(), |mut acc, inv| {
            if inv.status.is_billed() {
                acc.billed += inv.total;
            }
            if inv.status == InvoiceStatus::Paid {
                acc.paid += inv.total;
            }
            if inv.status.is_outstanding() {
                acc.outstanding += inv.total;
            }
            acc
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientSummary {
    pub client: Client,
    pub jobs_by_status: BTreeMap<String, u64>,
    pub invoices_by_status: BTreeMap<String, u64>,
    pub totals: BillingTotals,
}

#[derive(Debug, Clone)]
pub struct UserSummary {
    pub user_id: RecordId,
    pub client_count: u64,
    pub job_count: u64,
    pub invoice_count: u64,
    pub expense_count: u64,
    pub totals: BillingTotals,
    pub total_expenses: f64,
    pub total_tax: f64,
    pub net_income: f64,
}

#[derive(Debug, Clone)]
pub struct ExpenseSummary {
    pub user_id: RecordId,
    pub total_expenses: f64,
    pub total_tax: f64,
    pub expense_count: u64,
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone)]
pub struct JobDetails {
    pub job: Job,
    pub client: Option<Client>,
    pub invoice: Option<Invoice>,
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub client: Option<Client>,
    pub job: Option<Job>,
    pub business: Option<User>,
}

/// Result of one mail dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailOutcome {
    pub success: bool,
    pub message: String,
}

impl MailOutcome {
    pub fn sent(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

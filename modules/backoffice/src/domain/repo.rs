use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::{
    Client, ClientFilter, Expense, ExpenseFilter, Invoice, InvoiceFilter, Job, JobFilter,
    PageRequest, RecordId, User,
};

/// Persistence ports for the domain layer.
///
/// Every `list` takes an optional page; `None` returns every matching row.
/// Deletes return true if a row was removed.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<User>>;
    async fn find_by_subject(&self, subject: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_business_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn insert(&self, u: User) -> anyhow::Result<()>;
    async fn update(&self, u: User) -> anyhow::Result<()>;
    /// Persist only the invoice counter.
    async fn set_last_invoice_number(&self, id: RecordId, value: i64) -> anyhow::Result<()>;
    async fn delete(&self, id: RecordId) -> anyhow::Result<bool>;
    async fn list(&self, page: Option<PageRequest>) -> anyhow::Result<Vec<User>>;
}

#[async_trait]
pub trait ClientsRepository: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Client>>;
    async fn insert(&self, c: Client) -> anyhow::Result<()>;
    async fn update(&self, c: Client) -> anyhow::Result<()>;
    async fn delete(&self, id: RecordId) -> anyhow::Result<bool>;
    async fn list(
        &self,
        filter: &ClientFilter,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<Client>>;
}

#[async_trait]
pub trait JobsRepository: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Job>>;
    async fn insert(&self, j: Job) -> anyhow::Result<()>;
    async fn update(&self, j: Job) -> anyhow::Result<()>;
    async fn delete(&self, id: RecordId) -> anyhow::Result<bool>;
    async fn list(&self, filter: &JobFilter, page: Option<PageRequest>)
        -> anyhow::Result<Vec<Job>>;
}

#[async_trait]
pub trait InvoicesRepository: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Invoice>>;
    async fn insert(&self, i: Invoice) -> anyhow::Result<()>;
    async fn update(&self, i: Invoice) -> anyhow::Result<()>;
    async fn delete(&self, id: RecordId) -> anyhow::Result<bool>;
    async fn list(
        &self,
        filter: &InvoiceFilter,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<Invoice>>;
}

#[async_trait]
pub trait ExpensesRepository: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Expense>>;
    async fn insert(&self, e: Expense) -> anyhow::Result<()>;
    async fn update(&self, e: Expense) -> anyhow::Result<()>;
    async fn delete(&self, id: RecordId) -> anyhow::Result<bool>;
    /// Newest `date` first.
    async fn list(
        &self,
        filter: &ExpenseFilter,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<Expense>>;
}

/// All repositories the service needs, usually backed by one store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepository>,
    pub clients: Arc<dyn ClientsRepository>,
    pub jobs: Arc<dyn JobsRepository>,
    pub invoices: Arc<dyn InvoicesRepository>,
    pub expenses: Arc<dyn ExpensesRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UsersRepository
            + ClientsRepository
            + JobsRepository
            + InvoicesRepository
            + ExpensesRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            clients: store.clone(),
            jobs: store.clone(),
            invoices: store.clone(),
            expenses: store,
        }
    }
}

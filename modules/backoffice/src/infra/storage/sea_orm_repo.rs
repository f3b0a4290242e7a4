//! SeaORM-backed implementation of all repository ports.
//!
//! Generic over `C: ConnectionTrait`, so it can be built on a `DatabaseConnection`
//! or on a transaction.

use anyhow::Context;
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, NullOrdering};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use super::entity::{clients, expenses, invoices, jobs, users};
use super::mapper;
use crate::contract::{
    Client, ClientFilter, Expense, ExpenseFilter, Invoice, InvoiceFilter, Job, JobFilter,
    PageRequest, RecordId, User,
};
use crate::domain::repo::{
    ClientsRepository, ExpensesRepository, InvoicesRepository, JobsRepository, UsersRepository,
};

/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

fn paged<E: EntityTrait>(query: Select<E>, page: Option<PageRequest>) -> Select<E> {
    match page {
        Some(p) => query.offset(p.skip).limit(p.limit),
        None => query,
    }
}

fn collect<M, T>(rows: Vec<M>, map: fn(M) -> anyhow::Result<T>) -> anyhow::Result<Vec<T>> {
    rows.into_iter().map(map).collect()
}

#[async_trait]
impl<C> UsersRepository for SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<User>> {
        let found = users::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("users.find_by_id failed")?;
        found.map(mapper::user_from_row).transpose()
    }

    async fn find_by_subject(&self, subject: &str) -> anyhow::Result<Option<User>> {
        let found = users::Entity::find()
            .filter(users::Column::IdentitySubject.eq(subject))
            .one(&self.conn)
            .await
            .context("users.find_by_subject failed")?;
        found.map(mapper::user_from_row).transpose()
    }

    async fn find_by_business_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let found = users::Entity::find()
            .filter(users::Column::BusinessEmail.eq(email))
            .one(&self.conn)
            .await
            .context("users.find_by_business_email failed")?;
        found.map(mapper::user_from_row).transpose()
    }

    async fn insert(&self, u: User) -> anyhow::Result<()> {
        let _ = mapper::user_to_active(u)
            .insert(&self.conn)
            .await
            .context("users.insert failed")?;
        Ok(())
    }

    async fn update(&self, u: User) -> anyhow::Result<()> {
        let _ = mapper::user_to_active(u)
            .update(&self.conn)
            .await
            .context("users.update failed")?;
        Ok(())
    }

    async fn set_last_invoice_number(&self, id: RecordId, value: i64) -> anyhow::Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::LastInvoiceNumber, Expr::value(value))
            .filter(users::Column::Id.eq(id.to_string()))
            .exec(&self.conn)
            .await
            .context("users.set_last_invoice_number failed")?;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> anyhow::Result<bool> {
        let res = users::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("users.delete failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list(&self, page: Option<PageRequest>) -> anyhow::Result<Vec<User>> {
        let query = users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id);
        let rows = paged(query, page)
            .all(&self.conn)
            .await
            .context("users.list failed")?;
        collect(rows, mapper::user_from_row)
    }
}

#[async_trait]
impl<C> ClientsRepository for SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Client>> {
        let found = clients::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("clients.find_by_id failed")?;
        found.map(mapper::client_from_row).transpose()
    }

    async fn insert(&self, c: Client) -> anyhow::Result<()> {
        let _ = mapper::client_to_active(c)
            .insert(&self.conn)
            .await
            .context("clients.insert failed")?;
        Ok(())
    }

    async fn update(&self, c: Client) -> anyhow::Result<()> {
        let _ = mapper::client_to_active(c)
            .update(&self.conn)
            .await
            .context("clients.update failed")?;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> anyhow::Result<bool> {
        let res = clients::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("clients.delete failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list(
        &self,
        filter: &ClientFilter,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<Client>> {
        let mut query = clients::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(clients::Column::UserId.eq(user_id.to_string()));
        }
        if let Some(archived) = filter.archived {
            query = query.filter(clients::Column::Archived.eq(archived));
        }
        let query = query
            .order_by_asc(clients::Column::CreatedAt)
            .order_by_asc(clients::Column::Id);
        let rows = paged(query, page)
            .all(&self.conn)
            .await
            .context("clients.list failed")?;
        collect(rows, mapper::client_from_row)
    }
}

#[async_trait]
impl<C> JobsRepository for SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Job>> {
        let found = jobs::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("jobs.find_by_id failed")?;
        found.map(mapper::job_from_row).transpose()
    }

    async fn insert(&self, j: Job) -> anyhow::Result<()> {
        let _ = mapper::job_to_active(j)
            .insert(&self.conn)
            .await
            .context("jobs.insert failed")?;
        Ok(())
    }

    async fn update(&self, j: Job) -> anyhow::Result<()> {
        let _ = mapper::job_to_active(j)
            .update(&self.conn)
            .await
            .context("jobs.update failed")?;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> anyhow::Result<bool> {
        let res = jobs::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("jobs.delete failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list(&self, filter: &JobFilter, page: Option<PageRequest>) -> anyhow::Result<Vec<Job>> {
        let mut query = jobs::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(jobs::Column::UserId.eq(user_id.to_string()));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(jobs::Column::ClientId.eq(client_id.to_string()));
        }
        if let Some(status) = filter.status {
            query = query.filter(jobs::Column::Status.eq(status.as_str()));
        }
        let query = query
            .order_by_asc(jobs::Column::CreatedAt)
            .order_by_asc(jobs::Column::Id);
        let rows = paged(query, page)
            .all(&self.conn)
            .await
            .context("jobs.list failed")?;
        collect(rows, mapper::job_from_row)
    }
}

#[async_trait]
impl<C> InvoicesRepository for SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Invoice>> {
        let found = invoices::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("invoices.find_by_id failed")?;
        found.map(mapper::invoice_from_row).transpose()
    }

    async fn insert(&self, i: Invoice) -> anyhow::Result<()> {
        let _ = mapper::invoice_to_active(i)?
            .insert(&self.conn)
            .await
            .context("invoices.insert failed")?;
        Ok(())
    }

    async fn update(&self, i: Invoice) -> anyhow::Result<()> {
        let _ = mapper::invoice_to_active(i)?
            .update(&self.conn)
            .await
            .context("invoices.update failed")?;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> anyhow::Result<bool> {
        let res = invoices::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("invoices.delete failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list(
        &self,
        filter: &InvoiceFilter,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<Invoice>> {
        let mut query = invoices::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(invoices::Column::UserId.eq(user_id.to_string()));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(invoices::Column::ClientId.eq(client_id.to_string()));
        }
        if let Some(status) = filter.status {
            query = query.filter(invoices::Column::Status.eq(status.as_str()));
        }
        let query = query
            .order_by_asc(invoices::Column::CreatedAt)
            .order_by_asc(invoices::Column::Id);
        let rows = paged(query, page)
            .all(&self.conn)
            .await
            .context("invoices.list failed")?;
        collect(rows, mapper::invoice_from_row)
    }
}

#[async_trait]
impl<C> ExpensesRepository for SeaOrmRecordStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: RecordId) -> anyhow::Result<Option<Expense>> {
        let found = expenses::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("expenses.find_by_id failed")?;
        found.map(mapper::expense_from_row).transpose()
    }

    async fn insert(&self, e: Expense) -> anyhow::Result<()> {
        let _ = mapper::expense_to_active(e)?
            .insert(&self.conn)
            .await
            .context("expenses.insert failed")?;
        Ok(())
    }

    async fn update(&self, e: Expense) -> anyhow::Result<()> {
        let _ = mapper::expense_to_active(e)?
            .update(&self.conn)
            .await
            .context("expenses.update failed")?;
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> anyhow::Result<bool> {
        let res = expenses::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("expenses.delete failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn list(
        &self,
        filter: &ExpenseFilter,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<Expense>> {
        let mut query = expenses::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(expenses::Column::UserId.eq(user_id.to_string()));
        }
        if let Some(job_id) = filter.job_id {
            query = query.filter(expenses::Column::JobId.eq(job_id.to_string()));
        }
        let query = query
            .order_by_with_nulls(expenses::Column::Date, Order::Desc, NullOrdering::Last)
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id);
        let rows = paged(query, page)
            .all(&self.conn)
            .await
            .context("expenses.list failed")?;
        collect(rows, mapper::expense_from_row)
    }
}

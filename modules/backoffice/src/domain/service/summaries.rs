use std::collections::BTreeMap;

use tracing::{instrument, warn};

use super::{storage, Service};
use crate::contract::{
    BillingTotals, ClientFilter, ClientSummary, ExpenseFilter, ExpenseSummary, InvoiceFilter,
    InvoiceStatus, JobFilter, JobStatus, RecordId, UserSummary,
};
use crate::domain::error::DomainError;

impl Service {
    /// Job and invoice counts by status plus money totals for one client.
    #[instrument(name = "backoffice.service.client_summary", skip(self), fields(client_id = %id))]
    pub async fn client_summary(&self, id: RecordId) -> Result<ClientSummary, DomainError> {
        let client = self.load_client(id).await?;
        if let Err(e) = self.sweep_overdue(client.user_id).await {
            warn!("Overdue sweep failed (continuing): {}", e);
        }

        let jobs = self
            .repos
            .jobs
            .list(
                &JobFilter {
                    client_id: Some(id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;
        let invoices = self
            .repos
            .invoices
            .list(
                &InvoiceFilter {
                    client_id: Some(id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;

        let mut jobs_by_status: BTreeMap<String, u64> = JobStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for job in &jobs {
            *jobs_by_status.entry(job.status.as_str().to_string()).or_default() += 1;
        }
        let mut invoices_by_status: BTreeMap<String, u64> = InvoiceStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for invoice in &invoices {
            *invoices_by_status
                .entry(invoice.status.as_str().to_string())
                .or_default() += 1;
        }

        Ok(ClientSummary {
            client,
            jobs_by_status,
            invoices_by_status,
            totals: BillingTotals::from_invoices(&invoices),
        })
    }

    #[instrument(name = "backoffice.service.user_summary", skip(self), fields(user_id = %id))]
    pub async fn user_summary(&self, id: RecordId) -> Result<UserSummary, DomainError> {
        self.load_user(id).await?;
        if let Err(e) = self.sweep_overdue(Some(id)).await {
            warn!("Overdue sweep failed (continuing): {}", e);
        }

        let clients = self
            .repos
            .clients
            .list(
                &ClientFilter {
                    user_id: Some(id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;
        let jobs = self
            .repos
            .jobs
            .list(
                &JobFilter {
                    user_id: Some(id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;
        let invoices = self
            .repos
            .invoices
            .list(
                &InvoiceFilter {
                    user_id: Some(id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;
        let expenses = self
            .repos
            .expenses
            .list(
                &ExpenseFilter {
                    user_id: Some(id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;

        let totals = BillingTotals::from_invoices(&invoices);
        let total_expenses: f64 = expenses.iter().map(|e| e.total_amount).sum();
        let total_tax: f64 = expenses.iter().filter_map(|e| e.tax_amount).sum();

        Ok(UserSummary {
            user_id: id,
            client_count: clients.len() as u64,
            job_count: jobs.len() as u64,
            invoice_count: invoices.len() as u64,
            expense_count: expenses.len() as u64,
            totals,
            total_expenses,
            total_tax,
            net_income: totals.paid - total_expenses,
        })
    }

    #[instrument(name = "backoffice.service.expense_summary", skip(self), fields(user_id = %user_id))]
    pub async fn expense_summary(&self, user_id: RecordId) -> Result<ExpenseSummary, DomainError> {
        self.load_user(user_id).await?;
        let expenses = self
            .repos
            .expenses
            .list(
                &ExpenseFilter {
                    user_id: Some(user_id),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;

        Ok(ExpenseSummary {
            user_id,
            total_expenses: expenses.iter().map(|e| e.total_amount).sum(),
            total_tax: expenses.iter().filter_map(|e| e.tax_amount).sum(),
            expense_count: expenses.len() as u64,
            expenses,
        })
    }
}

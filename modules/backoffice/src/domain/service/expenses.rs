use chrono::Utc;
use tracing::{debug, info, instrument};

use super::{required_text, storage, Service};
use crate::contract::{
    Expense, ExpenseFilter, ExpensePatch, NewExpense, PageRequest, Patch, RecordId,
};
use crate::domain::error::DomainError;

const DEFAULT_CURRENCY: &str = "USD";

impl Service {
    #[instrument(name = "backoffice.service.create_expense", skip(self, new_expense), fields(user_id = %new_expense.user_id))]
    pub async fn create_expense(&self, new_expense: NewExpense) -> Result<Expense, DomainError> {
        info!("Creating new expense");
        required_text("vendorName", &new_expense.vendor_name)?;
        self.load_user(new_expense.user_id).await?;
        if let Some(job_id) = new_expense.job_id {
            self.load_job(job_id).await?;
        }

        let expense = Expense {
            id: RecordId::generate(),
            user_id: new_expense.user_id,
            job_id: new_expense.job_id,
            vendor_name: new_expense.vendor_name,
            date: new_expense.date,
            total_amount: new_expense.total_amount,
            tax_amount: new_expense.tax_amount,
            currency: new_expense
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            line_items: new_expense.line_items,
            receipt_image_url: new_expense.receipt_image_url,
            created_at: Utc::now(),
        };
        self.repos
            .expenses
            .insert(expense.clone())
            .await
            .map_err(storage)?;

        info!("Successfully created expense with id={}", expense.id);
        Ok(expense)
    }

    #[instrument(name = "backoffice.service.get_expense", skip(self), fields(expense_id = %id))]
    pub async fn get_expense(&self, id: RecordId) -> Result<Expense, DomainError> {
        debug!("Getting expense by id");
        self.repos
            .expenses
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| DomainError::not_found("Expense", id))
    }

    #[instrument(name = "backoffice.service.list_expenses", skip(self))]
    pub async fn list_expenses(
        &self,
        filter: ExpenseFilter,
        page: PageRequest,
    ) -> Result<Vec<Expense>, DomainError> {
        self.repos
            .expenses
            .list(&filter, Some(page))
            .await
            .map_err(storage)
    }

    #[instrument(name = "backoffice.service.update_expense", skip(self, patch), fields(expense_id = %id))]
    pub async fn update_expense(
        &self,
        id: RecordId,
        patch: ExpensePatch,
    ) -> Result<Expense, DomainError> {
        info!("Updating expense");
        if patch.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        let mut expense = self.get_expense(id).await?;

        match patch.user_id {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("userId")),
            Patch::Value(user_id) => {
                self.load_user(user_id).await?;
                expense.user_id = user_id;
            }
        }
        if let Patch::Value(job_id) = patch.job_id {
            self.load_job(job_id).await?;
        }
        patch.job_id.apply_to(&mut expense.job_id);
        match patch.vendor_name {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("vendorName")),
            Patch::Value(v) => {
                required_text("vendorName", &v)?;
                expense.vendor_name = v;
            }
        }
        patch.date.apply_to(&mut expense.date);
        match patch.total_amount {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("totalAmount")),
            Patch::Value(v) => expense.total_amount = v,
        }
        patch.tax_amount.apply_to(&mut expense.tax_amount);
        match patch.currency {
            Patch::Absent => {}
            Patch::Null => expense.currency = DEFAULT_CURRENCY.to_string(),
            Patch::Value(v) => expense.currency = v,
        }
        match patch.line_items {
            Patch::Absent => {}
            Patch::Null => expense.line_items.clear(),
            Patch::Value(items) => expense.line_items = items,
        }
        patch
            .receipt_image_url
            .apply_to(&mut expense.receipt_image_url);

        self.repos
            .expenses
            .update(expense.clone())
            .await
            .map_err(storage)?;
        info!("Successfully updated expense");
        Ok(expense)
    }

    #[instrument(name = "backoffice.service.delete_expense", skip(self), fields(expense_id = %id))]
    pub async fn delete_expense(&self, id: RecordId) -> Result<(), DomainError> {
        info!("Deleting expense");
        if !self.repos.expenses.delete(id).await.map_err(storage)? {
            return Err(DomainError::not_found("Expense", id));
        }
        Ok(())
    }
}

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{required_text, storage, Service};
use crate::contract::{
    Invoice, InvoiceDetails, InvoiceFilter, InvoicePatch, InvoiceStatus, Job, JobStatus,
    MailOutcome, NewInvoice, PageRequest, Patch, RecordId, INVOICE_NUMBER_BASE,
};
use crate::domain::dates;
use crate::domain::error::DomainError;
use crate::domain::invoice_mail::{self, InvoiceMessage};

impl Service {
    /// Create an invoice, numbering it from the user's counter when no number is given.
    ///
    /// Client and job references are validated before any write. The counter is
    /// then written before the invoice row, as a separate write: two
    /// concurrent creations for one user can read the same counter and produce
    /// the same number.
    #[instrument(name = "backoffice.service.create_invoice", skip(self, new_invoice), fields(user_id = %new_invoice.user_id))]
    pub async fn create_invoice(&self, new_invoice: NewInvoice) -> Result<Invoice, DomainError> {
        info!("Creating new invoice");
        let user = self.load_user(new_invoice.user_id).await?;

        // Every reference is resolved before anything is written.
        let client = match new_invoice.client_id {
            Some(cid) => Some(self.load_client(cid).await?),
            None => None,
        };
        if let Some(job_id) = new_invoice.job_id {
            self.load_job(job_id).await?;
        }

        let invoice_number = match new_invoice
            .invoice_number
            .filter(|n| !n.trim().is_empty())
        {
            Some(number) => number,
            None => {
                let next = user.last_invoice_number.unwrap_or(INVOICE_NUMBER_BASE) + 1;
                self.repos
                    .users
                    .set_last_invoice_number(user.id, next)
                    .await
                    .map_err(storage)?;
                debug!(next, "Advanced invoice counter");
                format!("INV-{next}")
            }
        };

        let client = match client {
            Some(client) => Some(self.adopt_client(client, user.id).await?),
            None => None,
        };

        let now = Utc::now();
        let total = new_invoice
            .total
            .unwrap_or_else(|| new_invoice.line_items.iter().map(|li| li.amount).sum());
        let mut invoice = Invoice {
            id: RecordId::generate(),
            user_id: user.id,
            client_id: new_invoice.client_id,
            job_id: new_invoice.job_id,
            invoice_number,
            invoice_title: new_invoice.invoice_title,
            invoice_description: new_invoice.invoice_description,
            status: new_invoice.status,
            issue_date: new_invoice.issue_date,
            due_date: new_invoice.due_date,
            line_items: new_invoice.line_items,
            total,
            created_at: now,
        };

        if let (Some(client), None) = (&client, invoice.job_id) {
            let title = invoice
                .invoice_title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .or_else(|| {
                    invoice
                        .invoice_description
                        .clone()
                        .filter(|d| !d.trim().is_empty())
                })
                .unwrap_or_else(|| format!("Invoice {}", invoice.invoice_number));
            let job = Job {
                id: RecordId::generate(),
                user_id: user.id,
                client_id: Some(client.id),
                title,
                status: JobStatus::Completed,
                start_time: invoice
                    .issue_date
                    .as_deref()
                    .and_then(dates::parse_datetime)
                    .or(Some(now)),
                end_time: invoice
                    .due_date
                    .as_deref()
                    .and_then(dates::parse_datetime)
                    .or(Some(now)),
                location: client.address.clone(),
                invoice_id: Some(invoice.id),
                calendar_event_id: None,
                created_at: now,
            };
            self.repos.jobs.insert(job.clone()).await.map_err(storage)?;
            invoice.job_id = Some(job.id);
            debug!(job_id = %job.id, "Synthesized job for invoice");
        }

        self.repos
            .invoices
            .insert(invoice.clone())
            .await
            .map_err(storage)?;

        info!(
            "Successfully created invoice {} with id={}",
            invoice.invoice_number, invoice.id
        );
        Ok(invoice)
    }

    #[instrument(name = "backoffice.service.get_invoice", skip(self), fields(invoice_id = %id))]
    pub async fn get_invoice(&self, id: RecordId) -> Result<Invoice, DomainError> {
        debug!("Getting invoice by id");
        self.load_invoice(id).await
    }

    /// Lists invoices after promoting overdue ones, unless the caller is asking for
    /// overdue invoices specifically.
    #[instrument(name = "backoffice.service.list_invoices", skip(self))]
    pub async fn list_invoices(
        &self,
        filter: InvoiceFilter,
        page: PageRequest,
    ) -> Result<Vec<Invoice>, DomainError> {
        if filter.status != Some(InvoiceStatus::Overdue) {
            if let Err(e) = self.sweep_overdue(filter.user_id).await {
                warn!("Overdue sweep failed (continuing): {}", e);
            }
        }
        self.repos
            .invoices
            .list(&filter, Some(page))
            .await
            .map_err(storage)
    }

    /// Apply a partial update. A `draft` → `sent` transition mails the invoice
    /// to the client once the write has committed; mail failures are only logged.
    #[instrument(name = "backoffice.service.update_invoice", skip(self, patch, pdf_base64), fields(invoice_id = %id))]
    pub async fn update_invoice(
        &self,
        id: RecordId,
        patch: InvoicePatch,
        pdf_base64: Option<String>,
    ) -> Result<Invoice, DomainError> {
        info!("Updating invoice");
        if patch.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        let mut invoice = self.load_invoice(id).await?;
        let previous_status = invoice.status;

        match patch.user_id {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("userId")),
            Patch::Value(user_id) => {
                self.load_user(user_id).await?;
                invoice.user_id = user_id;
            }
        }
        let client = match patch.client_id {
            Patch::Value(client_id) => Some(self.load_client(client_id).await?),
            _ => None,
        };
        patch.client_id.apply_to(&mut invoice.client_id);
        if let Patch::Value(job_id) = patch.job_id {
            self.load_job(job_id).await?;
        }
        patch.job_id.apply_to(&mut invoice.job_id);
        match patch.invoice_number {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("invoiceNumber")),
            Patch::Value(number) => {
                required_text("invoiceNumber", &number)?;
                invoice.invoice_number = number;
            }
        }
        patch.invoice_title.apply_to(&mut invoice.invoice_title);
        patch
            .invoice_description
            .apply_to(&mut invoice.invoice_description);
        match patch.status {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("status")),
            Patch::Value(status) => invoice.status = status,
        }
        patch.issue_date.apply_to(&mut invoice.issue_date);
        patch.due_date.apply_to(&mut invoice.due_date);
        match patch.line_items {
            Patch::Absent => {}
            Patch::Null => invoice.line_items.clear(),
            Patch::Value(items) => invoice.line_items = items,
        }
        match patch.total {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("total")),
            Patch::Value(total) => invoice.total = total,
        }

        if let Some(client) = client {
            self.adopt_client(client, invoice.user_id).await?;
        }
        self.repos
            .invoices
            .update(invoice.clone())
            .await
            .map_err(storage)?;
        info!("Successfully updated invoice");

        if previous_status == InvoiceStatus::Draft && invoice.status == InvoiceStatus::Sent {
            let outcome = self.mail_invoice(&invoice, pdf_base64.as_deref()).await;
            if outcome.success {
                info!("{}", outcome.message);
            } else {
                warn!("Invoice email not sent: {}", outcome.message);
            }
        }

        Ok(invoice)
    }

    #[instrument(name = "backoffice.service.delete_invoice", skip(self), fields(invoice_id = %id))]
    pub async fn delete_invoice(&self, id: RecordId) -> Result<(), DomainError> {
        info!("Deleting invoice");
        if !self.repos.invoices.delete(id).await.map_err(storage)? {
            return Err(DomainError::not_found("Invoice", id));
        }
        Ok(())
    }

    /// Promote `sent` invoices whose due date is before today (UTC) to `overdue`
    /// and attempt one reminder for each. Returns how many were promoted.
    ///
    /// Unparseable due dates are skipped. Per-invoice failures are logged and
    /// do not stop the sweep.
    #[instrument(name = "backoffice.service.sweep_overdue", skip(self))]
    pub async fn sweep_overdue(&self, user_id: Option<RecordId>) -> Result<usize, DomainError> {
        let today = Utc::now().date_naive();
        let filter = InvoiceFilter {
            user_id,
            status: Some(InvoiceStatus::Sent),
            ..Default::default()
        };
        let sent = self
            .repos
            .invoices
            .list(&filter, None)
            .await
            .map_err(storage)?;

        let mut promoted = 0;
        for mut invoice in sent {
            let Some(due) = invoice
                .due_date
                .as_deref()
                .and_then(dates::parse_calendar_date)
            else {
                continue;
            };
            if due >= today {
                continue;
            }

            invoice.status = InvoiceStatus::Overdue;
            if let Err(e) = self.repos.invoices.update(invoice.clone()).await {
                warn!(invoice_id = %invoice.id, "Failed to mark invoice overdue: {:#}", e);
                continue;
            }
            promoted += 1;
            info!(invoice_id = %invoice.id, "Invoice marked overdue");

            let outcome = self.mail_reminder(&invoice).await;
            if !outcome.success {
                warn!(invoice_id = %invoice.id, "Reminder not sent: {}", outcome.message);
            }
        }

        if promoted > 0 {
            info!("Overdue sweep promoted {} invoices", promoted);
        }
        Ok(promoted)
    }

    #[instrument(name = "backoffice.service.send_reminder", skip(self), fields(invoice_id = %id))]
    pub async fn send_reminder(&self, id: RecordId) -> Result<MailOutcome, DomainError> {
        let invoice = self.load_invoice(id).await?;
        Ok(self.mail_reminder(&invoice).await)
    }

    /// The invoice email HTML, for printing.
    #[instrument(name = "backoffice.service.printable_invoice", skip(self), fields(invoice_id = %id))]
    pub async fn printable_invoice(&self, id: RecordId) -> Result<String, DomainError> {
        let invoice = self.load_invoice(id).await?;
        let message = self.compose_message(&invoice).await?;
        Ok(invoice_mail::invoice_html(&message))
    }

    #[instrument(name = "backoffice.service.invoice_details", skip(self), fields(invoice_id = %id))]
    pub async fn invoice_details(&self, id: RecordId) -> Result<InvoiceDetails, DomainError> {
        let invoice = self.load_invoice(id).await?;
        let client = match invoice.client_id {
            Some(cid) => self.repos.clients.find_by_id(cid).await.map_err(storage)?,
            None => None,
        };
        let job = match invoice.job_id {
            Some(jid) => self.repos.jobs.find_by_id(jid).await.map_err(storage)?,
            None => None,
        };
        let business = self
            .repos
            .users
            .find_by_id(invoice.user_id)
            .await
            .map_err(storage)?;
        Ok(InvoiceDetails {
            invoice,
            client,
            job,
            business,
        })
    }

    pub(super) async fn load_invoice(&self, id: RecordId) -> Result<Invoice, DomainError> {
        self.repos
            .invoices
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| DomainError::not_found("Invoice", id))
    }

    async fn compose_message(&self, invoice: &Invoice) -> Result<InvoiceMessage, DomainError> {
        let client = match invoice.client_id {
            Some(cid) => self.repos.clients.find_by_id(cid).await.map_err(storage)?,
            None => None,
        };
        let business = self
            .repos
            .users
            .find_by_id(invoice.user_id)
            .await
            .map_err(storage)?;
        Ok(InvoiceMessage::compose(
            invoice,
            client.as_ref(),
            business.as_ref(),
        ))
    }

    async fn recipient(&self, invoice: &Invoice) -> Option<String> {
        let cid = invoice.client_id?;
        match self.repos.clients.find_by_id(cid).await {
            Ok(client) => client.and_then(|c| c.email).filter(|e| !e.trim().is_empty()),
            Err(e) => {
                warn!(client_id = %cid, "Failed to load client for mail: {:#}", e);
                None
            }
        }
    }

    async fn mail_invoice(&self, invoice: &Invoice, pdf_base64: Option<&str>) -> MailOutcome {
        let message = match self.compose_message(invoice).await {
            Ok(m) => m,
            Err(e) => return MailOutcome::failed(e.to_string()),
        };
        let recipient = self.recipient(invoice).await;
        self.integrations
            .mailer
            .send_invoice(&message, recipient.as_deref(), pdf_base64)
            .await
    }

    async fn mail_reminder(&self, invoice: &Invoice) -> MailOutcome {
        let message = match self.compose_message(invoice).await {
            Ok(m) => m,
            Err(e) => return MailOutcome::failed(e.to_string()),
        };
        let recipient = self.recipient(invoice).await;
        self.integrations
            .mailer
            .send_reminder(&message, recipient.as_deref())
            .await
    }
}

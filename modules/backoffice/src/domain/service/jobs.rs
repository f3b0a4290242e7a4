use chrono::Utc;
use tracing::{debug, info, instrument};

use super::{required_text, storage, Service};
use crate::contract::{
    ExpenseFilter, Job, JobDetails, JobFilter, JobPatch, NewJob, PageRequest, Patch, RecordId,
};
use crate::domain::error::DomainError;

impl Service {
    #[instrument(name = "backoffice.service.create_job", skip(self, new_job), fields(user_id = %new_job.user_id))]
    pub async fn create_job(&self, new_job: NewJob) -> Result<Job, DomainError> {
        info!("Creating new job");
        required_text("title", &new_job.title)?;
        self.load_user(new_job.user_id).await?;
        if let Some(client_id) = new_job.client_id {
            self.link_client(client_id, new_job.user_id).await?;
        }

        let job = Job {
            id: RecordId::generate(),
            user_id: new_job.user_id,
            client_id: new_job.client_id,
            title: new_job.title,
            status: new_job.status,
            start_time: new_job.start_time,
            end_time: new_job.end_time,
            location: new_job.location,
            invoice_id: None,
            calendar_event_id: new_job.calendar_event_id,
            created_at: Utc::now(),
        };
        self.repos.jobs.insert(job.clone()).await.map_err(storage)?;

        info!("Successfully created job with id={}", job.id);
        Ok(job)
    }

    #[instrument(name = "backoffice.service.get_job", skip(self), fields(job_id = %id))]
    pub async fn get_job(&self, id: RecordId) -> Result<Job, DomainError> {
        debug!("Getting job by id");
        self.load_job(id).await
    }

    #[instrument(name = "backoffice.service.list_jobs", skip(self))]
    pub async fn list_jobs(
        &self,
        filter: JobFilter,
        page: PageRequest,
    ) -> Result<Vec<Job>, DomainError> {
        self.repos
            .jobs
            .list(&filter, Some(page))
            .await
            .map_err(storage)
    }

    #[instrument(name = "backoffice.service.update_job", skip(self, patch), fields(job_id = %id))]
    pub async fn update_job(&self, id: RecordId, patch: JobPatch) -> Result<Job, DomainError> {
        info!("Updating job");
        if patch.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        let mut job = self.load_job(id).await?;

        match patch.user_id {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("userId")),
            Patch::Value(user_id) => {
                self.load_user(user_id).await?;
                job.user_id = user_id;
            }
        }
        let client = match patch.client_id {
            Patch::Value(client_id) => Some(self.load_client(client_id).await?),
            _ => None,
        };
        patch.client_id.apply_to(&mut job.client_id);
        match patch.title {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("title")),
            Patch::Value(title) => {
                required_text("title", &title)?;
                job.title = title;
            }
        }
        match patch.status {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("status")),
            Patch::Value(status) => job.status = status,
        }
        patch.start_time.apply_to(&mut job.start_time);
        patch.end_time.apply_to(&mut job.end_time);
        patch.location.apply_to(&mut job.location);
        if let Patch::Value(invoice_id) = patch.invoice_id {
            self.load_invoice(invoice_id).await?;
        }
        patch.invoice_id.apply_to(&mut job.invoice_id);
        patch.calendar_event_id.apply_to(&mut job.calendar_event_id);

        if let Some(client) = client {
            self.adopt_client(client, job.user_id).await?;
        }
        self.repos.jobs.update(job.clone()).await.map_err(storage)?;
        info!("Successfully updated job");
        Ok(job)
    }

    #[instrument(name = "backoffice.service.delete_job", skip(self), fields(job_id = %id))]
    pub async fn delete_job(&self, id: RecordId) -> Result<(), DomainError> {
        info!("Deleting job");
        if !self.repos.jobs.delete(id).await.map_err(storage)? {
            return Err(DomainError::not_found("Job", id));
        }
        Ok(())
    }

    /// Job with its client, invoice and linked expenses. Dangling references read as absent.
    #[instrument(name = "backoffice.service.job_details", skip(self), fields(job_id = %id))]
    pub async fn job_details(&self, id: RecordId) -> Result<JobDetails, DomainError> {
        let job = self.load_job(id).await?;
        let client = match job.client_id {
            Some(cid) => self.repos.clients.find_by_id(cid).await.map_err(storage)?,
            None => None,
        };
        let invoice = match job.invoice_id {
            Some(iid) => self.repos.invoices.find_by_id(iid).await.map_err(storage)?,
            None => None,
        };
        let filter = ExpenseFilter {
            job_id: Some(id),
            ..Default::default()
        };
        let expenses = self
            .repos
            .expenses
            .list(&filter, None)
            .await
            .map_err(storage)?;
        Ok(JobDetails {
            job,
            client,
            invoice,
            expenses,
        })
    }

    pub(super) async fn load_job(&self, id: RecordId) -> Result<Job, DomainError> {
        self.repos
            .jobs
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| DomainError::not_found("Job", id))
    }
}

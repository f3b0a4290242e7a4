use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{required_text, storage, Service};
use crate::contract::{
    Client, ClientFilter, ClientPatch, Invoice, InvoiceFilter, Job, JobFilter, NewClient,
    PageRequest, Patch, RecordId,
};
use crate::domain::error::DomainError;

impl Service {
    #[instrument(name = "backoffice.service.create_client", skip(self, new_client), fields(user_id = %new_client.user_id))]
    pub async fn create_client(&self, new_client: NewClient) -> Result<Client, DomainError> {
        info!("Creating new client");
        required_text("name", &new_client.name)?;
        self.load_user(new_client.user_id).await?;

        let client = Client {
            id: RecordId::generate(),
            user_id: Some(new_client.user_id),
            name: new_client.name,
            email: new_client.email,
            address: new_client.address,
            archived: new_client.archived,
            created_at: Utc::now(),
        };
        self.repos.clients.insert(client.clone()).await.map_err(storage)?;

        info!("Successfully created client with id={}", client.id);
        Ok(client)
    }

    #[instrument(name = "backoffice.service.get_client", skip(self), fields(client_id = %id))]
    pub async fn get_client(&self, id: RecordId) -> Result<Client, DomainError> {
        debug!("Getting client by id");
        self.load_client(id).await
    }

    #[instrument(name = "backoffice.service.list_clients", skip(self))]
    pub async fn list_clients(
        &self,
        filter: ClientFilter,
        page: PageRequest,
    ) -> Result<Vec<Client>, DomainError> {
        let clients = self
            .repos
            .clients
            .list(&filter, Some(page))
            .await
            .map_err(storage)?;
        debug!("Listed {} clients", clients.len());
        Ok(clients)
    }

    #[instrument(name = "backoffice.service.update_client", skip(self, patch), fields(client_id = %id))]
    pub async fn update_client(
        &self,
        id: RecordId,
        patch: ClientPatch,
    ) -> Result<Client, DomainError> {
        info!("Updating client");
        if patch.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        let mut client = self.load_client(id).await?;

        if let Patch::Value(user_id) = patch.user_id {
            self.load_user(user_id).await?;
        }
        patch.user_id.apply_to(&mut client.user_id);
        match patch.name {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("name")),
            Patch::Value(name) => {
                required_text("name", &name)?;
                client.name = name;
            }
        }
        patch.email.apply_to(&mut client.email);
        patch.address.apply_to(&mut client.address);
        match patch.archived {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("archived")),
            Patch::Value(v) => client.archived = v,
        }

        self.repos.clients.update(client.clone()).await.map_err(storage)?;
        info!("Successfully updated client");
        Ok(client)
    }

    #[instrument(name = "backoffice.service.delete_client", skip(self), fields(client_id = %id))]
    pub async fn delete_client(&self, id: RecordId) -> Result<(), DomainError> {
        info!("Deleting client");
        if !self.repos.clients.delete(id).await.map_err(storage)? {
            return Err(DomainError::not_found("Client", id));
        }
        Ok(())
    }

    #[instrument(name = "backoffice.service.list_client_jobs", skip(self), fields(client_id = %id))]
    pub async fn list_client_jobs(
        &self,
        id: RecordId,
        page: PageRequest,
    ) -> Result<Vec<Job>, DomainError> {
        self.load_client(id).await?;
        let filter = JobFilter {
            client_id: Some(id),
            ..Default::default()
        };
        self.repos
            .jobs
            .list(&filter, Some(page))
            .await
            .map_err(storage)
    }

    #[instrument(name = "backoffice.service.list_client_invoices", skip(self), fields(client_id = %id))]
    pub async fn list_client_invoices(
        &self,
        id: RecordId,
        page: PageRequest,
    ) -> Result<Vec<Invoice>, DomainError> {
        let client = self.load_client(id).await?;
        if let Err(e) = self.sweep_overdue(client.user_id).await {
            warn!("Overdue sweep failed (continuing): {}", e);
        }
        let filter = InvoiceFilter {
            client_id: Some(id),
            ..Default::default()
        };
        self.repos
            .invoices
            .list(&filter, Some(page))
            .await
            .map_err(storage)
    }

    pub(super) async fn load_client(&self, id: RecordId) -> Result<Client, DomainError> {
        self.repos
            .clients
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| DomainError::not_found("Client", id))
    }

    /// Resolve a client reference and adopt it for `user_id` if it has no owner yet.
    pub(super) async fn link_client(
        &self,
        id: RecordId,
        user_id: RecordId,
    ) -> Result<Client, DomainError> {
        let client = self.load_client(id).await?;
        self.adopt_client(client, user_id).await
    }

    /// Give an unowned client to `user_id`; owned clients are returned unchanged.
    pub(super) async fn adopt_client(
        &self,
        mut client: Client,
        user_id: RecordId,
    ) -> Result<Client, DomainError> {
        if client.user_id.is_none() {
            client.user_id = Some(user_id);
            self.repos.clients.update(client.clone()).await.map_err(storage)?;
            debug!(client_id = %client.id, "Linked unowned client to user");
        }
        Ok(client)
    }
}

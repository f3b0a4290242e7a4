use chrono::Utc;
use tracing::{debug, info, instrument};

use super::{storage, valid_email, Service};
use crate::contract::{IdentityClaims, NewUser, PageRequest, Patch, RecordId, SyncOutcome, User, UserPatch};
use crate::domain::error::DomainError;

impl Service {
    #[instrument(name = "backoffice.service.create_user", skip(self, new_user), fields(email = %new_user.business_email))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        valid_email("businessEmail", &new_user.business_email)?;
        self.ensure_business_email_free(&new_user.business_email, None)
            .await?;
        if let Some(subject) = new_user.identity_subject.as_deref() {
            self.ensure_subject_free(subject, None).await?;
        }

        let user = User {
            id: RecordId::generate(),
            identity_subject: new_user.identity_subject,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            personal_email: new_user.personal_email,
            business_name: new_user.business_name,
            business_email: Some(new_user.business_email),
            business_phone: new_user.business_phone,
            business_address: new_user.business_address,
            business_category: new_user.business_category,
            hourly_rate: new_user.hourly_rate,
            last_invoice_number: new_user.last_invoice_number,
            onboarding_complete: new_user.onboarding_complete,
            created_at: Utc::now(),
        };

        self.repos.users.insert(user.clone()).await.map_err(storage)?;

        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "backoffice.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: RecordId) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.load_user(id).await
    }

    #[instrument(name = "backoffice.service.list_users", skip(self))]
    pub async fn list_users(&self, page: PageRequest) -> Result<Vec<User>, DomainError> {
        let users = self.repos.users.list(Some(page)).await.map_err(storage)?;
        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "backoffice.service.update_user", skip(self, patch), fields(user_id = %id))]
    pub async fn update_user(&self, id: RecordId, patch: UserPatch) -> Result<User, DomainError> {
        info!("Updating user");
        if patch.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        let current = self.load_user(id).await?;
        let updated = self.apply_user_patch(current, patch).await?;
        self.repos.users.update(updated.clone()).await.map_err(storage)?;
        info!("Successfully updated user");
        Ok(updated)
    }

    #[instrument(name = "backoffice.service.delete_user", skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: RecordId) -> Result<(), DomainError> {
        info!("Deleting user");
        let deleted = self.repos.users.delete(id).await.map_err(storage)?;
        if !deleted {
            return Err(DomainError::not_found("User", id));
        }
        info!("Successfully deleted user");
        Ok(())
    }

    /// Find the caller's user record, creating a bare one on first sign-in.
    #[instrument(name = "backoffice.service.sync_user", skip(self, claims), fields(subject = %claims.subject))]
    pub async fn sync_user(&self, claims: &IdentityClaims) -> Result<SyncOutcome, DomainError> {
        if let Some(user) = self
            .repos
            .users
            .find_by_subject(&claims.subject)
            .await
            .map_err(storage)?
        {
            debug!("User already synced");
            return Ok(SyncOutcome {
                user,
                created: false,
            });
        }

        let user = User {
            id: RecordId::generate(),
            identity_subject: Some(claims.subject.clone()),
            first_name: None,
            last_name: None,
            personal_email: claims.email.clone(),
            business_name: None,
            business_email: None,
            business_phone: None,
            business_address: None,
            business_category: None,
            hourly_rate: None,
            last_invoice_number: None,
            onboarding_complete: false,
            created_at: Utc::now(),
        };
        self.repos.users.insert(user.clone()).await.map_err(storage)?;
        info!("Created user {} for new identity", user.id);
        Ok(SyncOutcome {
            user,
            created: true,
        })
    }

    #[instrument(name = "backoffice.service.get_user_by_subject", skip(self))]
    pub async fn get_user_by_subject(&self, subject: &str) -> Result<User, DomainError> {
        self.repos
            .users
            .find_by_subject(subject)
            .await
            .map_err(storage)?
            .ok_or_else(|| DomainError::not_found("User", subject))
    }

    /// Profile edit by the signed-in user; completes onboarding.
    #[instrument(name = "backoffice.service.update_profile", skip(self, patch))]
    pub async fn update_profile(&self, subject: &str, mut patch: UserPatch) -> Result<User, DomainError> {
        let current = self.get_user_by_subject(subject).await?;
        patch.identity_subject = Patch::Absent;
        patch.onboarding_complete = Patch::Value(true);
        let updated = self.apply_user_patch(current, patch).await?;
        self.repos.users.update(updated.clone()).await.map_err(storage)?;
        info!("Profile updated for user {}", updated.id);
        Ok(updated)
    }

    pub(super) async fn load_user(&self, id: RecordId) -> Result<User, DomainError> {
        self.repos
            .users
            .find_by_id(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    async fn apply_user_patch(&self, mut user: User, patch: UserPatch) -> Result<User, DomainError> {
        if let Patch::Value(email) = &patch.business_email {
            valid_email("businessEmail", email)?;
            self.ensure_business_email_free(email, Some(user.id)).await?;
        }
        if let Patch::Value(subject) = &patch.identity_subject {
            self.ensure_subject_free(subject, Some(user.id)).await?;
        }

        patch.identity_subject.apply_to(&mut user.identity_subject);
        patch.first_name.apply_to(&mut user.first_name);
        patch.last_name.apply_to(&mut user.last_name);
        patch.personal_email.apply_to(&mut user.personal_email);
        patch.business_name.apply_to(&mut user.business_name);
        patch.business_email.apply_to(&mut user.business_email);
        patch.business_phone.apply_to(&mut user.business_phone);
        patch.business_address.apply_to(&mut user.business_address);
        patch.business_category.apply_to(&mut user.business_category);
        patch.hourly_rate.apply_to(&mut user.hourly_rate);
        patch.last_invoice_number.apply_to(&mut user.last_invoice_number);
        match patch.onboarding_complete {
            Patch::Absent => {}
            Patch::Null => return Err(DomainError::not_nullable("onboardingComplete")),
            Patch::Value(v) => user.onboarding_complete = v,
        }
        Ok(user)
    }

    async fn ensure_business_email_free(
        &self,
        email: &str,
        owner: Option<RecordId>,
    ) -> Result<(), DomainError> {
        let existing = self
            .repos
            .users
            .find_by_business_email(email)
            .await
            .map_err(storage)?;
        match existing {
            Some(u) if Some(u.id) != owner => Err(DomainError::conflict(format!(
                "User with email '{email}' already exists"
            ))),
            _ => Ok(()),
        }
    }

    async fn ensure_subject_free(
        &self,
        subject: &str,
        owner: Option<RecordId>,
    ) -> Result<(), DomainError> {
        let existing = self
            .repos
            .users
            .find_by_subject(subject)
            .await
            .map_err(storage)?;
        match existing {
            Some(u) if Some(u.id) != owner => Err(DomainError::conflict(
                "Identity is already linked to another user",
            )),
            _ => Ok(()),
        }
    }
}

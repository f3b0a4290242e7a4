use std::sync::Arc;

use crate::contract::PageRequest;
use crate::domain::error::DomainError;
use crate::domain::ports::{AnalyticsSandbox, InvoiceMailer, Orchestrator, Transcriber};
use crate::domain::repo::Repositories;

mod agent;
mod clients;
mod expenses;
mod invoices;
mod jobs;
mod summaries;
mod users;

/// Domain service with the business rules of the back office.
/// Depends only on repository and integration ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    repos: Repositories,
    integrations: Integrations,
    config: ServiceConfig,
}

/// Outbound collaborators.
#[derive(Clone)]
pub struct Integrations {
    pub mailer: Arc<dyn InvoiceMailer>,
    pub orchestrator: Arc<dyn Orchestrator>,
    pub sandbox: Arc<dyn AnalyticsSandbox>,
    pub transcriber: Arc<dyn Transcriber>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

impl Service {
    pub fn new(repos: Repositories, integrations: Integrations, config: ServiceConfig) -> Self {
        Self {
            repos,
            integrations,
            config,
        }
    }

    /// `limit` of 0 or absent means the default page size; capped at the maximum.
    pub fn page(&self, skip: Option<u64>, limit: Option<u64>) -> PageRequest {
        let limit = match limit {
            None | Some(0) => self.config.default_page_size,
            Some(n) => n,
        };
        PageRequest {
            skip: skip.unwrap_or(0),
            limit: limit.min(self.config.max_page_size),
        }
    }
}

pub(crate) fn storage(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

fn required_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn valid_email(field: &str, value: &str) -> Result<(), DomainError> {
    required_text(field, value)?;
    if !value.contains('@') {
        return Err(DomainError::validation(field, "must be an email address"));
    }
    Ok(())
}

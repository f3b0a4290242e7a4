use tracing::{debug, info, instrument, warn};

use super::{storage, Service};
use crate::contract::{ClientFilter, ExpenseFilter, InvoiceFilter, JobFilter};
use crate::domain::error::DomainError;
use crate::domain::ports::{AnalyticsSnapshot, AudioUpload};

impl Service {
    /// One agent turn for the signed-in user.
    ///
    /// When the orchestrator routes to `system`, its query runs against the
    /// caller's records and the result goes back for a final answer.
    #[instrument(name = "backoffice.service.agent_chat", skip(self, message), fields(subject = %subject))]
    pub async fn agent_chat(
        &self,
        subject: &str,
        message: &str,
    ) -> Result<Option<String>, DomainError> {
        let directive = self
            .integrations
            .orchestrator
            .run(message)
            .await
            .map_err(|e| DomainError::external("orchestrator", format!("{e:#}")))?;

        if !directive.is_for_system() {
            debug!(to = %directive.to, "Orchestrator answered directly");
            return Ok(directive.message);
        }

        let query = directive.query.unwrap_or_default();
        let snapshot = self.analytics_snapshot(subject).await?;
        let result = self
            .integrations
            .sandbox
            .run_query(&snapshot, &query)
            .await;
        info!("Analytics query executed");

        let follow_up = format!(
            "USE THE APP NAVIGATION ROUTE FOR THIS: {message} was asked which generated this query: {query} which had this result: {result}"
        );
        let answer = self
            .integrations
            .orchestrator
            .run(&follow_up)
            .await
            .map_err(|e| DomainError::external("orchestrator", format!("{e:#}")))?;
        Ok(answer.message)
    }

    /// Speech-to-text; `None` when the service fails or hears nothing.
    #[instrument(name = "backoffice.service.transcribe", skip(self, audio), fields(file = %audio.file_name, bytes = audio.bytes.len()))]
    pub async fn transcribe(&self, audio: AudioUpload) -> Option<String> {
        match self.integrations.transcriber.transcribe(audio).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                warn!("Transcription returned no text");
                None
            }
            Err(e) => {
                warn!("Transcription failed: {:#}", e);
                None
            }
        }
    }

    async fn analytics_snapshot(&self, subject: &str) -> Result<AnalyticsSnapshot, DomainError> {
        let profile = self.get_user_by_subject(subject).await?;
        let uid = Some(profile.id);
        let clients = self
            .repos
            .clients
            .list(
                &ClientFilter {
                    user_id: uid,
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
                    user_id: uid,
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
                    user_id: uid,
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
                    user_id: uid,
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(storage)?;
        Ok(AnalyticsSnapshot {
            profile,
            clients,
            jobs,
            invoices,
            expenses,
        })
    }
}

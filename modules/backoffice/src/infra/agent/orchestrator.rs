use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use modkit::TracedClient;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::config::OrchestratorConfig;
use crate::domain::ports::{AgentDirective, Orchestrator};

#[derive(Debug, Deserialize)]
struct StartedRun {
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct RunStatus {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    outputs: Option<Value>,
}

/// Runs the saved workflow over HTTP: one `start_pipeline` call, then
/// `get_pl_run` polling until the run reports `DONE`.
pub struct HttpOrchestrator {
    http: TracedClient,
    config: OrchestratorConfig,
}

impl HttpOrchestrator {
    pub fn new(config: OrchestratorConfig, http: TracedClient) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn start(&self, message: &str) -> anyhow::Result<String> {
        let inner = json!({ "user_message": message }).to_string();
        let builder = self
            .http
            .request(Method::POST, &self.endpoint("start_pipeline"))
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("user_id", self.config.user_id.as_str()),
                ("saved_item_id", self.config.saved_item_id.as_str()),
            ])
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "webhook_payload": inner }));

        let started: StartedRun = self
            .http
            .send(builder)
            .await
            .context("start_pipeline request failed")?
            .error_for_status()
            .context("start_pipeline rejected")?
            .json()
            .await
            .context("start_pipeline returned no run id")?;
        Ok(started.run_id)
    }

    async fn poll(&self, run_id: &str) -> anyhow::Result<Option<Value>> {
        let builder = self
            .http
            .request(Method::GET, &self.endpoint("get_pl_run"))
            .query(&[("run_id", run_id), ("user_id", self.config.user_id.as_str())])
            .bearer_auth(&self.config.api_key);

        let status: RunStatus = self
            .http
            .send(builder)
            .await
            .context("get_pl_run request failed")?
            .error_for_status()
            .context("get_pl_run rejected")?
            .json()
            .await
            .context("get_pl_run body is not JSON")?;

        if status.state.as_deref() != Some("DONE") {
            return Ok(None);
        }
        let output = status
            .outputs
            .and_then(|mut o| o.get_mut("output").map(Value::take))
            .ok_or_else(|| anyhow!("finished run has no output"))?;
        Ok(Some(output))
    }
}

/// The workflow emits its decision either as a JSON object or as a string holding one.
fn parse_directive(output: Value) -> anyhow::Result<AgentDirective> {
    let directive = match output {
        Value::String(text) => serde_json::from_str(text.trim())
            .with_context(|| format!("orchestrator output is not a directive: {text}"))?,
        other => serde_json::from_value(other).context("orchestrator output is not a directive")?,
    };
    Ok(directive)
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    #[instrument(name = "backoffice.orchestrator.run", skip_all)]
    async fn run(&self, message: &str) -> anyhow::Result<AgentDirective> {
        let run_id = self.start(message).await?;
        info!(%run_id, "Orchestrator run started");

        let interval = Duration::from_millis(self.config.poll_interval_ms);
        for attempt in 1..=self.config.poll_attempts {
            if let Some(output) = self.poll(&run_id).await? {
                debug!(%run_id, attempt, "Orchestrator run finished");
                return parse_directive(output);
            }
            debug!(%run_id, attempt, "Waiting for orchestrator");
            if attempt < self.config.poll_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        bail!("orchestrator timed out")
    }
}

use anyhow::{bail, Context};
use async_trait::async_trait;
use modkit::TracedClient;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::config::TranscriptionConfig;
use crate::domain::ports::{AudioUpload, Transcriber};

const DEFAULT_AUDIO_TYPE: &str = "audio/wav";

#[derive(Debug, Deserialize)]
struct Transcript {
    #[serde(default)]
    text: String,
}

/// Speech-to-text over a multipart upload authenticated with `xi-api-key`.
pub struct SpeechToText {
    http: TracedClient,
    config: TranscriptionConfig,
}

impl SpeechToText {
    pub fn new(config: TranscriptionConfig, http: TracedClient) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    #[instrument(name = "backoffice.transcription.transcribe", skip_all, fields(file = %audio.file_name))]
    async fn transcribe(&self, audio: AudioUpload) -> anyhow::Result<String> {
        if self.config.api_key.trim().is_empty() {
            bail!("transcription api key is not configured");
        }

        let mime = audio.content_type.as_deref().unwrap_or(DEFAULT_AUDIO_TYPE);
        let part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(mime)
            .with_context(|| format!("invalid audio content type '{mime}'"))?;
        let form = Form::new()
            .part("file", part)
            .text("model_id", self.config.model_id.clone())
            .text("language_code", self.config.language_code.clone());

        let builder = self
            .http
            .request(Method::POST, &self.config.url)
            .header("xi-api-key", &self.config.api_key)
            .multipart(form);
        let response = self
            .http
            .send(builder)
            .await
            .context("speech-to-text request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Speech-to-text rejected the upload");
            bail!("speech-to-text returned {status}: {body}");
        }

        let transcript: Transcript = response
            .json()
            .await
            .context("speech-to-text body is not JSON")?;
        Ok(transcript.text)
    }
}

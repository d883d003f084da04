use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::Transcriber;
use crate::audio::CapturedAudio;
use crate::error::ApiError;

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: Option<String>,
}

/// Whisper-compatible speech-to-text client (multipart upload).
#[derive(Clone)]
pub struct TranscriptionClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: String,
}

impl TranscriptionClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        model: &str,
        language: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
            api_key,
            model: model.to_string(),
            language: language.to_string(),
        })
    }

    /// Upload `audio` once and return the recognized text. No retry.
    pub async fn query(&self, audio: &CapturedAudio) -> Result<String, ApiError> {
        let api_key = self.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;
        let upload = audio.to_upload()?;
        debug!(
            "uploading {} bytes of {} for transcription",
            upload.bytes.len(),
            upload.mime
        );

        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime)?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("transcription service returned {}: {}", status, body);
            return Err(ApiError::Status(status));
        }

        let transcription: TranscriptionResponse = response.json().await?;
        transcription.text.ok_or(ApiError::MissingField("text"))
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio: &CapturedAudio) -> Result<String, ApiError> {
        self.query(audio).await
    }
}

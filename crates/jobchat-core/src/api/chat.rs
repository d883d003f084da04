use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::ChatBackend;
use crate::error::ApiError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    user_input: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<String>,
}

/// Client for the assistant backend's `/api/chat/` endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn query(&self, token: &str, user_input: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/chat/", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&ChatRequest { user_input })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("chat backend returned {}", status);
            return Err(ApiError::Status(status));
        }

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ApiError::MissingField("message"))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send(&self, token: &str, user_input: &str) -> Result<String, ApiError> {
        self.query(token, user_input).await
    }
}

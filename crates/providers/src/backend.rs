//! HTTP client for the chat generation backend.
//!
//! The backend exposes two endpoints: `POST /api/chat` takes a multipart
//! form (`content` text field, optional `image` file part) and answers
//! with a raw incremental text body, and `POST /api/reset-chat` discards
//! the server-side conversation context.

use std::time::Duration;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use shared::error::TransportError;
use shared::settings::BackendSettings;
use shared::turn::Attachment;

use crate::stream::StreamHandle;

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> Result<Self, TransportError> {
        Self::new(
            &settings.base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    /// Open one streamed chat request. Performs exactly one outbound
    /// request per call and never retries; retry policy belongs to the
    /// caller, as does rejecting blank prompts.
    pub async fn send(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<StreamHandle, TransportError> {
        let url = format!("{}/api/chat", self.base_url);
        let mut form = Form::new().text("content", prompt.to_string());
        if let Some(att) = attachment {
            let part = Part::bytes(att.bytes.clone())
                .file_name(att.file_name.clone())
                .mime_str(&att.mime_type)
                .map_err(|e| {
                    TransportError::Network(format!("invalid attachment mime type: {e}"))
                })?;
            form = form.part("image", part);
        }

        tracing::debug!(url = %url, has_attachment = attachment.is_some(), "opening chat stream");
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            return Err(TransportError::Status { status, detail });
        }

        let bytes = resp.bytes_stream().map(|item| match item {
            Ok(chunk) => Ok(chunk.to_vec()),
            Err(e) => Err(TransportError::Read(e.to_string())),
        });
        Ok(StreamHandle::new(bytes))
    }

    /// Tell the backend to forget the current conversation. Safe to call
    /// repeatedly; the backend treats it as idempotent.
    pub async fn reset(&self) -> Result<(), TransportError> {
        let url = format!("{}/api/reset-chat", self.base_url);
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            return Err(TransportError::Status { status, detail });
        }
        Ok(())
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ApiError, PostedStatus, Publisher, ScheduledStatus, Visibility};
use crate::config::Config;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLLS: u32 = 30;

/// Mastodon REST client covering media upload and status creation.
pub struct MastodonClient {
    base_url: String,
    access_token: String,
    client: Client,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Debug, Deserialize)]
struct MediaAttachment {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl MastodonClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            client: Client::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url.clone(), config.access_token.clone())
    }

    /// How long to wait between checks on media the server is still processing.
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Wait until an asynchronously processed upload has a URL.
    ///
    /// `GET /api/v1/media/:id` answers 206 while processing and 200 once done.
    async fn wait_for_processing(&self, id: &str) -> Result<(), ApiError> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let resp = self
                .client
                .get(self.endpoint(&format!("/api/v1/media/{id}")))
                .bearer_auth(&self.access_token)
                .send()
                .await?;

            if resp.status() == StatusCode::PARTIAL_CONTENT {
                log::debug!("  Media {id} still processing (check {attempt}/{})", self.max_polls);
                continue;
            }

            let text = read_body(resp).await?;
            let media: MediaAttachment = decode(&text)?;
            if media.url.is_some() {
                return Ok(());
            }
        }

        Err(ApiError::MediaProcessing {
            id: id.to_string(),
            attempts: self.max_polls,
        })
    }
}

/// Read a response body, turning non-success statuses into [`ApiError::Status`].
async fn read_body(resp: Response) -> Result<String, ApiError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: api_error_message(&text),
        });
    }

    Ok(text)
}

fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(format!("{e}: {text}")))
}

/// Mastodon reports errors as `{"error": "..."}`. Fall back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait::async_trait]
impl Publisher for MastodonClient {
    fn name(&self) -> &str {
        "Mastodon"
    }

    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
        alt_text: Option<&str>,
    ) -> Result<String, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;
        let mut form = Form::new().part("file", part);
        if let Some(alt) = alt_text.filter(|a| !a.trim().is_empty()) {
            form = form.text("description", alt.to_string());
        }

        let resp = self
            .client
            .post(self.endpoint("/api/v2/media"))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;

        let accepted = resp.status() == StatusCode::ACCEPTED;
        let text = read_body(resp).await?;
        let media: MediaAttachment = decode(&text)?;

        if accepted {
            log::debug!("  Media {} accepted, waiting for processing", media.id);
            self.wait_for_processing(&media.id).await?;
        }

        Ok(media.id)
    }

    async fn create_status(
        &self,
        text: &str,
        media_ids: &[String],
        visibility: Visibility,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<PostedStatus, ApiError> {
        let mut body = json!({
            "status": text,
            "media_ids": media_ids,
            "visibility": visibility,
        });
        if let Some(at) = scheduled_at {
            body["scheduled_at"] = json!(at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        let resp = self
            .client
            .post(self.endpoint("/api/v1/statuses"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let text = read_body(resp).await?;
        decode(&text)
    }

    async fn scheduled_statuses(&self) -> Result<Vec<ScheduledStatus>, ApiError> {
        let resp = self
            .client
            .get(self.endpoint("/api/v1/scheduled_statuses"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let text = read_body(resp).await?;
        decode(&text)
    }

    async fn delete_scheduled_status(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.endpoint(&format!("/api/v1/scheduled_statuses/{id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        read_body(resp).await?;
        Ok(())
    }
}

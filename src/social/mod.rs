//! Publishing collaborator: uploads photos and creates statuses.
//!
//! The batch pipeline only talks to the [`Publisher`] trait. Two implementations
//! ship with the crate: [`MastodonClient`] for real posting and
//! [`DryRunPublisher`] for `--dry-run`.

mod dry_run;
mod mastodon;

pub use dry_run::DryRunPublisher;
pub use mastodon::MastodonClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Audience of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status that was created (or scheduled) on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedStatus {
    pub id: String,
    /// Public URL. Absent for scheduled statuses, which have no URL until they go out.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// A status waiting on the server to be published.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduledStatus {
    pub id: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Failure talking to the publishing service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered, but not with what we expected.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("media {id} was still processing after {attempts} checks")]
    MediaProcessing { id: String, attempts: u32 },
}

impl ApiError {
    /// The server's own wording, when there is one.
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// The two posting operations the batch needs, plus scheduled-status housekeeping.
///
/// Implement this trait to publish somewhere other than Mastodon.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Display name (e.g. "Mastodon").
    fn name(&self) -> &str;

    /// Upload image bytes with optional alt text. Returns the opaque media id.
    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
        alt_text: Option<&str>,
    ) -> Result<String, ApiError>;

    /// Create a status that references already uploaded media.
    ///
    /// With `scheduled_at` set, the server holds the status until that time.
    async fn create_status(
        &self,
        text: &str,
        media_ids: &[String],
        visibility: Visibility,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<PostedStatus, ApiError>;

    async fn scheduled_statuses(&self) -> Result<Vec<ScheduledStatus>, ApiError>;

    async fn delete_scheduled_status(&self, id: &str) -> Result<(), ApiError>;
}

/// Delete every scheduled status. Returns how many were deleted.
pub async fn unschedule_all(publisher: &dyn Publisher) -> crate::Result<usize> {
    let scheduled = publisher.scheduled_statuses().await?;

    if scheduled.is_empty() {
        log::info!("No scheduled statuses found");
        return Ok(0);
    }

    log::info!("Found {} scheduled status(es), deleting...", scheduled.len());
    for status in &scheduled {
        publisher.delete_scheduled_status(&status.id).await?;
        log::info!("Deleted scheduled status {}", status.id);
    }

    Ok(scheduled.len())
}

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ApiError, PostedStatus, Publisher, ScheduledStatus, Visibility};

/// Logs what would be posted and hands back synthetic ids.
#[derive(Debug, Default)]
pub struct DryRunPublisher {
    uploads: AtomicUsize,
    statuses: AtomicUsize,
}

impl DryRunPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Publisher for DryRunPublisher {
    fn name(&self) -> &str {
        "dry run"
    }

    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
        alt_text: Option<&str>,
    ) -> Result<String, ApiError> {
        let n = self.uploads.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!("  Would upload {file_name} ({mime_type}, {} bytes)", bytes.len());
        match alt_text {
            Some(alt) => log::info!("  Alt text: {alt}"),
            None => log::info!("  Alt text: (none)"),
        }
        Ok(format!("dry-run-media-{n}"))
    }

    async fn create_status(
        &self,
        text: &str,
        _media_ids: &[String],
        visibility: Visibility,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<PostedStatus, ApiError> {
        let n = self.statuses.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!("  Would post ({visibility}): {text}");
        if let Some(at) = scheduled_at {
            log::info!("  Scheduled for {}", at.to_rfc3339());
        }
        Ok(PostedStatus {
            id: format!("dry-run-{n}"),
            url: None,
            scheduled_at,
        })
    }

    async fn scheduled_statuses(&self) -> Result<Vec<ScheduledStatus>, ApiError> {
        Ok(Vec::new())
    }

    async fn delete_scheduled_status(&self, id: &str) -> Result<(), ApiError> {
        log::info!("  Would delete scheduled status {id}");
        Ok(())
    }
}

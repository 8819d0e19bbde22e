use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use photo_tooter::Error;
use photo_tooter::exif::MetadataExtractor;
use photo_tooter::pipeline::{PostOptions, PostOutcome, collect_images, publish_batch};
use photo_tooter::social::{ApiError, PostedStatus, Publisher, ScheduledStatus, Visibility};

/// Serves canned exiftool JSON by file name. Unknown files fail extraction.
struct FakeExifTool {
    payloads: HashMap<String, String>,
}

impl FakeExifTool {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            payloads: entries
                .iter()
                .map(|(name, json)| (name.to_string(), json.to_string()))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for FakeExifTool {
    fn name(&self) -> &str {
        "fake exiftool"
    }

    async fn extract(&self, path: &Path) -> photo_tooter::Result<String> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.payloads.get(&name).cloned().ok_or(Error::Extraction {
            path: path.to_path_buf(),
            message: "exiftool exited with exit status: 1".into(),
        })
    }
}

#[derive(Debug, Clone)]
struct Upload {
    file_name: String,
    mime_type: String,
    alt_text: Option<String>,
}

#[derive(Debug, Clone)]
struct Status {
    text: String,
    media_ids: Vec<String>,
    visibility: Visibility,
    scheduled_at: Option<DateTime<Utc>>,
}

/// Records every call. Uploads of files listed in `reject_uploads` fail.
#[derive(Default)]
struct RecordingPublisher {
    reject_uploads: Vec<String>,
    reject_statuses: bool,
    uploads: Mutex<Vec<Upload>>,
    statuses: Mutex<Vec<Status>>,
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn upload_media(
        &self,
        _bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
        alt_text: Option<&str>,
    ) -> Result<String, ApiError> {
        if self.reject_uploads.iter().any(|f| f == file_name) {
            return Err(ApiError::Status {
                status: 422,
                message: "Validation failed: File file size must be less than 16 MB".into(),
            });
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(Upload {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            alt_text: alt_text.map(String::from),
        });
        Ok(format!("media-{}", uploads.len()))
    }

    async fn create_status(
        &self,
        text: &str,
        media_ids: &[String],
        visibility: Visibility,
        scheduled_at: Option<DateTime<Utc>>,
    ) -> Result<PostedStatus, ApiError> {
        if self.reject_statuses {
            return Err(ApiError::Status {
                status: 429,
                message: "Too many requests".into(),
            });
        }
        let mut statuses = self.statuses.lock().unwrap();
        statuses.push(Status {
            text: text.to_string(),
            media_ids: media_ids.to_vec(),
            visibility,
            scheduled_at,
        });
        Ok(PostedStatus {
            id: format!("status-{}", statuses.len()),
            url: Some(format!("https://social.example/@me/{}", statuses.len())),
            scheduled_at,
        })
    }

    async fn scheduled_statuses(&self) -> Result<Vec<ScheduledStatus>, ApiError> {
        Ok(Vec::new())
    }

    async fn delete_scheduled_status(&self, _id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

fn photo_dir(names: &[&str]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    for name in names {
        fs::write(dir.path().join(name), b"not really a jpeg").unwrap();
    }
    let path = dir.path().to_path_buf();
    (dir, path)
}

fn file_names(outcomes: &[PostOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|o| o.path().file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn posts_each_image_in_name_order() {
    let (_dir, path) = photo_dir(&["02.jpg", "01.jpg", "notes.txt"]);
    let extractor = FakeExifTool::new(&[
        ("01.jpg", r#"[{"Title": "Sunset", "Description": "Over the bay"}]"#),
        ("02.jpg", r#"[{"Description": "Fog", "AltTextAccessibility": "Grey hills in fog"}]"#),
    ]);
    let publisher = RecordingPublisher::default();

    let files = collect_images(&[path], false).unwrap();
    let report = publish_batch(&files, &extractor, &publisher, &PostOptions::default()).await;

    assert_eq!(file_names(&report.outcomes), vec!["01.jpg", "02.jpg"]);
    assert_eq!(report.succeeded(), 2);
    assert!(!report.has_failures());

    let uploads = publisher.uploads.lock().unwrap();
    assert_eq!(uploads[0].file_name, "01.jpg");
    assert_eq!(uploads[0].mime_type, "image/jpeg");
    assert_eq!(uploads[0].alt_text.as_deref(), Some("Over the bay"));
    assert_eq!(uploads[1].alt_text.as_deref(), Some("Grey hills in fog"));

    let statuses = publisher.statuses.lock().unwrap();
    assert_eq!(statuses[0].text, "Sunset — Over the bay");
    assert_eq!(statuses[0].media_ids, vec!["media-1"]);
    assert_eq!(statuses[0].visibility, Visibility::Public);
    assert_eq!(statuses[1].text, "Fog");
}

#[tokio::test]
async fn one_failure_does_not_affect_the_others() {
    let (_dir, path) = photo_dir(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
    // b.jpg has no canned payload, so extraction fails; d.jpg has nothing to caption
    let extractor = FakeExifTool::new(&[
        ("a.jpg", r#"[{"Title": "A"}]"#),
        ("c.jpg", r#"[{"Title": "C"}]"#),
        ("d.jpg", r#"[{"SourceFile": "d.jpg"}]"#),
    ]);
    let publisher = RecordingPublisher::default();

    let files = collect_images(&[path], false).unwrap();
    let report = publish_batch(&files, &extractor, &publisher, &PostOptions::default()).await;

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(file_names(&report.outcomes), vec!["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
    assert!(report.outcomes[0].is_success());
    assert!(matches!(
        &report.outcomes[1],
        PostOutcome::Failed { error: Error::Extraction { .. }, .. }
    ));
    assert!(report.outcomes[2].is_success());
    assert!(matches!(
        &report.outcomes[3],
        PostOutcome::Failed { error: Error::MissingCaption, .. }
    ));
    assert_eq!(report.failed(), 2);

    // Nothing was uploaded for the failed files
    let statuses = publisher.statuses.lock().unwrap();
    let texts: Vec<&str> = statuses.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "C"]);
}

#[tokio::test]
async fn override_applies_to_every_file() {
    let (_dir, path) = photo_dir(&["bike.jpg", "empty.png"]);
    let extractor = FakeExifTool::new(&[
        ("bike.jpg", r#"[{"AltTextAccessibility": "A red bicycle"}]"#),
        ("empty.png", "[{}]"),
    ]);
    let publisher = RecordingPublisher::default();
    let options = PostOptions {
        text_override: Some("My bike".into()),
        visibility: Visibility::Unlisted,
        ..Default::default()
    };

    let files = collect_images(&[path], false).unwrap();
    let report = publish_batch(&files, &extractor, &publisher, &options).await;
    assert_eq!(report.succeeded(), 2);

    let uploads = publisher.uploads.lock().unwrap();
    assert_eq!(uploads[0].alt_text.as_deref(), Some("A red bicycle"));
    assert_eq!(uploads[1].alt_text, None);
    assert_eq!(uploads[1].mime_type, "image/png");

    let statuses = publisher.statuses.lock().unwrap();
    assert!(statuses.iter().all(|s| s.text == "My bike"));
    assert!(statuses.iter().all(|s| s.visibility == Visibility::Unlisted));
}

#[tokio::test]
async fn upload_and_status_failures_are_recorded() {
    let (_dir, path) = photo_dir(&["big.tif", "ok.jpg"]);
    let extractor = FakeExifTool::new(&[
        ("big.tif", r#"[{"Title": "Big"}]"#),
        ("ok.jpg", r#"[{"Title": "Ok"}]"#),
    ]);

    let publisher = RecordingPublisher {
        reject_uploads: vec!["big.tif".into()],
        ..Default::default()
    };
    let files = collect_images(&[path.clone()], false).unwrap();
    let report = publish_batch(&files, &extractor, &publisher, &PostOptions::default()).await;

    match &report.outcomes[0] {
        PostOutcome::Failed { error: Error::Upload { file_name, message }, .. } => {
            assert_eq!(file_name, "big.tif");
            assert!(message.contains("Export a smaller version"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.outcomes[1].is_success());

    let publisher = RecordingPublisher {
        reject_statuses: true,
        ..Default::default()
    };
    let report = publish_batch(&files, &extractor, &publisher, &PostOptions::default()).await;
    assert_eq!(report.failed(), 2);
    assert!(report.outcomes.iter().all(|o| matches!(
        o,
        PostOutcome::Failed { error: Error::PostCreation { .. }, .. }
    )));
}

#[tokio::test]
async fn hashtags_follow_the_caption() {
    let (_dir, path) = photo_dir(&["cactus.jpg"]);
    let extractor = FakeExifTool::new(&[(
        "cactus.jpg",
        r#"[{"Title": "Desert", "Subject": ["Saguaro cactus (Carnegiea gigantea)", "photography", "Arizona"]}]"#,
    )]);
    let publisher = RecordingPublisher::default();
    let options = PostOptions {
        hashtags: true,
        ..Default::default()
    };

    let files = collect_images(&[path], false).unwrap();
    publish_batch(&files, &extractor, &publisher, &options).await;

    let statuses = publisher.statuses.lock().unwrap();
    assert_eq!(statuses[0].text, "Desert\n\n#SaguaroCactus #Arizona");
}

#[tokio::test]
async fn schedule_interval_spaces_posts() {
    let (_dir, path) = photo_dir(&["1.jpg", "2.jpg", "3.jpg"]);
    let extractor = FakeExifTool::new(&[
        ("1.jpg", r#"[{"Title": "One"}]"#),
        ("2.jpg", r#"[{"Title": "Two"}]"#),
        ("3.jpg", r#"[{"Title": "Three"}]"#),
    ]);
    let publisher = RecordingPublisher::default();
    let options = PostOptions {
        schedule_interval: Some(chrono::Duration::minutes(10)),
        ..Default::default()
    };

    let files = collect_images(&[path], false).unwrap();
    publish_batch(&files, &extractor, &publisher, &options).await;

    let statuses = publisher.statuses.lock().unwrap();
    assert!(statuses[0].scheduled_at.is_none());
    let second = statuses[1].scheduled_at.unwrap();
    let third = statuses[2].scheduled_at.unwrap();
    assert_eq!(third - second, chrono::Duration::minutes(10));
}

#[tokio::test]
async fn schedule_past_the_calendar_fails_only_the_late_files() {
    let names: Vec<String> = (0..40).map(|i| format!("{i:02}.jpg")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (_dir, path) = photo_dir(&name_refs);
    let entries: Vec<(&str, &str)> = name_refs
        .iter()
        .map(|name| (*name, r#"[{"Title": "Slow"}]"#))
        .collect();
    let extractor = FakeExifTool::new(&entries);
    let publisher = RecordingPublisher::default();
    let options = PostOptions {
        schedule_interval: Some(chrono::Duration::minutes(i64::from(u32::MAX))),
        ..Default::default()
    };

    let files = collect_images(&[path], false).unwrap();
    let report = publish_batch(&files, &extractor, &publisher, &options).await;

    assert_eq!(report.outcomes.len(), 40);
    assert!(report.outcomes[0].is_success());
    assert!(report.has_failures());
    assert!(matches!(
        report.outcomes.last().unwrap(),
        PostOutcome::Failed { error: Error::ScheduleOutOfRange { position: 40 }, .. }
    ));
    // Only the files that got a valid slot reached the server
    assert_eq!(publisher.statuses.lock().unwrap().len(), report.succeeded());
}

#[tokio::test]
async fn missing_path_aborts_before_any_post() {
    let (_dir, path) = photo_dir(&["a.jpg"]);
    let result = collect_images(&[path, PathBuf::from("/definitely/not/here")], false);
    assert!(matches!(result, Err(Error::PathNotFound(_))));
}

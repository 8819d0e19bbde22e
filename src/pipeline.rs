use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::compose::compose;
use crate::error::{Error, Result};
use crate::exif::{self, MAX_HASHTAGS, MetadataExtractor};
use crate::social::{ApiError, PostedStatus, Publisher, Visibility};

/// Written to the working directory after a batch: one `path\turl\tscheduled_at` per line.
pub const POSTED_FILE: &str = "photo-tooter-posted.txt";
/// Written to the working directory after a batch: one failed path per line.
pub const FAILED_FILE: &str = "photo-tooter-failed.txt";

/// Image formats accepted for posting.
///
/// Use [`ImageFormat::from_path`] to detect the format from a file extension
/// (case-insensitive).
///
/// # Example
///
/// ```rust
/// use photo_tooter::pipeline::ImageFormat;
/// use std::path::Path;
///
/// assert_eq!(ImageFormat::from_path(Path::new("IMG_0001.HEIC")), Some(ImageFormat::Heic));
/// assert_eq!(ImageFormat::from_path(Path::new("notes.txt")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Heic,
    Heif,
    Tiff,
    WebP,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "heic" => Some(Self::Heic),
            "heif" => Some(Self::Heif),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// MIME type sent with the upload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
        }
    }
}

/// An existing image file with a supported extension. Each one becomes one post attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub format: ImageFormat,
}

impl ResolvedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Resolve files and directories into the ordered list of images to post.
///
/// Arguments keep their given order. Directories expand to their supported images
/// sorted by file name; only their immediate contents are scanned unless
/// `recursive` is set. Unsupported files are skipped. A path that does not exist
/// fails the whole resolution with [`Error::PathNotFound`]; one that exists but
/// cannot be inspected fails it with [`Error::Inaccessible`].
///
/// # Example
///
/// ```rust,no_run
/// use photo_tooter::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("cover.jpg"),   // single file
///     PathBuf::from("./trip/"),     // every image directly inside
/// ], false).unwrap();
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf], recursive: bool) -> Result<Vec<ResolvedFile>> {
    let mut images = Vec::new();

    for raw in paths {
        let path = expand_home(raw);

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PathNotFound(path));
            }
            Err(source) => return Err(Error::Inaccessible { path, source }),
        };

        if metadata.is_dir() {
            let mut walker = WalkDir::new(&path)
                .min_depth(1)
                .follow_links(true)
                .sort_by_file_name();
            if !recursive {
                walker = walker.max_depth(1);
            }

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("Skipping unreadable entry in {}: {e}", path.display());
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                match ImageFormat::from_path(entry.path()) {
                    Some(format) => images.push(ResolvedFile {
                        path: entry.into_path(),
                        format,
                    }),
                    None => log::debug!("Skipping unsupported file: {}", entry.path().display()),
                }
            }
        } else if metadata.is_file() {
            match ImageFormat::from_path(&path) {
                Some(format) => images.push(ResolvedFile { path, format }),
                None => log::warn!("Skipping unsupported file: {}", path.display()),
            }
        } else {
            log::warn!("Skipping special file: {}", path.display());
        }
    }

    Ok(images)
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Settings shared by every file in a batch.
#[derive(Debug, Clone, Default)]
pub struct PostOptions {
    /// Caption used for every file instead of the metadata-derived one.
    pub text_override: Option<String>,
    pub visibility: Visibility,
    /// Append hashtags built from subject keywords.
    pub hashtags: bool,
    /// Post the first file now and schedule each following file this much later.
    pub schedule_interval: Option<chrono::Duration>,
}

/// Result of one post attempt.
#[derive(Debug)]
pub enum PostOutcome {
    Posted { path: PathBuf, post: PostedStatus },
    Failed { path: PathBuf, error: Error },
}

impl PostOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Posted { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Posted { .. })
    }
}

impl fmt::Display for PostOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posted { path, post } => {
                write!(f, "ok   {} -> ", path.display())?;
                match (&post.url, &post.scheduled_at) {
                    (Some(url), _) => write!(f, "{url}"),
                    (None, Some(at)) => write!(f, "scheduled for {}", at.to_rfc3339()),
                    (None, None) => write!(f, "status {}", post.id),
                }
            }
            Self::Failed { path, error } => write!(f, "FAIL {}: {error}", path.display()),
        }
    }
}

/// When the file at `index` should go out; `None` means immediately.
///
/// The first file is always immediate. A slot past the end of the
/// representable date range is an [`Error::ScheduleOutOfRange`].
pub fn scheduled_time(
    start: DateTime<Utc>,
    interval: Option<chrono::Duration>,
    index: usize,
) -> Result<Option<DateTime<Utc>>> {
    let Some(interval) = interval else {
        return Ok(None);
    };
    if index == 0 {
        return Ok(None);
    }

    i32::try_from(index)
        .ok()
        .and_then(|steps| interval.checked_mul(steps))
        .and_then(|offset| start.checked_add_signed(offset))
        .map(Some)
        .ok_or(Error::ScheduleOutOfRange {
            position: index.saturating_add(1),
        })
}

/// Read, compose and publish a single image.
pub async fn publish_image(
    file: &ResolvedFile,
    extractor: &dyn MetadataExtractor,
    publisher: &dyn Publisher,
    options: &PostOptions,
    scheduled_at: Option<DateTime<Utc>>,
) -> PostOutcome {
    match try_publish(file, extractor, publisher, options, scheduled_at).await {
        Ok(post) => PostOutcome::Posted {
            path: file.path.clone(),
            post,
        },
        Err(error) => PostOutcome::Failed {
            path: file.path.clone(),
            error,
        },
    }
}

async fn try_publish(
    file: &ResolvedFile,
    extractor: &dyn MetadataExtractor,
    publisher: &dyn Publisher,
    options: &PostOptions,
    scheduled_at: Option<DateTime<Utc>>,
) -> Result<PostedStatus> {
    let meta = exif::read_metadata(&file.path, extractor).await?;

    let mut post = compose(&meta, options.text_override.as_deref())?;
    if options.hashtags {
        post.hashtags = exif::hashtags_from_subjects(&meta, MAX_HASHTAGS);
    }
    log::debug!("  Caption: {}", post.caption);

    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| Error::ReadMedia {
            path: file.path.clone(),
            source,
        })?;

    let file_name = file.file_name();
    let media_id = publisher
        .upload_media(bytes, &file_name, file.format.mime_type(), post.alt_text.as_deref())
        .await
        .map_err(|e| Error::Upload {
            file_name: file_name.clone(),
            message: upload_hint(&e),
        })?;

    publisher
        .create_status(&post.status_text(), &[media_id], options.visibility, scheduled_at)
        .await
        .map_err(|e| Error::PostCreation {
            file_name,
            message: e.to_string(),
        })
}

/// Turn the two common upload rejections into advice.
fn upload_hint(err: &ApiError) -> String {
    let message = err.message();
    if message.contains("less than 16 MB") {
        "File is larger than this instance's max media size (e.g. 16 MB). \
         Export a smaller version and try again."
            .to_string()
    } else if message.contains("images are not supported") {
        "Image resolution is too large for this instance. Export a version with a \
         smaller long edge (for example, 4000-6000 px) and try again."
            .to_string()
    } else {
        message
    }
}

/// Publish every file in order, one at a time.
///
/// A failure is recorded against its file and the batch carries on, so the
/// report always holds exactly one outcome per input file.
///
/// # Example
///
/// ```rust,no_run
/// use photo_tooter::exif::ExifTool;
/// use photo_tooter::pipeline::{PostOptions, collect_images, publish_batch};
/// use photo_tooter::social::DryRunPublisher;
/// use std::path::PathBuf;
///
/// # async fn example() -> photo_tooter::Result<()> {
/// let files = collect_images(&[PathBuf::from("./trip")], false)?;
/// let report = publish_batch(&files, &ExifTool::new(), &DryRunPublisher::new(), &PostOptions::default()).await;
/// for outcome in &report.outcomes {
///     println!("{outcome}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn publish_batch(
    files: &[ResolvedFile],
    extractor: &dyn MetadataExtractor,
    publisher: &dyn Publisher,
    options: &PostOptions,
) -> BatchReport {
    let start = Utc::now();
    let total = files.len();
    let mut report = BatchReport::default();

    for (i, file) in files.iter().enumerate() {
        let scheduled_at = match scheduled_time(start, options.schedule_interval, i) {
            Ok(at) => at,
            Err(error) => {
                log::error!("[{}/{}] {}: {error}", i + 1, total, file.file_name());
                report.outcomes.push(PostOutcome::Failed {
                    path: file.path.clone(),
                    error,
                });
                continue;
            }
        };
        let when = scheduled_at
            .map(|at| format!("scheduled at {}", at.to_rfc3339()))
            .unwrap_or_else(|| "immediately".to_string());
        log::info!("[{}/{}] Posting {} ({when})", i + 1, total, file.file_name());

        let outcome = publish_image(file, extractor, publisher, options, scheduled_at).await;
        match &outcome {
            PostOutcome::Posted { post, .. } => log::info!("  Done: status {}", post.id),
            PostOutcome::Failed { error, .. } => log::error!("  Error: {error}"),
        }
        report.outcomes.push(outcome);
    }

    report
}

/// Outcomes of one batch, in file order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PostOutcome>,
}

/// Paths written by [`BatchReport::write_files`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReportFiles {
    pub posted: Option<PathBuf>,
    pub failed: Option<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        let outcomes: Vec<serde_json::Value> = self
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                PostOutcome::Posted { path, post } => serde_json::json!({
                    "path": path.display().to_string(),
                    "status": "posted",
                    "id": post.id,
                    "url": post.url,
                    "scheduled_at": post.scheduled_at,
                }),
                PostOutcome::Failed { path, error } => serde_json::json!({
                    "path": path.display().to_string(),
                    "status": "failed",
                    "error": error.to_string(),
                }),
            })
            .collect();
        serde_json::Value::Array(outcomes)
    }

    /// Write [`POSTED_FILE`] and [`FAILED_FILE`] into `dir`, each only when it would be non-empty.
    ///
    /// The failed list holds one path per line so it can be fed straight back
    /// to `photo-tooter post $(cat photo-tooter-failed.txt)`. A list left over
    /// from an earlier run is removed when this run has nothing to put in it.
    pub fn write_files(&self, dir: &Path) -> anyhow::Result<ReportFiles> {
        let mut files = ReportFiles::default();

        let posted: String = self
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                PostOutcome::Posted { path, post } => Some(format!(
                    "{}\t{}\t{}\n",
                    path.display(),
                    post.url.as_deref().unwrap_or(""),
                    post.scheduled_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
                )),
                PostOutcome::Failed { .. } => None,
            })
            .collect();
        let path = dir.join(POSTED_FILE);
        if posted.is_empty() {
            remove_stale(&path)?;
        } else {
            std::fs::write(&path, posted).context("Failed to write posted list")?;
            files.posted = Some(path);
        }

        let failed: String = self
            .outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| format!("{}\n", o.path().display()))
            .collect();
        let path = dir.join(FAILED_FILE);
        if failed.is_empty() {
            remove_stale(&path)?;
        } else {
            std::fs::write(&path, failed).context("Failed to write failed list")?;
            files.failed = Some(path);
        }

        Ok(files)
    }
}

fn remove_stale(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove stale {}", path.display())),
    }
}

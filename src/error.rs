use std::path::PathBuf;
use thiserror::Error;

use crate::social::ApiError;

/// Errors produced while resolving, reading, composing and publishing photos.
///
/// Only [`Error::PathNotFound`], [`Error::Inaccessible`] and [`Error::NoImages`]
/// stop a whole batch.
/// Every other variant is recorded against a single file and the batch moves on.
#[derive(Error, Debug)]
pub enum Error {
    /// A path given on the command line does not exist.
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A path given on the command line exists but cannot be inspected.
    #[error("cannot access {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the given paths resolved to a supported image.
    #[error("no image files found")]
    NoImages,

    /// The metadata extractor failed or returned output we could not use.
    #[error("metadata extraction failed for {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    /// Neither a title nor a description was found, and no override text was given.
    #[error("no title or description found in metadata. Use --text to specify manually.")]
    MissingCaption,

    /// The post time for this file falls outside the representable date range.
    #[error("cannot schedule file #{position}: post time is out of range")]
    ScheduleOutOfRange { position: usize },

    /// The image bytes could not be read for upload.
    #[error("failed to read {}: {source}", path.display())]
    ReadMedia {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server rejected (or never answered) the media upload.
    #[error("error uploading {file_name}: {message}")]
    Upload { file_name: String, message: String },

    /// The server rejected (or never answered) the status creation.
    #[error("error posting status for {file_name}: {message}")]
    PostCreation { file_name: String, message: String },

    /// Any other API call (listing or deleting scheduled statuses).
    #[error("request failed: {0}")]
    Request(#[from] ApiError),
}

impl Error {
    pub(crate) fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

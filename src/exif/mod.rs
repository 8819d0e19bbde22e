//! Embedded metadata (XMP / IPTC / EXIF) reading.
//!
//! - [`read_metadata`] — run an extractor on one file and normalize its output
//! - [`hashtags_from_subjects`] — turn subject keywords into hashtags
//!
//! Extraction is delegated to a [`MetadataExtractor`]; [`ExifTool`] shells out to
//! `exiftool -json`.

mod hashtags;
mod reader;

pub use hashtags::{MAX_HASHTAGS, hashtags_from_subjects};
pub use reader::{ExifTool, ImageMetadata, MetadataExtractor, parse_exiftool_json, read_metadata};

//! # photo-tooter
//!
//! Post one Mastodon status per photo, taking the caption and alt text from the
//! metadata already embedded in the image (Title, Description and IPTC
//! "Alt Text (Accessibility)"), so tagging a photo once in a photo manager is
//! enough to publish it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photo_tooter::config::Config;
//! use photo_tooter::exif::ExifTool;
//! use photo_tooter::pipeline::{PostOptions, collect_images, publish_batch};
//! use photo_tooter::social::{MastodonClient, Visibility};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let client = MastodonClient::from_config(&config);
//!
//!     // Files keep their order; directories expand to their images sorted by name
//!     let files = collect_images(&[PathBuf::from("./trip")], false)?;
//!
//!     let options = PostOptions {
//!         visibility: Visibility::Unlisted,
//!         ..Default::default()
//!     };
//!     let report = publish_batch(&files, &ExifTool::new(), &client, &options).await;
//!
//!     for outcome in &report.outcomes {
//!         println!("{outcome}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Caption rules
//!
//! | Metadata present | Caption | Alt text |
//! |------------------|---------|----------|
//! | Title + Description | `Title — Description` | Alt text field, else Description |
//! | Description only | `Description` | Alt text field, else Description |
//! | Title only | `Title` | Alt text field, else none |
//! | neither | error unless `--text` is given | Alt text field, else none |
//!
//! ## Modules
//!
//! - [`compose`] — caption and alt text rules
//! - [`config`] — instance URL and access token storage
//! - [`exif`] — metadata extraction via exiftool, hashtags from keywords
//! - [`pipeline`] — file resolution and batch publishing
//! - [`social`] — publisher trait, Mastodon client, dry run

pub mod compose;
pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod social;

pub use error::{Error, Result};

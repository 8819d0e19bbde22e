//! Caption and alt text composition.
//!
//! Caption, in priority order:
//! 1. override text, verbatim (a blank override counts as none)
//! 2. `Title — Description` when both are present
//! 3. `Description`
//! 4. `Title`
//! 5. otherwise [`Error::MissingCaption`]
//!
//! Alt text is `AltTextAccessibility`, else `Description`, else none. The override
//! never changes the alt text.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::exif::ImageMetadata;

/// Joins title and description. Existing posts use exactly this string.
pub const CAPTION_SEPARATOR: &str = " — ";

/// Caption and alt text derived for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedPost {
    /// Never empty.
    pub caption: String,
    pub alt_text: Option<String>,
    /// Appended below the caption when non-empty.
    pub hashtags: Vec<String>,
}

impl ComposedPost {
    /// The full status body: the caption, then hashtags on their own paragraph.
    pub fn status_text(&self) -> String {
        if self.hashtags.is_empty() {
            self.caption.clone()
        } else {
            format!("{}\n\n{}", self.caption, self.hashtags.join(" "))
        }
    }
}

/// Derive the caption and alt text for one image.
///
/// # Example
///
/// ```rust
/// use photo_tooter::compose::compose;
/// use photo_tooter::exif::ImageMetadata;
///
/// let meta = ImageMetadata {
///     title: Some("Sunset".into()),
///     description: Some("Over the bay".into()),
///     ..Default::default()
/// };
/// let post = compose(&meta, None).unwrap();
/// assert_eq!(post.caption, "Sunset — Over the bay");
/// assert_eq!(post.alt_text.as_deref(), Some("Over the bay"));
/// ```
pub fn compose(meta: &ImageMetadata, text_override: Option<&str>) -> Result<ComposedPost> {
    let caption = caption(meta, text_override)?;

    Ok(ComposedPost {
        caption,
        alt_text: alt_text(meta),
        hashtags: Vec::new(),
    })
}

fn caption(meta: &ImageMetadata, text_override: Option<&str>) -> Result<String> {
    let text_override = text_override.filter(|text| !text.trim().is_empty());
    let caption = match (text_override, &meta.title, &meta.description) {
        (Some(text), _, _) => text.to_string(),
        (None, Some(title), Some(description)) => format!("{title}{CAPTION_SEPARATOR}{description}"),
        (None, None, Some(description)) => description.clone(),
        (None, Some(title), None) => title.clone(),
        (None, None, None) => return Err(Error::MissingCaption),
    };

    // A blank title alone still leaves nothing to publish
    if caption.is_empty() {
        return Err(Error::MissingCaption);
    }

    Ok(caption)
}

fn alt_text(meta: &ImageMetadata) -> Option<String> {
    meta.alt_text.clone().or_else(|| meta.description.clone())
}

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Tags requested from exiftool.
const EXIFTOOL_TAGS: &[&str] = &[
    "-Title",
    "-Description",
    "-AltTextAccessibility",
    "-ExtDescrAccessibility",
    "-Subject",
    "-WeightedFlatSubject",
    "-HierarchicalSubject",
];

/// Keys exiftool has been seen to use for the IPTC alt text field.
const ALT_TEXT_KEYS: &[&str] = &[
    "AltTextAccessibility",
    "Alt Text Accessibility",
    "AltTextAccessibility-en-US",
];

const EXT_DESCR_KEYS: &[&str] = &[
    "ExtDescrAccessibility",
    "Extended Description Accessibility",
    "ExtDescrAccessibility-en-US",
];

/// Preferred languages when a field holds a language-alternative object.
const LANG_PREFERENCE: &[&str] = &["en-US", "en", "x-default"];

/// Metadata fields read from one image.
///
/// `None` means the field is not set at all. `Some("")` means it is set but blank;
/// caption and alt text fallbacks treat the two differently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// IPTC "Alt Text (Accessibility)".
    pub alt_text: Option<String>,
    /// IPTC "Extended Description (Accessibility)". Read but not used for posting.
    pub extended_description: Option<String>,
    pub subject: Vec<String>,
    /// Lightroom-style keywords, most important first.
    pub weighted_flat_subject: Vec<String>,
    /// Read but not used for posting.
    pub hierarchical_subject: Vec<String>,
}

/// Source of raw metadata for an image file.
///
/// Implementations return the untyped payload; [`read_metadata`] validates it.
#[async_trait::async_trait]
pub trait MetadataExtractor: Send + Sync {
    fn name(&self) -> &str;
    /// Run extraction on `path` and return exiftool-style JSON.
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Runs `exiftool -json` as a child process.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new() -> Self {
        Self::with_program("exiftool")
    }

    /// Use a specific exiftool binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetadataExtractor for ExifTool {
    fn name(&self) -> &str {
        "exiftool"
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        let output = tokio::process::Command::new(&self.program)
            .arg("-json")
            .args(EXIFTOOL_TAGS)
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::extraction(
                        path,
                        "exiftool not found. Install it from https://exiftool.org (e.g. `brew install exiftool`)",
                    )
                } else {
                    Error::extraction(path, format!("failed to run exiftool: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::extraction(
                path,
                format!("exiftool exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| Error::extraction(path, "exiftool output is not valid UTF-8"))
    }
}

/// Read and normalize the metadata of one image.
pub async fn read_metadata(path: &Path, extractor: &dyn MetadataExtractor) -> Result<ImageMetadata> {
    let payload = extractor.extract(path).await?;
    log::debug!("Raw {} output for {}:\n{payload}", extractor.name(), path.display());
    parse_exiftool_json(path, &payload)
}

/// Parse `exiftool -json` output: an array holding one object per file.
pub fn parse_exiftool_json(path: &Path, payload: &str) -> Result<ImageMetadata> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::extraction(path, format!("unparsable exiftool output: {e}")))?;

    let record = value
        .as_array()
        .and_then(|records| records.first())
        .and_then(Value::as_object)
        .ok_or_else(|| Error::extraction(path, "unexpected exiftool JSON format"))?;

    Ok(ImageMetadata {
        title: record.get("Title").and_then(text_value),
        description: record.get("Description").and_then(text_value),
        alt_text: first_lang_alt(record, ALT_TEXT_KEYS),
        extended_description: first_lang_alt(record, EXT_DESCR_KEYS),
        subject: list_values(record.get("Subject")),
        weighted_flat_subject: list_values(record.get("WeightedFlatSubject")),
        hierarchical_subject: list_values(record.get("HierarchicalSubject")),
    })
}

/// A scalar field. Lists contribute their first element; blank strings stay present.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        // exiftool emits numeric-looking values (a title of "1984") as numbers
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(text_value),
        _ => None,
    }
}

fn first_lang_alt(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(lang_alt_value))
}

/// A field that may be a plain value or a `{"en-US": ..., "x-default": ...}` object.
fn lang_alt_value(value: &Value) -> Option<String> {
    let Value::Object(alternatives) = value else {
        return text_value(value);
    };

    let non_blank = |v: &Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    LANG_PREFERENCE
        .iter()
        .find_map(|lang| alternatives.get(*lang).and_then(non_blank))
        .or_else(|| alternatives.values().find_map(non_blank))
}

/// Keyword lists arrive as arrays or as comma-separated strings.
fn list_values(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

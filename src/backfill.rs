//! Placeholder backfill for word library data files
//!
//! Every word entry in a library file carries a `cardImageUrl`. Older files
//! store a single URL string; current files store one URL per card style.
//! The backfill rewrites each library so every entry has the styled shape
//! with both styles present, filling gaps with placeholder images. Existing
//! style URLs are never overwritten, and key order is kept as found.

use crate::error::{CutoutError, Result};
use crate::tracing_config::spans;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Library files processed by default, in order
pub const LIBRARY_IDS: [&str; 6] = ["colors", "fruits", "numbers", "vehicles", "tpr-l0", "tpr-l1"];

/// Library directory relative to the project root
pub const LIBRARY_DIR: &str = "src/data/libraries";

/// Entry field holding the card image URL(s)
pub const CARD_IMAGE_FIELD: &str = "cardImageUrl";

/// Top-level field holding the word entries
pub const WORDS_FIELD: &str = "words";

pub const DEFAULT_CARTOON_PLACEHOLDER: &str = "/cards/placeholder-cartoon.svg";
pub const DEFAULT_REALISTIC_PLACEHOLDER: &str = "/cards/placeholder-realistic.svg";

/// Presentation style of a word card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStyle {
    Cartoon,
    Realistic,
}

impl CardStyle {
    /// Canonical styles, in the order they are written
    pub const ALL: [CardStyle; 2] = [CardStyle::Cartoon, CardStyle::Realistic];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Cartoon => "cartoon",
            Self::Realistic => "realistic",
        }
    }
}

/// Default image URL per card style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub cartoon: String,
    pub realistic: String,
}

impl Default for Placeholder {
    fn default() -> Self {
        Self {
            cartoon: DEFAULT_CARTOON_PLACEHOLDER.to_string(),
            realistic: DEFAULT_REALISTIC_PLACEHOLDER.to_string(),
        }
    }
}

impl Placeholder {
    #[must_use]
    pub fn url(&self, style: CardStyle) -> &str {
        match style {
            CardStyle::Cartoon => &self.cartoon,
            CardStyle::Realistic => &self.realistic,
        }
    }

    /// Styled mapping with every canonical style set to its placeholder
    #[must_use]
    pub fn to_styled_map(&self) -> Map<String, Value> {
        CardStyle::ALL
            .iter()
            .map(|style| (style.key().to_string(), Value::String(self.url(*style).to_string())))
            .collect()
    }
}

/// Shape of an entry's `cardImageUrl`, resolved once per entry
#[derive(Debug, Clone, PartialEq)]
pub enum CardImageUrl {
    /// Field absent
    Missing,
    /// Single URL string from the old data format
    Legacy(String),
    /// Mapping from style key to URL
    Styled(Map<String, Value>),
    /// Anything else (null, numbers, arrays, booleans); left alone
    Unrecognized(Value),
}

impl CardImageUrl {
    #[must_use]
    pub fn from_field(value: Option<Value>) -> Self {
        match value {
            None => Self::Missing,
            Some(Value::String(url)) => Self::Legacy(url),
            Some(Value::Object(map)) => Self::Styled(map),
            Some(other) => Self::Unrecognized(other),
        }
    }

    /// Canonical styles missing from this value
    ///
    /// Missing and legacy values lack every style; unrecognized values are
    /// never completed and report none.
    #[must_use]
    pub fn missing_styles(&self) -> Vec<CardStyle> {
        match self {
            Self::Missing | Self::Legacy(_) => CardStyle::ALL.to_vec(),
            Self::Styled(map) => CardStyle::ALL
                .into_iter()
                .filter(|style| !map.contains_key(style.key()))
                .collect(),
            Self::Unrecognized(_) => Vec::new(),
        }
    }

    /// Complete with placeholders, returning the new value and how many
    /// defaults were filled
    ///
    /// Missing and legacy values count as one fill, matching the way the
    /// libraries have always been reported.
    #[must_use]
    pub fn complete(self, placeholder: &Placeholder) -> (Value, usize) {
        let missing = self.missing_styles();
        match self {
            Self::Missing | Self::Legacy(_) => (Value::Object(placeholder.to_styled_map()), 1),
            Self::Styled(mut map) => {
                for style in &missing {
                    map.insert(
                        style.key().to_string(),
                        Value::String(placeholder.url(*style).to_string()),
                    );
                }
                (Value::Object(map), missing.len())
            },
            Self::Unrecognized(value) => (value, 0),
        }
    }
}

/// Backfill one word entry in place, returning the number of defaults filled
///
/// An existing field keeps its position among the entry's keys; a missing
/// field is appended.
pub fn backfill_entry(entry: &mut Map<String, Value>, placeholder: &Placeholder) -> usize {
    let current = CardImageUrl::from_field(entry.get_mut(CARD_IMAGE_FIELD).map(Value::take));
    if let CardImageUrl::Unrecognized(_) = current {
        tracing::debug!(value = ?current, "Leaving unrecognized cardImageUrl untouched");
    }

    let (completed, filled) = current.complete(placeholder);
    entry.insert(CARD_IMAGE_FIELD.to_string(), completed);
    filled
}

/// Counts for one library document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillCounts {
    /// Entries whose `cardImageUrl` changed
    pub entries_updated: usize,
    /// Placeholder values written (legacy/missing fields count once)
    pub defaults_filled: usize,
}

/// Backfill every entry of a parsed library document
///
/// Non-object values inside `words` are skipped.
///
/// # Errors
/// Returns `CutoutError::Backfill` if the document has no `words` array
pub fn backfill_document(document: &mut Value, placeholder: &Placeholder) -> Result<BackfillCounts> {
    let words = document
        .get_mut(WORDS_FIELD)
        .ok_or_else(|| CutoutError::backfill("Library document has no 'words' field"))?
        .as_array_mut()
        .ok_or_else(|| CutoutError::backfill("Library 'words' field is not an array"))?;

    let mut counts = BackfillCounts::default();
    for word in words.iter_mut() {
        let Some(entry) = word.as_object_mut() else {
            continue;
        };
        let filled = backfill_entry(entry, placeholder);
        if filled > 0 {
            counts.entries_updated += 1;
            counts.defaults_filled += filled;
        }
    }

    Ok(counts)
}

/// Render a library document the way the data files are stored
///
/// Two-space indentation, non-ASCII written literally, no trailing newline.
///
/// # Errors
/// Returns `CutoutError::Json` if serialization fails
pub fn render_document(document: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Read, backfill and rewrite one library file
///
/// The file is rewritten even when nothing changed.
///
/// # Errors
/// - The file cannot be read or written
/// - The contents are not JSON or have no `words` array
pub fn backfill_file(path: &Path, placeholder: &Placeholder) -> Result<BackfillCounts> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CutoutError::file_io_error("read library", path, &e))?;
    let mut document: Value = serde_json::from_str(&contents)?;

    let counts = backfill_document(&mut document, placeholder)?;

    fs::write(path, render_document(&document)?)
        .map_err(|e| CutoutError::file_io_error("write library", path, &e))?;

    tracing::debug!(
        path = %path.display(),
        entries_updated = counts.entries_updated,
        defaults_filled = counts.defaults_filled,
        "Rewrote library file"
    );
    Ok(counts)
}

/// Where the backfill looks and what it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillConfig {
    /// Project root the library directory is resolved against
    pub root: PathBuf,
    /// Library directory relative to `root`
    pub library_dir: PathBuf,
    /// Library ids, processed in order
    pub libraries: Vec<String>,
    pub placeholder: Placeholder,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            library_dir: PathBuf::from(LIBRARY_DIR),
            libraries: LIBRARY_IDS.iter().map(|id| (*id).to_string()).collect(),
            placeholder: Placeholder::default(),
        }
    }
}

impl BackfillConfig {
    /// Default configuration rooted at `root`
    #[must_use]
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn library_path(&self, library: &str) -> PathBuf {
        self.root.join(&self.library_dir).join(format!("{library}.json"))
    }
}

/// What happened to one library file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped,
    Updated(BackfillCounts),
}

/// Result for one library file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub library: String,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            FileOutcome::Skipped => write!(f, "Skipping {} - file not found", self.library),
            FileOutcome::Updated(counts) => write!(
                f,
                "{}: Updated {} entries",
                self.library, counts.defaults_filled
            ),
        }
    }
}

/// Reports for a whole run, in library order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub reports: Vec<FileReport>,
}

impl BackfillSummary {
    /// Placeholder values written across all files
    #[must_use]
    pub fn total_filled(&self) -> usize {
        self.reports
            .iter()
            .map(|report| match report.outcome {
                FileOutcome::Updated(counts) => counts.defaults_filled,
                FileOutcome::Skipped => 0,
            })
            .sum()
    }

    #[must_use]
    pub fn files_skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.outcome == FileOutcome::Skipped)
            .count()
    }
}

/// Backfill every configured library
///
/// # Errors
/// Same as [`run_backfill_with`]
pub fn run_backfill(config: &BackfillConfig) -> Result<BackfillSummary> {
    run_backfill_with(config, |_| {})
}

/// Backfill every configured library, calling `on_report` after each file
///
/// Missing files are skipped. The first file that fails to read, parse or
/// write stops the run; reports for earlier files have already been emitted.
///
/// # Errors
/// - IO failures reading or writing a library file
/// - Malformed JSON or a document without a `words` array
pub fn run_backfill_with<F>(config: &BackfillConfig, mut on_report: F) -> Result<BackfillSummary>
where
    F: FnMut(&FileReport),
{
    let mut summary = BackfillSummary::default();

    for library in &config.libraries {
        let _span = spans::library(library).entered();
        let path = config.library_path(library);

        let outcome = if path.is_file() {
            let counts = backfill_file(&path, &config.placeholder)?;
            tracing::info!(
                library = %library,
                entries_updated = counts.entries_updated,
                defaults_filled = counts.defaults_filled,
                "Library backfilled"
            );
            FileOutcome::Updated(counts)
        } else {
            tracing::info!(library = %library, path = %path.display(), "Library file not found, skipping");
            FileOutcome::Skipped
        };

        let report = FileReport {
            library: library.clone(),
            path,
            outcome,
        };
        on_report(&report);
        summary.reports.push(report);
    }

    Ok(summary)
}

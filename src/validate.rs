//! Input validation for sensor operations.
//!
//! Every validator is a pure function: it returns the cleaned value or a
//! typed error, and never touches the store. Both the single-create and
//! bulk-create paths go through the same functions.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Maximum length of a sensor nameId after trimming
pub const MAX_NAME_ID_LEN: usize = 100;
/// Maximum length of sensor source text
pub const MAX_SENSOR_TEXT_LEN: usize = 10_000;
/// Maximum length of a similarity-check input
pub const MAX_PROBE_TEXT_LEN: usize = 5_000;
/// Maximum number of entries in one bulk-create request
pub const MAX_BULK_SENSORS: usize = 50;

static NAME_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("invalid nameId regex"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("nameId cannot be empty")]
    EmptyNameId,

    #[error("nameId is too long (maximum {max} characters, got {len})")]
    NameIdTooLong { len: usize, max: usize },

    #[error("nameId can only contain letters, numbers, hyphens, and underscores")]
    NameIdCharset,

    #[error("{field} cannot be empty or contain only whitespace")]
    EmptyText { field: String },

    #[error("{field} is too long (maximum {max} characters, got {len})")]
    TextTooLong {
        field: String,
        len: usize,
        max: usize,
    },

    #[error("text must contain at least one non-empty paragraph")]
    NoParagraphs,

    #[error("no sensors provided for bulk creation")]
    EmptyBatch,

    #[error("too many sensors for bulk creation (maximum {max}, got {len})")]
    BatchTooLarge { len: usize, max: usize },

    #[error("validation failed for sensor '{name_id}': {source}")]
    BatchEntry {
        name_id: String,
        source: Box<ValidationError>,
    },
}

/// Validate a sensor nameId: trimmed, non-empty, at most
/// [`MAX_NAME_ID_LEN`] characters, restricted to `[A-Za-z0-9_-]`.
pub fn validate_name_id(raw: &str) -> Result<String, ValidationError> {
    let name_id = raw.trim();

    if name_id.is_empty() {
        return Err(ValidationError::EmptyNameId);
    }

    if name_id.chars().count() > MAX_NAME_ID_LEN {
        return Err(ValidationError::NameIdTooLong {
            len: name_id.chars().count(),
            max: MAX_NAME_ID_LEN,
        });
    }

    if !NAME_ID_RE.is_match(name_id) {
        return Err(ValidationError::NameIdCharset);
    }

    Ok(name_id.to_string())
}

/// Validate a block of text: trimmed, non-blank, at most `max_len`
/// characters. `field` names the value in error messages ("text",
/// "input text").
pub fn validate_text(raw: &str, max_len: usize, field: &str) -> Result<String, ValidationError> {
    let text = raw.trim();

    if text.is_empty() {
        return Err(ValidationError::EmptyText {
            field: field.to_string(),
        });
    }

    if text.chars().count() > max_len {
        return Err(ValidationError::TextTooLong {
            field: field.to_string(),
            len: text.chars().count(),
            max: max_len,
        });
    }

    Ok(text.to_string())
}

/// Validate a paragraph list: drops blank entries, fails if nothing is left.
pub fn validate_paragraphs(paragraphs: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let valid: Vec<String> = paragraphs
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();

    if valid.is_empty() {
        return Err(ValidationError::NoParagraphs);
    }

    Ok(valid)
}

/// Validate a bulk-create batch as a whole.
///
/// The batch must be non-empty and at most [`MAX_BULK_SENSORS`] entries.
/// Every (nameId, text) pair is validated individually; the first failing
/// pair fails the entire call, wrapped in [`ValidationError::BatchEntry`]
/// naming the offending identifier. No partial result is produced.
///
/// Returns the cleaned pairs in the batch's iteration order.
pub fn validate_batch(
    batch: &BTreeMap<String, String>,
) -> Result<Vec<(String, String)>, ValidationError> {
    if batch.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    if batch.len() > MAX_BULK_SENSORS {
        return Err(ValidationError::BatchTooLarge {
            len: batch.len(),
            max: MAX_BULK_SENSORS,
        });
    }

    let mut validated = Vec::with_capacity(batch.len());
    for (name_id, text) in batch {
        let cleaned = validate_name_id(name_id)
            .and_then(|id| Ok((id, validate_text(text, MAX_SENSOR_TEXT_LEN, "text")?)))
            .map_err(|source| ValidationError::BatchEntry {
                name_id: name_id.clone(),
                source: Box::new(source),
            })?;
        validated.push(cleaned);
    }

    Ok(validated)
}

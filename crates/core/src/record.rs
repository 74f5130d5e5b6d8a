//! Breed records and the validator that turns raw upstream items into them.
//!
//! Upstream occasionally leaks image URLs into the `breed` field, so
//! [`normalize`] rejects anything that looks like a URL or an image filename
//! instead of storing it under a garbage key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Longest breed name accepted, in characters.
pub const MAX_BREED_LEN: usize = 60;

const URL_MARKERS: &[&str] = &["http://", "https://"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// A validated breed/image pair. `breed` is the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub breed: String,
    /// Image reference; empty when upstream sent none.
    pub image: String,
}

impl Record {
    pub fn new(breed: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            breed: breed.into(),
            image: image.into(),
        }
    }
}

/// Why a raw upstream item was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("breed is missing, not a string, or blank")]
    MissingBreed,

    #[error("breed is {0} characters long (max 60)")]
    BreedTooLong(usize),

    #[error("breed contains a URL")]
    ContainsUrl,

    #[error("breed contains an image file extension")]
    ImageExtension,
}

/// Validate and normalize one raw upstream item.
///
/// The breed is trimmed and must be non-empty, at most [`MAX_BREED_LEN`]
/// characters, and free of URL schemes and image extensions (checked
/// case-insensitively). A missing, non-string or blank `image` becomes `""`.
pub fn normalize(raw: &Value) -> Result<Record, Rejection> {
    let obj = raw.as_object().ok_or(Rejection::NotAnObject)?;

    let breed = obj
        .get("breed")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or(Rejection::MissingBreed)?;

    let len = breed.chars().count();
    if len > MAX_BREED_LEN {
        return Err(Rejection::BreedTooLong(len));
    }

    let lowered = breed.to_lowercase();
    if URL_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Err(Rejection::ContainsUrl);
    }
    if IMAGE_EXTENSIONS.iter().any(|ext| lowered.contains(ext)) {
        return Err(Rejection::ImageExtension);
    }

    let image = obj
        .get("image")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    Ok(Record::new(breed, image))
}

//! Structured error types for imgsheet.
//!
//! User input problems are `ValidationError`s and are always reported before
//! any image is decoded or any document is created. Decode failures are
//! `ImageError`s. Everything public returns the unified `ImgsheetError`.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected user input. Export is aborted before any work is done.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No images selected")]
    NoImages,

    #[error("Image width must be a positive number of millimetres (got {0})")]
    InvalidTargetWidth(f64),

    #[error("Gap must be zero or a positive number of millimetres (got {0})")]
    InvalidGap(f64),

    #[error("Image {index} has zero pixel dimensions")]
    EmptyImage { index: usize },

    #[error("Unknown page size '{0}' (expected a4 or l)")]
    UnknownPageSize(String),

    #[error("Unknown border color '{0}' (expected gray, black, pink or blue)")]
    UnknownBorderColor(String),
}

/// Failure to acquire or decode a single image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to read image file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(&'static str),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image data too short")]
    TooShort,

    #[error("Unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("File path images are not supported in WASM: '{0}'. Use data URIs or base64.")]
    PathUnsupported(String),
}

/// The unified error type returned by the public imgsheet API.
#[derive(Debug, Error)]
pub enum ImgsheetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One image of the selection failed; the whole export is abandoned.
    #[error("Failed to load image '{name}': {source}")]
    Image {
        name: String,
        #[source]
        source: ImageError,
    },

    #[error("Layout references image {index} but only {available} images were loaded")]
    MissingImage { index: usize, available: usize },

    #[error("Failed to parse job: {source}\n  Hint: {hint}")]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: &'static str,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for ImgsheetError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters."
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the job schema. Check field names and types."
            }
            serde_json::error::Category::Eof => "Unexpected end of input. Is the JSON truncated?",
            serde_json::error::Category::Io => "The job input could not be read.",
        };
        ImgsheetError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_carry_a_hint() {
        let err: ImgsheetError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.contains("Hint"), "got: {msg}");
        assert!(msg.contains("trailing commas"));
    }

    #[test]
    fn validation_errors_pass_through_unchanged() {
        let err = ImgsheetError::from(ValidationError::InvalidGap(-1.0));
        assert_eq!(
            err.to_string(),
            "Gap must be zero or a positive number of millimetres (got -1)"
        );
    }
}

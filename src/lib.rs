//! # imgsheet
//!
//! Lay out a selection of photos into a grid on fixed-size pages and export
//! them as a multi-page PDF, with a preview that matches the export exactly.
//!
//! Every image is drawn at the same target width with its aspect ratio kept.
//! Images flow left to right into rows, rows flow top to bottom, and a new
//! page starts whenever the next row would cross the bottom margin.
//!
//! ## Architecture
//!
//! ```text
//! image files / data URIs
//!       ↓
//!   [image_loader]  : decode, read pixel dimensions
//!       ↓
//!   [layout]        : pure row-then-page flow → placements + page count
//!       ↓                       ↓
//!   [pdf]  all pages        [preview]  page 0 only
//!       ↓
//!   [export]        : images_<timestamp>.pdf
//! ```

pub mod error;
pub mod export;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod preview;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{ImageError, ImgsheetError, ValidationError};
pub use export::ExportJob;
pub use layout::LayoutEngine;
pub use model::{LayoutRequest, LayoutResult, PageConfig, Placement};

/// Lay out a request. Rejects invalid widths and gaps before placing anything.
pub fn layout(request: &LayoutRequest) -> Result<LayoutResult, ValidationError> {
    LayoutEngine::new().layout(request)
}

/// Render an export job to PDF bytes.
///
/// This is the primary entry point. Loads every image the job names, lays
/// them out and returns the raw bytes of a valid PDF file.
pub fn render(job: &ExportJob) -> Result<Vec<u8>, ImgsheetError> {
    Ok(job.render()?.bytes)
}

/// Render a job described as JSON to PDF bytes.
pub fn render_json(json: &str) -> Result<Vec<u8>, ImgsheetError> {
    render(&ExportJob::from_json(json)?)
}

//! # Export
//!
//! One export is a straight pipeline, run from scratch each time:
//!
//! ```text
//! ExportJob ─validate─▶ load every image ─▶ layout ─▶ PDF bytes ─▶ images_<timestamp>.pdf
//! ```
//!
//! Input problems are reported before any image is read. If any image fails
//! to load, nothing is written.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ImgsheetError, ValidationError};
use crate::image_loader::{self, LoadedImage};
use crate::layout::LayoutEngine;
use crate::model::*;
use crate::pdf::{PdfWriter, RenderOptions};

pub const DEFAULT_TARGET_WIDTH: f64 = 90.0;
pub const DEFAULT_GAP: f64 = 5.0;

/// Everything the user chose for one export. Also the job-file schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportJob {
    /// Image sources in display order: file paths or data URIs.
    pub images: Vec<String>,
    pub page_size: PageSize,
    pub target_width: f64,
    pub gap: f64,
    pub border: BorderOptions,
    pub metadata: Metadata,
}

impl Default for ExportJob {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            page_size: PageSize::A4,
            target_width: DEFAULT_TARGET_WIDTH,
            gap: DEFAULT_GAP,
            border: BorderOptions::default(),
            metadata: Metadata::default(),
        }
    }
}

/// The laid-out document and its serialized bytes.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub layout: LayoutResult,
    pub bytes: Vec<u8>,
}

impl ExportJob {
    pub fn from_json(json: &str) -> Result<Self, ImgsheetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn page_config(&self) -> PageConfig {
        self.page_size.config()
    }

    /// Checks that can be made without touching any file.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.images.is_empty() {
            return Err(ValidationError::NoImages);
        }
        validate_dimensions(self.target_width, self.gap)
    }

    /// Load every image in order. The first failure aborts the whole job.
    pub fn load_images(&self) -> Result<Vec<LoadedImage>, ImgsheetError> {
        self.images
            .iter()
            .map(|src| {
                let image = image_loader::load_image(src).map_err(|source| ImgsheetError::Image {
                    name: display_name(src),
                    source,
                })?;
                debug!(
                    image = %display_name(src),
                    width = image.width_px,
                    height = image.height_px,
                    "loaded image"
                );
                Ok(image)
            })
            .collect()
    }

    pub fn layout_request(&self, images: &[LoadedImage]) -> LayoutRequest {
        LayoutRequest::new(
            self.page_config(),
            self.target_width,
            self.gap,
            images.iter().map(LoadedImage::spec).collect(),
        )
    }

    /// Validate, load, lay out and serialize.
    pub fn render(&self) -> Result<RenderedDocument, ImgsheetError> {
        self.validate()?;
        let images = self.load_images()?;
        self.render_images(&images)
    }

    /// Lay out and serialize images that are already loaded.
    pub fn render_images(&self, images: &[LoadedImage]) -> Result<RenderedDocument, ImgsheetError> {
        self.validate()?;
        let page = self.page_config();
        let layout = LayoutEngine::new().layout(&self.layout_request(images))?;
        info!(
            images = images.len(),
            pages = layout.page_count,
            "layout complete"
        );

        let options = RenderOptions {
            border: self.border,
            metadata: self.metadata.clone(),
        };
        let bytes = PdfWriter::new().write(&layout, &page, images, &options)?;
        Ok(RenderedDocument { layout, bytes })
    }

    /// Render and save into `dir` under a timestamped file name.
    pub fn export_to_dir(&self, dir: &Path) -> Result<(PathBuf, RenderedDocument), ImgsheetError> {
        let path = dir.join(output_filename());
        let document = self.export_to(&path)?;
        Ok((path, document))
    }

    /// Render and save to exactly `path`. Nothing is written if rendering fails.
    pub fn export_to(&self, path: &Path) -> Result<RenderedDocument, ImgsheetError> {
        let document = self.render()?;
        std::fs::write(path, &document.bytes).map_err(|source| ImgsheetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            bytes = document.bytes.len(),
            "wrote document"
        );
        Ok(document)
    }
}

/// `images_<YYYYMMDDhhmmss>.pdf` for the current local time.
pub fn output_filename() -> String {
    output_filename_at(chrono::Local::now().naive_local())
}

pub fn output_filename_at(at: NaiveDateTime) -> String {
    format!("images_{}.pdf", at.format("%Y%m%d%H%M%S"))
}

/// Short name for log lines and errors; data URIs are not worth printing.
fn display_name(src: &str) -> String {
    if src.starts_with("data:") {
        let kind = src[5..].split(';').next().unwrap_or("image");
        format!("<{} data URI>", kind)
    } else {
        src.to_string()
    }
}

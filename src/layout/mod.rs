//! # Page Layout Engine
//!
//! Assigns every image a page and a position using a row-then-page flow:
//!
//! 1. Start at the top-left corner of the usable area on page 0
//! 2. Each image is drawn at the target width; its height follows from its
//!    aspect ratio
//! 3. If the image would cross the right margin, start a new row below the
//!    tallest image of the current row
//! 4. If it would then cross the bottom margin, start a new page
//! 5. Place it and move the cursor right by its width plus the gap
//!
//! Images are never shrunk, clamped or rejected for being too large. An image
//! wider than the usable row is placed at the left margin anyway; an image
//! taller than the usable height is placed at the top of a fresh page and
//! overflows the bottom margin.
//!
//! The engine is pure: the same request always yields the same result, and
//! both the preview and the PDF export consume the same output.

pub mod flow;

use serde::Serialize;
use tracing::debug;

use crate::error::ValidationError;
use crate::model::*;
use flow::{decide_wrap, FlowCursor, WrapDecision};

pub struct LayoutEngine;

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate the request, then lay out every image.
    ///
    /// Invalid target widths or gaps are rejected before any placement is
    /// computed.
    pub fn layout(&self, request: &LayoutRequest) -> Result<LayoutResult, ValidationError> {
        request.validate()?;
        Ok(self.flow(request))
    }

    fn flow(&self, request: &LayoutRequest) -> LayoutResult {
        let page = &request.page_config;
        let width = request.target_width;
        let gap = request.gap;

        let (cursor, placements) = request.images.iter().enumerate().fold(
            (
                FlowCursor::start(page),
                Vec::with_capacity(request.images.len()),
            ),
            |(cursor, mut placements), (image_index, spec)| {
                let height = spec.scaled_height(width);
                let decision = decide_wrap(&cursor, width, height, page, gap);
                if decision != WrapDecision::Place {
                    debug!(image_index, ?decision, page = cursor.page, "flow wrap");
                }

                let at = cursor.wrapped(decision, page, gap);
                placements.push(Placement {
                    image_index,
                    page: at.page,
                    x: at.x,
                    y: at.y,
                    width,
                    height,
                });
                (at.advance(width, height, gap), placements)
            },
        );

        LayoutResult {
            placements,
            page_count: cursor.page + 1,
        }
    }
}

// ── Serializable layout summary (for the `layout` command / dev tools) ──

/// Per-page view of a layout result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    pub page_count: usize,
    pub pages: Vec<PageInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub content_x: f64,
    pub content_y: f64,
    pub content_width: f64,
    pub content_height: f64,
    pub placements: Vec<Placement>,
}

impl LayoutInfo {
    pub fn new(result: &LayoutResult, page: &PageConfig) -> Self {
        let pages = (0..result.page_count)
            .map(|index| PageInfo {
                index,
                width: page.width,
                height: page.height,
                content_x: page.margin,
                content_y: page.margin,
                content_width: page.usable_width(),
                content_height: page.usable_height(),
                placements: result.placements_on_page(index).copied().collect(),
            })
            .collect();
        LayoutInfo {
            page_count: result.page_count,
            pages,
        }
    }
}

//! # Flow Wrap Decisions
//!
//! The per-image step of the row-then-page flow. The cursor is a plain value:
//! each step takes the previous cursor and returns the next one, so a whole
//! layout pass is a fold over the image list.

use crate::model::PageConfig;

/// Position of the next free slot plus the state of the current row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowCursor {
    pub x: f64,
    pub y: f64,
    /// Tallest image placed on the current row so far.
    pub row_height: f64,
    pub page: usize,
}

impl FlowCursor {
    /// Top-left corner of the usable area on the first page.
    pub fn start(page: &PageConfig) -> Self {
        Self {
            x: page.margin,
            y: page.margin,
            row_height: 0.0,
            page: 0,
        }
    }

    /// Apply a wrap decision, giving the cursor the image is placed at.
    pub fn wrapped(self, decision: WrapDecision, page: &PageConfig, gap: f64) -> Self {
        match decision {
            WrapDecision::Place => self,
            WrapDecision::NewRow => Self {
                x: page.margin,
                y: self.y + self.row_height + gap,
                row_height: 0.0,
                page: self.page,
            },
            WrapDecision::NewPage | WrapDecision::NewRowThenNewPage => Self {
                page: self.page + 1,
                ..Self::start(page)
            },
        }
    }

    /// Step past an image of the given size placed at this cursor.
    pub fn advance(self, width: f64, height: f64, gap: f64) -> Self {
        Self {
            x: self.x + width + gap,
            row_height: self.row_height.max(height),
            ..self
        }
    }
}

/// What has to happen before the next image can be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapDecision {
    /// Fits at the cursor.
    Place,
    /// Too wide for the rest of the row; start a new row below it.
    NewRow,
    /// Fits the row but not the page; start a new page.
    NewPage,
    /// Needed a new row, and the new row does not fit the page either.
    NewRowThenNewPage,
}

/// Decide how to place an image of `width` × `height` at `cursor`.
///
/// The row check looks only at the horizontal extent. The page check runs
/// afterwards against the (possibly wrapped) row position. Comparisons are
/// plain floating point with no tolerance.
pub fn decide_wrap(
    cursor: &FlowCursor,
    width: f64,
    height: f64,
    page: &PageConfig,
    gap: f64,
) -> WrapDecision {
    let new_row = cursor.x + width > page.right_limit();
    let y = if new_row {
        cursor.y + cursor.row_height + gap
    } else {
        cursor.y
    };
    let new_page = y + height > page.bottom_limit();

    match (new_row, new_page) {
        (false, false) => WrapDecision::Place,
        (true, false) => WrapDecision::NewRow,
        (false, true) => WrapDecision::NewPage,
        (true, true) => WrapDecision::NewRowThenNewPage,
    }
}

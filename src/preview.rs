//! # Preview Renderer
//!
//! Draws the first page of a layout onto a drawing surface so the user sees
//! exactly what the exported document will look like. Only placements on
//! page 0 are drawn; the page count is reported back instead.
//!
//! Surfaces take page-local millimetre coordinates and do their own scaling.
//! `RasterSurface` is the built-in one, backed by an `image::RgbaImage`.

use std::path::Path;

use image::{imageops, Rgba, RgbaImage};

use crate::error::{ImageError, ImgsheetError};
use crate::image_loader::LoadedImage;
use crate::layout::LayoutEngine;
use crate::model::*;

pub const EMPTY_MESSAGE: &str = "Select images to see a preview";

/// Something the preview can draw on.
pub trait Surface {
    /// Clear the surface to a blank page.
    fn clear(&mut self);

    /// Draw `image` scaled into the box at (`x`, `y`) of size `width` × `height`.
    fn draw_image(
        &mut self,
        image: &LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), ImageError>;

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);

    /// Shown instead of a page when there is nothing to lay out.
    fn placeholder(&mut self, message: &str);
}

/// What the preview ended up showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    Empty { message: &'static str },
    Rendered { page_count: usize, drawn: usize },
}

pub struct Previewer {
    engine: LayoutEngine,
}

impl Default for Previewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Previewer {
    pub fn new() -> Self {
        Self {
            engine: LayoutEngine::new(),
        }
    }

    /// Lay out `request` and draw its first page onto `surface`.
    ///
    /// `images[i]` is drawn for `request.images[i]`.
    pub fn render<S: Surface>(
        &self,
        request: &LayoutRequest,
        images: &[LoadedImage],
        border: &BorderOptions,
        surface: &mut S,
    ) -> Result<PreviewOutcome, ImgsheetError> {
        surface.clear();
        if request.images.is_empty() {
            surface.placeholder(EMPTY_MESSAGE);
            return Ok(PreviewOutcome::Empty {
                message: EMPTY_MESSAGE,
            });
        }

        let layout = self.engine.layout(request)?;
        let mut drawn = 0;
        for p in layout.placements_on_page(0) {
            let image = images.get(p.image_index).ok_or(ImgsheetError::MissingImage {
                index: p.image_index,
                available: images.len(),
            })?;
            surface
                .draw_image(image, p.x, p.y, p.width, p.height)
                .map_err(|source| ImgsheetError::Image {
                    name: format!("#{}", p.image_index),
                    source,
                })?;
            if border.enabled {
                surface.stroke_rect(p.x, p.y, p.width, p.height, border.color.color());
            }
            drawn += 1;
        }

        Ok(PreviewOutcome::Rendered {
            page_count: layout.page_count,
            drawn,
        })
    }
}

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER_BG: Rgba<u8> = Rgba([240, 240, 240, 255]);

/// A pixel surface for one page at a fixed pixels-per-millimetre scale.
pub struct RasterSurface {
    canvas: RgbaImage,
    px_per_mm: f64,
    placeholder: Option<String>,
}

impl RasterSurface {
    pub fn new(page: &PageConfig, px_per_mm: f64) -> Self {
        let w = (page.width * px_per_mm).round().max(1.0) as u32;
        let h = (page.height * px_per_mm).round().max(1.0) as u32;
        Self {
            canvas: RgbaImage::from_pixel(w, h, PAPER),
            px_per_mm,
            placeholder: None,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn placeholder_message(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        self.canvas.save_with_format(path, image::ImageFormat::Png)
    }

    fn px(&self, mm: f64) -> i64 {
        (mm * self.px_per_mm).round() as i64
    }

    fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.canvas.width() && (y as u32) < self.canvas.height() {
            self.canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

impl Surface for RasterSurface {
    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = PAPER;
        }
        self.placeholder = None;
    }

    fn draw_image(
        &mut self,
        image: &LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), ImageError> {
        let w = self.px(width).max(1) as u32;
        let h = self.px(height).max(1) as u32;
        let resized = imageops::resize(&image.to_rgba()?, w, h, imageops::FilterType::Triangle);
        let (px, py) = (self.px(x), self.px(y));
        imageops::overlay(&mut self.canvas, &resized, px, py);
        Ok(())
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        let [r, g, b] = color.to_rgb8();
        let color = Rgba([r, g, b, 255]);
        let (x0, y0) = (self.px(x), self.px(y));
        let (x1, y1) = (self.px(x + width) - 1, self.px(y + height) - 1);
        for x in x0..=x1 {
            self.put(x, y0, color);
            self.put(x, y1, color);
        }
        for y in y0..=y1 {
            self.put(x0, y, color);
            self.put(x1, y, color);
        }
    }

    fn placeholder(&mut self, message: &str) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = PLACEHOLDER_BG;
        }
        self.placeholder = Some(message.to_string());
    }
}

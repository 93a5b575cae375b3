//! # Data Model
//!
//! The input and output types of the layout engine, plus the handful of
//! presentation options (border, metadata) the renderers need.
//!
//! All page geometry is in **millimetres** with a top-left origin. Image
//! dimensions are in source pixels. Conversion to PDF points happens only in
//! the PDF serializer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Page geometry: size and a uniform margin, in millimetres.
///
/// Callers must keep `width > 2 * margin` and `height > 2 * margin`; the
/// engine does not check it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PageConfig {
    pub const A4: PageConfig = PageConfig {
        width: 210.0,
        height: 297.0,
        margin: 10.0,
    };

    /// The "L" photo print size (89 × 127 mm).
    pub const L: PageConfig = PageConfig {
        width: 89.0,
        height: 127.0,
        margin: 5.0,
    };

    pub fn usable_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }

    /// Rightmost x an image edge may reach.
    pub fn right_limit(&self) -> f64 {
        self.width - self.margin
    }

    /// Lowest y an image edge may reach.
    pub fn bottom_limit(&self) -> f64 {
        self.height - self.margin
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::A4
    }
}

/// Page size selector as it appears in job files and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    L,
    Custom {
        width: f64,
        height: f64,
        margin: f64,
    },
}

impl PageSize {
    pub fn config(&self) -> PageConfig {
        match self {
            PageSize::A4 => PageConfig::A4,
            PageSize::L => PageConfig::L,
            PageSize::Custom {
                width,
                height,
                margin,
            } => PageConfig {
                width: *width,
                height: *height,
                margin: *margin,
            },
        }
    }
}

impl FromStr for PageSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "l" => Ok(PageSize::L),
            _ => Err(ValidationError::UnknownPageSize(s.to_string())),
        }
    }
}

/// Intrinsic size of a source image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
}

impl ImageSpec {
    pub fn new(intrinsic_width: u32, intrinsic_height: u32) -> Self {
        Self {
            intrinsic_width,
            intrinsic_height,
        }
    }

    /// Height of this image when drawn `width` wide, keeping its aspect ratio.
    pub fn scaled_height(&self, width: f64) -> f64 {
        width * self.intrinsic_height as f64 / self.intrinsic_width as f64
    }
}

/// Everything the layout engine needs for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub page_config: PageConfig,
    /// Width every image is drawn at, in millimetres.
    pub target_width: f64,
    /// Horizontal and vertical spacing between images, in millimetres.
    pub gap: f64,
    pub images: Vec<ImageSpec>,
}

impl LayoutRequest {
    pub fn new(page_config: PageConfig, target_width: f64, gap: f64, images: Vec<ImageSpec>) -> Self {
        Self {
            page_config,
            target_width,
            gap,
            images,
        }
    }

    /// Reject inputs the engine cannot lay out. An empty image list is valid
    /// here (it lays out to a single empty page); exporters reject it separately.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimensions(self.target_width, self.gap)?;
        if let Some(index) = self
            .images
            .iter()
            .position(|img| img.intrinsic_width == 0 || img.intrinsic_height == 0)
        {
            return Err(ValidationError::EmptyImage { index });
        }
        Ok(())
    }
}

/// Shared check for the two user-entered lengths. NaN and infinities count as
/// non-numeric input.
pub(crate) fn validate_dimensions(target_width: f64, gap: f64) -> Result<(), ValidationError> {
    if !target_width.is_finite() || target_width <= 0.0 {
        return Err(ValidationError::InvalidTargetWidth(target_width));
    }
    if !gap.is_finite() || gap < 0.0 {
        return Err(ValidationError::InvalidGap(gap));
    }
    Ok(())
}

/// Where one image lands: page index plus a page-local box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub image_index: usize,
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Output of the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    /// One placement per input image, in input order.
    pub placements: Vec<Placement>,
    /// Always at least 1.
    pub page_count: usize,
}

impl LayoutResult {
    pub fn placements_on_page(&self, page: usize) -> impl Iterator<Item = &Placement> {
        self.placements.iter().filter(move |p| p.page == page)
    }
}

/// An RGB color with components in 0.0..=1.0, as PDF operators expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn from_rgb8([r, g, b]: [u8; 3]) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [c(self.r), c(self.g), c(self.b)]
    }
}

/// The fixed palette offered for image borders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderColor {
    #[default]
    Gray,
    Black,
    Pink,
    Blue,
}

impl BorderColor {
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            BorderColor::Gray => [200, 200, 200],
            BorderColor::Black => [0, 0, 0],
            BorderColor::Pink => [255, 182, 193],
            BorderColor::Blue => [100, 149, 237],
        }
    }

    pub fn color(&self) -> Color {
        Color::from_rgb8(self.rgb())
    }
}

impl FromStr for BorderColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" => Ok(BorderColor::Gray),
            "black" => Ok(BorderColor::Black),
            "pink" => Ok(BorderColor::Pink),
            "blue" => Ok(BorderColor::Blue),
            _ => Err(ValidationError::UnknownBorderColor(s.to_string())),
        }
    }
}

/// Optional stroked rectangle around every image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorderOptions {
    pub enabled: bool,
    pub color: BorderColor,
    /// Stroke width in millimetres.
    pub line_width: f64,
}

impl Default for BorderOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            color: BorderColor::Gray,
            line_width: 0.2,
        }
    }
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_paper_sizes() {
        assert_eq!(PageSize::A4.config(), PageConfig::A4);
        assert_eq!(PageConfig::A4.usable_width(), 190.0);
        assert_eq!(PageConfig::A4.bottom_limit(), 287.0);
        assert_eq!(PageConfig::L.usable_width(), 79.0);
        assert_eq!(PageConfig::L.usable_height(), 117.0);
    }

    #[test]
    fn page_size_parses_selector_values() {
        assert_eq!("a4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("L".parse::<PageSize>().unwrap(), PageSize::L);
        assert!(matches!(
            "letter".parse::<PageSize>(),
            Err(ValidationError::UnknownPageSize(_))
        ));
    }

    #[test]
    fn page_size_deserializes_custom() {
        let size: PageSize =
            serde_json::from_str(r#"{"custom": {"width": 100, "height": 150, "margin": 4}}"#)
                .unwrap();
        assert_eq!(size.config().usable_height(), 142.0);
        let size: PageSize = serde_json::from_str(r#""l""#).unwrap();
        assert_eq!(size, PageSize::L);
    }

    #[test]
    fn scaled_height_preserves_aspect() {
        let spec = ImageSpec::new(2000, 1000);
        assert_eq!(spec.scaled_height(90.0), 45.0);
        let spec = ImageSpec::new(3, 7);
        assert!((spec.scaled_height(30.0) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_bad_lengths() {
        let ok = LayoutRequest::new(PageConfig::A4, 90.0, 0.0, vec![]);
        assert!(ok.validate().is_ok());

        for width in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let req = LayoutRequest::new(PageConfig::A4, width, 5.0, vec![]);
            assert!(matches!(
                req.validate(),
                Err(ValidationError::InvalidTargetWidth(_))
            ));
        }
        for gap in [-0.1, f64::NAN] {
            let req = LayoutRequest::new(PageConfig::A4, 90.0, gap, vec![]);
            assert!(matches!(req.validate(), Err(ValidationError::InvalidGap(_))));
        }
    }

    #[test]
    fn validate_rejects_zero_pixel_images() {
        let req = LayoutRequest::new(
            PageConfig::A4,
            90.0,
            5.0,
            vec![ImageSpec::new(10, 10), ImageSpec::new(0, 10)],
        );
        assert_eq!(req.validate(), Err(ValidationError::EmptyImage { index: 1 }));
    }

    #[test]
    fn request_uses_camel_case_json() {
        let json = r#"{
            "pageConfig": {"width": 210, "height": 297, "margin": 10},
            "targetWidth": 90,
            "gap": 5,
            "images": [{"intrinsicWidth": 2000, "intrinsicHeight": 1000}]
        }"#;
        let req: LayoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.page_config, PageConfig::A4);
        assert_eq!(req.images[0], ImageSpec::new(2000, 1000));
    }

    #[test]
    fn border_palette() {
        assert_eq!("black".parse::<BorderColor>().unwrap().rgb(), [0, 0, 0]);
        assert_eq!("Grey".parse::<BorderColor>().unwrap(), BorderColor::Gray);
        assert!("green".parse::<BorderColor>().is_err());
        assert_eq!(BorderColor::Pink.color().to_rgb8(), [255, 182, 193]);
        assert_eq!(Color::BLACK.to_rgb8(), [0, 0, 0]);
    }

    #[test]
    fn placements_on_page_filters() {
        let p = |image_index, page| Placement {
            image_index,
            page,
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        let result = LayoutResult {
            placements: vec![p(0, 0), p(1, 1), p(2, 0)],
            page_count: 2,
        };
        let first: Vec<usize> = result.placements_on_page(0).map(|p| p.image_index).collect();
        assert_eq!(first, vec![0, 2]);
    }
}

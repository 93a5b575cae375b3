//! # Image Loading and Decoding
//!
//! Turns a selected file into something both renderers can use: the pixel
//! dimensions the layout engine needs, and data the PDF serializer can embed
//! directly. JPEG images pass through without re-encoding (PDF readers
//! support DCTDecode natively). PNG images are decoded to RGB pixels with a
//! separate alpha channel for SMask transparency.
//!
//! Sources can be file paths, `data:image/...;base64,` URIs (what a browser
//! file picker hands over) or raw base64.

use std::path::Path;

use image::{GenericImageView, RgbaImage};

use crate::error::ImageError;
use crate::model::ImageSpec;

/// A fully decoded/loaded image ready for layout and embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded as-is with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl LoadedImage {
    /// The intrinsic size the layout engine works with.
    pub fn spec(&self) -> ImageSpec {
        ImageSpec::new(self.width_px, self.height_px)
    }

    /// Full RGBA pixels, for raster previews.
    pub fn to_rgba(&self) -> Result<RgbaImage, ImageError> {
        match &self.pixel_data {
            ImagePixelData::Jpeg { data, .. } => Ok(image::load_from_memory(data)?.to_rgba8()),
            ImagePixelData::Decoded { rgb, alpha } => {
                let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
                for (i, px) in rgb.chunks_exact(3).enumerate() {
                    rgba.extend_from_slice(px);
                    rgba.push(alpha.as_ref().map_or(255, |a| a[i]));
                }
                RgbaImage::from_raw(self.width_px, self.height_px, rgba)
                    .ok_or(ImageError::TooShort)
            }
        }
    }
}

/// Load an image from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` data URI
/// - File path (absolute or relative), read from disk
/// - Raw base64-encoded image data
pub fn load_image(src: &str) -> Result<LoadedImage, ImageError> {
    let raw_bytes = read_source_bytes(src)?;
    decode_image_bytes(&raw_bytes)
}

/// Load an image file from disk.
pub fn load_image_file(path: &Path) -> Result<LoadedImage, ImageError> {
    let raw_bytes = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_image_bytes(&raw_bytes)
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, ImageError> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or(ImageError::InvalidDataUri("missing comma"))?;
        if !src[..comma_pos].ends_with(";base64") {
            return Err(ImageError::InvalidDataUri("only base64 payloads are supported"));
        }
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Explicit path prefixes, an image extension or an existing file count as
    // paths, so base64 strings (which contain '/') are not mistaken for files.
    if looks_like_path(src) || is_existing_file(src) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return std::fs::read(src).map_err(|source| ImageError::Io {
                path: src.to_string(),
                source,
            });
        }
        #[cfg(target_arch = "wasm32")]
        {
            return Err(ImageError::PathUnsupported(src.to_string()));
        }
    }

    base64_decode(src)
}

fn looks_like_path(src: &str) -> bool {
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return true;
    }
    let lower = src.to_ascii_lowercase();
    [".jpg", ".jpeg", ".png"].iter().any(|ext| lower.ends_with(ext))
}

#[cfg(not(target_arch = "wasm32"))]
fn is_existing_file(src: &str) -> bool {
    Path::new(src).is_file()
}

#[cfg(target_arch = "wasm32")]
fn is_existing_file(_src: &str) -> bool {
    false
}

fn base64_decode(input: &str) -> Result<Vec<u8>, ImageError> {
    use base64::Engine;
    Ok(base64::engine::general_purpose::STANDARD.decode(input.trim())?)
}

/// Detect image format from magic bytes and decode accordingly.
pub fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, ImageError> {
    if data.len() < 4 {
        return Err(ImageError::TooShort);
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err(ImageError::UnsupportedFormat)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: decode once so a truncated or corrupt file fails here rather than
/// in the PDF reader, then keep the original bytes for passthrough.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, ImageError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?;
    let (width, height) = img.dimensions();

    match jpeg_color_space(data) {
        Some(color_space) => Ok(LoadedImage {
            pixel_data: ImagePixelData::Jpeg {
                data: data.to_vec(),
                color_space,
            },
            width_px: width,
            height_px: height,
        }),
        // CMYK/YCCK: the decoder already converted to RGB.
        None => Ok(split_alpha(&img.to_rgba8())),
    }
}

/// Scan JPEG markers to find the SOF (Start of Frame) segment and map its
/// component count to a color space DCTDecode can embed directly.
/// `None` means the JPEG has to be re-encoded.
fn jpeg_color_space(data: &[u8]) -> Option<JpegColorSpace> {
    match jpeg_components(data)? {
        1 => Some(JpegColorSpace::DeviceGray),
        3 => Some(JpegColorSpace::DeviceRGB),
        _ => None,
    }
}

fn jpeg_components(data: &[u8]) -> Option<u8> {
    let mut i = 2; // skip SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        // SOF markers: C0-C3, C5-C7, C9-CB, CD-CF
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof {
            // length(2) + precision(1) + height(2) + width(2) + num_components(1)
            return data.get(i + 9).copied();
        }
        if i + 3 >= data.len() {
            return None;
        }
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + seg_len;
    }
    None
}

/// PNG: decode to RGBA, split into RGB + alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, ImageError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
    Ok(split_alpha(&img.to_rgba8()))
}

fn split_alpha(rgba: &RgbaImage) -> LoadedImage {
    let pixel_count = (rgba.width() as usize) * (rgba.height() as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: rgba.width(),
        height_px: rgba.height(),
    }
}

//! # PDF Serializer
//!
//! Takes a layout result and the loaded images and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. Layout coordinates are millimetres
//! with a top-left origin; PDF user space is points with a bottom-left origin,
//! so every box is scaled and flipped on the way out.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, images, pages, content streams
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Each image is written once as an XObject, even when the layout draws it on
//! a page far from where it was registered.

use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::ImgsheetError;
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::model::*;

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// Presentation options that do not affect layout.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub border: BorderOptions,
    pub metadata: Metadata,
}

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// XObject obj ID per input image, referenced as /Im0, /Im1, ...
    image_objects: Vec<usize>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write every page of `layout` to a PDF byte vector.
    ///
    /// `images[i]` must be the image the layout knows as `image_index == i`.
    pub fn write(
        &self,
        layout: &LayoutResult,
        page: &PageConfig,
        images: &[LoadedImage],
        options: &RenderOptions,
    ) -> Result<Vec<u8>, ImgsheetError> {
        if let Some(p) = layout.placements.iter().find(|p| p.image_index >= images.len()) {
            return Err(ImgsheetError::MissingImage {
                index: p.image_index,
                available: images.len(),
            });
        }

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = images, then page objects and content streams
        let mut builder = PdfBuilder {
            objects: (0..3).map(|_| PdfObject { data: vec![] }).collect(),
            image_objects: Vec::with_capacity(images.len()),
        };

        for image in images {
            let id = Self::write_image_xobject(&mut builder, image);
            builder.image_objects.push(id);
        }

        let page_width = mm_to_pt(page.width);
        let page_height = mm_to_pt(page.height);
        let mut page_obj_ids: Vec<usize> = Vec::with_capacity(layout.page_count);

        for page_idx in 0..layout.page_count {
            let content = self.build_content_stream(layout, page_idx, page_height, options);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let page_obj_id = builder.objects.len();
            let xobjects = self.build_xobject_resource_dict(layout, page_idx, &builder);
            let resources = if xobjects.is_empty() {
                String::new()
            } else {
                format!("/XObject << {} >>", xobjects)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page_width, page_height, content_obj_id, resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: Self::build_info_dict(&options.metadata).into_bytes(),
        });

        Ok(self.serialize(&builder, info_obj_id))
    }

    /// Draw operators for every placement on one page, in layout order.
    fn build_content_stream(
        &self,
        layout: &LayoutResult,
        page_idx: usize,
        page_height: f64,
        options: &RenderOptions,
    ) -> String {
        let mut stream = String::new();
        let border = &options.border;

        for placement in layout.placements_on_page(page_idx) {
            let x = mm_to_pt(placement.x);
            let y = page_height - mm_to_pt(placement.y + placement.height);
            let w = mm_to_pt(placement.width);
            let h = mm_to_pt(placement.height);

            let _ = write!(
                stream,
                "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                w, h, x, y, placement.image_index
            );

            if border.enabled {
                let c = border.color.color();
                let _ = write!(
                    stream,
                    "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                    c.r,
                    c.g,
                    c.b,
                    mm_to_pt(border.line_width),
                    x,
                    y,
                    w,
                    h
                );
            }
        }

        stream
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space_str = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                Self::push_image_stream(
                    builder,
                    image,
                    color_space_str,
                    "/DCTDecode",
                    data,
                    "",
                )
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                let smask_id = alpha.as_ref().map(|alpha_data| {
                    let compressed = compress_to_vec_zlib(alpha_data, 6);
                    Self::push_image_stream(
                        builder,
                        image,
                        "/DeviceGray",
                        "/FlateDecode",
                        &compressed,
                        "",
                    )
                });

                let smask_ref = smask_id
                    .map(|id| format!(" /SMask {} 0 R", id))
                    .unwrap_or_default();
                let compressed = compress_to_vec_zlib(rgb, 6);
                Self::push_image_stream(
                    builder,
                    image,
                    "/DeviceRGB",
                    "/FlateDecode",
                    &compressed,
                    &smask_ref,
                )
            }
        }
    }

    fn push_image_stream(
        builder: &mut PdfBuilder,
        image: &LoadedImage,
        color_space: &str,
        filter: &str,
        data: &[u8],
        extra: &str,
    ) -> usize {
        let obj_id = builder.objects.len();
        let mut obj_data: Vec<u8> = Vec::new();
        let _ = write!(
            obj_data,
            "<< /Type /XObject /Subtype /Image \
             /Width {} /Height {} \
             /ColorSpace {} \
             /BitsPerComponent 8 \
             /Filter {} \
             /Length {}{} >>\nstream\n",
            image.width_px,
            image.height_px,
            color_space,
            filter,
            data.len(),
            extra
        );
        obj_data.extend_from_slice(data);
        obj_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject { data: obj_data });
        obj_id
    }

    /// Build the /XObject resource dict entries for a specific page.
    fn build_xobject_resource_dict(
        &self,
        layout: &LayoutResult,
        page_idx: usize,
        builder: &PdfBuilder,
    ) -> String {
        let used: BTreeSet<usize> = layout
            .placements_on_page(page_idx)
            .map(|p| p.image_index)
            .collect();
        used.iter()
            .map(|&idx| format!("/Im{} {} 0 R", idx, builder.image_objects[idx]))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_info_dict(metadata: &Metadata) -> String {
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", Self::text_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author {} ", Self::text_string(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject {} ", Self::text_string(subject));
        }
        let _ = write!(
            info,
            "/Producer (imgsheet {}) /Creator (imgsheet) >>",
            env!("CARGO_PKG_VERSION")
        );
        info
    }

    /// A text string for the Info dictionary: an escaped literal for ASCII,
    /// otherwise UTF-16BE with a byte order mark as a hex string.
    fn text_string(s: &str) -> String {
        if s.is_ascii() {
            return format!("({})", Self::escape_pdf_string(s));
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniz_oxide::inflate::decompress_to_vec_zlib;

    fn opaque_image(w: u32, h: u32) -> LoadedImage {
        LoadedImage {
            pixel_data: ImagePixelData::Decoded {
                rgb: vec![200; (w * h * 3) as usize],
                alpha: None,
            },
            width_px: w,
            height_px: h,
        }
    }

    fn placement(image_index: usize, page: usize) -> Placement {
        Placement {
            image_index,
            page,
            x: 10.0,
            y: 10.0,
            width: 90.0,
            height: 45.0,
        }
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Inflate every FlateDecode content stream that contains drawing operators.
    fn content_streams(bytes: &[u8]) -> Vec<String> {
        let marker = b"/Filter /FlateDecode >>\nstream\n";
        let mut out = Vec::new();
        let mut pos = 0;
        while let Some(start) = bytes[pos..].windows(marker.len()).position(|w| w == marker) {
            let begin = pos + start + marker.len();
            let end = begin
                + bytes[begin..]
                    .windows(10)
                    .position(|w| w == b"\nendstream")
                    .unwrap();
            if let Ok(raw) = decompress_to_vec_zlib(&bytes[begin..end]) {
                out.push(text(&raw));
            }
            pos = end;
        }
        out
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(
            PdfWriter::escape_pdf_string("Hello (World)"),
            "Hello \\(World\\)"
        );
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_non_ascii_text_string_is_utf16() {
        assert_eq!(PdfWriter::text_string("a(b)"), "(a\\(b\\))");
        // 旅 U+65C5, 行 U+884C; 😀 is a surrogate pair
        assert_eq!(PdfWriter::text_string("旅行"), "<FEFF65C5884C>");
        assert_eq!(PdfWriter::text_string("😀"), "<FEFFD83DDE00>");
    }

    #[test]
    fn test_mm_to_pt() {
        assert!((mm_to_pt(210.0) - 595.28).abs() < 0.01);
        assert!((mm_to_pt(297.0) - 841.89).abs() < 0.01);
    }

    #[test]
    fn test_empty_layout_produces_one_blank_page() {
        let layout = LayoutResult {
            placements: vec![],
            page_count: 1,
        };
        let bytes = PdfWriter::new()
            .write(&layout, &PageConfig::A4, &[], &RenderOptions::default())
            .unwrap();
        let pdf = text(&bytes);
        assert!(pdf.starts_with("%PDF-1.7"));
        assert!(pdf.contains("/Count 1"));
        assert!(pdf.contains("/MediaBox [0 0 595.28 841.89]"));
        assert!(pdf.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_one_page_object_per_layout_page() {
        let layout = LayoutResult {
            placements: vec![placement(0, 0), placement(1, 2)],
            page_count: 3,
        };
        let images = vec![opaque_image(2, 1), opaque_image(2, 1)];
        let bytes = PdfWriter::new()
            .write(&layout, &PageConfig::A4, &images, &RenderOptions::default())
            .unwrap();
        let pdf = text(&bytes);
        assert!(pdf.contains("/Count 3"));
        assert_eq!(pdf.matches("/Type /Page ").count(), 3);
        assert_eq!(pdf.matches("/Subtype /Image").count(), 2);
    }

    #[test]
    fn test_image_drawn_with_flipped_coordinates() {
        let layout = LayoutResult {
            placements: vec![placement(0, 0)],
            page_count: 1,
        };
        let bytes = PdfWriter::new()
            .write(
                &layout,
                &PageConfig::A4,
                &[opaque_image(2, 1)],
                &RenderOptions::default(),
            )
            .unwrap();
        let streams = content_streams(&bytes);
        let page = streams.iter().find(|s| s.contains(" Do")).unwrap();
        // x = 10mm, y = 297 - 55 = 242mm from the bottom
        let expected = format!(
            "{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im0 Do",
            mm_to_pt(90.0),
            mm_to_pt(45.0),
            mm_to_pt(10.0),
            mm_to_pt(297.0) - mm_to_pt(55.0)
        );
        assert!(page.contains(&expected), "got: {page}");
        assert!(!page.contains(" re\n"), "no border unless enabled");
    }

    #[test]
    fn test_border_stroked_in_palette_color() {
        let layout = LayoutResult {
            placements: vec![placement(0, 0)],
            page_count: 1,
        };
        let options = RenderOptions {
            border: BorderOptions {
                enabled: true,
                color: BorderColor::Black,
                line_width: 0.5,
            },
            ..Default::default()
        };
        let bytes = PdfWriter::new()
            .write(&layout, &PageConfig::A4, &[opaque_image(2, 1)], &options)
            .unwrap();
        let streams = content_streams(&bytes);
        let page = streams.iter().find(|s| s.contains(" Do")).unwrap();
        assert!(page.contains("0.000 0.000 0.000 RG"));
        assert!(page.contains(&format!("{:.2} w", mm_to_pt(0.5))));
        assert!(page.contains(" re\nS\n"));
    }

    #[test]
    fn test_resources_list_only_images_on_page() {
        let layout = LayoutResult {
            placements: vec![placement(0, 0), placement(1, 1)],
            page_count: 2,
        };
        let images = vec![opaque_image(1, 1), opaque_image(1, 1)];
        let bytes = PdfWriter::new()
            .write(&layout, &PageConfig::L, &images, &RenderOptions::default())
            .unwrap();
        let pdf = text(&bytes);
        let pages: Vec<&str> = pdf
            .split("<< /Type /Page ")
            .skip(1)
            .map(|s| s.split(">> >>").next().unwrap())
            .collect();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("/Im0 ") && !pages[0].contains("/Im1 "));
        assert!(pages[1].contains("/Im1 ") && !pages[1].contains("/Im0 "));
    }

    #[test]
    fn test_alpha_written_as_smask() {
        let image = LoadedImage {
            pixel_data: ImagePixelData::Decoded {
                rgb: vec![255, 0, 0],
                alpha: Some(vec![128]),
            },
            width_px: 1,
            height_px: 1,
        };
        let layout = LayoutResult {
            placements: vec![placement(0, 0)],
            page_count: 1,
        };
        let bytes = PdfWriter::new()
            .write(&layout, &PageConfig::A4, &[image], &RenderOptions::default())
            .unwrap();
        let pdf = text(&bytes);
        assert!(pdf.contains("/SMask"));
        assert!(pdf.contains("/ColorSpace /DeviceGray"));
    }

    #[test]
    fn test_metadata_in_info_dict() {
        let options = RenderOptions {
            metadata: Metadata {
                title: Some("Trip (2026)".to_string()),
                author: Some("Me".to_string()),
                subject: None,
            },
            ..Default::default()
        };
        let layout = LayoutResult {
            placements: vec![],
            page_count: 1,
        };
        let bytes = PdfWriter::new()
            .write(&layout, &PageConfig::A4, &[], &options)
            .unwrap();
        let pdf = text(&bytes);
        assert!(pdf.contains("/Title (Trip \\(2026\\))"));
        assert!(pdf.contains("/Author (Me)"));
        assert!(!pdf.contains("/Subject"));
        assert!(pdf.contains("/Producer (imgsheet"));
        assert!(pdf.contains("/Info "));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let layout = LayoutResult {
            placements: vec![placement(3, 0)],
            page_count: 1,
        };
        let err = PdfWriter::new()
            .write(&layout, &PageConfig::A4, &[], &RenderOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ImgsheetError::MissingImage {
                index: 3,
                available: 0
            }
        ));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let layout = LayoutResult {
            placements: vec![placement(0, 0)],
            page_count: 1,
        };
        let bytes = PdfWriter::new()
            .write(
                &layout,
                &PageConfig::A4,
                &[opaque_image(1, 1)],
                &RenderOptions::default(),
            )
            .unwrap();
        let pdf = text(&bytes);
        let xref = pdf.find("\nxref\n").unwrap() + 1;
        let entries: Vec<usize> = pdf[xref..]
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert!(!entries.is_empty());
        for (i, offset) in entries.iter().enumerate() {
            let header = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(header.as_bytes()));
        }
    }
}

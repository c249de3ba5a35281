//! PDF output
//!
//! Each composite page becomes exactly one PDF page holding one JPEG image
//! XObject that fills the page. No outlines, text or extra pages are added.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::info;

use crate::reassemble::CompositePage;

// ============================================================
// Constants
// ============================================================

/// Default JPEG quality for embedded pages
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default rendering resolution (one pixel per point)
pub const DEFAULT_DPI: u32 = 72;

/// PDF points per inch
const POINTS_PER_INCH: f64 = 72.0;

// ============================================================
// Error Types
// ============================================================

/// PDF writing error types
#[derive(Debug, Error)]
pub enum PdfWriterError {
    #[error("No pages to write")]
    NoPages,

    #[error("Failed to encode page {page}: {reason}")]
    Encode { page: usize, reason: String },

    #[error("Failed to serialize PDF: {0}")]
    Save(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PdfWriterError>;

// ============================================================
// Options
// ============================================================

/// PDF writer options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfWriterOptions {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Pixels per inch used to size pages
    pub dpi: u32,
}

impl Default for PdfWriterOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            dpi: DEFAULT_DPI,
        }
    }
}

impl PdfWriterOptions {
    /// Create a new options builder
    pub fn builder() -> PdfWriterOptionsBuilder {
        PdfWriterOptionsBuilder::default()
    }

    /// Page size in points for an image of `width` x `height` pixels
    pub fn page_size(&self, width: u32, height: u32) -> (f64, f64) {
        let scale = POINTS_PER_INCH / f64::from(self.dpi.max(1));
        (f64::from(width) * scale, f64::from(height) * scale)
    }
}

/// Builder for PdfWriterOptions
#[derive(Debug, Default)]
pub struct PdfWriterOptionsBuilder {
    options: PdfWriterOptions,
}

impl PdfWriterOptionsBuilder {
    /// Set JPEG quality
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.options.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set DPI
    #[must_use]
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.options.dpi = dpi.max(1);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> PdfWriterOptions {
        self.options
    }
}

// ============================================================
// Document Builder
// ============================================================

/// Summary of a written document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub page_count: usize,
    pub output_size: u64,
}

/// Bundles composite pages into a single PDF
pub struct DocumentBuilder;

impl DocumentBuilder {
    /// Build the PDF in memory
    pub fn build(pages: &[CompositePage], options: &PdfWriterOptions) -> Result<Document> {
        if pages.is_empty() {
            return Err(PdfWriterError::NoPages);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let jpeg = encode_jpeg(page, options.jpeg_quality)
                .map_err(|reason| PdfWriterError::Encode { page: i + 1, reason })?;
            let page_id = add_image_page(&mut doc, pages_id, page, jpeg, options);
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Ok(doc)
    }

    /// Build the PDF and write it to `path`
    pub fn write(
        pages: &[CompositePage],
        path: &Path,
        options: &PdfWriterOptions,
    ) -> Result<DocumentSummary> {
        let mut doc = Self::build(pages, options)?;

        let file = File::create(path).map_err(|e| PdfWriterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer)
            .map_err(|e| PdfWriterError::Save(e.to_string()))?;
        writer.flush().map_err(|e| PdfWriterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        drop(writer);

        let output_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        info!(
            path = %path.display(),
            pages = pages.len(),
            bytes = output_size,
            "PDF written"
        );

        Ok(DocumentSummary {
            path: path.to_path_buf(),
            page_count: pages.len(),
            output_size,
        })
    }
}

fn encode_jpeg(page: &CompositePage, quality: u8) -> std::result::Result<Vec<u8>, String> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&page.image)
        .map_err(|e| e.to_string())?;
    Ok(jpeg)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    page: &CompositePage,
    jpeg: Vec<u8>,
    options: &PdfWriterOptions,
) -> ObjectId {
    let (width_pt, height_pt) = options.page_size(page.width(), page.height());

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(page.width()),
            "Height" => i64::from(page.height()),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    let content = format!(
        "q\n{:.4} 0 0 {:.4} 0 0 cm\n/Im0 Do\nQ\n",
        width_pt, height_pt
    );
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width_pt as f32),
            Object::Real(height_pt as f32),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => Object::Reference(image_id),
            },
        },
        "Contents" => Object::Reference(content_id),
    })
}

// ============================================================
// Tests
// ============================================================

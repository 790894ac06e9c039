//! PDF Report Assembler Module
//! Collects the static chart images into a multi-page PDF, one chart per page.
//!
//! The PDF objects are written directly; each PNG is re-encoded as JPEG and
//! embedded as a DCTDecode image XObject.

use crate::charts::CHARTS;
use image::codecs::jpeg::JpegEncoder;
use image::ImageError;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const REPORT_FILE: &str = "sales_report.pdf";

/// 6.4in x 4.8in, in PDF points (72 per inch)
const PAGE_WIDTH: f64 = 460.8;
const PAGE_HEIGHT: f64 = 345.6;
const JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to read chart image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A chart image ready for embedding.
struct PageImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

/// PDF generator for the chart report
pub struct PdfAssembler;

impl PdfAssembler {
    /// Write `sales_report.pdf` from `monthly.png`, `region.png` and `products.png`.
    pub fn assemble_pdf(output_dir: &Path) -> Result<PathBuf, PdfError> {
        let images: Vec<PathBuf> = CHARTS.iter().map(|c| c.png_path(output_dir)).collect();
        let path = output_dir.join(REPORT_FILE);
        Self::write_pdf(&images, &path, "Sales Report")?;
        info!("report saved: {} ({} pages)", path.display(), images.len());
        Ok(path)
    }

    /// Write one page per image, in the given order, overwriting `output_path`.
    pub fn write_pdf(images: &[PathBuf], output_path: &Path, title: &str) -> Result<(), PdfError> {
        let pages = images
            .iter()
            .map(|p| Self::load_image(p))
            .collect::<Result<Vec<_>, _>>()?;

        let bytes = Self::build_document(&pages, title);
        fs::write(output_path, bytes).map_err(|source| PdfError::Io {
            path: output_path.to_path_buf(),
            source,
        })
    }

    fn load_image(path: &Path) -> Result<PageImage, PdfError> {
        let image_err = |source| PdfError::Image {
            path: path.to_path_buf(),
            source,
        };

        let rgb = image::open(path).map_err(image_err)?.to_rgb8();
        let mut jpeg = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
            .map_err(image_err)?;

        debug!(
            "{}: {}x{} px, {} bytes as jpeg",
            path.display(),
            rgb.width(),
            rgb.height(),
            jpeg.len()
        );
        Ok(PageImage {
            width: rgb.width(),
            height: rgb.height(),
            jpeg,
        })
    }

    /// Object layout: 1 catalog, 2 page tree, then (page, content, image)
    /// per page, then the info dictionary.
    fn build_document(pages: &[PageImage], title: &str) -> Vec<u8> {
        let mut doc = PdfWriter::new();

        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 3 + 3 * i).collect();
        let info_id = 3 + 3 * pages.len();

        doc.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        doc.object(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            )
            .as_bytes(),
        );

        for (page, &id) in pages.iter().zip(&page_ids) {
            let (content_id, image_id) = (id + 1, id + 2);

            doc.object(
                id,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /XObject << /Im0 {} 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH, PAGE_HEIGHT, image_id, content_id
                )
                .as_bytes(),
            );

            let (w, h, x, y) = fit_to_page(page.width, page.height);
            let content = format!("q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im0 Do Q", w, h, x, y);
            doc.stream(content_id, "", content.as_bytes());

            let dict = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
                page.width, page.height
            );
            doc.stream(image_id, &dict, &page.jpeg);
        }

        doc.object(
            info_id,
            format!(
                "<< /Title ({}) /Producer (sales_analyser) >>",
                escape_pdf_text(title)
            )
            .as_bytes(),
        );

        doc.finish(info_id + 1, info_id)
    }
}

/// Scale an image to fit the page keeping its aspect ratio, centered.
/// Returns (width, height, x, y) in points.
fn fit_to_page(width: u32, height: u32) -> (f64, f64, f64, f64) {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let scale = (PAGE_WIDTH / w).min(PAGE_HEIGHT / h);
    let (sw, sh) = (w * scale, h * scale);
    (sw, sh, (PAGE_WIDTH - sw) / 2.0, (PAGE_HEIGHT - sh) / 2.0)
}

fn escape_pdf_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Appends numbered objects and records their offsets for the xref table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        // Binary marker line so transfer tools treat the file as binary
        let mut buf = b"%PDF-1.4\n%".to_vec();
        buf.extend_from_slice(&[0xE2, 0xE3, 0xCF, 0xD3]);
        buf.push(b'\n');
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.push_str(&format!("{} 0 obj\n", id));
        self.buf.extend_from_slice(body);
        self.push_str("\nendobj\n");
    }

    fn stream(&mut self, id: usize, dict: &str, data: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.push_str(&format!(
            "{} 0 obj\n<< {} /Length {} >>\nstream\n",
            id,
            dict,
            data.len()
        ));
        self.buf.extend_from_slice(data);
        self.push_str("\nendstream\nendobj\n");
    }

    /// Write the xref table and trailer. `size` is the highest object id + 1.
    fn finish(mut self, size: usize, info_id: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let xref_start = self.buf.len();

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, info_id, xref_start
        ));
        self.push_str(&xref);
        self.buf
    }

    fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }
}

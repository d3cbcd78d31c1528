//! First-page preview: rasterise page 1 with pdfium and keep the band that
//! usually holds the title, authors and teaser figure.
//!
//! Rendering is blocking and CPU-bound. Async callers should run it inside
//! `tokio::task::spawn_blocking`, as the `paperdeck` binary does for the
//! whole deck stage.

use crate::error::DeckError;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// File name of the preview inside a paper directory.
pub const PREVIEW_FILE: &str = "half.png";

/// Vertical crop of a page `height` pixels tall: `(top, band_height)`.
///
/// The band starts 1/20 down the page and is half the page tall, skipping
/// running headers.
pub fn crop_band(height: u32) -> (u32, u32) {
    (height / 20, height / 2)
}

/// Crop `page` to the [`crop_band`] at full width.
pub fn crop_top_band(page: &DynamicImage) -> DynamicImage {
    let (top, band) = crop_band(page.height());
    page.crop_imm(0, top, page.width(), band)
}

/// Render page 1 of `pdf_path` at `zoom` times its nominal size.
pub fn render_first_page(
    pdfium: &Pdfium,
    pdf_path: &Path,
    zoom: f32,
) -> Result<DynamicImage, DeckError> {
    if !pdf_path.exists() {
        return Err(DeckError::PdfNotFound {
            path: pdf_path.to_path_buf(),
        });
    }

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| DeckError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let page = document
        .pages()
        .get(0)
        .map_err(|e| DeckError::RasterisationFailed {
            page: 1,
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| DeckError::RasterisationFailed {
            page: 1,
            detail: format!("{:?}", e),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page 1 of {} → {}x{} px",
        pdf_path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Render, crop and save the preview of `pdf_path` as `out_path` (PNG).
pub fn write_preview(
    pdfium: &Pdfium,
    pdf_path: &Path,
    out_path: &Path,
    zoom: f32,
) -> Result<(u32, u32), DeckError> {
    let band = crop_top_band(&render_first_page(pdfium, pdf_path, zoom)?);
    band.save_with_format(out_path, ImageFormat::Png)
        .map_err(|e| DeckError::ImageWriteFailed {
            path: out_path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
    Ok((band.width(), band.height()))
}

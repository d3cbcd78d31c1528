//! Selecting and saving the embedded figures of a paper.
//!
//! Pages are scanned in order. Every image reference is considered at most
//! once per document, however many pages draw it. An image is accepted when
//! it passes, in order:
//!
//! 1. size: at least `min_width` wide **or** at least `min_height` tall;
//! 2. recovery: it can be reconstructed as an image file;
//! 3. weight: the encoded file is larger than `min_bytes`;
//! 4. shape: neither side is more than `max_ratio` times the other.
//!
//! Scanning stops once `max_images` images have been accepted.

use crate::config::ExtractionConfig;
use crate::error::DeckError;
use crate::pdf::objects::page_images;
use crate::pdf::recover::recover_image;
use lopdf::{Document, ObjectId};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// An accepted image as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub path: PathBuf,
    pub file_name: String,
    /// 1-based page the image was first found on.
    pub page: u32,
    pub width: u32,
    pub height: u32,
}

/// What one extraction pass saw and kept.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    /// Every image reference on the scanned pages.
    pub encountered: BTreeSet<ObjectId>,
    /// References that were accepted, in acceptance order.
    pub extracted: Vec<ObjectId>,
    /// Accepted images, in acceptance order.
    pub images: Vec<ImageCandidate>,
    pub pages_scanned: usize,
}

/// Per-document bookkeeping for the filter.
#[derive(Debug)]
struct ExtractionState {
    seen: HashSet<ObjectId>,
    accepted: Vec<ImageCandidate>,
    extracted: Vec<ObjectId>,
    max_images: usize,
}

impl ExtractionState {
    fn new(max_images: usize) -> Self {
        Self {
            seen: HashSet::new(),
            accepted: Vec::new(),
            extracted: Vec::new(),
            max_images,
        }
    }

    fn is_full(&self) -> bool {
        self.accepted.len() >= self.max_images
    }

    /// Records `id` as seen; false if it already was.
    fn first_sighting(&mut self, id: ObjectId) -> bool {
        self.seen.insert(id)
    }

    fn accept(&mut self, id: ObjectId, candidate: ImageCandidate) {
        self.extracted.push(id);
        self.accepted.push(candidate);
    }
}

/// Rejected only when below *both* minimum dimensions.
pub fn passes_size(config: &ExtractionConfig, width: u32, height: u32) -> bool {
    width >= config.min_width || height >= config.min_height
}

pub fn passes_weight(config: &ExtractionConfig, encoded_len: usize) -> bool {
    encoded_len > config.min_bytes
}

/// Degenerate images with a zero side never pass.
pub fn passes_shape(config: &ExtractionConfig, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let (w, h) = (width as f64, height as f64);
    w / h <= config.max_ratio && h / w <= config.max_ratio
}

/// `img{page:02}_{object:05}.{ext}`
pub fn image_file_name(page: u32, id: ObjectId, ext: &str) -> String {
    format!("img{:02}_{:05}.{}", page, id.0, ext)
}

/// Open `pdf_path` and save its qualifying images into `out_dir`.
pub fn extract_images(
    pdf_path: &Path,
    out_dir: &Path,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, DeckError> {
    if !pdf_path.exists() {
        return Err(DeckError::PdfNotFound {
            path: pdf_path.to_path_buf(),
        });
    }
    let doc = Document::load(pdf_path).map_err(|e| DeckError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    extract_from_document(&doc, out_dir, config)
}

/// Same as [`extract_images`] for an already loaded document.
pub fn extract_from_document(
    doc: &Document,
    out_dir: &Path,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, DeckError> {
    let start = Instant::now();
    std::fs::create_dir_all(out_dir).map_err(|source| DeckError::ImageWriteFailed {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut state = ExtractionState::new(config.max_images);
    let mut result = ExtractionResult::default();

    for (&page_no, &page_id) in &pages {
        if state.is_full() {
            break;
        }
        debug!("Scanning page {}/{} for images", page_no, page_count);
        result.pages_scanned += 1;

        let refs = page_images(doc, page_id);
        result.encountered.extend(refs.iter().map(|r| r.id));

        for image in refs {
            if state.is_full() {
                break;
            }
            if !state.first_sighting(image.id) {
                continue;
            }
            if !passes_size(config, image.width, image.height) {
                debug!(
                    "{:?}: {}x{} below minimum size",
                    image.id, image.width, image.height
                );
                continue;
            }

            let recovered = match recover_image(doc, &image) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Page {}: cannot recover image {:?}: {}", page_no, image.id, e);
                    continue;
                }
            };
            if !passes_weight(config, recovered.data.len()) {
                debug!("{:?}: only {} bytes", image.id, recovered.data.len());
                continue;
            }
            if !passes_shape(config, image.width, image.height) {
                debug!(
                    "{:?}: aspect {}x{} exceeds {}",
                    image.id, image.width, image.height, config.max_ratio
                );
                continue;
            }

            let file_name = image_file_name(page_no, image.id, recovered.ext);
            let path = out_dir.join(&file_name);
            std::fs::write(&path, &recovered.data).map_err(|source| {
                DeckError::ImageWriteFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            debug!("Saved {} ({} bytes)", path.display(), recovered.data.len());

            state.accept(
                image.id,
                ImageCandidate {
                    path,
                    file_name,
                    page: page_no,
                    width: image.width,
                    height: image.height,
                },
            );
        }
    }

    info!(
        "Extracted {}/{} images from {} pages in {}ms",
        state.accepted.len(),
        result.encountered.len(),
        result.pages_scanned,
        start.elapsed().as_millis()
    );

    result.extracted = state.extracted;
    result.images = state.accepted;
    Ok(result)
}

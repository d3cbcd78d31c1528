//! Error types for the paperdeck library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`DeckError`] — **Fatal**: the run cannot proceed (no search results,
//!   unreadable record, missing PDF, pdfium not bindable). Returned as
//!   `Err(DeckError)` from the top-level entry points.
//!
//! * [`PaperError`] — **Non-fatal**: a single paper failed during acquisition
//!   (download glitch, LLM error) but the other papers are fine. Collected in
//!   [`crate::acquire::AcquisitionReport`] and logged.
//!
//! * [`RecoverError`] — a single embedded image could not be decoded. The
//!   extractor logs it and rejects that image; it never aborts a document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paperdeck library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Record errors ─────────────────────────────────────────────────────
    /// The records directory does not exist.
    #[error("Records directory not found: '{path}'\nRun `paperdeck fetch` first or pass --dir.")]
    RecordsDirNotFound { path: PathBuf },

    /// A record file exists but could not be read.
    #[error("Failed to read record '{path}': {source}")]
    RecordRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record file was read but is not a valid paper record.
    #[error("Malformed record '{path}': {source}")]
    RecordParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF referenced by a record is missing.
    #[error("PDF file not found: '{path}'")]
    PdfNotFound { path: PathBuf },

    /// The PDF could not be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not write an extracted image or preview.
    #[error("Failed to write image '{path}': {source}")]
    ImageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output deck or a record file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Acquisition errors ────────────────────────────────────────────────
    /// The search returned nothing usable.
    #[error("No papers found for query {query:?} published in or after {from_year}")]
    NoSearchResults { query: String, from_year: i32 },

    /// The search request itself failed.
    #[error("Paper search failed: {reason}")]
    SearchFailed { reason: String },

    /// The configured LLM provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single paper during acquisition.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PaperError {
    /// PDF download failed.
    #[error("{entry_id}: download failed: {reason}")]
    DownloadFailed { entry_id: String, reason: String },

    /// The downloaded bytes are not a PDF.
    #[error("{entry_id}: downloaded file is not a PDF (first bytes {magic:?})")]
    NotAPdf { entry_id: String, magic: [u8; 4] },

    /// LLM call failed after retries.
    #[error("{entry_id}: summary failed after {retries} retries: {detail}")]
    SummaryFailed {
        entry_id: String,
        retries: u32,
        detail: String,
    },

    /// The LLM reply lacked required fields and incomplete summaries are rejected.
    #[error("{entry_id}: summary is missing fields: {}", .missing.join(", "))]
    IncompleteSummary {
        entry_id: String,
        missing: Vec<String>,
    },

    /// The paper directory or record file could not be written.
    #[error("{entry_id}: failed to write record: {detail}")]
    RecordWriteFailed { entry_id: String, detail: String },
}

/// Failure to reconstruct one embedded image.
#[derive(Debug, Error)]
pub enum RecoverError {
    #[error("PDF object error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported stream filter /{0}")]
    UnsupportedFilter(String),

    #[error("unsupported colour space {0}")]
    UnsupportedColorSpace(String),

    #[error("unsupported bits per component: {0}")]
    UnsupportedBitDepth(i64),

    #[error("image dictionary lacks a usable /{0}")]
    MissingKey(&'static str),

    #[error("image of {width}x{height} is too large to decode")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("sample data too short: expected {expected} bytes, got {actual}")]
    ShortSampleData { expected: usize, actual: usize },

    #[error("mask is {mask_w}x{mask_h} but base image is {base_w}x{base_h}")]
    MaskMismatch {
        base_w: u32,
        base_h: u32,
        mask_w: u32,
        mask_h: u32,
    },
}

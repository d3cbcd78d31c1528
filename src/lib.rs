//! # paperdeck
//!
//! Fetch recent arXiv papers, summarise each one with an LLM, and turn the
//! results into a Marp slide deck illustrated with figures pulled straight
//! out of the PDFs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Stage A: fetch                          Stage B: render
//!  ├─ search   arXiv Atom feed             ├─ records  papers/*/paper.json
//!  ├─ filter   year ≥ from_year, sample    ├─ filter   keyword substring match
//!  ├─ download paper.pdf (%PDF checked)    ├─ preview  page 1 via pdfium, top band
//!  ├─ summary  5 labelled lines via LLM    ├─ figures  embedded images via lopdf
//!  └─ record   paper.json                  └─ deck     Marp Markdown
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperdeck::{acquire, render_deck, AcquisitionConfig, DeckConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let fetch = AcquisitionConfig::builder().num_papers(5).build()?;
//!     let words = vec!["surface".to_string(), "code".to_string()];
//!     let report = acquire(&words, fetch).await?;
//!     eprintln!("saved {} papers", report.saved.len());
//!
//!     let deck = DeckConfig::builder().keywords(["quantum"]).build()?;
//!     let stats = tokio::task::spawn_blocking(move || render_deck(&deck)).await??;
//!     eprintln!("{} slides of figures", stats.image_slides);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperdeck` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## pdfium
//!
//! Page previews need a pdfium shared library at run time. It is looked up
//! via `PDFIUM_LIB_PATH`, then the working directory, then the system path.
//! Figure extraction uses lopdf and works without it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod acquire;
pub mod config;
pub mod deck;
pub mod error;
pub mod pdf;
pub mod progress;
pub mod prompts;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use acquire::{acquire, Acquirer, AcquisitionReport};
pub use config::{
    AcquisitionConfig, AcquisitionConfigBuilder, DeckConfig, DeckConfigBuilder, ExtractionConfig,
    ExtractionConfigBuilder,
};
pub use deck::{render_deck, DeckStats};
pub use error::{DeckError, PaperError, RecoverError};
pub use pdf::extract::{extract_images, ExtractionResult, ImageCandidate};
pub use pdf::preview::crop_top_band;
pub use progress::{NoopProgressCallback, PaperProgressCallback, ProgressCallback};
pub use record::{PaperRecord, Summary};

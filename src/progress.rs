//! Progress-callback trait for per-paper events.
//!
//! Inject an [`Arc<dyn PaperProgressCallback>`] via
//! [`crate::config::AcquisitionConfigBuilder::progress_callback`] or
//! [`crate::config::DeckConfigBuilder::progress_callback`] to receive events as
//! each paper is fetched or rendered. The library itself never draws anything;
//! the `paperdeck` binary forwards these events to an indicatif progress bar.
//!
//! # Example
//!
//! ```rust
//! use paperdeck::{DeckConfig, PaperProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl PaperProgressCallback for Counter {
//!     fn on_paper_complete(&self, index: usize, total: usize, title: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index, total, title);
//!     }
//! }
//!
//! let config = DeckConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by acquisition and deck rendering as they process each paper.
///
/// Papers are processed one at a time, but the trait is `Send + Sync` so an
/// implementation can be shared with a rendering thread. All methods default
/// to no-ops.
pub trait PaperProgressCallback: Send + Sync {
    /// Called once the number of papers to process is known.
    fn on_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a paper is processed. `index` is 1-based.
    fn on_paper_start(&self, index: usize, total: usize, title: &str) {
        let _ = (index, total, title);
    }

    /// Called when a paper was processed successfully.
    fn on_paper_complete(&self, index: usize, total: usize, title: &str) {
        let _ = (index, total, title);
    }

    /// Called when a paper was skipped because of an error.
    fn on_paper_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after all papers have been attempted.
    fn on_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PaperProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the config structs.
pub type ProgressCallback = Arc<dyn PaperProgressCallback>;

//! PDF handling for the deck stage.
//!
//! Two libraries split the work:
//!
//! ```text
//! paper.pdf ──▶ objects ──▶ decode ──▶ recover ──▶ extract   (lopdf)
//!           └─▶ preview                                      (pdfium)
//! ```
//!
//! 1. [`objects`] — list the image XObjects each page draws
//! 2. [`decode`]  — turn an image stream into 8-bit samples
//! 3. [`recover`] — apply masks and choose an output encoding
//! 4. [`extract`] — the size/weight/shape filter and the per-document cap
//! 5. [`preview`] — first-page render cropped to the title band

pub mod decode;
pub mod extract;
pub mod objects;
pub mod preview;
pub mod recover;

use crate::error::DeckError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable naming a pdfium library file or its directory.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library.
///
/// Search order: `$PDFIUM_LIB_PATH` (file or directory), the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, DeckError> {
    if let Some(configured) = std::env::var_os(PDFIUM_LIB_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(configured);
        let bound = if path.is_dir() {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&path))
        } else {
            Pdfium::bind_to_library(&path)
        };
        match bound {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", path.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => debug!("{}={} unusable: {}", PDFIUM_LIB_ENV, path.display(), e),
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| DeckError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

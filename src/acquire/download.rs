//! PDF download with a magic-byte check.
//!
//! The bytes are validated as `%PDF` before anything is written, so a rate
//! limit page or an HTML error never ends up as `paper.pdf`.

use crate::error::PaperError;
use std::path::Path;
use tracing::{debug, info};

/// True when `bytes` start with the PDF header.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

fn magic_of(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    magic
}

/// Download `url` to `dest`. Returns the number of bytes written.
pub async fn download_pdf(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    entry_id: &str,
) -> Result<u64, PaperError> {
    info!("Downloading {}", url);
    let failed = |reason: String| PaperError::DownloadFailed {
        entry_id: entry_id.to_string(),
        reason,
    };

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out: {e}"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    if !has_pdf_magic(&bytes) {
        return Err(PaperError::NotAPdf {
            entry_id: entry_id.to_string(),
            magic: magic_of(&bytes),
        });
    }

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| failed(format!("cannot write {}: {e}", dest.display())))?;

    debug!("Saved {} bytes to {}", bytes.len(), dest.display());
    Ok(bytes.len() as u64)
}

//! Deck assembly: records in, one Marp Markdown file out.
//!
//! For each record that passes the keyword filter the deck gets a title
//! slide built from the summary, a slide with the cropped first-page preview,
//! and up to [`DeckConfig::display_images`] slides with extracted figures.
//! Any record-level failure (unreadable record, missing or corrupt PDF) aborts
//! the run; nothing is written in that case.

use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::pdf::bind_pdfium;
use crate::pdf::extract::extract_images;
use crate::pdf::preview::{write_preview, PREVIEW_FILE};
use crate::prompts::{LABEL_METHOD, LABEL_PROBLEM, LABEL_RESULT};
use crate::record::{discover_records, load_record, matches_keywords, LoadedRecord, PaperRecord};
use once_cell::unsync::OnceCell;
use pdfium_render::prelude::Pdfium;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Summary of one deck run.
#[derive(Debug, Clone, Serialize)]
pub struct DeckStats {
    /// Record files found under the records directory.
    pub records_found: usize,
    /// Records that passed the keyword filter.
    pub records_included: usize,
    /// Supporting-image slides written.
    pub image_slides: usize,
    pub output: PathBuf,
    pub duration_ms: u64,
}

/// Width directive that fits a `width`×`height` image into `fill` of the canvas.
///
/// `floor(min(cw·fill / w, ch·fill / h) · w)`
pub fn image_display_width(width: u32, height: u32, canvas: (u32, u32), fill: f64) -> u32 {
    if width == 0 || height == 0 {
        return 0;
    }
    let (w, h) = (width as f64, height as f64);
    let sx = canvas.0 as f64 * fill / w;
    let sy = canvas.1 as f64 * fill / h;
    (sx.min(sy) * w).floor() as u32
}

/// Render every matching record in `config.records_dir` into `config.output`.
///
/// pdfium is bound lazily, so a run in which no record matches never needs
/// the library.
pub fn render_deck(config: &DeckConfig) -> Result<DeckStats, DeckError> {
    let start = Instant::now();
    let paths = discover_records(&config.records_dir)?;

    let mut included = Vec::new();
    for path in &paths {
        let loaded = load_record(path)?;
        if matches_keywords(&loaded.text, &config.keywords) {
            included.push(loaded);
        } else {
            debug!("{}: no keyword match", path.display());
        }
    }
    info!(
        "{} of {} records match {:?}",
        included.len(),
        paths.len(),
        config.keywords
    );

    let total = included.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_start(total);
    }

    let pdfium = OnceCell::new();
    let mut deck = front_matter(config);
    let mut image_slides = 0;

    for (i, loaded) in included.iter().enumerate() {
        let index = i + 1;
        let title = loaded.record.title.as_str();
        if let Some(cb) = cb {
            cb.on_paper_start(index, total, title);
        }
        match render_paper(&mut deck, &pdfium, loaded, config) {
            Ok(shown) => {
                image_slides += shown;
                if let Some(cb) = cb {
                    cb.on_paper_complete(index, total, title);
                }
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_paper_error(index, total, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    write_atomic(&config.output, &deck)?;
    if let Some(cb) = cb {
        cb.on_complete(total, total);
    }

    let stats = DeckStats {
        records_found: paths.len(),
        records_included: total,
        image_slides,
        output: config.output.clone(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Wrote {} ({} papers, {} image slides) in {}ms",
        stats.output.display(),
        stats.records_included,
        stats.image_slides,
        stats.duration_ms
    );
    Ok(stats)
}

/// Append the slides of one paper; returns the number of image slides.
fn render_paper(
    deck: &mut String,
    pdfium: &OnceCell<Pdfium>,
    loaded: &LoadedRecord,
    config: &DeckConfig,
) -> Result<usize, DeckError> {
    let record = &loaded.record;
    let pdf_path = record.pdf_path(&loaded.dir);
    if !pdf_path.exists() {
        return Err(DeckError::PdfNotFound { path: pdf_path });
    }

    deck.push_str(&title_slide(record));

    let engine = pdfium.get_or_try_init(bind_pdfium)?;
    let preview = loaded.dir.join(PREVIEW_FILE);
    write_preview(engine, &pdf_path, &preview, config.preview_zoom)?;
    deck.push_str(&image_slide(
        config.preview_width,
        &slide_path(&loaded.dir, PREVIEW_FILE),
    ));

    let extraction = extract_images(&pdf_path, &loaded.dir, &config.extraction)?;
    let shown: Vec<_> = extraction
        .images
        .iter()
        .take(config.display_images)
        .collect();
    for img in &shown {
        let width = image_display_width(img.width, img.height, config.canvas, config.canvas_fill);
        deck.push_str(&image_slide(width, &slide_path(&loaded.dir, &img.file_name)));
    }
    debug!(
        "{}: {} of {} extracted images shown",
        record.entry_id,
        shown.len(),
        extraction.images.len()
    );
    Ok(shown.len())
}

/// Deck header and cover slide.
pub fn front_matter(config: &DeckConfig) -> String {
    let topic = if config.keywords.is_empty() {
        "Papers".to_string()
    } else {
        config.keywords.join(", ")
    };
    format!(
        "---\nmarp: true\ntheme: default\nsize: 16:9\npaginate: true\n_class: [\"cool-theme\"]\n\n\
         ---\n# {topic} on arXiv\nautomatically generated by {}\n\n",
        config.generator
    )
}

/// Title slide with the summary of `record`. Missing fields render empty.
pub fn title_slide(record: &PaperRecord) -> String {
    let s = &record.summary;
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut out = String::from("---\n<!-- _class: title -->\n");
    let _ = writeln!(out, "# {}", field(&s.title_jp));
    let _ = writeln!(out, "{}", record.title);
    let _ = writeln!(out, "[{}] {} {}", record.year, field(&s.keywords), record.entry_id);
    let _ = writeln!(out, "__{}__ {}", LABEL_PROBLEM, field(&s.problem));
    let _ = writeln!(out, "__{}__ {}", LABEL_METHOD, field(&s.method));
    let _ = writeln!(out, "__{}__ {}", LABEL_RESULT, field(&s.result));
    out.push('\n');
    out
}

fn image_slide(width: u32, path: &str) -> String {
    format!("---\n<!-- _class: info -->\n![width:{width}]({path})\n\n")
}

/// Path of a file in a record directory as written into the deck.
fn slide_path(dir: &Path, file: &str) -> String {
    format!("{}/{}", dir.display(), file)
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), DeckError> {
    let write_err = |source: std::io::Error| DeckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

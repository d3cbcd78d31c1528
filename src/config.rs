//! Configuration types for acquisition, extraction and deck rendering.
//!
//! Each stage is controlled by one struct built via its builder:
//!
//! * [`AcquisitionConfig`] — search, download and summary settings (Stage A).
//!   Passed to [`crate::acquire::Acquirer::new`] at construction; nothing is
//!   read from process-global state afterwards.
//! * [`ExtractionConfig`] — thresholds of the embedded-image filter.
//! * [`DeckConfig`] — record discovery, keyword filter and slide layout (Stage B).
//!
//! Every builder validates in `build()` so that an impossible threshold is
//! reported before any PDF is opened.

use crate::error::DeckError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default arXiv Atom endpoint.
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

// ── Extraction ───────────────────────────────────────────────────────────

/// Thresholds for selecting embedded images worth showing on a slide.
///
/// The defaults suppress logos, icons, rules and banner strips that appear in
/// almost every paper while keeping figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Minimum width in pixels. Default: 400.
    ///
    /// An image is rejected only when it is below *both* `min_width` and
    /// `min_height`; exceeding one dimension is enough to pass.
    pub min_width: u32,

    /// Minimum height in pixels. Default: 400.
    pub min_height: u32,

    /// Encoded images of this many bytes or fewer are rejected. Default: 2048.
    pub min_bytes: usize,

    /// Maximum aspect ratio in either direction. Default: 8.
    pub max_ratio: f64,

    /// Maximum number of images accepted per document. Default: 5.
    pub max_images: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_width: 400,
            min_height: 400,
            min_bytes: 2048,
            max_ratio: 8.0,
            max_images: 5,
        }
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn min_width(mut self, px: u32) -> Self {
        self.config.min_width = px;
        self
    }

    pub fn min_height(mut self, px: u32) -> Self {
        self.config.min_height = px;
        self
    }

    pub fn min_bytes(mut self, n: usize) -> Self {
        self.config.min_bytes = n;
        self
    }

    pub fn max_ratio(mut self, r: f64) -> Self {
        self.config.max_ratio = r;
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n;
        self
    }

    pub fn build(self) -> Result<ExtractionConfig, DeckError> {
        let c = &self.config;
        if !(c.max_ratio >= 1.0) {
            return Err(DeckError::InvalidConfig(format!(
                "max_ratio must be ≥ 1, got {}",
                c.max_ratio
            )));
        }
        if c.max_images == 0 {
            return Err(DeckError::InvalidConfig("max_images must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Deck ─────────────────────────────────────────────────────────────────

/// Configuration for rendering records into a Marp slide deck.
#[derive(Clone)]
pub struct DeckConfig {
    /// Directory holding one sub-directory per paper. Default: `./papers`.
    pub records_dir: PathBuf,

    /// Output Markdown file. Default: `output.md`.
    pub output: PathBuf,

    /// Inclusion keywords, matched case-insensitively against the full record
    /// text. Empty means every record is included.
    pub keywords: Vec<String>,

    /// Supporting-image slides per paper. Default: 3.
    pub display_images: usize,

    /// Zoom factor for the first-page preview render. Default: 2.0.
    pub preview_zoom: f32,

    /// Width directive of the preview slide. Default: 1400.
    pub preview_width: u32,

    /// Slide canvas in pixels. Default: 1600×900 (16:9).
    pub canvas: (u32, u32),

    /// Fraction of the canvas an image may occupy. Default: 0.7.
    pub canvas_fill: f64,

    /// Name shown on the cover slide. Default: "paperdeck".
    pub generator: String,

    /// Image filter thresholds.
    pub extraction: ExtractionConfig,

    /// Optional per-paper progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            records_dir: PathBuf::from("./papers"),
            output: PathBuf::from("output.md"),
            keywords: Vec::new(),
            display_images: 3,
            preview_zoom: 2.0,
            preview_width: 1400,
            canvas: (1600, 900),
            canvas_fill: 0.7,
            generator: "paperdeck".to_string(),
            extraction: ExtractionConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("records_dir", &self.records_dir)
            .field("output", &self.output)
            .field("keywords", &self.keywords)
            .field("display_images", &self.display_images)
            .field("preview_zoom", &self.preview_zoom)
            .field("canvas", &self.canvas)
            .field("canvas_fill", &self.canvas_fill)
            .field("extraction", &self.extraction)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl DeckConfig {
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DeckConfig`].
#[derive(Debug)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    pub fn records_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.records_dir = dir.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();
        self
    }

    pub fn display_images(mut self, n: usize) -> Self {
        self.config.display_images = n;
        self
    }

    pub fn preview_zoom(mut self, zoom: f32) -> Self {
        self.config.preview_zoom = zoom;
        self
    }

    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.config.canvas = (width, height);
        self
    }

    pub fn canvas_fill(mut self, fill: f64) -> Self {
        self.config.canvas_fill = fill;
        self
    }

    pub fn generator(mut self, name: impl Into<String>) -> Self {
        self.config.generator = name.into();
        self
    }

    pub fn extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.config.extraction = extraction;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<DeckConfig, DeckError> {
        let c = &self.config;
        if !(c.preview_zoom > 0.0) {
            return Err(DeckError::InvalidConfig(format!(
                "preview zoom must be positive, got {}",
                c.preview_zoom
            )));
        }
        if c.canvas.0 == 0 || c.canvas.1 == 0 {
            return Err(DeckError::InvalidConfig("canvas must be non-empty".into()));
        }
        if !(c.canvas_fill > 0.0 && c.canvas_fill <= 1.0) {
            return Err(DeckError::InvalidConfig(format!(
                "canvas fill must be in (0, 1], got {}",
                c.canvas_fill
            )));
        }
        Ok(self.config)
    }
}

// ── Acquisition ──────────────────────────────────────────────────────────

/// Configuration for searching, downloading and summarising papers.
#[derive(Clone)]
pub struct AcquisitionConfig {
    /// Destination directory; one sub-directory per paper. Default: `./papers`.
    pub output_dir: PathBuf,

    /// Oldest publication year kept. Default: 2017.
    pub from_year: i32,

    /// Papers to sample from the filtered results; 0 keeps all. Default: 0.
    pub num_papers: usize,

    /// Results requested from the search API. Default: 100.
    pub max_results: usize,

    /// Search endpoint. Default: [`ARXIV_API_URL`].
    pub search_url: String,

    /// Seed for the random sample. `None` draws from entropy.
    pub seed: Option<u64>,

    /// LLM model identifier. If None, `gpt-4.1-nano`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the summary. Default: 0.25.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per summary. Default: 1024.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed LLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Summary prompt template. If None, [`crate::prompts::SUMMARY_PROMPT`].
    pub system_prompt: Option<String>,

    /// Reject papers whose summary lacks a field instead of flagging them. Default: false.
    pub require_complete_summary: bool,

    /// HTTP timeout for search and PDF download in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-paper progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./papers"),
            from_year: 2017,
            num_papers: 0,
            max_results: 100,
            search_url: ARXIV_API_URL.to_string(),
            seed: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.25,
            max_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            require_complete_summary: false,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AcquisitionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionConfig")
            .field("output_dir", &self.output_dir)
            .field("from_year", &self.from_year)
            .field("num_papers", &self.num_papers)
            .field("max_results", &self.max_results)
            .field("search_url", &self.search_url)
            .field("seed", &self.seed)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("require_complete_summary", &self.require_complete_summary)
            .finish()
    }
}

impl AcquisitionConfig {
    pub fn builder() -> AcquisitionConfigBuilder {
        AcquisitionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AcquisitionConfig`].
#[derive(Debug)]
pub struct AcquisitionConfigBuilder {
    config: AcquisitionConfig,
}

impl AcquisitionConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn from_year(mut self, year: i32) -> Self {
        self.config.from_year = year;
        self
    }

    pub fn num_papers(mut self, n: usize) -> Self {
        self.config.num_papers = n;
        self
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.config.max_results = n;
        self
    }

    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.config.search_url = url.into();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn require_complete_summary(mut self, v: bool) -> Self {
        self.config.require_complete_summary = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AcquisitionConfig, DeckError> {
        let c = &self.config;
        if c.max_results == 0 {
            return Err(DeckError::InvalidConfig("max_results must be ≥ 1".into()));
        }
        if c.search_url.is_empty() {
            return Err(DeckError::InvalidConfig("search URL is empty".into()));
        }
        Ok(self.config)
    }
}

//! CLI binary for paperdeck.
//!
//! A thin shim over the library crate: `fetch` maps flags to
//! `AcquisitionConfig`, `render` maps flags to `DeckConfig`, and both print a
//! short summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paperdeck::{
    acquire, render_deck, AcquisitionConfig, DeckConfig, ExtractionConfig, PaperProgressCallback,
    ProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders a progress bar with one log line per paper.
struct CliProgressCallback {
    bar: ProgressBar,
    verb: &'static str,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(verb: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(format!("{verb}…"));
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            verb,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Papers reported through `on_paper_error` so far.
    fn skipped(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Cut `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

impl PaperProgressCallback for CliProgressCallback {
    fn on_start(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} papers  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(self.verb);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{} {total} papers…", self.verb))
        ));
    }

    fn on_paper_start(&self, index: usize, _total: usize, title: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(truncate(title, 48));
    }

    fn on_paper_complete(&self, index: usize, total: usize, title: &str) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            truncate(title, 60),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_paper_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_complete(&self, total: usize, success_count: usize) {
        let failed = self.skipped();
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} papers done",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} papers done  ({} skipped)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Fetch 5 random recent papers on a topic into ./papers
  paperdeck fetch surface code -n 5

  # Reproducible sample, papers from 2020 on, a specific model
  paperdeck fetch graph neural network -n 10 --seed 42 --year 2020 --model gpt-4.1-mini

  # Build a deck from every record
  paperdeck render -o output.md

  # Only records mentioning "quantum" (case-insensitive)
  paperdeck render quantum -o quantum.md

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for page previews
  RUST_LOG                Log filter, overrides -v / -q

Every flag also reads a PAPERDECK_* variable (see --help for each flag).
"#;

/// Turn arXiv search results into a Marp slide deck.
#[derive(Parser, Debug)]
#[command(
    name = "paperdeck",
    version,
    about = "Fetch and summarise arXiv papers, then build a Marp slide deck",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPERDECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPERDECK_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PAPERDECK_NO_PROGRESS")]
    no_progress: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, global = true, env = "PAPERDECK_JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search arXiv, download PDFs and write summarised records.
    Fetch(FetchArgs),
    /// Build a Marp deck from the records.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Query words; searched as one phrase.
    #[arg(required = true, num_args = 1..)]
    words: Vec<String>,

    /// Directory for paper records.
    #[arg(short, long, env = "PAPERDECK_DIR", default_value = "./papers")]
    dir: PathBuf,

    /// Oldest publication year to keep.
    #[arg(short, long, env = "PAPERDECK_FROM_YEAR", default_value_t = 2017)]
    year: i32,

    /// Papers to sample from the results (0 = all).
    #[arg(short, long, env = "PAPERDECK_NUM_PAPERS", default_value_t = 0)]
    num: usize,

    /// Results requested from the search API.
    #[arg(long, env = "PAPERDECK_MAX_RESULTS", default_value_t = 100)]
    max_results: usize,

    /// Seed for a reproducible sample.
    #[arg(long, env = "PAPERDECK_SEED")]
    seed: Option<u64>,

    /// Search endpoint.
    #[arg(long, env = "PAPERDECK_SEARCH_URL", default_value = paperdeck::config::ARXIV_API_URL)]
    search_url: String,

    /// LLM model ID (default gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PAPERDECK_TEMPERATURE", default_value_t = 0.25)]
    temperature: f32,

    /// Max LLM output tokens per summary.
    #[arg(long, env = "PAPERDECK_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per paper on LLM failure.
    #[arg(long, env = "PAPERDECK_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Path to a text file with a custom summary prompt.
    #[arg(long, env = "PAPERDECK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Skip papers whose summary lacks a field.
    #[arg(long, env = "PAPERDECK_STRICT")]
    strict: bool,

    /// HTTP timeout in seconds.
    #[arg(long, env = "PAPERDECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Include only records containing any of these words (case-insensitive).
    keywords: Vec<String>,

    /// Directory holding the paper records.
    #[arg(short, long, env = "PAPERDECK_DIR", default_value = "./papers")]
    dir: PathBuf,

    /// Output Markdown file.
    #[arg(short, long, env = "PAPERDECK_OUTPUT", default_value = "output.md")]
    output: PathBuf,

    /// Figure slides per paper.
    #[arg(long, env = "PAPERDECK_IMAGES", default_value_t = 3)]
    images: usize,

    /// Figures extracted per paper.
    #[arg(long, env = "PAPERDECK_MAX_IMAGES", default_value_t = 5)]
    max_images: usize,

    /// Minimum figure width in pixels.
    #[arg(long, env = "PAPERDECK_MIN_WIDTH", default_value_t = 400)]
    min_width: u32,

    /// Minimum figure height in pixels.
    #[arg(long, env = "PAPERDECK_MIN_HEIGHT", default_value_t = 400)]
    min_height: u32,

    /// Figures of this many bytes or fewer are skipped.
    #[arg(long, env = "PAPERDECK_MIN_BYTES", default_value_t = 2048)]
    min_bytes: usize,

    /// Maximum aspect ratio of a figure.
    #[arg(long, env = "PAPERDECK_MAX_RATIO", default_value_t = 8.0)]
    max_ratio: f64,

    /// Zoom of the first-page preview.
    #[arg(long, env = "PAPERDECK_ZOOM", default_value_t = 2.0)]
    zoom: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Fetch(args) => run_fetch(&cli, args, show_progress).await,
        Command::Render(args) => run_render(&cli, args, show_progress).await,
    }
}

async fn run_fetch(cli: &Cli, args: &FetchArgs, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = show_progress
        .then(|| CliProgressCallback::new("Fetching") as Arc<dyn PaperProgressCallback>);
    let config = build_acquisition_config(args, progress).await?;

    let report = acquire(&args.words, config)
        .await
        .context("Acquisition failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} papers  {}ms  →  {}",
            if report.failed.is_empty() { green("✔") } else { cyan("⚠") },
            report.saved.len(),
            report.candidates,
            report.duration_ms,
            bold(&args.dir.display().to_string()),
        );
        for failure in &report.failed {
            eprintln!("   {}", dim(&failure.to_string()));
        }
    }
    Ok(())
}

async fn run_render(cli: &Cli, args: &RenderArgs, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = show_progress
        .then(|| CliProgressCallback::new("Rendering") as Arc<dyn PaperProgressCallback>);
    let config = build_deck_config(args, progress)?;

    // lopdf and pdfium are blocking
    let stats = tokio::task::spawn_blocking(move || render_deck(&config))
        .await
        .context("Render task panicked")?
        .context("Rendering failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} records  {} figure slides  {}ms  →  {}",
            green("✔"),
            stats.records_included,
            stats.records_found,
            stats.image_slides,
            stats.duration_ms,
            bold(&stats.output.display().to_string()),
        );
    }
    Ok(())
}

/// Map `fetch` args to `AcquisitionConfig`.
async fn build_acquisition_config(
    args: &FetchArgs,
    progress: Option<ProgressCallback>,
) -> Result<AcquisitionConfig> {
    let mut builder = AcquisitionConfig::builder()
        .output_dir(&args.dir)
        .from_year(args.year)
        .num_papers(args.num)
        .max_results(args.max_results)
        .search_url(&args.search_url)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_retries(args.max_retries)
        .require_complete_summary(args.strict)
        .download_timeout_secs(args.download_timeout);

    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map `render` args to `DeckConfig`.
fn build_deck_config(args: &RenderArgs, progress: Option<ProgressCallback>) -> Result<DeckConfig> {
    let extraction = ExtractionConfig::builder()
        .min_width(args.min_width)
        .min_height(args.min_height)
        .min_bytes(args.min_bytes)
        .max_ratio(args.max_ratio)
        .max_images(args.max_images)
        .build()
        .context("Invalid extraction settings")?;

    let mut builder = DeckConfig::builder()
        .records_dir(&args.dir)
        .output(&args.output)
        .keywords(args.keywords.iter().cloned())
        .display_images(args.images)
        .preview_zoom(args.zoom)
        .extraction(extraction);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_names_the_stage() {
        let cb = CliProgressCallback::new("Rendering");
        assert_eq!(cb.bar.message(), "Rendering…");
        cb.bar.finish_and_clear();
    }

    #[test]
    fn skipped_count_tracks_reported_errors() {
        let cb = CliProgressCallback::new("Fetching");
        cb.on_start(3);
        cb.on_paper_start(1, 3, "a");
        cb.on_paper_error(1, 3, "download failed");
        cb.on_paper_start(2, 3, "b");
        cb.on_paper_complete(2, 3, "b");
        cb.on_paper_start(3, 3, "c");
        cb.on_paper_error(3, 3, "summary failed");
        assert_eq!(cb.skipped(), 2);
        cb.on_complete(3, 1);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("量子誤り訂正", 4), "量子誤…");
        assert_eq!(truncate("short", 10), "short");
    }
}

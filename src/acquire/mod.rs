//! Acquisition: search, download and summarise papers into records.
//!
//! ## Data Flow
//!
//! ```text
//! words ──▶ search ──▶ year filter ──▶ sample ──▶ per paper:
//!                                                 download ──▶ summarize ──▶ record
//! ```
//!
//! Papers are processed one after another. A paper that fails at any step
//! is logged, reported in [`AcquisitionReport::failed`] and skipped; only a
//! failed or empty search aborts the run.

pub mod download;
pub mod search;
pub mod summarize;

use crate::config::AcquisitionConfig;
use crate::error::{DeckError, PaperError};
use crate::record::PDF_FILE;
use edgequake_llm::{LLMProvider, ProviderFactory};
use search::SearchResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default model when only a provider name is given.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Outcome of an acquisition run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AcquisitionReport {
    pub query: String,
    /// Entries left after the year filter and sampling.
    pub candidates: usize,
    /// Record files written.
    pub saved: Vec<PathBuf>,
    /// Papers that were skipped.
    pub failed: Vec<PaperError>,
    pub duration_ms: u64,
}

/// Holds the HTTP client and LLM provider for a run.
pub struct Acquirer {
    config: AcquisitionConfig,
    client: reqwest::Client,
    provider: Arc<dyn LLMProvider>,
}

impl Acquirer {
    /// Resolve the LLM provider and build the HTTP client.
    pub fn new(config: AcquisitionConfig) -> Result<Self, DeckError> {
        let provider = resolve_provider(&config)?;
        Self::with_provider(config, provider)
    }

    /// Use an explicit provider regardless of the config.
    pub fn with_provider(
        config: AcquisitionConfig,
        provider: Arc<dyn LLMProvider>,
    ) -> Result<Self, DeckError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(concat!("paperdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeckError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            provider,
        })
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Search, filter by year and sample. Empty results are an error.
    pub async fn find_papers(&self, query: &str) -> Result<Vec<SearchResult>, DeckError> {
        let results = search::search(&self.client, &self.config, query).await?;
        let total = results.len();
        let recent = search::filter_by_year(results, self.config.from_year);
        if recent.is_empty() {
            return Err(DeckError::NoSearchResults {
                query: query.to_string(),
                from_year: self.config.from_year,
            });
        }
        let picked = search::sample(recent, self.config.num_papers, self.config.seed);
        info!(
            "{} results, {} kept for year ≥ {}",
            total,
            picked.len(),
            self.config.from_year
        );
        Ok(picked)
    }

    /// Download and summarise one paper, then write its record.
    pub async fn acquire_paper(
        &self,
        paper: &SearchResult,
        query: &str,
    ) -> Result<PathBuf, PaperError> {
        let entry_id = paper.entry_id.as_str();
        let write_failed = |detail: String| PaperError::RecordWriteFailed {
            entry_id: entry_id.to_string(),
            detail,
        };

        let dir = self.config.output_dir.join(paper.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| write_failed(format!("cannot create {}: {e}", dir.display())))?;

        download::download_pdf(
            &self.client,
            &paper.pdf_download_url(),
            &dir.join(PDF_FILE),
            entry_id,
        )
        .await?;

        self.summarize_and_record(paper, query, &dir).await
    }

    /// Summarise `paper` and write its record into `dir`.
    pub async fn summarize_and_record(
        &self,
        paper: &SearchResult,
        query: &str,
        dir: &Path,
    ) -> Result<PathBuf, PaperError> {
        let entry_id = paper.entry_id.as_str();
        let summary = summarize::summarize(
            &self.provider,
            entry_id,
            &paper.title,
            &paper.abstract_text,
            &self.config,
        )
        .await?;

        let missing = summary.missing();
        if !missing.is_empty() {
            if self.config.require_complete_summary {
                return Err(PaperError::IncompleteSummary {
                    entry_id: entry_id.to_string(),
                    missing: missing.iter().map(|s| s.to_string()).collect(),
                });
            }
            warn!("{}: summary lacks {}", entry_id, missing.join(", "));
        }

        paper
            .to_record(summary, query)
            .save(dir)
            .map_err(|e| PaperError::RecordWriteFailed {
                entry_id: entry_id.to_string(),
                detail: e.to_string(),
            })
    }

    /// Full run for `words`.
    pub async fn run(&self, words: &[String]) -> Result<AcquisitionReport, DeckError> {
        let query = search::build_query(words);
        let papers = self.find_papers(&query).await?;
        Ok(self.acquire_all(&papers, &query).await)
    }

    /// Acquire `papers` one after another. Failures are logged and reported,
    /// never propagated.
    pub async fn acquire_all(&self, papers: &[SearchResult], query: &str) -> AcquisitionReport {
        let start = Instant::now();
        let total = papers.len();
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_start(total);
        }

        let mut report = AcquisitionReport {
            query: query.to_string(),
            candidates: total,
            ..Default::default()
        };

        for (i, paper) in papers.iter().enumerate() {
            let index = i + 1;
            if let Some(cb) = cb {
                cb.on_paper_start(index, total, &paper.title);
            }
            match self.acquire_paper(paper, query).await {
                Ok(path) => {
                    info!("[{}/{}] {}", index, total, paper.title);
                    report.saved.push(path);
                    if let Some(cb) = cb {
                        cb.on_paper_complete(index, total, &paper.title);
                    }
                }
                Err(e) => {
                    warn!("[{}/{}] skipped: {}", index, total, e);
                    if let Some(cb) = cb {
                        cb.on_paper_error(index, total, &e.to_string());
                    }
                    report.failed.push(e);
                }
            }
        }

        if let Some(cb) = cb {
            cb.on_complete(total, report.saved.len());
        }
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Saved {}/{} papers in {}ms",
            report.saved.len(),
            total,
            report.duration_ms
        );
        report
    }
}

/// Build an [`Acquirer`] from `config` and run it for `words`.
pub async fn acquire(
    words: &[String],
    config: AcquisitionConfig,
) -> Result<AcquisitionReport, DeckError> {
    Acquirer::new(config)?.run(words).await
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DeckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DeckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. a pre-built provider in the config;
/// 2. `provider_name` plus `model`;
/// 3. `EDGEQUAKE_LLM_PROVIDER` together with `EDGEQUAKE_MODEL`;
/// 4. OpenAI when `OPENAI_API_KEY` is set;
/// 5. whatever [`ProviderFactory::from_env`] detects.
pub fn resolve_provider(config: &AcquisitionConfig) -> Result<Arc<dyn LLMProvider>, DeckError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::PaperProgressCallback;
    use crate::record::{load_record, RECORD_FILE};
    use edgequake_llm::MockProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn paper(id: &str, pdf_url: &str) -> SearchResult {
        SearchResult {
            entry_id: format!("http://arxiv.org/abs/{id}"),
            title: format!("Paper {id}"),
            abstract_text: "We study things.".into(),
            authors: vec!["A. Author".into()],
            published: None,
            categories: vec!["quant-ph".into()],
            pdf_url: Some(pdf_url.into()),
            doi: None,
        }
    }

    fn acquirer(dir: &Path, strict: bool, mock: MockProvider) -> Acquirer {
        let config = AcquisitionConfig::builder()
            .output_dir(dir)
            .max_retries(0)
            .retry_backoff_ms(0)
            .download_timeout_secs(5)
            .require_complete_summary(strict)
            .build()
            .unwrap();
        Acquirer::with_provider(config, Arc::new(mock)).unwrap()
    }

    #[tokio::test]
    async fn strict_mode_rejects_incomplete_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockProvider::new();
        mock.add_response("論文名: T\n課題: P").await;
        let acq = acquirer(tmp.path(), true, mock);

        let err = acq
            .summarize_and_record(&paper("2301.00001v1", "unused"), "q", tmp.path())
            .await
            .unwrap_err();

        match err {
            PaperError::IncompleteSummary { entry_id, missing } => {
                assert_eq!(entry_id, "http://arxiv.org/abs/2301.00001v1");
                assert_eq!(missing, vec!["キーワード", "手法", "結果"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!tmp.path().join(RECORD_FILE).exists());
    }

    #[tokio::test]
    async fn lenient_mode_keeps_missing_fields_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockProvider::new();
        mock.add_response("論文名: T\n課題: P").await;
        let acq = acquirer(tmp.path(), false, mock);

        let path = acq
            .summarize_and_record(&paper("2301.00001v1", "unused"), "all:\"q\"", tmp.path())
            .await
            .unwrap();

        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded.record.summary.title_jp.as_deref(), Some("T"));
        assert_eq!(loaded.record.summary.method, None);
        assert_eq!(loaded.record.query.as_deref(), Some("all:\"q\""));
        assert_eq!(loaded.record.primary_category.as_deref(), Some("quant-ph"));
    }

    #[derive(Default)]
    struct Counter {
        started: AtomicUsize,
        failed: AtomicUsize,
    }

    impl PaperProgressCallback for Counter {
        fn on_paper_start(&self, _index: usize, _total: usize, _title: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_paper_error(&self, _index: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn failed_paper_is_skipped_and_run_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let counter = Arc::new(Counter::default());
        let config = AcquisitionConfig::builder()
            .output_dir(tmp.path())
            .download_timeout_secs(5)
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let acq = Acquirer::with_provider(config, Arc::new(MockProvider::new())).unwrap();

        // nothing listens on the discard port
        let papers = [
            paper("2301.00001v1", "http://127.0.0.1:9/a.pdf"),
            paper("2301.00002v1", "http://127.0.0.1:9/b.pdf"),
        ];
        let report = acq.acquire_all(&papers, "q").await;

        assert_eq!(report.candidates, 2);
        assert!(report.saved.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report
            .failed
            .iter()
            .all(|e| matches!(e, PaperError::DownloadFailed { .. })));
        assert_eq!(counter.started.load(Ordering::SeqCst), 2);
        assert_eq!(counter.failed.load(Ordering::SeqCst), 2);
    }
}

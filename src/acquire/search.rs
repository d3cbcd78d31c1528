//! arXiv search: build the query, fetch the Atom feed, parse and sample it.

use crate::config::AcquisitionConfig;
use crate::error::DeckError;
use crate::record::{PaperRecord, Summary, PDF_FILE};
use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;
use tracing::{debug, info};

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_UNSAFE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// One entry of the search feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Feed id, e.g. `http://arxiv.org/abs/2301.00001v1`.
    pub entry_id: String,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub pdf_url: Option<String>,
    pub doi: Option<String>,
}

impl SearchResult {
    pub fn year(&self) -> Option<i32> {
        self.published.map(|d| d.year())
    }

    /// Directory name for this paper: scheme dropped, `/` and anything
    /// else unsafe in a path mapped to `-`.
    pub fn dir_name(&self) -> String {
        let id = self
            .entry_id
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        RE_UNSAFE_PATH.replace_all(id, "-").into_owned()
    }

    /// PDF link from the feed, or derived from the abstract URL.
    pub fn pdf_download_url(&self) -> String {
        match &self.pdf_url {
            Some(url) => url.clone(),
            None => self.entry_id.replacen("/abs/", "/pdf/", 1),
        }
    }

    /// Record for this entry with the given summary.
    pub fn to_record(&self, summary: Summary, query: &str) -> PaperRecord {
        let year = self.year().map(|y| y.to_string()).unwrap_or_default();
        let mut record = PaperRecord::new(&self.title, year, &self.entry_id);
        record.pdf = PDF_FILE.to_string();
        record.summary = summary;
        record.date = self
            .published
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string());
        record.authors = self.authors.clone();
        record.primary_category = self.categories.first().cloned();
        record.categories = self.categories.clone();
        record.pdf_url = Some(self.pdf_download_url());
        record.doi = self.doi.clone();
        record.abstract_text = Some(self.abstract_text.clone());
        record.query = Some(query.to_string());
        record
    }
}

/// `all:"<words>"`
pub fn build_query(words: &[String]) -> String {
    let phrase = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("all:\"{phrase}\"")
}

fn normalise_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Parse an Atom feed into search results.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<SearchResult>, DeckError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| DeckError::SearchFailed {
        reason: format!("failed to parse Atom feed: {e}"),
    })?;

    let results = feed
        .entries
        .into_iter()
        .map(|entry| {
            let pdf_url = entry
                .links
                .iter()
                .find(|l| {
                    l.title.as_deref() == Some("pdf")
                        || l.media_type.as_deref() == Some("application/pdf")
                })
                .map(|l| l.href.clone());
            let doi = entry
                .links
                .iter()
                .find(|l| l.title.as_deref() == Some("doi"))
                .map(|l| doi_from_link(&l.href));

            SearchResult {
                entry_id: entry.id,
                title: entry
                    .title
                    .map(|t| normalise_whitespace(&t.content))
                    .unwrap_or_default(),
                abstract_text: entry
                    .summary
                    .map(|s| normalise_whitespace(&s.content))
                    .unwrap_or_default(),
                authors: entry.authors.into_iter().map(|a| a.name).collect(),
                published: entry.published.or(entry.updated),
                categories: entry.categories.into_iter().map(|c| c.term).collect(),
                pdf_url,
                doi,
            }
        })
        .collect();
    Ok(results)
}

fn doi_from_link(href: &str) -> String {
    ["https://doi.org/", "http://dx.doi.org/", "https://dx.doi.org/", "http://doi.org/"]
        .iter()
        .find_map(|prefix| href.strip_prefix(prefix))
        .unwrap_or(href)
        .to_string()
}

/// Entries published in or after `from_year`. Undated entries are dropped.
pub fn filter_by_year(results: Vec<SearchResult>, from_year: i32) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| r.year().is_some_and(|y| y >= from_year))
        .collect()
}

/// Up to `n` entries drawn at random; `n == 0` or `n >= len` keeps all.
///
/// Sampled entries keep their feed order.
pub fn sample(results: Vec<SearchResult>, n: usize, seed: Option<u64>) -> Vec<SearchResult> {
    if n == 0 || n >= results.len() {
        return results;
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let indices: Vec<usize> = (0..results.len()).collect();
    let mut picked: Vec<usize> = indices.choose_multiple(&mut rng, n).copied().collect();
    picked.sort_unstable();

    let mut picked = picked.into_iter().peekable();
    results
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| {
            if picked.peek() == Some(&i) {
                picked.next();
                Some(r)
            } else {
                None
            }
        })
        .collect()
}

/// Query the search endpoint for `query`, newest submissions first.
pub async fn search(
    client: &reqwest::Client,
    config: &AcquisitionConfig,
    query: &str,
) -> Result<Vec<SearchResult>, DeckError> {
    info!("Searching {} for {}", config.search_url, query);
    let max_results = config.max_results.to_string();

    let response = client
        .get(&config.search_url)
        .query(&[
            ("search_query", query),
            ("sortBy", "submittedDate"),
            ("sortOrder", "descending"),
            ("start", "0"),
            ("max_results", max_results.as_str()),
        ])
        .send()
        .await
        .map_err(|e| DeckError::SearchFailed {
            reason: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(DeckError::SearchFailed {
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| DeckError::SearchFailed {
        reason: e.to_string(),
    })?;
    let results = parse_feed(&bytes)?;
    debug!("Feed returned {} entries", results.len());
    Ok(results)
}

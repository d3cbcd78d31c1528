//! LLM summary of a paper abstract.
//!
//! ## Retry Strategy
//!
//! Rate limits and 5xx replies are common when summarising a whole result
//! page in a row. Failed calls are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with the defaults that is
//! 500 ms → 1 s → 2 s before the paper is given up.

use crate::config::AcquisitionConfig;
use crate::error::PaperError;
use crate::prompts::{
    summary_user_message, LABEL_KEYWORDS, LABEL_METHOD, LABEL_PROBLEM, LABEL_RESULT,
    LABEL_TITLE_JP, SUMMARY_PROMPT,
};
use crate::record::Summary;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Ask the provider for a summary of `title` / `abstract_text`.
///
/// Returns the parsed summary; fields the reply lacks are `None`.
pub async fn summarize(
    provider: &Arc<dyn LLMProvider>,
    entry_id: &str,
    title: &str,
    abstract_text: &str,
    config: &AcquisitionConfig,
) -> Result<Summary, PaperError> {
    let start = Instant::now();
    let system_prompt = config.system_prompt.as_deref().unwrap_or(SUMMARY_PROMPT);
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(summary_user_message(title, abstract_text)),
    ];
    let options = build_options(config);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                entry_id, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    entry_id,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(parse_summary(&response.content));
            }
            Err(e) => {
                let err_msg = e.to_string();
                warn!("{}: attempt {} failed: {}", entry_id, attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(PaperError::SummaryFailed {
        entry_id: entry_id.to_string(),
        retries: config.max_retries,
        detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Read the labelled lines of a summary reply.
///
/// A line belongs to a field when it starts with the field's label; the
/// label, a following `:` or `：`, and surrounding whitespace are removed.
/// Later lines override earlier ones. Empty values count as missing.
pub fn parse_summary(reply: &str) -> Summary {
    let mut summary = Summary::default();
    for line in reply.lines() {
        let line = line.trim_start();
        let slot = [
            (LABEL_TITLE_JP, &mut summary.title_jp),
            (LABEL_KEYWORDS, &mut summary.keywords),
            (LABEL_PROBLEM, &mut summary.problem),
            (LABEL_METHOD, &mut summary.method),
            (LABEL_RESULT, &mut summary.result),
        ]
        .into_iter()
        .find_map(|(label, slot)| line.strip_prefix(label).map(|rest| (rest, slot)));

        if let Some((rest, slot)) = slot {
            let value = rest
                .trim_start_matches(|c: char| c == ':' || c == '：' || c.is_whitespace())
                .trim_end();
            *slot = (!value.is_empty()).then(|| value.to_string());
        }
    }
    summary
}

fn build_options(config: &AcquisitionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

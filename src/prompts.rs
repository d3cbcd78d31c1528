//! Prompt template and field labels for the paper summary.
//!
//! The summary is requested in Japanese with five labelled lines. The same
//! labels are used by [`crate::acquire::summarize::parse_summary`] to read
//! the reply back and by [`crate::deck`] to caption the title slide, so all
//! of them live here.
//!
//! Callers can override the template via
//! [`crate::config::AcquisitionConfig::system_prompt`]; a custom template must
//! keep the labels or the corresponding fields will come back empty.

/// Label of the translated title line.
pub const LABEL_TITLE_JP: &str = "論文名";
/// Label of the keywords line.
pub const LABEL_KEYWORDS: &str = "キーワード";
/// Label of the problem line.
pub const LABEL_PROBLEM: &str = "課題";
/// Label of the method line.
pub const LABEL_METHOD: &str = "手法";
/// Label of the result line.
pub const LABEL_RESULT: &str = "結果";

/// Default system prompt for summarising a paper.
pub const SUMMARY_PROMPT: &str = r#"与えられた論文の要点をまとめ、以下の項目で日本語で出力せよ。それぞれの項目は最大でも180文字以内に要約せよ。
```
論文名:タイトルの日本語訳
キーワード:この論文のキーワード
課題:この論文が解決する課題
手法:この論文が提案する手法
結果:提案手法によって得られた結果
```"#;

/// Build the user message carrying the paper to summarise.
pub fn summary_user_message(title: &str, abstract_text: &str) -> String {
    format!("title: {title}\nbody: {abstract_text}")
}

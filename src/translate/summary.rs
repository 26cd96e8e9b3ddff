//! Article summaries.
//!
//! A [`Summarizer`] downloads the linked page, reduces it to plain text and
//! asks the model for a short bullet list in the target language.

use crate::feed::{read_limited_bytes, FetchError};
use crate::translate::TranslateError;
use crate::util::strip_control_chars;
use futures::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;

pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ARTICLE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const TEXT_WIDTH: usize = 100;

/// Upper bound on article text sent to the model, in chars.
pub const MAX_ARTICLE_CHARS: usize = 40_000;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Could not fetch article: {0}")]
    Article(#[from] FetchError),
    #[error("Could not read article: {0}")]
    Extract(String),
    #[error("Article has no readable text")]
    EmptyArticle,
    #[error(transparent)]
    Service(#[from] TranslateError),
}

/// An article summarization backend.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(
        &'a self,
        url: &'a str,
        target_language: &'a str,
    ) -> BoxFuture<'a, Result<String, SummarizeError>>;
}

/// Download `url` and return its readable text.
///
/// The whole exchange, body included, must finish within [`ARTICLE_TIMEOUT`].
pub(crate) async fn fetch_article_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, SummarizeError> {
    let download = async {
        let response = client.get(url).send().await.map_err(FetchError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        read_limited_bytes(response, MAX_ARTICLE_SIZE).await
    };

    let bytes = tokio::time::timeout(ARTICLE_TIMEOUT, download)
        .await
        .map_err(|_| FetchError::Timeout)??;

    article_text(&bytes)
}

/// Plain text of an HTML page, blank runs collapsed and capped at
/// [`MAX_ARTICLE_CHARS`].
pub(crate) fn article_text(html: &[u8]) -> Result<String, SummarizeError> {
    let rendered = html2text::from_read(html, TEXT_WIDTH)
        .map_err(|e| SummarizeError::Extract(e.to_string()))?;

    let mut text = String::new();
    let mut blank = true;
    for line in rendered.lines() {
        let line = strip_control_chars(line);
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !blank {
                text.push('\n');
            }
            blank = true;
            continue;
        }
        text.push_str(line);
        text.push('\n');
        blank = false;
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(SummarizeError::EmptyArticle);
    }
    Ok(text.chars().take(MAX_ARTICLE_CHARS).collect())
}

pub(crate) fn summary_prompt(article: &str, target_language: &str) -> String {
    format!(
        "Summarize the following article in {lang} as 3 to 5 short bullet points. \
         Each bullet starts with \"- \". Respond with ONLY the bullet points in {lang}, \
         no title or closing remarks.\n\n{article}",
        lang = target_language,
        article = article
    )
}

/// Control characters stripped per line, surrounding blank lines dropped.
pub fn clean_summary(raw: &str) -> String {
    raw.lines()
        .map(|line| strip_control_chars(line).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

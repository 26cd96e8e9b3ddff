use super::summary::{clean_summary, fetch_article_text, summary_prompt};
use super::{SummarizeError, Summarizer, TranslateError, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// A title or a few bullet points; anything bigger is not an answer.
const MAX_RESPONSE_SIZE: usize = 256 * 1024;

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini `generateContent` client.
///
/// Translates one title per request and summarizes linked articles.
pub struct GeminiTranslator {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for GeminiTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTranslator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiTranslator {
    /// Build a client for `base_url` (defaults to the public endpoint).
    ///
    /// The API key travels in a header, so a non-HTTPS base URL is refused
    /// unless it points at localhost.
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        base_url: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self, TranslateError> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');

        if !base.starts_with("https://") {
            let is_localhost =
                base.starts_with("http://127.0.0.1") || base.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(TranslateError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base, "Using non-HTTPS Gemini base URL (localhost only)");
        }

        if api_key.expose_secret().trim().is_empty() {
            return Err(TranslateError::MissingApiKey);
        }

        Ok(Self {
            client,
            api_key,
            base_url: base.to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn translate_title(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslateError> {
        let prompt = format!(
            "Translate the following news headline into {}. \
             Respond with ONLY the translated headline, no quotes or explanations.\n\n{}",
            target_language, text
        );
        let answer = self.generate(&prompt, 0.0).await?;
        let answer = strip_wrapping(&answer);
        if answer.is_empty() {
            return Err(TranslateError::InvalidResponse("no text in response".into()));
        }
        Ok(answer.to_string())
    }

    async fn summarize_article(
        &self,
        url: &str,
        target_language: &str,
    ) -> Result<String, SummarizeError> {
        let article = fetch_article_text(&self.client, url).await?;
        let answer = self
            .generate(&summary_prompt(&article, target_language), 0.2)
            .await?;
        let summary = clean_summary(&answer);
        if summary.is_empty() {
            return Err(TranslateError::InvalidResponse("empty summary".into()).into());
        }
        Ok(summary)
    }

    /// First text part of the first candidate for `prompt`.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, TranslateError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": temperature }
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::HttpStatus(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_RESPONSE_SIZE as u64)
        {
            return Err(TranslateError::InvalidResponse("response too large".into()));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_RESPONSE_SIZE {
            return Err(TranslateError::InvalidResponse("response too large".into()));
        }
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| TranslateError::InvalidResponse("no text in response".into()))
    }
}

/// Models sometimes wrap the answer in quotes or a code fence.
fn strip_wrapping(s: &str) -> &str {
    let s = s.trim();
    let s = s
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
        .map(|inner| inner.trim_start_matches("text").trim())
        .unwrap_or(s);
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
        .trim()
}

impl Translator for GeminiTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_language: &'a str,
    ) -> BoxFuture<'a, Result<String, TranslateError>> {
        self.translate_title(text, target_language).boxed()
    }
}

impl Summarizer for GeminiTranslator {
    fn summarize<'a>(
        &'a self,
        url: &'a str,
        target_language: &'a str,
    ) -> BoxFuture<'a, Result<String, SummarizeError>> {
        self.summarize_article(url, target_language).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator(base: &str) -> GeminiTranslator {
        GeminiTranslator::new(
            reqwest::Client::new(),
            SecretString::from("test-key".to_string()),
            Some(base),
            None,
        )
        .unwrap()
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        })
    }

    #[tokio::test]
    async fn test_translate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_string_contains("Korean"))
            .and(body_string_contains("Rust 2024 released"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("러스트 2024 출시\n")))
            .expect(1)
            .mount(&server)
            .await;

        let result = translator(&server.uri())
            .translate("Rust 2024 released", "Korean")
            .await
            .unwrap();
        assert_eq!(result, "러스트 2024 출시");
    }

    #[tokio::test]
    async fn test_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = translator(&server.uri())
            .translate("x", "Korean")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::HttpStatus(429)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_candidates_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = translator(&server.uri())
            .translate("x", "Korean")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_summarize_fetches_article_then_asks_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/edition"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><article><p>The 2024 edition is now stable.</p></article></body></html>",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
            .and(body_string_contains("bullet points"))
            .and(body_string_contains("The 2024 edition is now stable."))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(reply("- 2024 에디션 안정화\n- 업그레이드 권장\n")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/posts/edition", server.uri());
        let summary = translator(&server.uri())
            .summarize(&url, "Korean")
            .await
            .unwrap();
        assert_eq!(summary, "- 2024 에디션 안정화\n- 업그레이드 권장");
    }

    #[tokio::test]
    async fn test_summarize_article_error_skips_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("- unused")))
            .expect(0)
            .mount(&server)
            .await;

        let url = format!("{}/posts/down", server.uri());
        let err = translator(&server.uri())
            .summarize(&url, "Korean")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SummarizeError::Article(crate::feed::FetchError::HttpStatus(500))
        ));
    }

    #[tokio::test]
    async fn test_summarize_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Some article.</p>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/posts/a", server.uri());
        let err = translator(&server.uri())
            .summarize(&url, "Korean")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SummarizeError::Service(TranslateError::HttpStatus(503))
        ));
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let result = GeminiTranslator::new(
            reqwest::Client::new(),
            SecretString::from("k".to_string()),
            Some("http://translate.example.com"),
            None,
        );
        assert!(matches!(result, Err(TranslateError::InsecureBaseUrl)));
    }

    #[test]
    fn test_blank_key_rejected() {
        let result = GeminiTranslator::new(
            reqwest::Client::new(),
            SecretString::from("  ".to_string()),
            None,
            None,
        );
        assert!(matches!(result, Err(TranslateError::MissingApiKey)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let t = translator("https://example.com");
        let out = format!("{:?}", t);
        assert!(!out.contains("test-key"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn test_strip_wrapping() {
        assert_eq!(strip_wrapping("  \"안녕\"  "), "안녕");
        assert_eq!(strip_wrapping("```text\n안녕\n```"), "안녕");
        assert_eq!(strip_wrapping("plain"), "plain");
    }
}

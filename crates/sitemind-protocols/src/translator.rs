//! Translator protocol and output parsing.

use async_trait::async_trait;

use crate::error::TranslatorError;
use crate::page::PageModel;

/// Produces a semantic [`PageModel`] from raw page content.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a page. `context` is the site digest built by the knowledge
    /// store, absent when nothing is known about the site.
    async fn translate(
        &self,
        url: &str,
        content: &str,
        accessibility: &str,
        context: Option<&str>,
    ) -> Result<PageModel, TranslatorError>;
}

/// Parse raw translator output into a sanitized [`PageModel`].
///
/// Accepts bare JSON, JSON wrapped in a markdown code fence, or JSON
/// surrounded by prose. An empty `url` in the output is replaced by `url`.
pub fn parse_page_model(url: &str, raw: &str) -> Result<PageModel, TranslatorError> {
    let json = extract_json(raw)
        .ok_or_else(|| TranslatorError::Malformed("no JSON object in output".to_string()))?;

    let mut model: PageModel =
        serde_json::from_str(json).map_err(|e| TranslatorError::Malformed(e.to_string()))?;

    if model.url.is_empty() {
        model.url = url.to_string();
    }
    Ok(model.sanitize())
}

fn extract_json(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let body = match raw.find("```") {
        Some(start) => {
            let after = &raw[start + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => &after[..end],
                None => after,
            }
        }
        None => raw,
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

//! Content-based classification through a local LLM.
//!
//! The classifier only sees the [`AnalyzerBackend`] trait, so tests swap in
//! deterministic fakes. [`OllamaBackend`] talks to an Ollama server over
//! HTTP with a bounded timeout on every call.

use crate::config::AnalyzerSettings;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a file categorization assistant. Your job is to analyze file information and categorize files into the appropriate category.

You must respond with ONLY a valid JSON object in this exact format:
{\"category\": \"category_name\", \"confidence\": 0.95, \"reasoning\": \"brief explanation\"}

The category must be one of the valid categories provided. The confidence should be between 0.0 and 1.0.";

/// Everything a backend may use to pick a category.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    /// Extracted text, already non-empty.
    pub text_snippet: &'a str,
    /// Category keys the backend must choose from.
    pub known_categories: &'a [&'a str],
    pub file_name: &'a str,
    pub extension: &'a str,
    pub mime_type: Option<&'a str>,
    pub size_bytes: u64,
    /// `- key: description (path: ...)` lines for the prompt.
    pub category_descriptions: &'a str,
}

/// Reasons a backend call produced no usable label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// The service could not be reached.
    Unavailable(String),
    /// The call exceeded its time budget.
    Timeout,
    /// The service answered with a non-success status.
    Http(u16),
    /// The reply could not be parsed.
    InvalidResponse(String),
    /// The reply named a category that does not exist.
    UnknownLabel(String),
}

impl std::fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "analyzer unavailable: {}", reason),
            Self::Timeout => write!(f, "analyzer timed out"),
            Self::Http(status) => write!(f, "analyzer returned HTTP {}", status),
            Self::InvalidResponse(reason) => write!(f, "invalid analyzer response: {}", reason),
            Self::UnknownLabel(label) => write!(f, "unknown category label '{}'", label),
        }
    }
}

impl std::error::Error for AnalyzerError {}

/// A capability that classifies file content or fails.
///
/// Implementations must bound their own latency; a failure of any kind makes
/// the classifier fall through to rule-based matching.
pub trait AnalyzerBackend: Send + Sync {
    /// Returns a category label, ideally one of `request.known_categories`.
    fn classify(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalyzerError>;
}

/// Ollama chat API client.
pub struct OllamaBackend {
    client: reqwest::blocking::Client,
    host: String,
    model: String,
    max_prompt_chars: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaBackend {
    /// Builds a client and verifies the server answers.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` or `Timeout` when the server cannot be reached
    /// within the configured timeout.
    pub fn connect(settings: &AnalyzerSettings) -> Result<Self, AnalyzerError> {
        let backend = Self::new(settings)?;
        let url = format!("{}/api/tags", backend.host);
        let response = backend.client.get(&url).send().map_err(map_request_error)?;
        if !response.status().is_success() {
            return Err(AnalyzerError::Http(response.status().as_u16()));
        }
        log::info!("Connected to Ollama at {} (model {})", backend.host, backend.model);
        Ok(backend)
    }

    /// Builds a client without probing the server.
    pub fn new(settings: &AnalyzerSettings) -> Result<Self, AnalyzerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout())
            .connect_timeout(settings.timeout().min(Duration::from_secs(5)))
            .build()
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            host: settings.host.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_prompt_chars: settings.max_prompt_chars,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_prompt(&self, request: &AnalysisRequest<'_>) -> String {
        let preview: String = request
            .text_snippet
            .chars()
            .take(self.max_prompt_chars)
            .collect();

        format!(
            "Categorize this file based on its information:

**File Name:** {name}
**Extension:** {ext}
**Size:** {size:.2} MB
**MIME Type:** {mime}

**Content Preview:**
```
{preview}
```

**Available Categories:**
{categories}

Valid category names: {keys}

Analyze the file name, extension, and content to determine the best category. Respond with JSON only.",
            name = request.file_name,
            ext = request.extension,
            size = request.size_bytes as f64 / (1024.0 * 1024.0),
            mime = request.mime_type.unwrap_or("Unknown"),
            preview = preview,
            categories = request.category_descriptions,
            keys = request.known_categories.join(", "),
        )
    }
}

impl AnalyzerBackend for OllamaBackend {
    fn classify(&self, request: &AnalysisRequest<'_>) -> Result<String, AnalyzerError> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": self.build_prompt(request) },
            ],
            "options": { "temperature": 0.1, "num_predict": 200 },
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .map_err(map_request_error)?;
        if !response.status().is_success() {
            return Err(AnalyzerError::Http(response.status().as_u16()));
        }

        let chat: ChatResponse = response
            .json()
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;
        parse_category_label(&chat.message.content)
    }
}

fn map_request_error(e: reqwest::Error) -> AnalyzerError {
    if e.is_timeout() {
        AnalyzerError::Timeout
    } else {
        AnalyzerError::Unavailable(e.to_string())
    }
}

/// Extracts the `category` field from a model reply.
///
/// Replies wrapped in Markdown code fences are unwrapped first. The model's
/// own confidence and reasoning are ignored.
pub fn parse_category_label(reply: &str) -> Result<String, AnalyzerError> {
    let body = strip_code_fence(reply.trim());
    let value: serde_json::Value = serde_json::from_str(body.trim())
        .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;
    value
        .get("category")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AnalyzerError::InvalidResponse("missing 'category' field".to_string()))
}

fn strip_code_fence(reply: &str) -> &str {
    let after_open = if let Some((_, rest)) = reply.split_once("```json") {
        rest
    } else if let Some((_, rest)) = reply.split_once("```") {
        rest
    } else {
        return reply;
    };
    after_open
        .split_once("```")
        .map(|(inner, _)| inner)
        .unwrap_or(after_open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let label =
            parse_category_label(r#"{"category": "financial", "confidence": 0.4, "reasoning": "x"}"#)
                .unwrap();
        assert_eq!(label, "financial");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "Sure!\n```json\n{\"category\": \"legal\"}\n```\nDone.";
        assert_eq!(parse_category_label(reply).unwrap(), "legal");

        let bare_fence = "```\n{\"category\": \"music\"}\n```";
        assert_eq!(parse_category_label(bare_fence).unwrap(), "music");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_category_label("I think it is a photo"),
            Err(AnalyzerError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_category_label(r#"{"confidence": 0.9}"#),
            Err(AnalyzerError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_category_label(r#"{"category": "  "}"#),
            Err(AnalyzerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_prompt_contains_file_details() {
        let backend = OllamaBackend::new(&AnalyzerSettings {
            max_prompt_chars: 5,
            ..AnalyzerSettings::default()
        })
        .unwrap();
        let keys = ["pdf", "misc"];
        let request = AnalysisRequest {
            text_snippet: "abcdefghij",
            known_categories: &keys,
            file_name: "notes.txt",
            extension: ".txt",
            mime_type: None,
            size_bytes: 1024,
            category_descriptions: "- pdf: PDF documents (path: Documents/PDFs)",
        };
        let prompt = backend.build_prompt(&request);
        assert!(prompt.contains("**File Name:** notes.txt"));
        assert!(prompt.contains("abcde\n"));
        assert!(!prompt.contains("abcdef"));
        assert!(prompt.contains("Valid category names: pdf, misc"));
        assert!(prompt.contains("**MIME Type:** Unknown"));
    }

    #[test]
    fn test_connect_unreachable_host_fails() {
        let settings = AnalyzerSettings {
            host: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..AnalyzerSettings::default()
        };
        assert!(OllamaBackend::connect(&settings).is_err());
    }
}

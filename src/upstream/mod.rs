//! The upstream agent API as seen by the pipeline.
//!
//! [`UpstreamApi`] is the only seam between the orchestration logic and the
//! network. [`MistralClient`] implements it over HTTP; tests substitute an
//! in-memory fake that records every call.
//!
//! ## Wire Format
//!
//! ```text
//! POST   {base}/files              multipart purpose=ocr, file=<bytes>  → { id }
//! GET    {base}/files/{id}/url     ?expiry=<hours>                      → { url }
//! DELETE {base}/files/{id}
//! POST   {base}/agents/completions { agent_id, max_tokens, messages }   → { choices }
//! ```
//!
//! Response bodies are classified by [`decode`] so that an HTML gateway page,
//! malformed JSON and a JSON body of the wrong shape each surface as a
//! distinct [`AnalysisError`].

mod client;

pub use client::MistralClient;

use crate::error::{truncate_body, AnalysisError, Stage};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Characters of an HTML page kept for diagnostics.
const HTML_SNIPPET_CHARS: usize = 120;

/// Outbound operations the pipeline needs from the agent API.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Store the document with purpose `ocr` and return its remote id.
    async fn upload(&self, file_name: &str, document: &[u8]) -> Result<String, AnalysisError>;

    /// Obtain a time-limited URL for a stored file.
    async fn signed_url(&self, file_id: &str) -> Result<String, AnalysisError>;

    /// Run one agent completion.
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResult, AnalysisError>;

    /// Remove a stored file.
    async fn delete(&self, file_id: &str) -> Result<(), AnalysisError>;
}

/// One completion call, before serialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub agent_id: String,
    pub system_prompt: String,
    pub user_text: String,
    pub document_url: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// JSON body for `POST /agents/completions`.
    pub fn to_body(&self) -> Value {
        json!({
            "agent_id": self.agent_id,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": self.user_text },
                        { "type": "document_url", "document_url": self.document_url },
                    ],
                },
            ],
        })
    }
}

/// Text of the first choice of a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub markdown: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignedUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

/// Agents answer either with a plain string or with typed content chunks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    #[serde(default)]
    text: Option<String>,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            MessageContent::Text(s) => s,
            MessageContent::Chunks(chunks) => chunks
                .into_iter()
                .filter_map(|c| c.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// True when a body is an HTML document rather than JSON.
pub(crate) fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(16).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Decode a 2xx body into `T`, classifying failures.
pub(crate) fn decode<T: DeserializeOwned>(
    stage: Stage,
    body: &str,
    limit: usize,
) -> Result<T, AnalysisError> {
    if looks_like_html(body) {
        return Err(AnalysisError::HtmlErrorPage {
            stage,
            snippet: truncate_body(body.trim_start(), HTML_SNIPPET_CHARS.min(limit)),
        });
    }
    let value: Value = serde_json::from_str(body).map_err(|e| AnalysisError::MalformedJson {
        stage,
        detail: truncate_body(&format!("{e}; body: {body}"), limit),
    })?;
    serde_json::from_value(value).map_err(|e| AnalysisError::UnexpectedShape {
        stage,
        detail: e.to_string(),
    })
}

/// Extract `choices[0].message.content` from a completion body.
pub(crate) fn parse_completion(body: &str, limit: usize) -> Result<CompletionResult, AnalysisError> {
    let response: ChatResponse = decode(Stage::Completion, body, limit)?;
    let markdown = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(MessageContent::into_text)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AnalysisError::UnexpectedShape {
            stage: Stage::Completion,
            detail: "no choices[0].message.content in response".into(),
        })?;
    Ok(CompletionResult { markdown })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CompletionRequest {
        CompletionRequest {
            agent_id: "ag-1".into(),
            system_prompt: "sys".into(),
            user_text: "do it".into(),
            document_url: "https://files.example/doc".into(),
            max_tokens: 4000,
        }
    }

    #[test]
    fn body_layout() {
        let body = sample_request().to_body();
        assert_eq!(body["agent_id"], "ag-1");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        let user = &body["messages"][1]["content"];
        assert_eq!(user[0]["type"], "text");
        assert_eq!(user[0]["text"], "do it");
        assert_eq!(user[1]["type"], "document_url");
        assert_eq!(user[1]["document_url"], "https://files.example/doc");
    }

    #[test]
    fn parses_string_content() {
        let body = r##"{"choices":[{"message":{"role":"assistant","content":"# Summary"}}]}"##;
        assert_eq!(parse_completion(body, 500).unwrap().markdown, "# Summary");
    }

    #[test]
    fn parses_chunked_content() {
        let body = r##"{"choices":[{"message":{"content":[{"type":"text","text":"# A"},{"type":"text","text":"\nB"}]}}]}"##;
        assert_eq!(parse_completion(body, 500).unwrap().markdown, "# A\nB");
    }

    #[test]
    fn html_page_is_detected() {
        let body = "  <!DOCTYPE html><html><body>502 Bad Gateway</body></html>";
        assert!(matches!(
            parse_completion(body, 500),
            Err(AnalysisError::HtmlErrorPage { .. })
        ));
        assert!(looks_like_html("<html lang=\"en\">"));
        assert!(!looks_like_html("{\"html\": true}"));
    }

    #[test]
    fn malformed_json_is_detected() {
        assert!(matches!(
            parse_completion("{\"choices\": [", 500),
            Err(AnalysisError::MalformedJson { .. })
        ));
    }

    #[test]
    fn missing_choices_is_unexpected_shape() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#, 500),
            Err(AnalysisError::UnexpectedShape { .. })
        ));
        assert!(matches!(
            parse_completion(r#"{"object":"error"}"#, 500),
            Err(AnalysisError::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn upload_response_decodes() {
        let r: UploadResponse = decode(Stage::Upload, r#"{"id":"f-1","purpose":"ocr"}"#, 500).unwrap();
        assert_eq!(r.id, "f-1");
    }
}

//! Error types for the pdf-analyst library.
//!
//! Every failure the pipeline can surface is an [`AnalysisError`]. Variants
//! fall into four families, exposed through [`AnalysisError::kind`]:
//!
//! * **User input**: a required multipart field is missing. Detected before
//!   any upstream call, so no remote resource exists yet.
//! * **Configuration**: the server has no API key or agent id for the task.
//!   The user cannot fix this, so it maps to HTTP 500 rather than 400.
//! * **Upstream transport**: the file or completion API rejected the call,
//!   could not be reached, or did not answer in time.
//! * **Upstream parse**: the API answered 2xx but the body is not the JSON
//!   shape we expect (malformed JSON, an HTML error page, missing `choices`).
//!
//! A context-overflow condition is *not* an error variant of its own. It is a
//! predicate over timeouts and status bodies ([`AnalysisError::signals_context_overflow`])
//! that the extended-timeout strategy consults before deciding to escalate.

use std::fmt;
use thiserror::Error;

/// Phrases the upstream API uses when a document exceeds the model's context.
const CONTEXT_LIMIT_PHRASES: [&str; 3] = ["context length", "token limit", "too large"];

/// Which upstream call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    SignedUrl,
    Completion,
    Delete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Upload => "file upload",
            Stage::SignedUrl => "signed URL",
            Stage::Completion => "completion",
            Stage::Delete => "file delete",
        })
    }
}

/// Coarse classification of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UserInput,
    Configuration,
    UpstreamTransport,
    UpstreamParse,
}

/// All errors returned by the pdf-analyst library.
#[derive(Debug, Error)]
pub enum AnalysisError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A required multipart field was absent or empty.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// The task type tag is not one of `summarize` / `explain`.
    #[error("Unsupported task type '{value}' (expected 'summarize' or 'explain')")]
    UnsupportedTaskType { value: String },

    // ── Deployment errors ─────────────────────────────────────────────────
    /// The server is missing a credential or agent id.
    #[error("Server is not configured: {name} is not set")]
    CredentialNotConfigured { name: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Upstream transport errors ─────────────────────────────────────────
    /// The upstream API answered with a non-success status.
    #[error("Upstream {stage} failed with HTTP {status}")]
    UpstreamStatus {
        stage: Stage,
        status: u16,
        /// Response body, already truncated.
        body: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset…).
    #[error("Upstream {stage} request failed: {detail}")]
    UpstreamRequest { stage: Stage, detail: String },

    /// The call did not complete within the allotted time.
    #[error("Upstream {stage} timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },

    // ── Upstream parse errors ─────────────────────────────────────────────
    /// The body was not valid JSON.
    #[error("Upstream {stage} returned malformed JSON")]
    MalformedJson { stage: Stage, detail: String },

    /// The body was an HTML page (usually a gateway or proxy error).
    #[error("Upstream {stage} returned an HTML error page instead of JSON")]
    HtmlErrorPage { stage: Stage, snippet: String },

    /// The body was JSON but lacked the fields we need.
    #[error("Upstream {stage} response has an unexpected shape: {detail}")]
    UnexpectedShape { stage: Stage, detail: String },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::MissingField { .. } | AnalysisError::UnsupportedTaskType { .. } => {
                ErrorKind::UserInput
            }
            AnalysisError::CredentialNotConfigured { .. } | AnalysisError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            AnalysisError::UpstreamStatus { .. }
            | AnalysisError::UpstreamRequest { .. }
            | AnalysisError::Timeout { .. } => ErrorKind::UpstreamTransport,
            AnalysisError::MalformedJson { .. }
            | AnalysisError::HtmlErrorPage { .. }
            | AnalysisError::UnexpectedShape { .. } => ErrorKind::UpstreamParse,
        }
    }

    /// HTTP status the inbound surface responds with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::UserInput => 400,
            _ => 500,
        }
    }

    /// Diagnostics for the `details` field of the JSON error envelope.
    pub fn details(&self) -> Option<String> {
        match self {
            AnalysisError::UpstreamStatus { body, .. } if !body.is_empty() => Some(body.clone()),
            AnalysisError::UpstreamRequest { detail, .. }
            | AnalysisError::MalformedJson { detail, .. }
            | AnalysisError::UnexpectedShape { detail, .. } => Some(detail.clone()),
            AnalysisError::HtmlErrorPage { snippet, .. } => Some(snippet.clone()),
            _ => None,
        }
    }

    /// Whether this failure means the document was too big for one call.
    ///
    /// True for client-side timeouts and for status errors whose body
    /// mentions a context or size limit.
    pub fn signals_context_overflow(&self) -> bool {
        match self {
            AnalysisError::Timeout { .. } => true,
            AnalysisError::UpstreamStatus { body, .. } => mentions_context_limit(body),
            _ => false,
        }
    }
}

/// Substring heuristic for context-length exhaustion in an upstream error body.
///
/// The upstream API exposes no structured code for this condition, so matching
/// is on free text, case-insensitively.
pub fn mentions_context_limit(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTEXT_LIMIT_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// Truncate an upstream body to at most `limit` characters.
pub fn truncate_body(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}\u{2026}", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_user_error() {
        let e = AnalysisError::MissingField { field: "instructions" };
        assert_eq!(e.kind(), ErrorKind::UserInput);
        assert_eq!(e.status_code(), 400);
        assert!(e.to_string().contains("instructions"));
        assert!(e.details().is_none());
    }

    #[test]
    fn missing_credential_is_server_error() {
        let e = AnalysisError::CredentialNotConfigured {
            name: "MISTRAL_API_KEY",
        };
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn status_error_carries_body_as_details() {
        let e = AnalysisError::UpstreamStatus {
            stage: Stage::Completion,
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(e.kind(), ErrorKind::UpstreamTransport);
        assert_eq!(e.details().as_deref(), Some("bad gateway"));
        assert!(e.to_string().contains("HTTP 502"));
        assert!(e.to_string().contains("completion"));
    }

    #[test]
    fn parse_errors_are_distinguished() {
        let html = AnalysisError::HtmlErrorPage {
            stage: Stage::Completion,
            snippet: "<!DOCTYPE html>".into(),
        };
        let json = AnalysisError::MalformedJson {
            stage: Stage::Completion,
            detail: "expected value".into(),
        };
        assert_eq!(html.kind(), ErrorKind::UpstreamParse);
        assert_eq!(json.kind(), ErrorKind::UpstreamParse);
        assert_ne!(html.to_string(), json.to_string());
    }

    #[test]
    fn context_limit_phrases_match_case_insensitively() {
        assert!(mentions_context_limit("Context length exceeded"));
        assert!(mentions_context_limit("prompt is over the TOKEN LIMIT"));
        assert!(mentions_context_limit("{\"message\":\"document too large\"}"));
        assert!(!mentions_context_limit("internal server error"));
        assert!(!mentions_context_limit(""));
    }

    #[test]
    fn timeout_signals_overflow() {
        let e = AnalysisError::Timeout {
            stage: Stage::Completion,
            secs: 75,
        };
        assert!(e.signals_context_overflow());
    }

    #[test]
    fn only_matching_status_bodies_signal_overflow() {
        let overflow = AnalysisError::UpstreamStatus {
            stage: Stage::Completion,
            status: 500,
            body: "context length exceeded".into(),
        };
        let other = AnalysisError::UpstreamStatus {
            stage: Stage::Completion,
            status: 500,
            body: "model overloaded".into(),
        };
        let parse = AnalysisError::MalformedJson {
            stage: Stage::Completion,
            detail: "too large".into(),
        };
        assert!(overflow.signals_context_overflow());
        assert!(!other.signals_context_overflow());
        assert!(!parse.signals_context_overflow());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_body("short", 10), "short");
        assert_eq!(truncate_body("abcdef", 3), "abc\u{2026}");
        // Multi-byte characters must not be split.
        assert_eq!(truncate_body("ééééé", 2), "éé\u{2026}");
    }
}

//! Inbound request values and the request validator.
//!
//! A request arrives as loosely-typed multipart fields ([`Submission`]),
//! is turned into a typed [`AnalysisRequest`], and is checked against the
//! deployment's credentials by [`validate`] before anything is uploaded.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the caller wants done with the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Summarize,
    Explain,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Summarize => "summarize",
            TaskType::Explain => "explain",
        }
    }

    /// Noun used in prompts ("summary" / "explanation").
    pub fn deliverable(&self) -> &'static str {
        match self {
            TaskType::Summarize => "summary",
            TaskType::Explain => "explanation",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" => Ok(TaskType::Summarize),
            "explain" => Ok(TaskType::Explain),
            _ => Err(AnalysisError::UnsupportedTaskType {
                value: s.to_string(),
            }),
        }
    }
}

/// Raw form fields as received from a multipart upload or the CLI.
#[derive(Debug, Default, Clone)]
pub struct Submission {
    pub document: Option<Vec<u8>>,
    pub file_name: Option<String>,
    pub instructions: Option<String>,
    pub task_type: Option<String>,
}

/// A typed analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document: Vec<u8>,
    /// File name forwarded to the upload endpoint.
    pub file_name: String,
    pub instructions: String,
    pub task: TaskType,
}

impl AnalysisRequest {
    pub fn new(document: Vec<u8>, instructions: impl Into<String>, task: TaskType) -> Self {
        Self {
            document,
            file_name: "document.pdf".to_string(),
            instructions: instructions.into(),
            task,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Build a request from raw form fields, rejecting absent or empty ones.
    pub fn from_submission(submission: Submission) -> Result<Self, AnalysisError> {
        let document = submission
            .document
            .filter(|d| !d.is_empty())
            .ok_or(AnalysisError::MissingField { field: "file" })?;
        let instructions = submission
            .instructions
            .filter(|s| !s.trim().is_empty())
            .ok_or(AnalysisError::MissingField {
                field: "instructions",
            })?;
        let task = submission
            .task_type
            .filter(|s| !s.trim().is_empty())
            .ok_or(AnalysisError::MissingField { field: "taskType" })?
            .parse::<TaskType>()?;

        let file_name = submission
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "document.pdf".to_string());

        Ok(Self {
            document,
            file_name,
            instructions,
            task,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.document.len() as u64
    }
}

/// Check a request and the deployment before any upstream call.
///
/// Returns the agent id to use for the request's task. Missing fields are
/// reported before missing credentials.
pub fn validate<'c>(
    request: &AnalysisRequest,
    config: &'c AnalysisConfig,
) -> Result<&'c str, AnalysisError> {
    if request.document.is_empty() {
        return Err(AnalysisError::MissingField { field: "file" });
    }
    if request.instructions.trim().is_empty() {
        return Err(AnalysisError::MissingField {
            field: "instructions",
        });
    }
    if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        return Err(AnalysisError::CredentialNotConfigured {
            name: "MISTRAL_API_KEY",
        });
    }
    config
        .agent_id(request.task)
        .filter(|id| !id.trim().is_empty())
        .ok_or(AnalysisError::CredentialNotConfigured {
            name: match request.task {
                TaskType::Summarize => "MISTRAL_SUMMARIZE_AGENT_ID",
                TaskType::Explain => "MISTRAL_EXPLAIN_AGENT_ID",
            },
        })
}

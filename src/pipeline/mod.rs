//! Strategy tiers for document analysis.
//!
//! Each submodule implements exactly one step of the chain. The orchestrator
//! in [`crate::analyze`] acquires the document once, runs the tiers, and
//! releases the document once.
//!
//! ## State Machine
//!
//! ```text
//! Received ─▶ Validated ─▶ Uploaded ─┬─▶ SinglePass ──────────────────────────────┬─▶ Done
//!                                    └─▶ ExtendedTimeout ─┬───────────────────────┤
//!                                                         └─[escalate]─▶ Outline ─▶ Detail ─▶ Done
//! ```
//!
//! The only conditional edge is `ExtendedTimeout → Outline`, taken when the
//! extended call times out or the upstream reports a context/size limit. It is
//! returned as [`StrategyOutcome::Escalate`], never as an error, and is taken
//! at most once.
//!
//! 1. [`handle`]:      upload + signed URL, and the never-failing release
//! 2. [`select`]:      pick the first tier from the document size
//! 3. [`single`]:      one completion, transport timeout only
//! 4. [`extended`]:    one completion under a client-side timeout; may escalate
//! 5. [`progressive`]: outline pass, then detail pass conditioned on the outline
//! 6. [`postprocess`]: deterministic Markdown cleanup of the final text

pub mod extended;
pub mod handle;
pub mod postprocess;
pub mod progressive;
pub mod select;
pub mod single;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Stage};
use crate::observer::PipelineObserver;
use crate::request::AnalysisRequest;
use crate::upstream::{CompletionRequest, CompletionResult, UpstreamApi};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

/// The tier that produced (or failed to produce) a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    SinglePass,
    ExtendedTimeout,
    Progressive,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::SinglePass => "single-pass",
            Strategy::ExtendedTimeout => "extended-timeout",
            Strategy::Progressive => "progressive",
        })
    }
}

/// Why the extended-timeout tier handed over to progressive analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationReason {
    /// The client-side timeout elapsed.
    Timeout { secs: u64 },
    /// The upstream rejected the call with a context/size-limit message.
    ContextOverflow { status: u16, detail: String },
}

impl EscalationReason {
    /// Map an error to an escalation reason, if it signals overflow.
    pub fn from_error(error: &AnalysisError) -> Option<Self> {
        if !error.signals_context_overflow() {
            return None;
        }
        match error {
            AnalysisError::Timeout { secs, .. } => Some(EscalationReason::Timeout { secs: *secs }),
            AnalysisError::UpstreamStatus { status, body, .. } => {
                Some(EscalationReason::ContextOverflow {
                    status: *status,
                    detail: body.clone(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationReason::Timeout { secs } => write!(f, "completion timed out after {secs}s"),
            EscalationReason::ContextOverflow { status, detail } => {
                write!(f, "context limit reported (HTTP {status}): {detail}")
            }
        }
    }
}

/// Result of a tier that is allowed to escalate.
#[derive(Debug)]
pub enum StrategyOutcome {
    /// The tier concluded the request, successfully or not.
    Finished(Result<CompletionResult, AnalysisError>),
    /// The next tier should run with the same document.
    Escalate(EscalationReason),
}

/// Everything a tier needs for one request.
///
/// Borrowed from the orchestrator for the lifetime of the chain; the document
/// URL stays valid until the orchestrator releases the handle.
pub struct StrategyContext<'a> {
    pub upstream: &'a dyn UpstreamApi,
    pub config: &'a AnalysisConfig,
    pub observer: &'a dyn PipelineObserver,
    pub request: &'a AnalysisRequest,
    pub agent_id: &'a str,
    pub document_url: &'a str,
    completion_calls: AtomicU32,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        upstream: &'a dyn UpstreamApi,
        config: &'a AnalysisConfig,
        observer: &'a dyn PipelineObserver,
        request: &'a AnalysisRequest,
        agent_id: &'a str,
        document_url: &'a str,
    ) -> Self {
        Self {
            upstream,
            config,
            observer,
            request,
            agent_id,
            document_url,
            completion_calls: AtomicU32::new(0),
        }
    }

    /// Number of completion calls sent so far.
    pub fn completion_calls(&self) -> u32 {
        self.completion_calls.load(Ordering::SeqCst)
    }

    /// Build a completion request against the current document.
    pub fn completion_request(
        &self,
        system_prompt: &str,
        user_text: String,
        max_tokens: u32,
    ) -> CompletionRequest {
        CompletionRequest {
            agent_id: self.agent_id.to_string(),
            system_prompt: system_prompt.to_string(),
            user_text,
            document_url: self.document_url.to_string(),
            max_tokens,
        }
    }

    /// Send one completion, optionally bounded by a client-side timeout.
    ///
    /// The timeout aborts the in-flight call and is reported as
    /// [`AnalysisError::Timeout`], independent of any transport timeout.
    pub async fn complete(
        &self,
        strategy: Strategy,
        request: CompletionRequest,
        limit: Option<Duration>,
    ) -> Result<CompletionResult, AnalysisError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.observer.on_completion_call(strategy, request.max_tokens);
        debug!(
            "{}: completion with max_tokens={} ({} chars of user text)",
            strategy,
            request.max_tokens,
            request.user_text.len()
        );

        match limit {
            None => self.upstream.complete(&request).await,
            Some(limit) => tokio::time::timeout(limit, self.upstream.complete(&request))
                .await
                .unwrap_or(Err(AnalysisError::Timeout {
                    stage: Stage::Completion,
                    secs: limit.as_secs(),
                })),
        }
    }
}

//! The analysis orchestrator.
//!
//! [`Analyzer::analyze`] validates the request, acquires the document handle,
//! runs the strategy chain from [`crate::pipeline`], and releases the handle
//! exactly once before returning, whatever the outcome. If the returned
//! future is dropped mid-flight, the handle's guard spawns the release.
//!
//! An `Analyzer` holds no per-request state and is shared behind an `Arc` by
//! the HTTP surface; concurrent requests never see each other's documents.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::observer::{NoopObserver, SharedObserver};
use crate::pipeline::handle::DocumentHandles;
use crate::pipeline::select::{self, InitialStrategy};
use crate::pipeline::{
    extended, postprocess, progressive, single, Strategy, StrategyContext, StrategyOutcome,
};
use crate::request::{validate, AnalysisRequest, Submission};
use crate::upstream::{CompletionResult, MistralClient, UpstreamApi};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Successful result of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutput {
    /// Cleaned Markdown produced by the concluding tier.
    pub markdown: String,
    /// Tier that produced `markdown`.
    pub strategy: Strategy,
    /// Completion calls sent for this request, across all tiers.
    pub completion_calls: u32,
    pub duration_ms: u64,
}

/// Runs analysis requests against one upstream.
#[derive(Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    upstream: Arc<dyn UpstreamApi>,
    observer: SharedObserver,
}

impl Analyzer {
    /// Create an analyzer talking HTTP to the configured upstream.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = MistralClient::new(&config)?;
        Ok(Self::with_upstream(config, Arc::new(client)))
    }

    /// Create an analyzer over any [`UpstreamApi`] implementation.
    pub fn with_upstream(config: AnalysisConfig, upstream: Arc<dyn UpstreamApi>) -> Self {
        Self {
            config,
            upstream,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Parse raw form fields and analyse them.
    pub async fn analyze_submission(
        &self,
        submission: Submission,
    ) -> Result<AnalysisOutput, AnalysisError> {
        let request = AnalysisRequest::from_submission(submission)?;
        self.analyze(request).await
    }

    /// Analyse one document.
    ///
    /// # Errors
    /// - user-input / configuration errors before any upstream call
    /// - upstream transport or parse errors from the concluding tier
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutput, AnalysisError> {
        let span = info_span!(
            "analyze",
            task = %request.task,
            bytes = request.document.len()
        );
        async {
            let start = Instant::now();
            let result = self.run(&request).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(done) => info!(
                    "Analysis complete via {} ({} completion calls, {}ms)",
                    done.strategy, done.completion_calls, duration_ms
                ),
                Err(e) => warn!("Analysis failed after {}ms: {}", duration_ms, e),
            }
            self.observer.on_finished(result.is_ok(), duration_ms);
            result.map(|done| AnalysisOutput {
                markdown: done.markdown,
                strategy: done.strategy,
                completion_calls: done.completion_calls,
                duration_ms,
            })
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<Completed, AnalysisError> {
        // ── Validate (no upstream calls yet) ─────────────────────────────────
        let agent_id = validate(request, &self.config)?;

        // ── Acquire ──────────────────────────────────────────────────────────
        let handles =
            DocumentHandles::new(Arc::clone(&self.upstream), Arc::clone(&self.observer));
        let handle = handles.acquire(request).await?;

        // ── Strategy chain ───────────────────────────────────────────────────
        let ctx = StrategyContext::new(
            self.upstream.as_ref(),
            &self.config,
            self.observer.as_ref(),
            request,
            agent_id,
            &handle.signed_url,
        );
        let outcome = run_chain(&ctx).await;
        let completion_calls = ctx.completion_calls();
        drop(ctx);

        // ── Release (exactly once, result unaffected) ────────────────────────
        handles.release(handle).await;

        let (result, strategy) = outcome?;
        Ok(Completed {
            markdown: postprocess::clean_markdown(&result.markdown),
            strategy,
            completion_calls,
        })
    }
}

/// Result of [`Analyzer::run`], before timing is attached.
struct Completed {
    markdown: String,
    strategy: Strategy,
    completion_calls: u32,
}

/// Run the tiers in order. Escalation happens at most once.
async fn run_chain(
    ctx: &StrategyContext<'_>,
) -> Result<(CompletionResult, Strategy), AnalysisError> {
    let initial = select::initial_strategy(
        ctx.request.size_bytes(),
        ctx.config.size_threshold_bytes,
    );
    debug!(
        "Starting on {} tier ({} bytes, threshold {})",
        Strategy::from(initial),
        ctx.request.size_bytes(),
        ctx.config.size_threshold_bytes
    );
    match initial {
        InitialStrategy::SinglePass => single::run(ctx)
            .await
            .map(|r| (r, Strategy::SinglePass)),
        InitialStrategy::ExtendedTimeout => match extended::run(ctx).await {
            StrategyOutcome::Finished(result) => result.map(|r| (r, Strategy::ExtendedTimeout)),
            StrategyOutcome::Escalate(reason) => {
                info!("Escalating to progressive analysis: {}", reason);
                ctx.observer.on_escalation(&reason);
                progressive::run(ctx)
                    .await
                    .map(|r| (r, Strategy::Progressive))
            }
        },
    }
}

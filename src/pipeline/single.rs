//! Single-pass tier: one completion for the whole document.

use super::{Strategy, StrategyContext};
use crate::error::AnalysisError;
use crate::prompts::{task_user_text, SINGLE_PASS_SYSTEM_PROMPT};
use crate::upstream::CompletionResult;
use tracing::info;

/// Run one completion with the standard prompt and full token budget.
///
/// Bounded only by the transport timeout; failures are terminal.
pub async fn run(ctx: &StrategyContext<'_>) -> Result<CompletionResult, AnalysisError> {
    info!("Running single-pass analysis");
    ctx.observer.on_strategy_start(Strategy::SinglePass);

    let request = ctx.completion_request(
        SINGLE_PASS_SYSTEM_PROMPT,
        task_user_text(ctx.request.task, &ctx.request.instructions),
        ctx.config.max_tokens,
    );
    ctx.complete(Strategy::SinglePass, request, None).await
}

//! Progressive (two-pass) tier.
//!
//! A single completion over an oversized document can exceed the model's
//! context window. This tier splits the work:
//!
//! 1. **Outline pass**: a small-budget call that returns only the document's
//!    headings and section map.
//! 2. **Detail pass**: a full-budget call whose user text carries the outline
//!    verbatim, so the model follows a compact structure instead of
//!    re-deriving it from the whole document.
//!
//! Both calls run under the extended client-side timeout. Any failure in
//! either pass is terminal; there is no tier below this one.

use super::{Strategy, StrategyContext};
use crate::error::AnalysisError;
use crate::prompts::{
    detail_user_text, outline_user_text, DETAIL_SYSTEM_PROMPT, OUTLINE_SYSTEM_PROMPT,
};
use crate::upstream::CompletionResult;
use tracing::info;

pub async fn run(ctx: &StrategyContext<'_>) -> Result<CompletionResult, AnalysisError> {
    ctx.observer.on_strategy_start(Strategy::Progressive);
    let limit = Some(ctx.config.extended_timeout());
    let task = ctx.request.task;
    let instructions = &ctx.request.instructions;

    info!("Progressive analysis: outline pass");
    let outline_request = ctx.completion_request(
        OUTLINE_SYSTEM_PROMPT,
        outline_user_text(task, instructions),
        ctx.config.outline_max_tokens,
    );
    let outline = ctx
        .complete(Strategy::Progressive, outline_request, limit)
        .await?;
    info!("Outline ready ({} chars); detail pass", outline.markdown.len());

    let detail_request = ctx.completion_request(
        DETAIL_SYSTEM_PROMPT,
        detail_user_text(task, instructions, &outline.markdown),
        ctx.config.max_tokens,
    );
    ctx.complete(Strategy::Progressive, detail_request, limit).await
}

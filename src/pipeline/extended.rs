//! Extended-timeout tier for large documents.
//!
//! Sends one completion with the coverage-oriented prompt under a client-side
//! timeout. A timeout, or an upstream error that mentions a context/size
//! limit, escalates to [`super::progressive`] instead of failing. The document
//! handle is left in place so the next tier reuses it.

use super::{EscalationReason, Strategy, StrategyContext, StrategyOutcome};
use crate::prompts::{task_user_text, EXTENDED_SYSTEM_PROMPT};
use tracing::{info, warn};

pub async fn run(ctx: &StrategyContext<'_>) -> StrategyOutcome {
    info!(
        "Running extended-timeout analysis (limit {}s)",
        ctx.config.extended_timeout_secs
    );
    ctx.observer.on_strategy_start(Strategy::ExtendedTimeout);

    let request = ctx.completion_request(
        EXTENDED_SYSTEM_PROMPT,
        task_user_text(ctx.request.task, &ctx.request.instructions),
        ctx.config.max_tokens,
    );

    match ctx
        .complete(
            Strategy::ExtendedTimeout,
            request,
            Some(ctx.config.extended_timeout()),
        )
        .await
    {
        Ok(result) => StrategyOutcome::Finished(Ok(result)),
        Err(e) => match EscalationReason::from_error(&e) {
            Some(reason) => {
                warn!("Extended analysis hit a size limit: {}", reason);
                StrategyOutcome::Escalate(reason)
            }
            None => StrategyOutcome::Finished(Err(e)),
        },
    }
}

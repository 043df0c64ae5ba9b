//! Observer trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via [`crate::Analyzer::with_observer`]
//! to receive events as a request moves through the strategies. Cleanup
//! failures are reported here (and logged) instead of being returned, because
//! the caller's result must not depend on whether the remote delete worked.
//!
//! # Example
//!
//! ```rust
//! use pdf_analyst::PipelineObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct OrphanCounter {
//!     orphans: AtomicUsize,
//! }
//!
//! impl PipelineObserver for OrphanCounter {
//!     fn on_release_failed(&self, file_id: &str, error: &str) {
//!         self.orphans.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("could not delete {file_id}: {error}");
//!     }
//! }
//! ```

use crate::pipeline::{EscalationReason, Strategy};
use std::sync::Arc;

/// Receives pipeline events.
///
/// Implementations must be `Send + Sync`: one observer is shared by every
/// concurrent request served by an [`crate::Analyzer`]. All methods have
/// no-op defaults.
pub trait PipelineObserver: Send + Sync {
    /// The document was stored remotely and a signed URL obtained.
    fn on_uploaded(&self, file_id: &str, size_bytes: u64) {
        let _ = (file_id, size_bytes);
    }

    /// A strategy tier is about to run.
    fn on_strategy_start(&self, strategy: Strategy) {
        let _ = strategy;
    }

    /// A completion request is about to be sent.
    ///
    /// `max_tokens` identifies the budget, which distinguishes the outline
    /// pass from the others.
    fn on_completion_call(&self, strategy: Strategy, max_tokens: u32) {
        let _ = (strategy, max_tokens);
    }

    /// The extended-timeout strategy handed over to progressive analysis.
    fn on_escalation(&self, reason: &EscalationReason) {
        let _ = reason;
    }

    /// Deleting the uploaded document failed. The file may be orphaned.
    fn on_release_failed(&self, file_id: &str, error: &str) {
        let _ = (file_id, error);
    }

    /// The request reached a terminal state.
    fn on_finished(&self, succeeded: bool, duration_ms: u64) {
        let _ = (succeeded, duration_ms);
    }
}

/// Observer that ignores every event. Used when none is configured.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn PipelineObserver>;

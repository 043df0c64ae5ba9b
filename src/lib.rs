//! # pdf-analyst
//!
//! Summarise or explain PDF documents with a hosted LLM agent, returning
//! Markdown with `$…$` / `$$…$$` math ready for a study front-end.
//!
//! ## Pipeline Overview
//!
//! ```text
//! multipart request
//!  │
//!  ├─ 1. Validate   file, instructions, task type, credentials   (400 / 500)
//!  ├─ 2. Upload     POST /files (purpose=ocr) + signed URL
//!  ├─ 3. Select     ≤ 5 MiB → single pass, > 5 MiB → extended timeout
//!  ├─ 4. Complete   one agent completion against the signed URL
//!  │     └─ extended tier only: timeout / context-limit → progressive
//!  │                            (outline pass, then detail pass)
//!  ├─ 5. Release    DELETE /files/{id}, exactly once, errors only logged
//!  └─ 6. Polish     deterministic Markdown cleanup
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_analyst::{AnalysisConfig, AnalysisRequest, Analyzer, TaskType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // MISTRAL_API_KEY, MISTRAL_SUMMARIZE_AGENT_ID, MISTRAL_EXPLAIN_AGENT_ID
//!     let analyzer = Analyzer::new(AnalysisConfig::from_env()?)?;
//!     let bytes = std::fs::read("lecture.pdf")?;
//!     let request = AnalysisRequest::new(bytes, "Summarize key points", TaskType::Summarize);
//!     let output = analyzer.analyze(request).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("via {} in {} calls", output.strategy, output.completion_calls);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-analyst` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod prompts;
pub mod request;
pub mod server;
pub mod upstream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{AnalysisOutput, Analyzer};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::{mentions_context_limit, AnalysisError, ErrorKind, Stage};
pub use observer::{NoopObserver, PipelineObserver, SharedObserver};
pub use pipeline::{EscalationReason, Strategy};
pub use request::{AnalysisRequest, Submission, TaskType};
pub use upstream::{CompletionRequest, CompletionResult, MistralClient, UpstreamApi};

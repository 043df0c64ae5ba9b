//! CLI binary for pdf-analyst.
//!
//! `serve` runs the HTTP surface; `analyze` runs one document through the
//! same pipeline from the terminal.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_analyst::{
    server, AnalysisConfig, AnalysisRequest, Analyzer, EscalationReason, PipelineObserver,
    Strategy, TaskType,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Spinner that narrates which tier is running.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Uploading");
        bar.set_message("sending document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineObserver for SpinnerObserver {
    fn on_uploaded(&self, file_id: &str, size_bytes: u64) {
        self.bar.println(format!(
            "  {} uploaded {}  {}",
            green("✓"),
            file_id,
            dim(&format!("{size_bytes} bytes"))
        ));
    }

    fn on_strategy_start(&self, strategy: Strategy) {
        self.bar.set_prefix("Analysing");
        self.bar.set_message(strategy.to_string());
    }

    fn on_completion_call(&self, strategy: Strategy, max_tokens: u32) {
        self.bar
            .set_message(format!("{strategy}  {}", dim(&format!("max_tokens={max_tokens}"))));
    }

    fn on_escalation(&self, reason: &EscalationReason) {
        self.bar.println(format!(
            "  {} {}; switching to progressive analysis",
            cyan("⚠"),
            reason
        ));
    }

    fn on_release_failed(&self, file_id: &str, error: &str) {
        self.bar
            .println(format!("  {} could not delete {}: {}", red("✗"), file_id, error));
    }

    fn on_finished(&self, succeeded: bool, duration_ms: u64) {
        self.bar.finish_and_clear();
        let mark = if succeeded { green("✔") } else { red("✘") };
        eprintln!("{} done in {:.1}s", mark, duration_ms as f64 / 1000.0);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP API on the default address
  pdf-analyst serve

  # Summarise a lecture to stdout
  pdf-analyst analyze lecture.pdf --instructions "Summarize key points"

  # Explain a paper and write the Markdown to a file
  pdf-analyst analyze paper.pdf --task explain \
      --instructions "Explain the main theorem step by step" -o paper.md

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY               Upstream API key (required)
  MISTRAL_SUMMARIZE_AGENT_ID    Agent used for --task summarize
  MISTRAL_EXPLAIN_AGENT_ID      Agent used for --task explain
  MISTRAL_BASE_URL              Override the API root (default https://api.mistral.ai/v1)
  PDF_ANALYST_SIZE_THRESHOLD    Bytes above which the extended strategy is used (default 5 MiB)
  PDF_ANALYST_EXTENDED_TIMEOUT  Client-side completion timeout in seconds (default 75)
  RUST_LOG                      Log filter, e.g. pdf_analyst=debug
"#;

/// Summarise or explain PDF documents with a hosted LLM agent.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-analyst",
    version,
    about = "Summarise or explain PDF documents with a hosted LLM agent",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_ANALYST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_ANALYST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "PDF_ANALYST_ADDR", default_value = "127.0.0.1:8787")]
        addr: SocketAddr,
    },
    /// Analyse one local PDF and print the Markdown.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Local PDF file path.
    input: PathBuf,

    /// What to produce.
    #[arg(long, value_enum, default_value = "summarize")]
    task: TaskArg,

    /// Instructions forwarded to the agent.
    #[arg(short, long)]
    instructions: String,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output structured JSON (AnalysisOutput) instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDF_ANALYST_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TaskArg {
    Summarize,
    Explain,
}

impl From<TaskArg> for TaskType {
    fn from(v: TaskArg) -> Self {
        match v {
            TaskArg::Summarize => TaskType::Summarize,
            TaskArg::Explain => TaskType::Explain,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already narrates progress in `analyze`; keep library logs
    // to errors there unless asked for more.
    let spinner_active = matches!(&cli.command, Command::Analyze(a) if !a.no_progress && !a.json)
        && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = AnalysisConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Command::Serve { addr } => {
            let analyzer = Arc::new(Analyzer::new(config).context("Failed to build analyzer")?);
            server::serve(analyzer, addr)
                .await
                .with_context(|| format!("Server on {addr} failed"))?;
        }
        Command::Analyze(args) => run_analyze(config, args, spinner_active).await?,
    }
    Ok(())
}

async fn run_analyze(config: AnalysisConfig, args: AnalyzeArgs, spinner: bool) -> Result<()> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;
    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document.pdf".to_string());

    let mut analyzer = Analyzer::new(config).context("Failed to build analyzer")?;
    if spinner {
        analyzer = analyzer.with_observer(SpinnerObserver::new());
    }

    let request =
        AnalysisRequest::new(bytes, args.instructions, args.task.into()).with_file_name(file_name);
    let output = analyzer.analyze(request).await?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        output.markdown
    };

    match args.output {
        Some(path) => {
            // Atomic write: temp file in the target directory, then rename.
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .with_context(|| format!("Failed to create a file in '{}'", dir.display()))?;
            tmp.write_all(rendered.as_bytes())?;
            tmp.persist(&path)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("{} wrote {}", green("✔"), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

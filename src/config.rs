//! Configuration for the analysis pipeline.
//!
//! Credentials, agent ids, thresholds and timeouts all live in one
//! [`AnalysisConfig`] that is handed to [`crate::Analyzer`] at construction.
//! Nothing reads the environment after that point, so tests can build a
//! config in code and point it at a fake upstream.
//!
//! Use [`AnalysisConfig::from_env`] in the server binary and
//! [`AnalysisConfig::builder`] everywhere else.

use crate::error::AnalysisError;
use crate::request::TaskType;
use std::fmt;
use std::time::Duration;

/// Default upstream API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Documents larger than this start on the extended-timeout strategy.
pub const DEFAULT_SIZE_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Configuration for one [`crate::Analyzer`].
///
/// # Example
/// ```rust
/// use pdf_analyst::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .api_key("test-key")
///     .summarize_agent_id("ag:summarize")
///     .explain_agent_id("ag:explain")
///     .extended_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 4000);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Bearer token for the upstream API. `None` means the deployment is
    /// incomplete; every request then fails with a 500 before any upload.
    pub api_key: Option<String>,

    /// Upstream API root, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Agent used for [`TaskType::Summarize`].
    pub summarize_agent_id: Option<String>,

    /// Agent used for [`TaskType::Explain`].
    pub explain_agent_id: Option<String>,

    /// Byte size above which the extended-timeout strategy is used first.
    /// Default: 5 MiB.
    pub size_threshold_bytes: u64,

    /// Token budget for single-pass, extended and detail completions. Default: 4000.
    pub max_tokens: u32,

    /// Token budget for the outline pass of progressive analysis. Default: 2000.
    pub outline_max_tokens: u32,

    /// Client-side timeout around completion calls in the extended-timeout
    /// and progressive strategies. Default: 75.
    pub extended_timeout_secs: u64,

    /// Transport-level timeout applied by the HTTP client to every call. Default: 120.
    pub request_timeout_secs: u64,

    /// Lifetime requested for signed document URLs. Default: 24.
    pub signed_url_expiry_hours: u32,

    /// Maximum characters of an upstream body kept in errors. Default: 500.
    pub error_body_limit: usize,

    /// Largest inbound multipart body accepted by the HTTP surface. Default: 50 MiB.
    pub max_upload_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            summarize_agent_id: None,
            explain_agent_id: None,
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD,
            max_tokens: 4000,
            outline_max_tokens: 2000,
            extended_timeout_secs: 75,
            request_timeout_secs: 120,
            signed_url_expiry_hours: 24,
            error_body_limit: 500,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("summarize_agent_id", &self.summarize_agent_id)
            .field("explain_agent_id", &self.explain_agent_id)
            .field("size_threshold_bytes", &self.size_threshold_bytes)
            .field("max_tokens", &self.max_tokens)
            .field("outline_max_tokens", &self.outline_max_tokens)
            .field("extended_timeout_secs", &self.extended_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `MISTRAL_API_KEY` | `api_key` |
    /// | `MISTRAL_BASE_URL` | `base_url` |
    /// | `MISTRAL_SUMMARIZE_AGENT_ID` | `summarize_agent_id` |
    /// | `MISTRAL_EXPLAIN_AGENT_ID` | `explain_agent_id` |
    /// | `PDF_ANALYST_SIZE_THRESHOLD` | `size_threshold_bytes` |
    /// | `PDF_ANALYST_EXTENDED_TIMEOUT` | `extended_timeout_secs` |
    ///
    /// Missing credentials are not an error here; they are reported per
    /// request so the server can still start and answer `/health`.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_var("MISTRAL_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(url) = non_empty_var("MISTRAL_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(id) = non_empty_var("MISTRAL_SUMMARIZE_AGENT_ID") {
            builder = builder.summarize_agent_id(id);
        }
        if let Some(id) = non_empty_var("MISTRAL_EXPLAIN_AGENT_ID") {
            builder = builder.explain_agent_id(id);
        }
        if let Some(raw) = non_empty_var("PDF_ANALYST_SIZE_THRESHOLD") {
            let bytes = raw.parse::<u64>().map_err(|_| {
                AnalysisError::InvalidConfig(format!(
                    "PDF_ANALYST_SIZE_THRESHOLD must be a byte count, got '{raw}'"
                ))
            })?;
            builder = builder.size_threshold_bytes(bytes);
        }
        if let Some(raw) = non_empty_var("PDF_ANALYST_EXTENDED_TIMEOUT") {
            let secs = raw.parse::<u64>().map_err(|_| {
                AnalysisError::InvalidConfig(format!(
                    "PDF_ANALYST_EXTENDED_TIMEOUT must be whole seconds, got '{raw}'"
                ))
            })?;
            builder = builder.extended_timeout_secs(secs);
        }
        builder.build()
    }

    /// Agent id configured for `task`, if any.
    pub fn agent_id(&self, task: TaskType) -> Option<&str> {
        match task {
            TaskType::Summarize => self.summarize_agent_id.as_deref(),
            TaskType::Explain => self.explain_agent_id.as_deref(),
        }
    }

    pub fn extended_timeout(&self) -> Duration {
        Duration::from_secs(self.extended_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn summarize_agent_id(mut self, id: impl Into<String>) -> Self {
        self.config.summarize_agent_id = Some(id.into());
        self
    }

    pub fn explain_agent_id(mut self, id: impl Into<String>) -> Self {
        self.config.explain_agent_id = Some(id.into());
        self
    }

    pub fn size_threshold_bytes(mut self, bytes: u64) -> Self {
        self.config.size_threshold_bytes = bytes;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn outline_max_tokens(mut self, n: u32) -> Self {
        self.config.outline_max_tokens = n;
        self
    }

    pub fn extended_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extended_timeout_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.signed_url_expiry_hours = hours.max(1);
        self
    }

    pub fn error_body_limit(mut self, chars: usize) -> Self {
        self.config.error_body_limit = chars;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalysisError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(AnalysisError::InvalidConfig("base URL must not be empty".into()));
        }
        if c.max_tokens == 0 || c.outline_max_tokens == 0 {
            return Err(AnalysisError::InvalidConfig(
                "token budgets must be ≥ 1".into(),
            ));
        }
        if c.extended_timeout_secs == 0 {
            return Err(AnalysisError::InvalidConfig(
                "extended timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

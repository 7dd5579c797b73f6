//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events (targets `siumai_jobs::*`).
//! Binaries and tests that want to see them can install a subscriber here.
//!
//! ```rust,ignore
//! use siumai_jobs::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! init_subscriber(
//!     SubscriberConfig::builder()
//!         .log_level(tracing::Level::DEBUG)
//!         .output_format(OutputFormat::Json)
//!         .build(),
//! )?;
//! ```

use crate::error::JobError;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(JobError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: text, json"
            ))),
        }
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Extra `EnvFilter` directives appended after the crate-level one.
    pub directives: Vec<String>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            directives: Vec::new(),
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            directives: Vec::new(),
        }
    }

    /// `EnvFilter` directive string for this configuration.
    pub fn filter(&self) -> String {
        let level = self.log_level.as_str().to_ascii_lowercase();
        let mut filter = format!("siumai_jobs={level}");
        for directive in &self.directives {
            filter.push(',');
            filter.push_str(directive);
        }
        filter
    }
}

#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    directives: Vec<String>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_level_str(mut self, level: &str) -> Result<Self, JobError> {
        let level = level.trim().parse::<tracing::Level>().map_err(|_| {
            JobError::ConfigurationError(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            directives: self.directives,
        }
    }
}

/// Install a global `fmt` subscriber.
///
/// Returns `Ok(false)` when a global subscriber was already set.
pub fn init_subscriber(config: SubscriberConfig) -> Result<bool, JobError> {
    let filter = tracing_subscriber::EnvFilter::try_new(config.filter())
        .map_err(|e| JobError::ConfigurationError(format!("Invalid log filter: {e}")))?;

    let result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    // an error here only means a global subscriber is already installed
    Ok(result.is_ok())
}

/// Initialize from `SIUMAI_JOBS_LOG_LEVEL` and `SIUMAI_JOBS_LOG_FORMAT`.
pub fn init_from_env() -> Result<bool, JobError> {
    let mut builder = SubscriberConfig::builder();
    if let Ok(level) = std::env::var("SIUMAI_JOBS_LOG_LEVEL") {
        builder = builder.log_level_str(&level)?;
    }
    if let Ok(format) = std::env::var("SIUMAI_JOBS_LOG_FORMAT") {
        builder = builder.output_format(format.parse()?);
    }
    init_subscriber(builder.build())
}

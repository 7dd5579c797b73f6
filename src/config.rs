//! Client configuration.
//!
//! One `JobClientConfig` is built per process and passed by reference into
//! every orchestrator; nothing is read from globals at call time.

use std::time::Duration;

use crate::defaults;
use crate::error::JobError;
use crate::handle::HandleCodec;
use crate::http::HttpConfig;
use crate::schedule::FibonacciBackoff;

/// Poll budget and wait scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Hard ceiling on total wait time inside one poll loop.
    pub max_time: Duration,
    /// Length of one Fibonacci step (waits are 1, 2, 3, 5, ... units).
    pub unit: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_time: defaults::poll::MAX_TIME,
            unit: defaults::poll::UNIT,
        }
    }
}

impl PollOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    pub const fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// A fresh scheduler for one poll loop.
    pub fn scheduler(&self) -> FibonacciBackoff {
        FibonacciBackoff::new(self.max_time).with_unit(self.unit)
    }
}

/// Configuration shared by all orchestrators of a process.
#[derive(Debug, Clone)]
pub struct JobClientConfig {
    pub poll: PollOptions,
    pub separator: String,
    pub settings_suffix: String,
    /// Age after which another poller may take over an unfinished deferred start.
    pub start_claim_ttl: Duration,
    pub http: HttpConfig,
}

impl Default for JobClientConfig {
    fn default() -> Self {
        Self {
            poll: PollOptions::default(),
            separator: defaults::handle::SEPARATOR.to_string(),
            settings_suffix: defaults::store::SETTINGS_SUFFIX.to_string(),
            start_claim_ttl: defaults::store::START_CLAIM_TTL,
            http: HttpConfig::default(),
        }
    }
}

impl JobClientConfig {
    pub fn builder() -> JobClientConfigBuilder {
        JobClientConfigBuilder::default()
    }

    /// Defaults overridden by `SIUMAI_JOBS_*` environment variables.
    pub fn from_env() -> Result<Self, JobError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, JobError> {
        let mut builder = Self::builder();
        if let Some(raw) = lookup(defaults::env::MAX_POLL_SECS) {
            builder = builder.max_poll_time(Duration::from_secs(parse_u64(
                defaults::env::MAX_POLL_SECS,
                &raw,
            )?));
        }
        if let Some(raw) = lookup(defaults::env::POLL_UNIT_MS) {
            builder = builder.poll_unit(Duration::from_millis(parse_u64(
                defaults::env::POLL_UNIT_MS,
                &raw,
            )?));
        }
        if let Some(raw) = lookup(defaults::env::HANDLE_SEPARATOR) {
            builder = builder.separator(raw);
        }
        if let Some(raw) = lookup(defaults::env::START_CLAIM_TTL_SECS) {
            builder = builder.start_claim_ttl(Duration::from_secs(parse_u64(
                defaults::env::START_CLAIM_TTL_SECS,
                &raw,
            )?));
        }
        builder.build()
    }

    pub fn codec(&self) -> Result<HandleCodec, JobError> {
        HandleCodec::new(self.separator.clone())
    }
}

fn parse_u64(name: &str, raw: &str) -> Result<u64, JobError> {
    raw.trim()
        .parse()
        .map_err(|e| JobError::ConfigurationError(format!("{name}={raw:?}: {e}")))
}

/// Builder for `JobClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct JobClientConfigBuilder {
    max_time: Option<Duration>,
    unit: Option<Duration>,
    separator: Option<String>,
    settings_suffix: Option<String>,
    start_claim_ttl: Option<Duration>,
    http: Option<HttpConfig>,
}

impl JobClientConfigBuilder {
    pub fn max_poll_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn poll_unit(mut self, unit: Duration) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn settings_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.settings_suffix = Some(suffix.into());
        self
    }

    pub fn start_claim_ttl(mut self, ttl: Duration) -> Self {
        self.start_claim_ttl = Some(ttl);
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<JobClientConfig, JobError> {
        let base = JobClientConfig::default();
        let poll = PollOptions {
            max_time: self.max_time.unwrap_or(base.poll.max_time),
            unit: self.unit.unwrap_or(base.poll.unit),
        };
        if poll.unit.is_zero() {
            return Err(JobError::ConfigurationError(
                "poll unit must be greater than zero".to_string(),
            ));
        }
        let config = JobClientConfig {
            poll,
            separator: self.separator.unwrap_or(base.separator),
            settings_suffix: self.settings_suffix.unwrap_or(base.settings_suffix),
            start_claim_ttl: self.start_claim_ttl.unwrap_or(base.start_claim_ttl),
            http: self.http.unwrap_or(base.http),
        };
        if config.settings_suffix.is_empty() {
            return Err(JobError::ConfigurationError(
                "settings suffix must not be empty".to_string(),
            ));
        }
        // validates the separator
        config.codec()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = JobClientConfig::builder().build().unwrap();
        assert_eq!(config.poll.max_time, Duration::from_secs(60));
        assert_eq!(config.separator, "XBrandX");
        assert_eq!(config.settings_suffix, "_settings");
        assert_eq!(config.start_claim_ttl, Duration::from_secs(300));
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SIUMAI_JOBS_MAX_POLL_SECS", "120"),
            ("SIUMAI_JOBS_POLL_UNIT_MS", "250"),
            ("SIUMAI_JOBS_HANDLE_SEPARATOR", "::"),
            ("SIUMAI_JOBS_START_CLAIM_TTL_SECS", "30"),
        ]);
        let config =
            JobClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.poll.max_time, Duration::from_secs(120));
        assert_eq!(config.poll.unit, Duration::from_millis(250));
        assert_eq!(config.separator, "::");
        assert_eq!(config.start_claim_ttl, Duration::from_secs(30));
    }

    #[test]
    fn invalid_env_values_are_configuration_errors() {
        let err = JobClientConfig::from_lookup(|k| {
            (k == "SIUMAI_JOBS_MAX_POLL_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, JobError::ConfigurationError(_)));

        let err = JobClientConfig::builder()
            .poll_unit(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, JobError::ConfigurationError(_)));

        assert!(JobClientConfig::builder().separator("").build().is_err());
    }

    #[test]
    fn scheduler_uses_unit() {
        let mut scheduler = PollOptions::new()
            .with_unit(Duration::from_millis(10))
            .with_max_time(Duration::from_secs(1))
            .scheduler();
        assert_eq!(scheduler.next_wait(), Some(Duration::from_millis(10)));
        assert_eq!(scheduler.next_wait(), Some(Duration::from_millis(20)));
    }
}

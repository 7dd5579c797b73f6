//! Default values shared across the crate.

pub mod handle {
    /// Separator joining a primary and a secondary resource ID in a job handle.
    pub const SEPARATOR: &str = "XBrandX";
}

pub mod store {
    use std::time::Duration;

    /// Suffix appended to the primary ID to form the side-channel record key.
    pub const SETTINGS_SUFFIX: &str = "_settings";

    /// How long a claimed but unfinished deferred start blocks other pollers.
    pub const START_CLAIM_TTL: Duration = Duration::from_secs(300);

    /// Attempts at recording a started job before giving up on the write.
    pub const RECORD_WRITE_ATTEMPTS: usize = 3;
}

pub mod poll {
    use std::time::Duration;

    /// Wall-clock budget for a blocking or awaited poll loop.
    pub const MAX_TIME: Duration = Duration::from_secs(60);

    /// Unit that scales the Fibonacci wait sequence.
    pub const UNIT: Duration = Duration::from_secs(1);

    /// Upper bound on result pages drained for one job.
    pub const MAX_PAGES: usize = 1000;

    /// Slice used by the blocking driver to observe cancellation while sleeping.
    pub const BLOCKING_SLICE: Duration = Duration::from_millis(50);
}

pub mod http {
    use std::time::Duration;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const USER_AGENT: &str = concat!("siumai-jobs/", env!("CARGO_PKG_VERSION"));
}

pub mod env {
    pub const MAX_POLL_SECS: &str = "SIUMAI_JOBS_MAX_POLL_SECS";
    pub const POLL_UNIT_MS: &str = "SIUMAI_JOBS_POLL_UNIT_MS";
    pub const HANDLE_SEPARATOR: &str = "SIUMAI_JOBS_HANDLE_SEPARATOR";
    pub const START_CLAIM_TTL_SECS: &str = "SIUMAI_JOBS_START_CLAIM_TTL_SECS";
}

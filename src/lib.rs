//! # siumai-jobs - Asynchronous vendor job orchestration
//!
//! Slow vendor operations (transcription, document analysis, video analysis)
//! run as remote jobs. This crate gives them one two-call contract:
//!
//! 1. `launch_job` starts the work and returns an opaque [`JobHandle`]
//! 2. `get_job_result` checks it once and classifies the answer as pending,
//!    succeeded, failed or deprecated (the vendor no longer knows the job)
//!
//! `wait_for_result` polls with Fibonacci backoff under a hard time budget.
//! Jobs whose start depends on an auxiliary resource (e.g. a custom
//! vocabulary) are launched in two phases, with progress kept in a small
//! side-channel record in the blob store.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use siumai_jobs::prelude::*;
//!
//! let config = JobClientConfig::from_env()?;
//! let vendor = HttpJobVendor::<DocumentAnalysisConfig>::new(
//!     HttpJobEndpoints::new("acme", "https://api.acme.test/jobs", "https://api.acme.test/jobs/{job_id}"),
//!     &config.http,
//! )?
//! .with_api_key("sk-...");
//! let jobs = JobOrchestrator::new(vendor, DocumentNormalizer, &config)?;
//!
//! let request = DocumentAnalysisConfig::new(JobInput::stored("in/report.pdf"), [DocumentFeature::Tables]).build()?;
//! let handle = jobs.launch_job(request).await?;
//! match jobs.wait_for_result(&handle, None).await? {
//!     JobOutcome::Succeeded { result, .. } => println!("{} blocks", result.blocks.len()),
//!     JobOutcome::Pending => println!("still running; poll {handle} later"),
//!     JobOutcome::Deprecated { message, .. } => println!("stale handle: {message}"),
//! }
//! ```

#![deny(unsafe_code)]

pub mod classify;
pub mod config;
pub mod defaults;
pub mod error;
pub mod handle;
pub mod http;
pub mod operations;
pub mod orchestrator;
pub mod poll;
pub mod schedule;
pub mod store;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{JobError, VendorError};
pub use handle::JobHandle;
pub use types::JobOutcome;

/// Common imports.
pub mod prelude {
    pub use crate::classify::{CanonicalState, NotFoundSignatures, StatusClassifier, StatusTable};
    pub use crate::config::{JobClientConfig, PollOptions};
    pub use crate::error::{ErrorCategory, JobError, VendorError};
    pub use crate::handle::{HandleCodec, JobHandle};
    pub use crate::http::{HttpConfig, HttpJobEndpoints, HttpJobVendor, WebhookRelay};
    pub use crate::operations::{
        DocumentAnalysisConfig, DocumentFeature, DocumentNormalizer, TranscriptNormalizer,
        TranscriptionJobConfig, VideoAnalysisConfig, VideoFeature,
    };
    pub use crate::orchestrator::{JobOrchestrator, MultiPhaseOrchestrator};
    pub use crate::schedule::FibonacciBackoff;
    pub use crate::store::{BlobStore, FsBlobStore, InMemoryBlobStore};
    pub use crate::traits::{
        AsyncJobCapability, AuxiliaryVendor, DeferredRequest, JobVendor, LaunchRequest,
        ResultNormalizer,
    };
    pub use crate::types::{AuxiliaryState, JobInput, JobOutcome, StatusPage};
    pub use crate::utils::CancelHandle;
}

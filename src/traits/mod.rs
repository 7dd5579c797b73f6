//! Capability and collaborator traits.
//!
//! - `JobVendor` / `AuxiliaryVendor`: the vendor "start" and "status" calls
//! - `LaunchRequest` / `DeferredRequest`: per-operation launch configuration
//! - `ResultNormalizer`: raw terminal payload to canonical result
//! - `AsyncJobCapability`: the public two-call contract

pub mod job;
pub mod normalizer;
pub mod request;
pub mod vendor;

pub use job::AsyncJobCapability;
pub use normalizer::{FnNormalizer, RawPages, ResultNormalizer, normalizer_fn};
pub use request::{DeferredRequest, LaunchRequest};
pub use vendor::{AuxiliaryVendor, JobVendor};

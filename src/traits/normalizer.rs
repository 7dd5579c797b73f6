//! Result normalizer seam.
//!
//! Normalizers map a terminal raw payload to the canonical result record. They
//! are invoked only on a classified success, and their errors propagate to the
//! caller unchanged.

use serde_json::Value;

use crate::error::JobError;

pub trait ResultNormalizer: Send + Sync {
    type Output: Send;

    /// Normalize all result pages (in order) of a finished job.
    fn normalize(&self, pages: &[Value]) -> Result<Self::Output, JobError>;
}

/// Normalizer built from a closure.
pub struct FnNormalizer<F> {
    f: F,
}

pub fn normalizer_fn<F, O>(f: F) -> FnNormalizer<F>
where
    F: Fn(&[Value]) -> Result<O, JobError> + Send + Sync,
    O: Send,
{
    FnNormalizer { f }
}

impl<F, O> ResultNormalizer for FnNormalizer<F>
where
    F: Fn(&[Value]) -> Result<O, JobError> + Send + Sync,
    O: Send,
{
    type Output = O;

    fn normalize(&self, pages: &[Value]) -> Result<O, JobError> {
        (self.f)(pages)
    }
}

/// Identity normalizer returning the raw pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPages;

impl ResultNormalizer for RawPages {
    type Output = Vec<Value>;

    fn normalize(&self, pages: &[Value]) -> Result<Vec<Value>, JobError> {
        Ok(pages.to_vec())
    }
}

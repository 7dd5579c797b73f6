//! Per-operation launch configurations and result normalizers.
//!
//! Each configuration is validated (via `validator`) in its `build()` and
//! again at launch, so an orchestrator never sends an out-of-range parameter
//! to a vendor.

pub mod document;
pub mod transcription;
pub mod video;

pub use document::{DocumentAnalysis, DocumentAnalysisConfig, DocumentFeature, DocumentNormalizer, PageRange};
pub use transcription::{Transcript, TranscriptNormalizer, TranscriptionJobConfig};
pub use video::{VideoAnalysisConfig, VideoFeature, VideoLabel, VideoLabelNormalizer};

use serde::Serializer;
use serde_json::Value;

use crate::error::JobError;
use crate::types::JobInput;

/// Serialize a job input as the blob key the vendor reads it from.
pub(crate) fn serialize_input_key<S: Serializer>(input: &JobInput, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(input.key())
}

/// First string found at any of `pointers`.
pub(crate) fn str_at<'a>(page: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .find_map(|p| page.pointer(p).and_then(Value::as_str))
}

pub(crate) fn missing(what: &str) -> JobError {
    JobError::NormalizationError(format!("result payload has no {what}"))
}

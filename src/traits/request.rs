//! Launch request seams.

use crate::error::JobError;
use crate::store::SideChannelRecord;
use crate::types::JobInput;

/// Common shape of a per-operation launch configuration.
pub trait LaunchRequest: Send + Sync {
    /// Explicit job name; a random one is generated when `None`.
    fn job_name(&self) -> Option<&str> {
        None
    }

    /// Input that may have to be uploaded before the job starts.
    fn input(&self) -> Option<&JobInput> {
        None
    }

    /// Checked once at launch, before anything is uploaded or started.
    fn validate_request(&self) -> Result<(), JobError> {
        Ok(())
    }
}

/// A launch whose primary start can be deferred behind an auxiliary resource.
///
/// The request is persisted in a side-channel record at launch and rebuilt
/// from it when the auxiliary resource becomes ready.
pub trait DeferredRequest: LaunchRequest + Sized {
    /// Specification of the auxiliary resource (e.g. vocabulary phrases).
    type Auxiliary: Send + Sync;

    /// `None` when the launch needs no auxiliary resource.
    fn auxiliary(&self) -> Option<&Self::Auxiliary>;

    fn to_record(&self, job_name: &str) -> SideChannelRecord;

    fn from_record(record: &SideChannelRecord) -> Result<Self, JobError>;
}

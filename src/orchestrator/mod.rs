//! Two-call job protocol.
//!
//! - `JobOrchestrator`: the vendor job starts at launch
//! - `MultiPhaseOrchestrator`: the start may be deferred until an auxiliary
//!   resource is ready, with progress kept in a side-channel record

pub mod multi_phase;
pub mod single;

pub use multi_phase::MultiPhaseOrchestrator;
pub use single::JobOrchestrator;

use std::sync::Arc;

use crate::error::JobError;
use crate::handle::HandleCodec;
use crate::store::{BlobStore, upload_file, upload_input};
use crate::traits::LaunchRequest;
use crate::types::JobInput;

/// Job name for a launch: the explicit one, or a fresh UUID.
pub(crate) fn job_name_for<R: LaunchRequest + ?Sized>(request: &R) -> String {
    request
        .job_name()
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Validate the request and pick a job name the codec can carry.
///
/// Runs before any upload or vendor call, so a launch that cannot produce a
/// handle leaves nothing behind.
pub(crate) fn plan_launch<R: LaunchRequest + ?Sized>(
    codec: &HandleCodec,
    request: &R,
    composite: bool,
) -> Result<String, JobError> {
    request.validate_request()?;
    let job_name = job_name_for(request);
    if composite {
        codec.check_primary(&job_name)?;
    } else {
        codec.check_id(&job_name)?;
    }
    Ok(job_name)
}

/// Upload the request input when it is not in the blob store yet.
pub(crate) async fn prepare_input<R: LaunchRequest + ?Sized>(
    blobs: Option<&Arc<dyn BlobStore>>,
    request: &R,
) -> Result<(), JobError> {
    let Some(input) = request.input() else {
        return Ok(());
    };
    if !input.needs_upload() {
        return Ok(());
    }
    let Some(blobs) = blobs else {
        return Err(JobError::ConfigurationError(
            "job input needs uploading but no blob store is configured".to_string(),
        ));
    };
    match input {
        JobInput::Bytes { key, bytes } => {
            upload_input(blobs.as_ref(), key, bytes.clone(), None).await?;
        }
        JobInput::File { key, path } => {
            upload_file(blobs.as_ref(), key, path).await?;
        }
        JobInput::Stored(_) => {}
    }
    Ok(())
}

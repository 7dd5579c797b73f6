//! Public two-call job contract.

use async_trait::async_trait;

use crate::error::JobError;
use crate::handle::JobHandle;
use crate::types::JobOutcome;
use crate::utils::CancelHandle;

/// Launch / poll contract shared by every slow vendor operation.
///
/// 1. `launch_job` starts the work and returns an opaque handle
/// 2. `get_job_result` checks it once; safe to call repeatedly
/// 3. `wait_for_result` polls with backoff until terminal or out of budget
#[async_trait]
pub trait AsyncJobCapability: Send + Sync {
    type Request: Send;
    type Output: Send;

    async fn launch_job(&self, request: Self::Request) -> Result<JobHandle, JobError>;

    async fn get_job_result(
        &self,
        handle: &JobHandle,
    ) -> Result<JobOutcome<Self::Output>, JobError>;

    /// Returns `JobOutcome::Pending` (not an error) when the budget runs out.
    async fn wait_for_result(
        &self,
        handle: &JobHandle,
        cancel: Option<&CancelHandle>,
    ) -> Result<JobOutcome<Self::Output>, JobError>;
}

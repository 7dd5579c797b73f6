//! Single-phase orchestration.

use async_trait::async_trait;
use std::sync::Arc;

use super::{plan_launch, prepare_input};
use crate::config::{JobClientConfig, PollOptions};
use crate::error::JobError;
use crate::handle::{HandleCodec, JobHandle};
use crate::poll::poll_vendor;
use crate::store::BlobStore;
use crate::traits::{AsyncJobCapability, JobVendor, LaunchRequest, ResultNormalizer};
use crate::types::JobOutcome;
use crate::utils::CancelHandle;

/// Launches a vendor job immediately and polls it through its status call.
pub struct JobOrchestrator<V, N> {
    vendor: V,
    normalizer: N,
    blobs: Option<Arc<dyn BlobStore>>,
    codec: HandleCodec,
    poll: PollOptions,
}

impl<V, N> JobOrchestrator<V, N>
where
    V: JobVendor,
    V::Request: LaunchRequest,
    N: ResultNormalizer,
{
    pub fn new(vendor: V, normalizer: N, config: &JobClientConfig) -> Result<Self, JobError> {
        Ok(Self {
            vendor,
            normalizer,
            blobs: None,
            codec: config.codec()?,
            poll: config.poll,
        })
    }

    /// Blob store receiving inputs that need uploading.
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn vendor(&self) -> &V {
        &self.vendor
    }

    fn primary_id(&self, handle: &JobHandle) -> Result<String, JobError> {
        let decoded = self.codec.decode(handle)?;
        if decoded.secondary.is_some() {
            return Err(JobError::InvalidHandle(format!(
                "handle {handle} carries an auxiliary resource; single-phase jobs never do"
            )));
        }
        Ok(decoded.primary)
    }

    async fn check(
        &self,
        job_id: &str,
        options: PollOptions,
        cancel: Option<&CancelHandle>,
    ) -> Result<JobOutcome<N::Output>, JobError> {
        let report = poll_vendor(&self.vendor, job_id, options.scheduler(), cancel).await?;
        report.into_job_outcome(job_id, &self.normalizer)
    }
}

#[async_trait]
impl<V, N> AsyncJobCapability for JobOrchestrator<V, N>
where
    V: JobVendor,
    V::Request: LaunchRequest,
    N: ResultNormalizer,
{
    type Request = V::Request;
    type Output = N::Output;

    async fn launch_job(&self, request: V::Request) -> Result<JobHandle, JobError> {
        let job_name = plan_launch(&self.codec, &request, false)?;
        prepare_input(self.blobs.as_ref(), &request).await?;
        let job_id = self
            .vendor
            .start_job(&job_name, &request, None)
            .await
            .map_err(|e| e.into_provider_error())?;
        tracing::info!(
            target: "siumai_jobs::orchestrator",
            provider = %self.vendor.provider_id(),
            job_id = %job_id,
            "job launched"
        );
        self.codec.encode(&job_id, None)
    }

    async fn get_job_result(&self, handle: &JobHandle) -> Result<JobOutcome<N::Output>, JobError> {
        let job_id = self.primary_id(handle)?;
        // zero budget: a single status check (plus any result pages)
        let once = self.poll.with_max_time(std::time::Duration::ZERO);
        self.check(&job_id, once, None).await
    }

    async fn wait_for_result(
        &self,
        handle: &JobHandle,
        cancel: Option<&CancelHandle>,
    ) -> Result<JobOutcome<N::Output>, JobError> {
        let job_id = self.primary_id(handle)?;
        self.check(&job_id, self.poll, cancel).await
    }
}

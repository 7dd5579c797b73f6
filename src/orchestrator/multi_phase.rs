//! Multi-phase orchestration.
//!
//! When a launch needs an auxiliary resource (a custom vocabulary, a trained
//! model, ...), `launch_job` only starts provisioning it and writes a
//! side-channel record holding the deferred request. Each later status check
//! advances the record:
//!
//! ```text
//!  launch ──> record(unclaimed) ──┬─ aux provisioning ──> Pending
//!                                 ├─ aux ready  ──> claim, start(aux)  ──> started ──> Pending
//!                                 └─ aux failed ──> claim, start(none) ──> started ──> Pending
//!  record(starting) ──> Pending
//!  record(started)  ──> ordinary status check of the primary job
//! ```
//!
//! The claim is a conditional write on the record's blob version, so of
//! several concurrent pollers exactly one calls the vendor. Until that call
//! returns and the vendor job ID is recorded, everyone else sees Pending. A
//! failed start hands the claim back; a claim whose holder never reports back
//! can be taken over once it is older than the configured TTL.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{plan_launch, prepare_input};
use crate::classify::ErrorClass;
use crate::config::{JobClientConfig, PollOptions};
use crate::error::JobError;
use crate::handle::{HandleCodec, JobHandle};
use crate::poll::poll_vendor;
use crate::schedule::FibonacciBackoff;
use crate::store::{BlobStore, RecordStore, VersionedRecord};
use crate::traits::{AsyncJobCapability, AuxiliaryVendor, DeferredRequest, JobVendor, ResultNormalizer};
use crate::types::{AuxiliaryState, JobOutcome};
use crate::utils::CancelHandle;
use crate::utils::cancel::sleep_or_cancel;

const TARGET: &str = "siumai_jobs::orchestrator";

/// Where a handle stands after side-channel gating.
enum Gate {
    /// The primary job is not running yet, or has only just been started.
    Pending,
    /// The primary job runs under this vendor ID.
    Proceed(String),
    /// The vendor no longer knows the auxiliary resource.
    Deprecated(String),
}

/// Orchestrates vendor jobs whose start may wait on an auxiliary resource.
pub struct MultiPhaseOrchestrator<V, A, N> {
    vendor: V,
    auxiliary: A,
    normalizer: N,
    blobs: Arc<dyn BlobStore>,
    records: RecordStore<Arc<dyn BlobStore>>,
    codec: HandleCodec,
    poll: PollOptions,
    start_claim_ttl: Duration,
}

impl<V, A, N> MultiPhaseOrchestrator<V, A, N>
where
    V: JobVendor,
    V::Request: DeferredRequest,
    A: AuxiliaryVendor<<V::Request as DeferredRequest>::Auxiliary>,
    N: ResultNormalizer,
{
    pub fn new(
        vendor: V,
        auxiliary: A,
        normalizer: N,
        blobs: Arc<dyn BlobStore>,
        config: &JobClientConfig,
    ) -> Result<Self, JobError> {
        Ok(Self {
            vendor,
            auxiliary,
            normalizer,
            records: RecordStore::new(blobs.clone()).with_suffix(config.settings_suffix.clone()),
            blobs,
            codec: config.codec()?,
            poll: config.poll,
            start_claim_ttl: config.start_claim_ttl,
        })
    }

    pub fn vendor(&self) -> &V {
        &self.vendor
    }

    pub fn records(&self) -> &RecordStore<Arc<dyn BlobStore>> {
        &self.records
    }

    /// Advance the side-channel record of `primary` by at most one step.
    async fn gate(&self, primary: &str, auxiliary_id: &str) -> Result<Gate, JobError> {
        let current = self.records.load(primary).await?.ok_or_else(|| {
            JobError::RecordNotFound(format!(
                "no side-channel record {} for job {primary}",
                self.records.key(primary)
            ))
        })?;
        let record = &current.record;
        if record.is_started() {
            return Ok(Gate::Proceed(record.vendor_job_id().to_string()));
        }
        if record.is_starting() {
            if !record.start_claim_expired(self.start_claim_ttl) {
                tracing::debug!(target: TARGET, job_id = %primary, "deferred start in progress");
                return Ok(Gate::Pending);
            }
            tracing::warn!(
                target: TARGET,
                job_id = %primary,
                updated_at = %record.updated_at,
                "taking over an expired start claim"
            );
            let auxiliary = (!record.auxiliary_abandoned).then_some(auxiliary_id);
            self.start_deferred(current, auxiliary).await?;
            return Ok(Gate::Pending);
        }
        if record.auxiliary_abandoned {
            // an earlier degraded start failed; the resource may be gone
            self.start_deferred(current, None).await?;
            return Ok(Gate::Pending);
        }

        let state = match self.auxiliary.auxiliary_state(auxiliary_id).await {
            Ok(state) => state,
            Err(e) => {
                let classifier = self.vendor.classifier();
                return match classifier.classify_error(&e) {
                    ErrorClass::NotFound => Ok(Gate::Deprecated(e.message)),
                    ErrorClass::Provider => Err(e.into_provider_error()),
                };
            }
        };
        match state {
            AuxiliaryState::Provisioning => {
                tracing::debug!(
                    target: TARGET,
                    job_id = %primary,
                    auxiliary_id = %auxiliary_id,
                    "auxiliary resource still provisioning"
                );
            }
            AuxiliaryState::Ready => {
                self.start_deferred(current, Some(auxiliary_id)).await?;
            }
            AuxiliaryState::Failed => {
                tracing::warn!(
                    target: TARGET,
                    provider = %self.vendor.provider_id(),
                    job_id = %primary,
                    auxiliary_id = %auxiliary_id,
                    "auxiliary resource failed; starting degraded job without it"
                );
                self.start_deferred(current, None).await?;
            }
        }
        Ok(Gate::Pending)
    }

    /// Claim the record, start the primary job, then record it as started.
    ///
    /// `auxiliary_id = None` is a degraded start; the failed auxiliary
    /// resource is deleted once the vendor accepted the job.
    async fn start_deferred(
        &self,
        current: VersionedRecord,
        auxiliary_id: Option<&str>,
    ) -> Result<(), JobError> {
        let request = <V::Request as DeferredRequest>::from_record(&current.record)?;
        let job_name = current.record.primary_job_name.clone();
        let degraded = auxiliary_id.is_none();

        let claimed = match self.records.claim_start(&current, degraded).await {
            Ok(claimed) => claimed,
            Err(JobError::ConflictError(_)) => {
                // someone else advanced the record first
                tracing::debug!(target: TARGET, job_id = %job_name, "side-channel record already claimed");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let job_id = match self.vendor.start_job(&job_name, &request, auxiliary_id).await {
            Ok(job_id) => job_id,
            Err(e) => {
                if let Err(release) = self.records.release_claim(&claimed).await {
                    tracing::warn!(target: TARGET, job_id = %job_name, err = %release, "could not release side-channel record");
                }
                return Err(e.into_provider_error());
            }
        };
        tracing::info!(
            target: TARGET,
            provider = %self.vendor.provider_id(),
            job_id = %job_id,
            auxiliary_id = auxiliary_id.unwrap_or("-"),
            "deferred job started"
        );

        // the vendor job exists now; a failed write must not fail the check
        if let Err(e) = self.records.mark_started(&claimed, &job_id).await {
            tracing::warn!(
                target: TARGET,
                job_id = %job_id,
                err = %e,
                "deferred job started but its side-channel record could not be updated"
            );
        }

        if degraded {
            if let Some(failed) = claimed.record.auxiliary_resource_name.as_deref() {
                if let Err(e) = self.auxiliary.delete_auxiliary(failed).await {
                    tracing::debug!(target: TARGET, auxiliary_id = %failed, err = %e, "could not delete failed auxiliary resource");
                }
            }
        }
        Ok(())
    }

    async fn check(
        &self,
        job_id: &str,
        scheduler: FibonacciBackoff,
        cancel: Option<&CancelHandle>,
    ) -> Result<JobOutcome<N::Output>, JobError> {
        let report = poll_vendor(&self.vendor, job_id, scheduler, cancel).await?;
        report.into_job_outcome(job_id, &self.normalizer)
    }
}

#[async_trait]
impl<V, A, N> AsyncJobCapability for MultiPhaseOrchestrator<V, A, N>
where
    V: JobVendor,
    V::Request: DeferredRequest,
    A: AuxiliaryVendor<<V::Request as DeferredRequest>::Auxiliary>,
    N: ResultNormalizer,
{
    type Request = V::Request;
    type Output = N::Output;

    async fn launch_job(&self, request: V::Request) -> Result<JobHandle, JobError> {
        let deferred = request.auxiliary().is_some();
        let job_name = plan_launch(&self.codec, &request, deferred)?;
        if deferred && self.records.load(&job_name).await?.is_some() {
            return Err(JobError::ConflictError(format!(
                "job name {job_name} already has a side-channel record"
            )));
        }
        prepare_input(Some(&self.blobs), &request).await?;

        let Some(spec) = request.auxiliary() else {
            let job_id = self
                .vendor
                .start_job(&job_name, &request, None)
                .await
                .map_err(|e| e.into_provider_error())?;
            tracing::info!(target: TARGET, provider = %self.vendor.provider_id(), job_id = %job_id, "job launched");
            return self.codec.encode(&job_id, None);
        };

        let auxiliary_id = self
            .auxiliary
            .create_auxiliary(&format!("{job_name}-aux"), spec)
            .await
            .map_err(|e| e.into_provider_error())?;
        let record = request
            .to_record(&job_name)
            .with_auxiliary_resource(auxiliary_id.clone());
        let written = async {
            let handle = self.codec.encode(&job_name, Some(&auxiliary_id))?;
            self.records.create(&record).await?;
            Ok::<_, JobError>(handle)
        }
        .await;
        let handle = match written {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(cleanup) = self.auxiliary.delete_auxiliary(&auxiliary_id).await {
                    tracing::warn!(target: TARGET, auxiliary_id = %auxiliary_id, err = %cleanup, "could not delete orphaned auxiliary resource");
                }
                return Err(e);
            }
        };
        tracing::info!(
            target: TARGET,
            provider = %self.vendor.provider_id(),
            job_id = %job_name,
            auxiliary_id = %auxiliary_id,
            "job deferred until auxiliary resource is ready"
        );
        Ok(handle)
    }

    async fn get_job_result(&self, handle: &JobHandle) -> Result<JobOutcome<N::Output>, JobError> {
        let decoded = self.codec.decode(handle)?;
        let job_id = match decoded.secondary {
            None => decoded.primary,
            Some(auxiliary_id) => match self.gate(&decoded.primary, &auxiliary_id).await? {
                Gate::Pending => return Ok(JobOutcome::Pending),
                Gate::Proceed(job_id) => job_id,
                Gate::Deprecated(message) => {
                    return Ok(JobOutcome::Deprecated {
                        job_id: decoded.primary,
                        message,
                    });
                }
            },
        };
        let once = self.poll.with_max_time(Duration::ZERO);
        self.check(&job_id, once.scheduler(), None).await
    }

    async fn wait_for_result(
        &self,
        handle: &JobHandle,
        cancel: Option<&CancelHandle>,
    ) -> Result<JobOutcome<N::Output>, JobError> {
        let decoded = self.codec.decode(handle)?;
        // gating and polling share one budget
        let mut scheduler = self.poll.scheduler();
        let job_id = match decoded.secondary {
            None => decoded.primary,
            Some(auxiliary_id) => loop {
                match self.gate(&decoded.primary, &auxiliary_id).await? {
                    Gate::Proceed(job_id) => break job_id,
                    Gate::Deprecated(message) => {
                        return Ok(JobOutcome::Deprecated {
                            job_id: decoded.primary,
                            message,
                        });
                    }
                    Gate::Pending => {
                        let Some(wait) = scheduler.next_wait() else {
                            return Ok(JobOutcome::Pending);
                        };
                        if !sleep_or_cancel(wait, cancel).await {
                            return Err(JobError::Cancelled(format!(
                                "waiting for job {} was cancelled",
                                decoded.primary
                            )));
                        }
                    }
                }
            },
        };
        self.check(&job_id, scheduler, cancel).await
    }
}

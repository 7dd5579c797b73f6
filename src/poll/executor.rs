//! Async and blocking poll drivers.

use std::future::Future;
use std::time::Duration;

use super::machine::{PollAction, PollMachine, PollOutcome};
use crate::classify::StatusClassifier;
use crate::error::{JobError, VendorError};
use crate::schedule::FibonacciBackoff;
use crate::traits::{JobVendor, ResultNormalizer};
use crate::types::{JobOutcome, StatusPage};
use crate::utils::CancelHandle;
use crate::utils::cancel::{blocking_sleep_or_cancel, sleep_or_cancel};

/// Outcome of one poll loop with its bookkeeping.
#[derive(Debug)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Status calls issued, result pages included.
    pub attempts: u32,
    /// Total wait time spent between attempts.
    pub waited: Duration,
}

impl PollReport {
    /// Turn the classified outcome into the caller-facing result.
    ///
    /// The normalizer runs only on success; its errors are returned as-is.
    pub fn into_job_outcome<N: ResultNormalizer + ?Sized>(
        self,
        job_id: &str,
        normalizer: &N,
    ) -> Result<JobOutcome<N::Output>, JobError> {
        match self.outcome {
            PollOutcome::Pending => Ok(JobOutcome::Pending),
            PollOutcome::Succeeded(pages) => {
                let result = normalizer.normalize(&pages)?;
                Ok(JobOutcome::Succeeded { result, raw: pages })
            }
            PollOutcome::Failed(error) => Err(error),
            PollOutcome::Deprecated { message } => Ok(JobOutcome::Deprecated {
                job_id: job_id.to_string(),
                message,
            }),
        }
    }
}

fn cancelled(job_id: &str) -> JobError {
    JobError::Cancelled(format!("polling of job {job_id} was cancelled"))
}

fn into_report(machine: PollMachine<'_>) -> Result<PollReport, JobError> {
    let attempts = machine.attempts();
    let waited = machine.waited();
    let outcome = machine.finish().ok_or_else(|| {
        JobError::InternalError("poll loop ended without an outcome".to_string())
    })?;
    Ok(PollReport {
        outcome,
        attempts,
        waited,
    })
}

/// Poll until the job is terminal or the scheduler's budget is spent.
///
/// `fetch` performs one vendor status call; it receives the page cursor when
/// result pages are being drained. Suspends only at `fetch` and between
/// attempts; both points observe `cancel`.
pub async fn poll_until_terminal<F, Fut>(
    job_id: &str,
    classifier: &StatusClassifier,
    scheduler: FibonacciBackoff,
    cancel: Option<&CancelHandle>,
    mut fetch: F,
) -> Result<PollReport, JobError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<StatusPage, VendorError>>,
{
    let mut machine = PollMachine::new(job_id, classifier, scheduler);
    let mut action = machine.start();
    loop {
        action = match action {
            PollAction::Fetch { cursor } => {
                let response = match cancel {
                    Some(handle) => tokio::select! {
                        biased;
                        _ = handle.cancelled() => return Err(cancelled(job_id)),
                        response = fetch(cursor) => response,
                    },
                    None => fetch(cursor).await,
                };
                machine.on_response(response)
            }
            PollAction::Sleep(wait) => {
                if !sleep_or_cancel(wait, cancel).await {
                    return Err(cancelled(job_id));
                }
                machine.on_slept()
            }
            PollAction::Done(_) => break,
        };
    }
    into_report(machine)
}

/// Blocking variant of [`poll_until_terminal`]; the calling thread sleeps.
pub fn poll_until_terminal_blocking<F>(
    job_id: &str,
    classifier: &StatusClassifier,
    scheduler: FibonacciBackoff,
    cancel: Option<&CancelHandle>,
    mut fetch: F,
) -> Result<PollReport, JobError>
where
    F: FnMut(Option<&str>) -> Result<StatusPage, VendorError>,
{
    let mut machine = PollMachine::new(job_id, classifier, scheduler);
    let mut action = machine.start();
    loop {
        action = match action {
            PollAction::Fetch { cursor } => {
                if cancel.is_some_and(CancelHandle::is_cancelled) {
                    return Err(cancelled(job_id));
                }
                machine.on_response(fetch(cursor.as_deref()))
            }
            PollAction::Sleep(wait) => {
                if !blocking_sleep_or_cancel(wait, cancel) {
                    return Err(cancelled(job_id));
                }
                machine.on_slept()
            }
            PollAction::Done(_) => break,
        };
    }
    into_report(machine)
}

/// Poll a [`JobVendor`]'s status endpoint with its own classifier.
pub async fn poll_vendor<V: JobVendor + ?Sized>(
    vendor: &V,
    job_id: &str,
    scheduler: FibonacciBackoff,
    cancel: Option<&CancelHandle>,
) -> Result<PollReport, JobError> {
    poll_until_terminal(
        job_id,
        vendor.classifier(),
        scheduler,
        cancel,
        move |cursor| async move { vendor.job_status(job_id, cursor.as_deref()).await },
    )
    .await
}

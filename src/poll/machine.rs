//! Poll state machine.

use serde_json::Value;
use std::time::Duration;

use crate::classify::{CanonicalState, ErrorClass, StatusClassifier};
use crate::defaults;
use crate::error::{JobError, VendorError};
use crate::schedule::FibonacciBackoff;
use crate::types::StatusPage;

/// Result of driving one job to a terminal state or out of budget.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Budget exhausted while the job was still running.
    Pending,
    /// Terminal success; every result page in order.
    Succeeded(Vec<Value>),
    /// Terminal failure or unclassified vendor error.
    Failed(JobError),
    /// The vendor no longer knows the job.
    Deprecated { message: String },
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq)]
pub enum PollAction {
    /// Call the vendor status endpoint, for a result page when `cursor` is set.
    Fetch { cursor: Option<String> },
    /// Wait, then report back with [`PollMachine::on_slept`].
    Sleep(Duration),
    Done(PollOutcomeKind),
}

/// Discriminant of the final outcome; take the outcome with [`PollMachine::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcomeKind {
    Pending,
    Succeeded,
    Failed,
    Deprecated,
}

#[derive(Debug)]
enum Phase {
    Polling,
    Draining,
    Finished(PollOutcome),
}

/// Drives one job: status checks, backoff waits and result-page draining.
#[derive(Debug)]
pub struct PollMachine<'a> {
    job_id: String,
    classifier: &'a StatusClassifier,
    scheduler: FibonacciBackoff,
    pages: Vec<Value>,
    attempts: u32,
    max_pages: usize,
    phase: Phase,
}

impl<'a> PollMachine<'a> {
    pub fn new(
        job_id: impl Into<String>,
        classifier: &'a StatusClassifier,
        scheduler: FibonacciBackoff,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            classifier,
            scheduler,
            pages: Vec::new(),
            attempts: 0,
            max_pages: defaults::poll::MAX_PAGES,
            phase: Phase::Polling,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Number of status calls issued, result pages included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total wait time issued so far.
    pub fn waited(&self) -> Duration {
        self.scheduler.elapsed()
    }

    pub fn start(&mut self) -> PollAction {
        self.fetch(None)
    }

    pub fn on_slept(&mut self) -> PollAction {
        self.fetch(None)
    }

    fn fetch(&mut self, cursor: Option<String>) -> PollAction {
        self.attempts += 1;
        PollAction::Fetch { cursor }
    }

    fn done(&mut self, outcome: PollOutcome) -> PollAction {
        let kind = match &outcome {
            PollOutcome::Pending => PollOutcomeKind::Pending,
            PollOutcome::Succeeded(_) => PollOutcomeKind::Succeeded,
            PollOutcome::Failed(_) => PollOutcomeKind::Failed,
            PollOutcome::Deprecated { .. } => PollOutcomeKind::Deprecated,
        };
        self.phase = Phase::Finished(outcome);
        PollAction::Done(kind)
    }

    /// Feed the result of the last `Fetch`.
    pub fn on_response(&mut self, response: Result<StatusPage, VendorError>) -> PollAction {
        match self.phase {
            Phase::Polling => self.on_status(response),
            Phase::Draining => self.on_page(response),
            Phase::Finished(_) => PollAction::Done(self.finished_kind()),
        }
    }

    fn finished_kind(&self) -> PollOutcomeKind {
        match &self.phase {
            Phase::Finished(PollOutcome::Succeeded(_)) => PollOutcomeKind::Succeeded,
            Phase::Finished(PollOutcome::Failed(_)) => PollOutcomeKind::Failed,
            Phase::Finished(PollOutcome::Deprecated { .. }) => PollOutcomeKind::Deprecated,
            _ => PollOutcomeKind::Pending,
        }
    }

    fn on_status(&mut self, response: Result<StatusPage, VendorError>) -> PollAction {
        let page = match response {
            Ok(page) => page,
            Err(error) => {
                return match self.classifier.classify_error(&error) {
                    ErrorClass::NotFound => {
                        tracing::debug!(target: "siumai_jobs::poll", job_id = %self.job_id, "job not found at vendor");
                        self.done(PollOutcome::Deprecated {
                            message: error.message,
                        })
                    }
                    ErrorClass::Provider => self.done(PollOutcome::Failed(error.into_provider_error())),
                };
            }
        };

        match self.classifier.classify(&page.status) {
            None => self.done(PollOutcome::Failed(JobError::ProviderError {
                code: None,
                message: format!("unrecognized job status {:?}", page.status),
                details: Some(page.payload),
            })),
            Some(CanonicalState::Failed) => {
                let message = page
                    .error_message
                    .unwrap_or_else(|| format!("job finished with status {}", page.status));
                self.done(PollOutcome::Failed(JobError::ProviderError {
                    code: None,
                    message,
                    details: Some(page.payload),
                }))
            }
            Some(CanonicalState::Pending) => match self.scheduler.next_wait() {
                Some(wait) => {
                    tracing::debug!(
                        target: "siumai_jobs::poll",
                        job_id = %self.job_id,
                        status = %page.status,
                        wait_ms = wait.as_millis() as u64,
                        "job pending"
                    );
                    PollAction::Sleep(wait)
                }
                None => {
                    tracing::debug!(
                        target: "siumai_jobs::poll",
                        job_id = %self.job_id,
                        elapsed_ms = self.scheduler.elapsed().as_millis() as u64,
                        "poll budget exhausted; job still pending"
                    );
                    self.done(PollOutcome::Pending)
                }
            },
            Some(CanonicalState::Succeeded) => self.accept_page(page),
        }
    }

    fn on_page(&mut self, response: Result<StatusPage, VendorError>) -> PollAction {
        match response {
            Err(error) => {
                let error = match error.into_provider_error() {
                    JobError::ProviderError { code, message, details } => JobError::ProviderError {
                        code,
                        message: format!("failed to fetch result page {}: {message}", self.pages.len() + 1),
                        details,
                    },
                    other => other,
                };
                self.done(PollOutcome::Failed(error))
            }
            Ok(page) => match self.classifier.classify(&page.status) {
                Some(CanonicalState::Succeeded) => self.accept_page(page),
                _ => self.done(PollOutcome::Failed(JobError::ProviderError {
                    code: None,
                    message: format!(
                        "job status changed to {:?} while draining result pages",
                        page.status
                    ),
                    details: Some(page.payload),
                })),
            },
        }
    }

    fn accept_page(&mut self, page: StatusPage) -> PollAction {
        self.pages.push(page.payload);
        tracing::trace!(target: "siumai_jobs::poll", job_id = %self.job_id, page = self.pages.len(), "result page received");
        match page.next_token {
            Some(_) if self.pages.len() >= self.max_pages => {
                self.done(PollOutcome::Failed(JobError::provider(
                    None,
                    format!("result exceeded {} pages", self.max_pages),
                )))
            }
            Some(cursor) => {
                self.phase = Phase::Draining;
                self.fetch(Some(cursor))
            }
            None => {
                let pages = std::mem::take(&mut self.pages);
                self.done(PollOutcome::Succeeded(pages))
            }
        }
    }

    /// Take the final outcome. `None` until a `Done` action was produced.
    pub fn finish(self) -> Option<PollOutcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}

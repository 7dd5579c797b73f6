//! In-process fake vendors for orchestration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use siumai_jobs::prelude::*;
use siumai_jobs::store::{BlobVersion, StoredBlob};

/// Scripted `JobVendor`: status answers are served in order, then the
/// fallback answer repeats.
pub struct FakeVendor<R> {
    classifier: StatusClassifier,
    script: Mutex<VecDeque<Result<StatusPage, VendorError>>>,
    fallback: StatusPage,
    start_error: Mutex<Option<VendorError>>,
    start_delay: Option<Duration>,
    unknown_not_found: bool,
    assigned_id: Option<String>,
    /// IDs the vendor has accepted, in order.
    pub known: Mutex<Vec<String>>,
    pub starts: Mutex<Vec<(String, Option<String>)>>,
    pub status_ids: Mutex<Vec<String>>,
    pub cursors: Mutex<Vec<Option<String>>>,
    pub status_calls: AtomicU32,
    _request: PhantomData<fn(&R)>,
}

impl<R> FakeVendor<R> {
    pub fn new() -> Self {
        Self {
            classifier: StatusClassifier::new(StatusTable::aws_style(), NotFoundSignatures::default()),
            script: Mutex::new(VecDeque::new()),
            fallback: StatusPage::new("IN_PROGRESS", json!({"status": "IN_PROGRESS"})),
            start_error: Mutex::new(None),
            start_delay: None,
            unknown_not_found: false,
            assigned_id: None,
            known: Mutex::new(Vec::new()),
            starts: Mutex::new(Vec::new()),
            status_ids: Mutex::new(Vec::new()),
            cursors: Mutex::new(Vec::new()),
            status_calls: AtomicU32::new(0),
            _request: PhantomData,
        }
    }

    /// Vendor assigns `id` instead of using the client job name.
    pub fn assigning(mut self, id: &str) -> Self {
        self.assigned_id = Some(id.to_string());
        self
    }

    /// `start_job` takes `delay` before the vendor knows the job.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Status checks of jobs that were never started answer 404.
    pub fn unknown_jobs_not_found(mut self) -> Self {
        self.unknown_not_found = true;
        self
    }

    pub fn then(self, answer: Result<StatusPage, VendorError>) -> Self {
        self.script.lock().unwrap().push_back(answer);
        self
    }

    pub fn then_status(self, status: &str, payload: serde_json::Value) -> Self {
        self.then(Ok(StatusPage::new(status, payload)))
    }

    pub fn fail_next_start(&self, error: VendorError) {
        *self.start_error.lock().unwrap() = Some(error);
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn status_count(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Send + Sync> JobVendor for FakeVendor<R> {
    type Request = R;

    fn provider_id(&self) -> &str {
        "fake"
    }

    fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    async fn start_job(
        &self,
        job_name: &str,
        _request: &R,
        auxiliary: Option<&str>,
    ) -> Result<String, VendorError> {
        if let Some(error) = self.start_error.lock().unwrap().take() {
            return Err(error);
        }
        self.starts
            .lock()
            .unwrap()
            .push((job_name.to_string(), auxiliary.map(str::to_string)));
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        let job_id = self.assigned_id.clone().unwrap_or_else(|| job_name.to_string());
        self.known.lock().unwrap().push(job_id.clone());
        Ok(job_id)
    }

    async fn job_status(
        &self,
        job_id: &str,
        cursor: Option<&str>,
    ) -> Result<StatusPage, VendorError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_ids.lock().unwrap().push(job_id.to_string());
        self.cursors.lock().unwrap().push(cursor.map(str::to_string));
        // yield so concurrent callers interleave
        tokio::task::yield_now().await;
        if self.unknown_not_found
            && !self.known.lock().unwrap().iter().any(|id| id == job_id)
        {
            return Err(VendorError::http(404, "Job not found"));
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Scripted auxiliary resource vendor (e.g. custom vocabularies).
pub struct FakeAuxiliary {
    states: Mutex<VecDeque<Result<AuxiliaryState, VendorError>>>,
    last: AuxiliaryState,
    pub created: Mutex<Vec<(String, Vec<String>)>>,
    pub deleted: Mutex<Vec<String>>,
    pub state_calls: AtomicU32,
}

impl FakeAuxiliary {
    /// Reports `last` once the scripted states are used up.
    pub fn settling_on(last: AuxiliaryState) -> Self {
        Self {
            states: Mutex::new(VecDeque::new()),
            last,
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            state_calls: AtomicU32::new(0),
        }
    }

    pub fn then(self, state: Result<AuxiliaryState, VendorError>) -> Self {
        self.states.lock().unwrap().push_back(state);
        self
    }

    pub fn state_count(&self) -> u32 {
        self.state_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuxiliaryVendor<Vec<String>> for FakeAuxiliary {
    async fn create_auxiliary(&self, name: &str, spec: &Vec<String>) -> Result<String, VendorError> {
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), spec.clone()));
        Ok("vocab-1".to_string())
    }

    async fn auxiliary_state(&self, id: &str) -> Result<AuxiliaryState, VendorError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.deleted.lock().unwrap().iter().any(|d| d == id) {
            return Err(VendorError::http(404, "vocabulary does not exist"));
        }
        self.states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.last))
    }

    async fn delete_auxiliary(&self, id: &str) -> Result<(), VendorError> {
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// In-memory blob store whose conditional writes fail while their payload
/// contains `marker`, up to `failures` times.
pub struct FlakyBlobStore {
    inner: InMemoryBlobStore,
    marker: String,
    failures: AtomicU32,
}

impl FlakyBlobStore {
    pub fn failing_writes_containing(marker: &str, failures: u32) -> Self {
        Self {
            inner: InMemoryBlobStore::new(),
            marker: marker.to_string(),
            failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, JobError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<BlobVersion, JobError> {
        self.inner.put(key, bytes).await
    }

    async fn put_if_version(
        &self,
        key: &str,
        bytes: Vec<u8>,
        expected: Option<&BlobVersion>,
    ) -> Result<BlobVersion, JobError> {
        if String::from_utf8_lossy(&bytes).contains(&self.marker)
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(JobError::StorageError(format!("write to {key} refused")));
        }
        self.inner.put_if_version(key, bytes, expected).await
    }

    async fn delete(&self, key: &str) -> Result<(), JobError> {
        self.inner.delete(key).await
    }
}

/// Millisecond-scale poll budget for tests.
pub fn fast_config(max_ms: u64) -> JobClientConfig {
    JobClientConfig::builder()
        .max_poll_time(Duration::from_millis(max_ms))
        .poll_unit(Duration::from_millis(1))
        .build()
        .unwrap()
}

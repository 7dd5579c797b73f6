//! Side-channel records.
//!
//! A record remembers the parameters of a primary job whose start was
//! deferred until an auxiliary resource became usable. It is written once at
//! launch, claimed by the poller that starts the primary job, and marked
//! started once the vendor accepted it:
//!
//! ```text
//!  confirmed=false ──claim──> confirmed=true, startState=starting ──> startState=started
//!        ^                                   │
//!        └──────────── release (start failed)┘
//! ```

use chrono::{DateTime, Utc};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BlobStore, BlobVersion};
use crate::defaults;
use crate::error::JobError;

/// Progress of the deferred primary start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartState {
    /// A poller holds the claim and is calling the vendor.
    Starting,
    /// The vendor accepted the primary job.
    Started,
}

/// Deferred launch state persisted as `"{primary}_settings"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideChannelRecord {
    pub primary_job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_resource_name: Option<String>,
    #[serde(default)]
    pub auxiliary_confirmed: bool,
    /// The auxiliary resource failed; the primary job starts without it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auxiliary_abandoned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_state: Option<StartState>,
    /// Vendor ID of the primary job when it differs from the job name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_job_id: Option<String>,
    /// Remaining deferred request parameters.
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SideChannelRecord {
    pub fn new(primary_job_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            primary_job_name: primary_job_name.into(),
            target_language: None,
            speaker_count: None,
            auxiliary_resource_name: None,
            auxiliary_confirmed: false,
            auxiliary_abandoned: false,
            start_state: None,
            vendor_job_id: None,
            extra: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn with_speaker_count(mut self, count: u32) -> Self {
        self.speaker_count = Some(count);
        self
    }

    pub fn with_auxiliary_resource(mut self, name: impl Into<String>) -> Self {
        self.auxiliary_resource_name = Some(name.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The primary job runs at the vendor and can be status-checked.
    ///
    /// Confirmed records without a start state count as started.
    pub fn is_started(&self) -> bool {
        self.auxiliary_confirmed && self.start_state != Some(StartState::Starting)
    }

    pub fn is_starting(&self) -> bool {
        self.start_state == Some(StartState::Starting)
    }

    /// A start claim whose holder has not reported back within `ttl`.
    pub fn start_claim_expired(&self, ttl: Duration) -> bool {
        self.is_starting()
            && (Utc::now() - self.updated_at)
                .to_std()
                .is_ok_and(|age| age >= ttl)
    }

    /// ID the vendor knows the primary job by.
    pub fn vendor_job_id(&self) -> &str {
        self.vendor_job_id
            .as_deref()
            .unwrap_or(&self.primary_job_name)
    }
}

/// A record together with the blob version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    pub record: SideChannelRecord,
    pub version: BlobVersion,
}

/// Typed access to side-channel records in a blob store.
#[derive(Debug, Clone)]
pub struct RecordStore<S> {
    blobs: S,
    suffix: String,
}

impl<S: BlobStore> RecordStore<S> {
    pub fn new(blobs: S) -> Self {
        Self {
            blobs,
            suffix: defaults::store::SETTINGS_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    pub fn key(&self, primary: &str) -> String {
        format!("{primary}{}", self.suffix)
    }

    pub async fn load(&self, primary: &str) -> Result<Option<VersionedRecord>, JobError> {
        let key = self.key(primary);
        let Some(blob) = self.blobs.get(&key).await? else {
            return Ok(None);
        };
        let record: SideChannelRecord = serde_json::from_slice(&blob.bytes)
            .map_err(|e| JobError::ParseError(format!("corrupt side-channel record {key}: {e}")))?;
        Ok(Some(VersionedRecord {
            record,
            version: blob.version,
        }))
    }

    /// Write a new record; fails with `ConflictError` if one already exists.
    pub async fn create(&self, record: &SideChannelRecord) -> Result<VersionedRecord, JobError> {
        let key = self.key(&record.primary_job_name);
        let version = self
            .blobs
            .put_if_version(&key, serde_json::to_vec(record)?, None)
            .await?;
        tracing::debug!(target: "siumai_jobs::store", key = %key, "side-channel record created");
        Ok(VersionedRecord {
            record: record.clone(),
            version,
        })
    }

    /// Replace the record if it is still at `current.version`.
    pub async fn replace(
        &self,
        current: &VersionedRecord,
        mut record: SideChannelRecord,
    ) -> Result<VersionedRecord, JobError> {
        record.updated_at = Utc::now();
        let key = self.key(&record.primary_job_name);
        let version = self
            .blobs
            .put_if_version(&key, serde_json::to_vec(&record)?, Some(&current.version))
            .await?;
        Ok(VersionedRecord { record, version })
    }

    /// Claim the deferred start, conditional on the read version.
    ///
    /// `degraded` marks the auxiliary resource as abandoned, so a retry after a
    /// failed start never asks for it again.
    pub async fn claim_start(
        &self,
        current: &VersionedRecord,
        degraded: bool,
    ) -> Result<VersionedRecord, JobError> {
        let mut record = current.record.clone();
        record.auxiliary_confirmed = true;
        record.auxiliary_abandoned |= degraded;
        record.start_state = Some(StartState::Starting);
        let claimed = self.replace(current, record).await?;
        tracing::debug!(
            target: "siumai_jobs::store",
            job_id = %claimed.record.primary_job_name,
            degraded = claimed.record.auxiliary_abandoned,
            "side-channel record claimed"
        );
        Ok(claimed)
    }

    /// Give a claim back after the vendor refused the start.
    pub async fn release_claim(&self, claimed: &VersionedRecord) -> Result<VersionedRecord, JobError> {
        let mut record = claimed.record.clone();
        record.auxiliary_confirmed = false;
        record.start_state = None;
        self.replace(claimed, record).await
    }

    /// Record that the vendor accepted the primary job as `vendor_job_id`.
    ///
    /// A write that loses its precondition or fails is retried against a fresh
    /// read of the record.
    pub async fn mark_started(
        &self,
        claimed: &VersionedRecord,
        vendor_job_id: &str,
    ) -> Result<VersionedRecord, JobError> {
        let primary = claimed.record.primary_job_name.clone();
        let mut current = claimed.clone();
        let mut attempt = 1;
        loop {
            let mut record = current.record.clone();
            record.auxiliary_confirmed = true;
            record.start_state = Some(StartState::Started);
            record.vendor_job_id = (vendor_job_id != primary).then(|| vendor_job_id.to_string());
            match self.replace(&current, record).await {
                Ok(started) => return Ok(started),
                Err(e) if attempt < defaults::store::RECORD_WRITE_ATTEMPTS => {
                    tracing::debug!(
                        target: "siumai_jobs::store",
                        job_id = %primary,
                        attempt,
                        err = %e,
                        "retrying side-channel record write"
                    );
                    attempt += 1;
                    current = self.load(&primary).await?.ok_or_else(|| {
                        JobError::RecordNotFound(format!("side-channel record of {primary} vanished"))
                    })?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! Status Classifier
//!
//! Maps vendor status vocabularies onto one canonical state, and vendor call
//! failures onto "job not found" (deprecated handle) versus ordinary provider
//! errors. Both mappings are plain tables so each vendor's rules can be read
//! and tested on their own.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::error::{JobError, VendorError, VendorErrorKind};

/// Canonical job state, independent of vendor vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalState {
    Pending,
    Succeeded,
    Failed,
}

impl CanonicalState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Finite vendor status vocabulary.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    exact: HashMap<String, CanonicalState>,
    folded: HashMap<String, CanonicalState>,
}

impl StatusTable {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, CanonicalState)>) -> Self {
        let mut table = Self::default();
        for (token, state) in entries {
            table = table.with(token, state);
        }
        table
    }

    pub fn with(mut self, token: &str, state: CanonicalState) -> Self {
        self.exact.insert(token.to_string(), state);
        self.folded.insert(token.to_ascii_lowercase(), state);
        self
    }

    /// Exact match first, then ASCII case-insensitive. `None` for unknown tokens.
    pub fn classify(&self, token: &str) -> Option<CanonicalState> {
        self.exact
            .get(token)
            .or_else(|| self.folded.get(&token.trim().to_ascii_lowercase()))
            .copied()
    }

    /// `QUEUED / IN_PROGRESS / SUCCEEDED / FAILED` style vocabularies.
    pub fn aws_style() -> Self {
        use CanonicalState::*;
        Self::new([
            ("SUBMITTED", Pending),
            ("QUEUED", Pending),
            ("IN_PROGRESS", Pending),
            ("SUCCEEDED", Succeeded),
            ("COMPLETED", Succeeded),
            ("PARTIAL_SUCCESS", Succeeded),
            ("FAILED", Failed),
            ("ERROR", Failed),
        ])
    }

    /// Long-running operation vocabularies (`RUNNING / DONE / ERROR`).
    pub fn google_operation() -> Self {
        use CanonicalState::*;
        Self::new([
            ("RUNNING", Pending),
            ("PENDING", Pending),
            ("DONE", Succeeded),
            ("ERROR", Failed),
            ("CANCELLED", Failed),
        ])
    }

    /// Lowercase vocabularies common to REST task APIs.
    pub fn generic() -> Self {
        use CanonicalState::*;
        Self::new([
            ("pending", Pending),
            ("queued", Pending),
            ("processing", Pending),
            ("running", Pending),
            ("in_progress", Pending),
            ("succeeded", Succeeded),
            ("success", Succeeded),
            ("completed", Succeeded),
            ("done", Succeeded),
            ("finished", Succeeded),
            ("failed", Failed),
            ("fail", Failed),
            ("error", Failed),
            ("cancelled", Failed),
        ])
    }
}

/// How a vendor call failure is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// The vendor does not know the job: the handle is stale.
    NotFound,
    /// Anything else.
    Provider,
}

/// Signatures that identify a "job not found" failure.
#[derive(Debug, Clone)]
pub struct NotFoundSignatures {
    statuses: Vec<u16>,
    patterns: Vec<Regex>,
}

const DEFAULT_NOT_FOUND_PATTERNS: &[&str] = &[
    r"job\s+not\s+found",
    r"couldn't find the requested job",
    r"does not exist",
    r"invalid job id",
];

impl Default for NotFoundSignatures {
    fn default() -> Self {
        let mut signatures = Self::empty().with_status(404);
        signatures.patterns = DEFAULT_NOT_FOUND_PATTERNS
            .iter()
            .filter_map(|p| compile(p).ok())
            .collect();
        signatures
    }
}

fn compile(pattern: &str) -> Result<Regex, JobError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| JobError::ConfigurationError(format!("invalid not-found pattern: {e}")))
}

impl NotFoundSignatures {
    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self {
            statuses: Vec::new(),
            patterns: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.statuses.push(status);
        self
    }

    /// Add a case-insensitive regular expression matched against the error message.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, JobError> {
        self.patterns.push(compile(pattern)?);
        Ok(self)
    }

    pub fn matches(&self, error: &VendorError) -> bool {
        if error.kind != VendorErrorKind::Http {
            return false;
        }
        if error.status.is_some_and(|s| self.statuses.contains(&s)) {
            return true;
        }
        self.patterns.iter().any(|p| p.is_match(&error.message))
    }
}

/// Vendor-parametrised classifier: a status table plus not-found signatures.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    table: StatusTable,
    not_found: NotFoundSignatures,
}

impl StatusClassifier {
    pub fn new(table: StatusTable, not_found: NotFoundSignatures) -> Self {
        Self { table, not_found }
    }

    pub fn classify(&self, token: &str) -> Option<CanonicalState> {
        self.table.classify(token)
    }

    pub fn classify_error(&self, error: &VendorError) -> ErrorClass {
        if self.not_found.matches(error) {
            ErrorClass::NotFound
        } else {
            ErrorClass::Provider
        }
    }

    /// Convert a status-call failure into the error callers see.
    pub fn error_for(&self, job_id: &str, error: VendorError) -> JobError {
        match self.classify_error(&error) {
            ErrorClass::NotFound => JobError::deprecated(job_id, error.message),
            ErrorClass::Provider => error.into_provider_error(),
        }
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(StatusTable::generic(), NotFoundSignatures::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aws_vocabulary() {
        let table = StatusTable::aws_style();
        assert_eq!(table.classify("IN_PROGRESS"), Some(CanonicalState::Pending));
        assert_eq!(table.classify("SUCCEEDED"), Some(CanonicalState::Succeeded));
        assert_eq!(table.classify("FAILED"), Some(CanonicalState::Failed));
        assert_eq!(table.classify("succeeded"), Some(CanonicalState::Succeeded));
        assert_eq!(table.classify("EXPLODED"), None);
    }

    #[test]
    fn not_found_by_status_and_message() {
        let classifier = StatusClassifier::new(StatusTable::aws_style(), NotFoundSignatures::default());
        assert_eq!(
            classifier.classify_error(&VendorError::http(404, "nope")),
            ErrorClass::NotFound
        );
        assert_eq!(
            classifier.classify_error(&VendorError::http(
                400,
                "BadRequestException: The requested job couldn't be found. Job not found."
            )),
            ErrorClass::NotFound
        );
        assert_eq!(
            classifier.classify_error(&VendorError::message(
                "The specified job does not exist"
            )),
            ErrorClass::NotFound
        );
        assert_eq!(
            classifier.classify_error(&VendorError::http(500, "boom")),
            ErrorClass::Provider
        );
    }

    #[test]
    fn transport_and_malformed_errors_are_never_not_found() {
        let classifier = StatusClassifier::default();
        assert_eq!(
            classifier.classify_error(&VendorError::transport("job not found")),
            ErrorClass::Provider
        );
        let err = classifier.error_for("job1", VendorError::malformed("bad utf-8"));
        assert_eq!(err.to_string(), "Provider error (500): internal server error");
    }

    #[test]
    fn custom_signatures() {
        let signatures = NotFoundSignatures::empty()
            .with_pattern(r"^InvalidJobIdException")
            .unwrap();
        let classifier = StatusClassifier::new(StatusTable::generic(), signatures);
        assert!(matches!(
            classifier.error_for("j", VendorError::http(400, "InvalidJobIdException: gone")),
            JobError::DeprecatedJob { .. }
        ));
        // 404 is not in this table
        assert!(matches!(
            classifier.error_for("j", VendorError::http(404, "missing route")),
            JobError::ProviderError { code: Some(404), .. }
        ));
        assert!(NotFoundSignatures::empty().with_pattern("(").is_err());
    }
}

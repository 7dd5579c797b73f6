//! Speech-to-text jobs.
//!
//! A transcription with custom vocabulary runs in two phases: the vocabulary
//! is provisioned first and the transcription starts once it is ready (or
//! without it, if provisioning fails). See `MultiPhaseOrchestrator`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use super::{missing, serialize_input_key, str_at};
use crate::error::JobError;
use crate::store::SideChannelRecord;
use crate::traits::{DeferredRequest, LaunchRequest, ResultNormalizer};
use crate::types::JobInput;

const PROFANITY_FILTER: &str = "profanityFilter";
const INPUT_KEY: &str = "inputKey";

/// Launch configuration of a transcription job.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_vocabulary"))]
pub struct TranscriptionJobConfig {
    #[validate(length(min = 2, max = 16))]
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 30))]
    pub speaker_count: Option<u32>,
    /// Custom vocabulary phrases; non-empty means a multi-phase launch.
    #[serde(skip)]
    pub vocabulary: Vec<String>,
    pub profanity_filter: bool,
    #[serde(skip)]
    #[validate(length(min = 1, max = 200))]
    pub job_name: Option<String>,
    #[serde(rename = "mediaKey", serialize_with = "serialize_input_key")]
    pub input: JobInput,
}

fn validate_vocabulary(config: &TranscriptionJobConfig) -> Result<(), ValidationError> {
    if config.vocabulary.iter().any(|phrase| phrase.trim().is_empty()) {
        return Err(ValidationError::new("vocabulary")
            .with_message("vocabulary phrases must not be blank".into()));
    }
    Ok(())
}

impl TranscriptionJobConfig {
    pub fn new(language: impl Into<String>, input: JobInput) -> Self {
        Self {
            language: language.into(),
            speaker_count: None,
            vocabulary: Vec::new(),
            profanity_filter: false,
            job_name: None,
            input,
        }
    }

    pub fn with_speaker_count(mut self, count: u32) -> Self {
        self.speaker_count = Some(count);
        self
    }

    pub fn with_vocabulary<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_profanity_filter(mut self, enabled: bool) -> Self {
        self.profanity_filter = enabled;
        self
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<Self, JobError> {
        self.validate()?;
        Ok(self)
    }
}

impl LaunchRequest for TranscriptionJobConfig {
    fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }

    fn input(&self) -> Option<&JobInput> {
        Some(&self.input)
    }

    fn validate_request(&self) -> Result<(), JobError> {
        Ok(self.validate()?)
    }
}

impl DeferredRequest for TranscriptionJobConfig {
    type Auxiliary = Vec<String>;

    fn auxiliary(&self) -> Option<&Vec<String>> {
        (!self.vocabulary.is_empty()).then_some(&self.vocabulary)
    }

    fn to_record(&self, job_name: &str) -> SideChannelRecord {
        let mut record = SideChannelRecord::new(job_name)
            .with_target_language(self.language.clone())
            .with_extra(PROFANITY_FILTER, Value::Bool(self.profanity_filter))
            .with_extra(INPUT_KEY, Value::String(self.input.key().to_string()));
        if let Some(count) = self.speaker_count {
            record = record.with_speaker_count(count);
        }
        record
    }

    /// The rebuilt request reads its (already uploaded) input from the store.
    fn from_record(record: &SideChannelRecord) -> Result<Self, JobError> {
        let language = record.target_language.clone().ok_or_else(|| {
            JobError::ParseError(format!(
                "side-channel record of {} has no target language",
                record.primary_job_name
            ))
        })?;
        let input_key = record
            .extra
            .get(INPUT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                JobError::ParseError(format!(
                    "side-channel record of {} has no input key",
                    record.primary_job_name
                ))
            })?;
        let mut config = Self::new(language, JobInput::stored(input_key))
            .with_job_name(record.primary_job_name.clone())
            .with_profanity_filter(
                record
                    .extra
                    .get(PROFANITY_FILTER)
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            );
        config.speaker_count = record.speaker_count;
        config.build()
    }
}

/// Canonical transcription result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Joins the transcript text of every result page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptNormalizer;

const TEXT_POINTERS: &[&str] = &["/transcript", "/results/transcripts/0/transcript", "/text"];
const LANGUAGE_POINTERS: &[&str] = &["/language_code", "/languageCode", "/language"];

impl ResultNormalizer for TranscriptNormalizer {
    type Output = Transcript;

    fn normalize(&self, pages: &[Value]) -> Result<Transcript, JobError> {
        let parts: Vec<&str> = pages
            .iter()
            .filter_map(|page| str_at(page, TEXT_POINTERS))
            .collect();
        if parts.is_empty() {
            return Err(missing("transcript text"));
        }
        Ok(Transcript {
            text: parts.join(" "),
            language: pages
                .iter()
                .find_map(|page| str_at(page, LANGUAGE_POINTERS))
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> TranscriptionJobConfig {
        TranscriptionJobConfig::new("en-US", JobInput::stored("calls/1.wav"))
    }

    #[test]
    fn speaker_count_bounds() {
        assert!(config().with_speaker_count(1).build().is_ok());
        assert!(config().with_speaker_count(30).build().is_ok());
        assert!(matches!(
            config().with_speaker_count(0).build(),
            Err(JobError::InvalidParameter(_))
        ));
        assert!(config().with_speaker_count(31).build().is_err());
    }

    #[test]
    fn blank_vocabulary_phrase_is_rejected() {
        assert!(config().with_vocabulary(["siumai", " "]).build().is_err());
        assert!(config().with_vocabulary(["siumai"]).build().is_ok());
    }

    #[test]
    fn auxiliary_only_with_vocabulary() {
        assert!(config().auxiliary().is_none());
        let with_vocab = config().with_vocabulary(["kubectl"]);
        assert_eq!(with_vocab.auxiliary().map(Vec::len), Some(1));
    }

    #[test]
    fn record_round_trip_keeps_deferred_parameters() {
        let original = config()
            .with_speaker_count(2)
            .with_profanity_filter(true)
            .with_vocabulary(["kubectl"]);
        let record = original.to_record("job123");
        assert_eq!(record.target_language.as_deref(), Some("en-US"));
        assert_eq!(record.speaker_count, Some(2));

        let rebuilt = TranscriptionJobConfig::from_record(&record).unwrap();
        assert_eq!(rebuilt.job_name.as_deref(), Some("job123"));
        assert_eq!(rebuilt.speaker_count, Some(2));
        assert!(rebuilt.profanity_filter);
        assert_eq!(rebuilt.input, JobInput::stored("calls/1.wav"));
        // the vocabulary now lives in the auxiliary resource
        assert!(rebuilt.vocabulary.is_empty());
    }

    #[test]
    fn record_without_language_is_rejected() {
        let record = SideChannelRecord::new("job123");
        assert!(matches!(
            TranscriptionJobConfig::from_record(&record),
            Err(JobError::ParseError(_))
        ));
    }

    #[test]
    fn start_body_shape() {
        let body = serde_json::to_value(config().with_speaker_count(3)).unwrap();
        assert_eq!(
            body,
            json!({"language": "en-US", "speakerCount": 3, "profanityFilter": false, "mediaKey": "calls/1.wav"})
        );
    }

    #[test]
    fn transcript_pages_are_joined() {
        let pages = vec![
            json!({"results": {"transcripts": [{"transcript": "hello"}]}, "language_code": "en-US"}),
            json!({"results": {"transcripts": [{"transcript": "world"}]}}),
        ];
        let transcript = TranscriptNormalizer.normalize(&pages).unwrap();
        assert_eq!(transcript.text, "hello world");
        assert_eq!(transcript.language.as_deref(), Some("en-US"));

        assert!(matches!(
            TranscriptNormalizer.normalize(&[json!({"status": "COMPLETED"})]),
            Err(JobError::NormalizationError(_))
        ));
    }
}

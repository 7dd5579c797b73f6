//! Video analysis jobs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{missing, serialize_input_key};
use crate::error::JobError;
use crate::traits::{LaunchRequest, ResultNormalizer};
use crate::types::JobInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoFeature {
    Labels,
    Faces,
    Text,
    Moderation,
}

/// Launch configuration of a video analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysisConfig {
    #[serde(rename = "videoKey", serialize_with = "serialize_input_key")]
    pub input: JobInput,
    #[validate(length(min = 1))]
    pub features: Vec<VideoFeature>,
    /// Minimum confidence (percent) for reported detections.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_confidence: Option<f32>,
    #[serde(skip)]
    #[validate(length(min = 1, max = 200))]
    pub job_name: Option<String>,
}

impl VideoAnalysisConfig {
    /// Label detection on `input`.
    pub fn new(input: JobInput) -> Self {
        Self {
            input,
            features: vec![VideoFeature::Labels],
            min_confidence: None,
            job_name: None,
        }
    }

    pub fn with_features<I: IntoIterator<Item = VideoFeature>>(mut self, features: I) -> Self {
        self.features = features.into_iter().collect();
        self
    }

    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Self, JobError> {
        self.validate()?;
        Ok(self)
    }

    /// Normalizer applying this configuration's confidence floor.
    pub fn normalizer(&self) -> VideoLabelNormalizer {
        VideoLabelNormalizer {
            min_confidence: self.min_confidence.unwrap_or(0.0),
        }
    }
}

impl LaunchRequest for VideoAnalysisConfig {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLabel {
    pub name: String,
    pub confidence: f32,
    pub timestamp_ms: u64,
}

/// Flattens `Labels` of every page, dropping those below the confidence floor.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoLabelNormalizer {
    min_confidence: f32,
}

impl VideoLabelNormalizer {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }
}

impl ResultNormalizer for VideoLabelNormalizer {
    type Output = Vec<VideoLabel>;

    fn normalize(&self, pages: &[Value]) -> Result<Vec<VideoLabel>, JobError> {
        let mut labels = Vec::new();
        for page in pages {
            let entries = page
                .get("Labels")
                .and_then(Value::as_array)
                .ok_or_else(|| missing("labels"))?;
            for entry in entries {
                let name = entry
                    .pointer("/Label/Name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing("label name"))?;
                let confidence = entry
                    .pointer("/Label/Confidence")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0) as f32;
                if confidence < self.min_confidence {
                    continue;
                }
                labels.push(VideoLabel {
                    name: name.to_string(),
                    confidence,
                    timestamp_ms: entry.get("Timestamp").and_then(Value::as_u64).unwrap_or(0),
                });
            }
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn confidence_range() {
        let base = VideoAnalysisConfig::new(JobInput::stored("v.mp4"));
        assert!(base.clone().with_min_confidence(0.0).build().is_ok());
        assert!(base.clone().with_min_confidence(100.0).build().is_ok());
        assert!(base.clone().with_min_confidence(100.5).build().is_err());
        assert!(base.with_features([]).build().is_err());
    }

    #[test]
    fn labels_below_floor_are_dropped() {
        let config = VideoAnalysisConfig::new(JobInput::stored("v.mp4")).with_min_confidence(80.0);
        let pages = vec![
            json!({"Labels": [
                {"Timestamp": 0, "Label": {"Name": "Cat", "Confidence": 97.5}},
                {"Timestamp": 40, "Label": {"Name": "Dog", "Confidence": 41.0}}
            ]}),
            json!({"Labels": [{"Timestamp": 80, "Label": {"Name": "Sofa", "Confidence": 88.0}}]}),
        ];
        let labels = config.normalizer().normalize(&pages).unwrap();
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Cat", "Sofa"]);
        assert_eq!(labels[1].timestamp_ms, 80);
    }
}

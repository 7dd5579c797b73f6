//! Document analysis jobs (text, tables, forms).
//!
//! Results are paginated; `DocumentNormalizer` merges the blocks of every page.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use super::{missing, serialize_input_key};
use crate::error::JobError;
use crate::traits::{LaunchRequest, ResultNormalizer};
use crate::types::JobInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentFeature {
    Text,
    Tables,
    Forms,
    Signatures,
    Layout,
}

/// Inclusive 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl PageRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }
}

/// Launch configuration of a document analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_page_range"))]
pub struct DocumentAnalysisConfig {
    #[serde(rename = "documentKey", serialize_with = "serialize_input_key")]
    pub input: JobInput,
    #[validate(length(min = 1, message = "at least one feature is required"))]
    pub features: Vec<DocumentFeature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_range: Option<PageRange>,
    #[serde(skip)]
    #[validate(length(min = 1, max = 200))]
    pub job_name: Option<String>,
}

fn validate_page_range(config: &DocumentAnalysisConfig) -> Result<(), ValidationError> {
    match config.page_range {
        Some(range) if range.first == 0 || range.first > range.last => Err(ValidationError::new(
            "page_range",
        )
        .with_message(format!("invalid page range {}..={}", range.first, range.last).into())),
        _ => Ok(()),
    }
}

impl DocumentAnalysisConfig {
    pub fn new<I>(input: JobInput, features: I) -> Self
    where
        I: IntoIterator<Item = DocumentFeature>,
    {
        Self {
            input,
            features: features.into_iter().collect(),
            page_range: None,
            job_name: None,
        }
    }

    pub fn with_page_range(mut self, first: u32, last: u32) -> Self {
        self.page_range = Some(PageRange::new(first, last));
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
}

impl LaunchRequest for DocumentAnalysisConfig {
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

/// Canonical document analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// Page count reported by the vendor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u64>,
    /// Detected blocks of every result page, in order.
    pub blocks: Vec<Value>,
}

impl DocumentAnalysis {
    /// Text of all `LINE` blocks joined by newlines.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.get("BlockType").and_then(Value::as_str) == Some("LINE"))
            .filter_map(|b| b.get("Text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentNormalizer;

impl ResultNormalizer for DocumentNormalizer {
    type Output = DocumentAnalysis;

    fn normalize(&self, pages: &[Value]) -> Result<DocumentAnalysis, JobError> {
        let mut blocks = Vec::new();
        for page in pages {
            let page_blocks = page
                .get("Blocks")
                .or_else(|| page.get("blocks"))
                .and_then(Value::as_array)
                .ok_or_else(|| missing("blocks"))?;
            blocks.extend(page_blocks.iter().cloned());
        }
        let pages = pages.first().and_then(|p| {
            p.pointer("/DocumentMetadata/Pages")
                .or_else(|| p.get("pages"))
                .and_then(Value::as_u64)
        });
        Ok(DocumentAnalysis { pages, blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn features_must_not_be_empty() {
        let config = DocumentAnalysisConfig::new(JobInput::stored("a.pdf"), []);
        assert!(matches!(config.build(), Err(JobError::InvalidParameter(_))));
        assert!(
            DocumentAnalysisConfig::new(JobInput::stored("a.pdf"), [DocumentFeature::Tables])
                .build()
                .is_ok()
        );
    }

    #[test]
    fn page_range_is_checked() {
        let base = DocumentAnalysisConfig::new(JobInput::stored("a.pdf"), [DocumentFeature::Text]);
        assert!(base.clone().with_page_range(1, 3).build().is_ok());
        assert!(base.clone().with_page_range(0, 3).build().is_err());
        assert!(base.with_page_range(4, 3).build().is_err());
    }

    #[test]
    fn start_body_shape() {
        let config = DocumentAnalysisConfig::new(
            JobInput::stored("docs/a.pdf"),
            [DocumentFeature::Tables, DocumentFeature::Forms],
        )
        .with_page_range(1, 2);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "documentKey": "docs/a.pdf",
                "features": ["TABLES", "FORMS"],
                "pageRange": {"first": 1, "last": 2}
            })
        );
    }

    #[test]
    fn blocks_of_all_pages_are_merged() {
        let pages = vec![
            json!({"DocumentMetadata": {"Pages": 2}, "Blocks": [{"BlockType": "LINE", "Text": "a"}]}),
            json!({"Blocks": [{"BlockType": "WORD", "Text": "b"}, {"BlockType": "LINE", "Text": "c"}]}),
        ];
        let analysis = DocumentNormalizer.normalize(&pages).unwrap();
        assert_eq!(analysis.pages, Some(2));
        assert_eq!(analysis.blocks.len(), 3);
        assert_eq!(analysis.text(), "a\nc");
        assert!(DocumentNormalizer.normalize(&[json!({})]).is_err());
    }
}

//! Job Handle Codec
//!
//! A job handle is the only identifier callers see. It is either a bare
//! primary resource ID or `<primary><SEP><secondary>`, which lets a second,
//! independent vendor resource (e.g. a custom vocabulary) travel through code
//! that only understands "one job id".
//!
//! The codec refuses IDs that contain the separator, and pairs whose joined
//! form would split elsewhere (`aXBrand` + `Xb`), so every handle it produces
//! decodes back to exactly the IDs it was built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::defaults;
use crate::error::JobError;

/// Opaque, caller-visible job identifier. Forward it byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wrap a handle string received from a caller.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobHandle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for JobHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The resource IDs carried by a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHandle {
    pub primary: String,
    pub secondary: Option<String>,
}

/// Encodes and decodes job handles with a fixed separator token.
#[derive(Debug, Clone)]
pub struct HandleCodec {
    separator: String,
}

impl Default for HandleCodec {
    fn default() -> Self {
        Self {
            separator: defaults::handle::SEPARATOR.to_string(),
        }
    }
}

impl HandleCodec {
    pub fn new(separator: impl Into<String>) -> Result<Self, JobError> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(JobError::ConfigurationError(
                "handle separator must not be empty".to_string(),
            ));
        }
        Ok(Self { separator })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    fn check_segment(&self, role: &str, id: &str) -> Result<(), JobError> {
        if id.is_empty() {
            return Err(JobError::InvalidHandle(format!("{role} id must not be empty")));
        }
        if id.contains(&self.separator) {
            return Err(JobError::InvalidHandle(format!(
                "{role} id {id:?} contains the reserved separator {:?}",
                self.separator
            )));
        }
        Ok(())
    }

    /// Check that `id` can stand alone as a bare handle.
    pub fn check_id(&self, id: &str) -> Result<(), JobError> {
        self.check_segment("job", id)
    }

    /// Check that `primary` can head a composite handle, whatever the
    /// secondary ID turns out to be.
    ///
    /// Besides containing the separator, a primary ID can complete it early
    /// when its tail overlaps the separator's head (`aXBrand` + `XBrandX`).
    pub fn check_primary(&self, primary: &str) -> Result<(), JobError> {
        self.check_segment("primary", primary)?;
        let joined = format!("{primary}{}", self.separator);
        if joined.find(&self.separator) != Some(primary.len()) {
            return Err(JobError::InvalidHandle(format!(
                "primary id {primary:?} runs into the separator {:?}",
                self.separator
            )));
        }
        Ok(())
    }

    pub fn encode(&self, primary: &str, secondary: Option<&str>) -> Result<JobHandle, JobError> {
        match secondary {
            None => {
                self.check_id(primary)?;
                Ok(JobHandle(primary.to_string()))
            }
            Some(secondary) => {
                self.check_primary(primary)?;
                self.check_segment("secondary", secondary)?;
                Ok(JobHandle(format!("{primary}{}{secondary}", self.separator)))
            }
        }
    }

    pub fn decode(&self, handle: &JobHandle) -> Result<DecodedHandle, JobError> {
        let raw = handle.as_str();
        let Some((primary, secondary)) = raw.split_once(&self.separator) else {
            if raw.is_empty() {
                return Err(JobError::InvalidHandle("empty job handle".to_string()));
            }
            return Ok(DecodedHandle {
                primary: raw.to_string(),
                secondary: None,
            });
        };
        if secondary.contains(&self.separator) {
            return Err(JobError::InvalidHandle(format!(
                "handle {raw:?} contains the separator more than once"
            )));
        }
        self.check_segment("primary", primary)?;
        self.check_segment("secondary", secondary)?;
        Ok(DecodedHandle {
            primary: primary.to_string(),
            secondary: Some(secondary.to_string()),
        })
    }
}

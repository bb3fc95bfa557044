use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of geometric landmark coordinates in a feature vector.
pub const LANDMARK_COUNT: usize = 68;
/// Dimension of the identity descriptor embedding.
pub const DESCRIPTOR_DIM: usize = 128;

// Minimum acceptable capture for enrollment.
const MIN_ENROLL_EXTENT: f64 = 50.0;
const MIN_ENROLL_QUALITY: f64 = 0.3;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed face template: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("expected {expected} {field}, got {actual}")]
    Dimension {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("quality {0} outside [0, 1]")]
    Quality(f64),
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Region of the source image that contains the face.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Numeric representation of one captured face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    /// Facial geometry reference points, exactly [`LANDMARK_COUNT`] values.
    pub landmarks: Vec<f64>,
    /// Identity embedding, exactly [`DESCRIPTOR_DIM`] values.
    pub descriptors: Vec<f64>,
    #[serde(alias = "boundingBox")]
    pub bounding_region: BoundingRegion,
    /// Capture quality in [0, 1]. Templates stored without one are treated as full quality.
    #[serde(default = "full_quality")]
    pub quality: f64,
    #[serde(default, alias = "timestamp")]
    pub captured_at: DateTime<Utc>,
}

fn full_quality() -> f64 {
    1.0
}

impl FeatureVector {
    /// Check the dimension and range invariants. Invalid vectors never reach the matcher.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.landmarks.len() != LANDMARK_COUNT {
            return Err(DecodeError::Dimension {
                field: "landmarks",
                expected: LANDMARK_COUNT,
                actual: self.landmarks.len(),
            });
        }
        if self.descriptors.len() != DESCRIPTOR_DIM {
            return Err(DecodeError::Dimension {
                field: "descriptors",
                expected: DESCRIPTOR_DIM,
                actual: self.descriptors.len(),
            });
        }
        if !self.landmarks.iter().all(|v| v.is_finite()) {
            return Err(DecodeError::NonFinite("landmarks"));
        }
        if !self.descriptors.iter().all(|v| v.is_finite()) {
            return Err(DecodeError::NonFinite("descriptors"));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(DecodeError::Quality(self.quality));
        }
        Ok(())
    }

    /// Whether this capture is good enough to serve as a reference for an identity.
    pub fn is_enrollable(&self) -> bool {
        self.validate().is_ok()
            && self.bounding_region.width > MIN_ENROLL_EXTENT
            && self.bounding_region.height > MIN_ENROLL_EXTENT
            && self.quality > MIN_ENROLL_QUALITY
    }

    pub fn quality_grade(&self) -> QualityGrade {
        QualityGrade::from_score(self.quality)
    }
}

/// Coarse capture quality tier shown to the person being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::Excellent
        } else if score >= 0.8 {
            Self::Good
        } else if score >= 0.7 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Encoded reference vector as persisted alongside an identity.
///
/// Stored data may predate the current format or be corrupted, so decoding
/// is fallible and re-validates the vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceTemplate(String);

impl FaceTemplate {
    pub fn encode(vector: &FeatureVector) -> Result<Self, DecodeError> {
        vector.validate()?;
        Ok(Self(serde_json::to_string(vector)?))
    }

    pub fn decode(&self) -> Result<FeatureVector, DecodeError> {
        let vector: FeatureVector = serde_json::from_str(&self.0)?;
        vector.validate()?;
        Ok(vector)
    }

    /// Wrap raw template text without checking it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

/// An enrolled person and their optional reference face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "faceData")]
    pub reference_vector: Option<FaceTemplate>,
    #[serde(alias = "createdAt")]
    pub enrolled_at: DateTime<Utc>,
}

/// The subset of an identity surfaced in a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedIdentity {
    pub id: String,
    pub name: String,
    pub department: String,
}

impl From<&Identity> for MatchedIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            name: identity.name.clone(),
            department: identity.department.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Verified,
    Unverified,
    Rejected,
    NoMatch,
}

impl MatchStatus {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Verified => "Verified Match",
            Self::Unverified => "Unverified Match",
            Self::Rejected => "Match Rejected",
            Self::NoMatch => "No Match Found",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Verified => "verified",
            Self::Unverified => "unverified",
            Self::Rejected => "rejected",
            Self::NoMatch => "no_match",
        };
        f.write_str(s)
    }
}

/// Outcome of one matching attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchVerdict {
    pub is_match: bool,
    /// Adjusted confidence in [0, 1], rounded to two decimals.
    pub confidence: f64,
    #[serde(rename = "matchStatus")]
    pub status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "employee")]
    pub matched_identity: Option<MatchedIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MatchVerdict {
    pub fn no_match(reason: impl Into<String>) -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            status: MatchStatus::NoMatch,
            matched_identity: None,
            reason: Some(reason.into()),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            status: MatchStatus::Rejected,
            matched_identity: None,
            reason: Some(reason.into()),
        }
    }

    /// Verified and unverified verdicts both count as attendance-worthy.
    pub fn is_accepted(&self) -> bool {
        self.is_match
            && matches!(self.status, MatchStatus::Verified | MatchStatus::Unverified)
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }
}

/// Human-facing label for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Excellent,
    #[serde(rename = "Very High")]
    VeryHigh,
    High,
    Good,
    Fair,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.95 {
            Self::Excellent
        } else if confidence >= 0.85 {
            Self::VeryHigh
        } else if confidence >= 0.75 {
            Self::High
        } else if confidence >= 0.65 {
            Self::Good
        } else if confidence >= 0.55 {
            Self::Fair
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "Excellent",
            Self::VeryHigh => "Very High",
            Self::High => "High",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Low => "Low",
        };
        f.write_str(s)
    }
}

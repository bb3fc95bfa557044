//! rollcall-core: Face feature vectors and gallery matching.
//!
//! Scores a captured feature vector against the reference vectors of
//! enrolled identities and turns the best score into a verification
//! verdict with a confidence tier.

pub mod extractor;
pub mod matcher;
pub mod similarity;
pub mod types;

pub use extractor::{FeatureExtractor, FixedExtractor, SimulatedExtractor};
pub use matcher::{match_against_gallery, Matcher, WeightedMatcher};
pub use types::{
    BoundingRegion, ConfidenceLevel, DecodeError, FaceTemplate, FeatureVector, Identity,
    MatchStatus, MatchVerdict, MatchedIdentity, QualityGrade,
};

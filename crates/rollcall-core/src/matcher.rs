//! Gallery matching and the verification decision policy.

use crate::similarity::{descriptor_similarity, landmark_similarity};
use crate::types::{FeatureVector, Identity, MatchStatus, MatchVerdict, MatchedIdentity};

const DESCRIPTOR_WEIGHT: f64 = 0.7;
const LANDMARK_WEIGHT: f64 = 0.3;

/// Captures below this quality are rejected without comparing anything.
pub const MIN_CAPTURE_QUALITY: f64 = 0.5;

// Inclusive lower bounds on adjusted confidence.
pub const VERIFIED_THRESHOLD: f64 = 0.85;
pub const UNVERIFIED_THRESHOLD: f64 = 0.70;
pub const REJECTED_THRESHOLD: f64 = 0.50;

/// Strategy for comparing a captured vector against a gallery of identities.
pub trait Matcher {
    fn compare(&self, probe: &FeatureVector, gallery: &[Identity]) -> MatchVerdict;
}

/// Weighted descriptor/landmark matcher scaled by capture quality.
///
/// Visits every identity with a reference vector and keeps the first one
/// reaching the highest adjusted confidence. Identities whose stored
/// template cannot be decoded are skipped.
pub struct WeightedMatcher;

impl Matcher for WeightedMatcher {
    fn compare(&self, probe: &FeatureVector, gallery: &[Identity]) -> MatchVerdict {
        if gallery.is_empty() {
            return MatchVerdict::no_match("No employees in database");
        }

        if let Err(e) = probe.validate() {
            tracing::warn!(error = %e, "captured feature vector is invalid");
            return MatchVerdict::rejected("Error processing face data");
        }

        if probe.quality < MIN_CAPTURE_QUALITY {
            return MatchVerdict::rejected(
                "Poor image quality - please try again with better lighting",
            );
        }

        let mut best: Option<(&Identity, f64)> = None;

        for identity in gallery {
            let Some(template) = &identity.reference_vector else {
                continue;
            };
            let reference = match template.decode() {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        identity = %identity.id,
                        name = %identity.name,
                        error = %e,
                        "skipping identity with undecodable face data"
                    );
                    continue;
                }
            };

            let confidence = adjusted_confidence(probe, &reference);
            if !confidence.is_finite() {
                tracing::warn!(identity = %identity.id, "skipping identity with non-finite score");
                continue;
            }
            let is_better = match best {
                None => true,
                Some((_, prev)) => confidence > prev,
            };
            if is_better {
                best = Some((identity, confidence));
            }
        }

        let Some((identity, confidence)) = best else {
            return MatchVerdict::no_match("No face data found in database");
        };

        let verdict = classify(identity, confidence);
        tracing::debug!(
            identity = %identity.id,
            raw = confidence,
            confidence = verdict.confidence,
            status = %verdict.status,
            "gallery match complete"
        );
        verdict
    }
}

/// Match a captured vector against a gallery snapshot with the default matcher.
pub fn match_against_gallery(captured: &FeatureVector, gallery: &[Identity]) -> MatchVerdict {
    WeightedMatcher.compare(captured, gallery)
}

/// Combined similarity of a capture to one reference, scaled by the weaker quality.
pub fn adjusted_confidence(probe: &FeatureVector, reference: &FeatureVector) -> f64 {
    let desc = descriptor_similarity(&probe.descriptors, &reference.descriptors);
    let land = landmark_similarity(&probe.landmarks, &reference.landmarks);
    let overall = DESCRIPTOR_WEIGHT * desc + LANDMARK_WEIGHT * land;
    let quality_factor = probe.quality.min(reference.quality);
    (overall * quality_factor).clamp(0.0, 1.0)
}

/// Apply the decision thresholds to the best candidate's adjusted confidence.
///
/// Thresholds compare against the unrounded value; only the reported
/// confidence is rounded.
pub fn classify(candidate: &Identity, confidence: f64) -> MatchVerdict {
    let rounded = round2(confidence.clamp(0.0, 1.0));

    if confidence >= VERIFIED_THRESHOLD {
        MatchVerdict {
            is_match: true,
            confidence: rounded,
            status: MatchStatus::Verified,
            matched_identity: Some(MatchedIdentity::from(candidate)),
            reason: None,
        }
    } else if confidence >= UNVERIFIED_THRESHOLD {
        MatchVerdict {
            is_match: true,
            confidence: rounded,
            status: MatchStatus::Unverified,
            matched_identity: Some(MatchedIdentity::from(candidate)),
            reason: Some("Medium confidence - manual verification recommended".into()),
        }
    } else if confidence >= REJECTED_THRESHOLD {
        MatchVerdict {
            is_match: false,
            confidence: rounded,
            status: MatchStatus::Rejected,
            matched_identity: None,
            reason: Some(format!(
                "Low confidence match with {} ({}%)",
                candidate.name,
                (confidence * 100.0).round()
            )),
        }
    } else {
        MatchVerdict {
            is_match: false,
            confidence: rounded,
            status: MatchStatus::NoMatch,
            matched_identity: None,
            reason: Some("No matching face found in database".into()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

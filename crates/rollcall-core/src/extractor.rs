//! Feature extraction capability.
//!
//! The match engine never cares where vectors come from. A real model
//! backend implements [`FeatureExtractor`] the same way the simulated and
//! fixed extractors below do.

use crate::types::{BoundingRegion, FeatureVector, DESCRIPTOR_DIM, LANDMARK_COUNT};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_DETECTION_RATE: f64 = 0.9;

// Perturbation applied when simulating a fresh capture of an enrolled face.
const LOOKALIKE_DESCRIPTOR_JITTER: f64 = 0.1;
const LOOKALIKE_LANDMARK_JITTER: f64 = 5.0;

/// Turns a raw image into a feature vector, or `None` when no face is found.
pub trait FeatureExtractor: Send {
    fn extract(&mut self, image: &[u8]) -> Option<FeatureVector>;
}

/// Stand-in for a detection model: succeeds with a fixed probability and
/// emits random geometry with quality in [0.6, 1.0].
pub struct SimulatedExtractor {
    rng: StdRng,
    detection_rate: f64,
}

impl SimulatedExtractor {
    pub fn new(detection_rate: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            detection_rate: detection_rate.clamp(0.0, 1.0),
        }
    }

    /// Reproducible extractor for demos and tests.
    pub fn seeded(seed: u64, detection_rate: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            detection_rate: detection_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_DETECTION_RATE)
    }
}

impl FeatureExtractor for SimulatedExtractor {
    fn extract(&mut self, image: &[u8]) -> Option<FeatureVector> {
        if image.is_empty() {
            tracing::debug!("empty image, nothing to detect");
            return None;
        }
        if !self.rng.gen_bool(self.detection_rate) {
            tracing::debug!(bytes = image.len(), "simulated detection found no face");
            return None;
        }

        let rng = &mut self.rng;
        let quality = rng.gen_range(0.6..=1.0);
        Some(FeatureVector {
            landmarks: (0..LANDMARK_COUNT).map(|_| rng.gen_range(0.0..100.0)).collect(),
            descriptors: (0..DESCRIPTOR_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            bounding_region: BoundingRegion {
                x: rng.gen_range(50.0..70.0),
                y: rng.gen_range(60.0..80.0),
                width: rng.gen_range(120.0..160.0),
                height: rng.gen_range(150.0..190.0),
            },
            quality,
            captured_at: Utc::now(),
        })
    }
}

/// Deterministic extractor returning the same result for every image.
#[derive(Debug, Clone)]
pub struct FixedExtractor {
    vector: Option<FeatureVector>,
}

impl FixedExtractor {
    pub fn new(vector: FeatureVector) -> Self {
        Self {
            vector: Some(vector),
        }
    }

    /// An extractor that never detects a face.
    pub fn failing() -> Self {
        Self { vector: None }
    }
}

impl FeatureExtractor for FixedExtractor {
    fn extract(&mut self, _image: &[u8]) -> Option<FeatureVector> {
        self.vector.clone()
    }
}

/// Simulate a new capture of an already enrolled face by jittering its reference.
pub fn lookalike<R: Rng>(reference: &FeatureVector, rng: &mut R) -> FeatureVector {
    let jitter = |rng: &mut R, span: f64| (rng.gen::<f64>() - 0.5) * span;
    FeatureVector {
        landmarks: reference
            .landmarks
            .iter()
            .map(|v| v + jitter(rng, LOOKALIKE_LANDMARK_JITTER))
            .collect(),
        descriptors: reference
            .descriptors
            .iter()
            .map(|v| v + jitter(rng, LOOKALIKE_DESCRIPTOR_JITTER))
            .collect(),
        bounding_region: reference.bounding_region,
        quality: reference.quality,
        captured_at: Utc::now(),
    }
}

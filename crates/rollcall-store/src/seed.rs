//! Demo gallery and synthetic attendance history.
//!
//! Face templates are derived from a hash of each person's key so the same
//! person always gets the same reference vector. Attendance history depends
//! on the [`SeedPolicy`]: deterministic seeding reproduces the exact same
//! week for a given anchor date, randomized seeding differs on every reset.

use crate::model::{AttendanceEvent, EventKind};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rollcall_core::{BoundingRegion, FaceTemplate, FeatureVector, Identity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_SEED: u64 = 0x00C0_FFEE;
const SEED_DAYS: i64 = 7;
const DEMO_LOCATION: &str = "Main Office";

// (id, key, name, department, enrolled_at)
const DEMO_PEOPLE: [(&str, &str, &str, &str, &str); 6] = [
    ("emp_001", "sarah", "Sarah Johnson", "Engineering", "2024-01-15T08:00:00Z"),
    ("emp_002", "michael", "Michael Chen", "Design", "2024-01-16T09:30:00Z"),
    ("emp_003", "emily", "Emily Rodriguez", "Marketing", "2024-01-17T10:15:00Z"),
    ("emp_004", "david", "David Kim", "Engineering", "2024-01-18T11:00:00Z"),
    ("emp_005", "lisa", "Lisa Thompson", "HR", "2024-01-19T14:20:00Z"),
    ("emp_006", "james", "James Wilson", "Sales", "2024-01-20T16:45:00Z"),
];

/// How synthetic attendance is generated when the store is seeded or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SeedPolicy {
    Deterministic { seed: u64 },
    Randomized,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self::Deterministic { seed: DEFAULT_SEED }
    }
}

impl SeedPolicy {
    fn rng(&self) -> StdRng {
        match self {
            Self::Deterministic { seed } => StdRng::seed_from_u64(*seed),
            Self::Randomized => StdRng::from_entropy(),
        }
    }
}

/// The fixed demo gallery, each identity enrolled with a stable face template.
pub fn demo_identities() -> Vec<Identity> {
    DEMO_PEOPLE
        .iter()
        .filter_map(|(id, key, name, department, enrolled)| {
            let enrolled_at = DateTime::parse_from_rfc3339(enrolled)
                .ok()?
                .with_timezone(&Utc);
            let reference_vector = FaceTemplate::encode(&demo_face(key, enrolled_at)).ok();
            let email = format!("{}@company.com", name.to_lowercase().replace(' ', "."));
            Some(Identity {
                id: id.to_string(),
                name: name.to_string(),
                email,
                department: department.to_string(),
                reference_vector,
                enrolled_at,
            })
        })
        .collect()
}

/// Stable synthetic face for a person key.
pub fn demo_face(person_key: &str, captured_at: DateTime<Utc>) -> FeatureVector {
    let seed = person_seed(person_key);
    let phase = (seed % 100_000) as f64;
    let mut rng = StdRng::seed_from_u64(seed);

    let landmarks = (0..rollcall_core::types::LANDMARK_COUNT)
        .map(|i| (phase + i as f64 * 0.1).sin() * 50.0 + 50.0 + rng.gen::<f64>() * 20.0)
        .collect();
    let descriptors = (0..rollcall_core::types::DESCRIPTOR_DIM)
        .map(|i| (phase + i as f64 * 0.05).cos() * 0.8 + rng.gen::<f64>() * 0.4 - 0.2)
        .collect();
    let bounding_region = BoundingRegion {
        x: 45.0 + rng.gen::<f64>() * 10.0,
        y: 55.0 + rng.gen::<f64>() * 10.0,
        width: 130.0 + rng.gen::<f64>() * 20.0,
        height: 160.0 + rng.gen::<f64>() * 20.0,
    };

    FeatureVector {
        landmarks,
        descriptors,
        bounding_region,
        quality: 1.0,
        captured_at,
    }
}

fn person_seed(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// A week of synthetic check-ins and check-outs ending on `anchor`, newest first.
pub fn demo_attendance(
    identities: &[Identity],
    anchor: NaiveDate,
    policy: SeedPolicy,
) -> Vec<AttendanceEvent> {
    let mut rng = policy.rng();
    let mut events = Vec::new();

    for day in 0..SEED_DAYS {
        let date = anchor - Duration::days(day);

        for identity in identities {
            if rng.gen::<f64>() <= 0.3 {
                continue;
            }

            let check_in_hour = 8 + rng.gen_range(0..2);
            let check_in_minute = rng.gen_range(0..60);
            let Some(check_in) = date.and_hms_opt(check_in_hour, check_in_minute, 0) else {
                continue;
            };
            let check_in = Utc.from_utc_datetime(&check_in);
            events.push(demo_event(
                identity,
                EventKind::CheckIn,
                check_in,
                0.85 + rng.gen::<f64>() * 0.12,
            ));

            if rng.gen::<f64>() > 0.2 {
                let hour = 17 + rng.gen_range(0..2);
                let minute = rng.gen_range(0..60);
                if let Some(check_out) = date.and_hms_opt(hour, minute, 0) {
                    events.push(demo_event(
                        identity,
                        EventKind::CheckOut,
                        Utc.from_utc_datetime(&check_out),
                        0.82 + rng.gen::<f64>() * 0.15,
                    ));
                }
            }
        }
    }

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

fn demo_event(
    identity: &Identity,
    kind: EventKind,
    timestamp: DateTime<Utc>,
    confidence: f64,
) -> AttendanceEvent {
    let suffix = match kind {
        EventKind::CheckIn => "in",
        EventKind::CheckOut => "out",
    };
    AttendanceEvent {
        id: format!("att_{}_{}_{suffix}", timestamp.timestamp_millis(), identity.id),
        identity_id: identity.id.clone(),
        identity_name: identity.name.clone(),
        kind,
        timestamp,
        location: Some(DEMO_LOCATION.to_string()),
        confidence: Some(confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::extractor::lookalike;
    use rollcall_core::{match_against_gallery, MatchStatus};

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
    }

    #[test]
    fn test_demo_gallery_is_enrolled() {
        let gallery = demo_identities();
        assert_eq!(gallery.len(), 6);
        assert_eq!(gallery[0].email, "sarah.johnson@company.com");
        for identity in &gallery {
            let face = identity.reference_vector.as_ref().unwrap().decode().unwrap();
            assert!(face.is_enrollable());
        }
    }

    #[test]
    fn test_demo_faces_are_stable() {
        let at = Utc::now();
        assert_eq!(demo_face("sarah", at).descriptors, demo_face("sarah", at).descriptors);
        assert_ne!(demo_face("sarah", at).descriptors, demo_face("david", at).descriptors);
    }

    #[test]
    fn test_lookalike_of_demo_face_is_verified() {
        let gallery = demo_identities();
        let reference = gallery[2].reference_vector.as_ref().unwrap().decode().unwrap();
        let capture = lookalike(&reference, &mut StdRng::seed_from_u64(11));
        let verdict = match_against_gallery(&capture, &gallery);
        assert_eq!(verdict.status, MatchStatus::Verified);
        assert_eq!(verdict.matched_identity.unwrap().id, "emp_003");
    }

    #[test]
    fn test_deterministic_attendance_is_reproducible() {
        let gallery = demo_identities();
        let policy = SeedPolicy::default();
        let a = demo_attendance(&gallery, anchor(), policy);
        let b = demo_attendance(&gallery, anchor(), policy);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_attendance_shape() {
        let gallery = demo_identities();
        let events = demo_attendance(&gallery, anchor(), SeedPolicy::Deterministic { seed: 5 });
        let oldest = anchor() - Duration::days(SEED_DAYS - 1);

        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        for event in &events {
            assert!(event.validate().is_ok());
            assert!(event.date() <= anchor() && event.date() >= oldest);
            let hour = chrono::Timelike::hour(&event.timestamp);
            match event.kind {
                EventKind::CheckIn => assert!((8..10).contains(&hour)),
                EventKind::CheckOut => assert!((17..19).contains(&hour)),
            }
        }
    }
}

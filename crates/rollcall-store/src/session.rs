//! Check-in/check-out toggling on accepted matches.
//!
//! Each identity is either checked out (the initial state) or checked in.
//! An accepted match records the event that moves it to the other state.

use crate::error::Result;
use crate::model::{generate_id, AttendanceEvent, EventKind};
use crate::store::IdentityStore;
use chrono::{DateTime, Utc};
use rollcall_core::{MatchVerdict, MatchedIdentity};
use serde::Serialize;
use std::collections::HashSet;

/// Kind of the next event for `identity_id`, given its recent events.
///
/// The most recent event decides; on equal timestamps the one listed first
/// (the newest-first collection's latest write) wins.
pub fn decide_event_kind(identity_id: &str, recent: &[AttendanceEvent]) -> EventKind {
    let mut latest: Option<&AttendanceEvent> = None;
    for event in recent.iter().filter(|e| e.identity_id == identity_id) {
        if latest.map_or(true, |l| event.timestamp > l.timestamp) {
            latest = Some(event);
        }
    }

    match latest {
        Some(event) if event.kind == EventKind::CheckIn => EventKind::CheckOut,
        _ => EventKind::CheckIn,
    }
}

/// Distinct identities seen in a set of events, usually one day's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceCounts {
    pub checked_in: usize,
    pub checked_out: usize,
    /// Identities whose latest event is a check-in.
    pub present: usize,
}

pub fn presence_counts(events: &[AttendanceEvent]) -> PresenceCounts {
    let mut checked_in = HashSet::new();
    let mut checked_out = HashSet::new();
    for event in events {
        match event.kind {
            EventKind::CheckIn => checked_in.insert(event.identity_id.as_str()),
            EventKind::CheckOut => checked_out.insert(event.identity_id.as_str()),
        };
    }

    let present = checked_in
        .iter()
        .filter(|id| decide_event_kind(id, events) == EventKind::CheckOut)
        .count();

    PresenceCounts {
        checked_in: checked_in.len(),
        checked_out: checked_out.len(),
        present,
    }
}

/// Append the next attendance event for a matched identity, stamped now.
pub fn record_verified_attendance(
    store: &IdentityStore,
    identity: &MatchedIdentity,
    confidence: f64,
    location: Option<String>,
) -> Result<AttendanceEvent> {
    record_attendance_at(store, identity, confidence, location, Utc::now())
}

pub fn record_attendance_at(
    store: &IdentityStore,
    identity: &MatchedIdentity,
    confidence: f64,
    location: Option<String>,
    at: DateTime<Utc>,
) -> Result<AttendanceEvent> {
    let recent = store.events_for_identity(&identity.id)?;
    let kind = decide_event_kind(&identity.id, &recent);

    let event = AttendanceEvent {
        id: generate_id("att", at),
        identity_id: identity.id.clone(),
        identity_name: identity.name.clone(),
        kind,
        timestamp: at,
        location,
        confidence: Some(confidence.clamp(0.0, 1.0)),
    };

    let event = store.append_attendance_event(event)?;
    tracing::info!(
        identity = %identity.id,
        kind = %event.kind,
        confidence,
        "attendance recorded"
    );
    Ok(event)
}

/// Record attendance for a verified or unverified verdict. Other verdicts
/// leave the store untouched and return `None`.
pub fn record_verdict(
    store: &IdentityStore,
    verdict: &MatchVerdict,
    location: Option<String>,
) -> Result<Option<AttendanceEvent>> {
    if !verdict.is_accepted() {
        return Ok(None);
    }
    let Some(identity) = &verdict.matched_identity else {
        return Ok(None);
    };
    record_verified_attendance(store, identity, verdict.confidence, location).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rollcall_core::MatchStatus;

    fn event(identity_id: &str, kind: EventKind, hour: u32) -> AttendanceEvent {
        AttendanceEvent {
            id: format!("{identity_id}-{hour}"),
            identity_id: identity_id.into(),
            identity_name: "Someone".into(),
            kind,
            timestamp: Utc.with_ymd_and_hms(2024, 4, 2, hour, 0, 0).unwrap(),
            location: None,
            confidence: None,
        }
    }

    fn matched(id: &str) -> MatchedIdentity {
        MatchedIdentity {
            id: id.into(),
            name: "Sarah Johnson".into(),
            department: "Engineering".into(),
        }
    }

    fn empty_store() -> IdentityStore {
        let store = IdentityStore::in_memory();
        store.clear_all().unwrap();
        store
    }

    #[test]
    fn test_no_history_checks_in() {
        assert_eq!(decide_event_kind("a", &[]), EventKind::CheckIn);
    }

    #[test]
    fn test_after_check_in_checks_out() {
        let events = vec![event("a", EventKind::CheckIn, 8)];
        assert_eq!(decide_event_kind("a", &events), EventKind::CheckOut);
    }

    #[test]
    fn test_after_check_out_checks_in() {
        let events = vec![event("a", EventKind::CheckOut, 17), event("a", EventKind::CheckIn, 8)];
        assert_eq!(decide_event_kind("a", &events), EventKind::CheckIn);
    }

    #[test]
    fn test_uses_latest_timestamp_not_position() {
        let events = vec![event("a", EventKind::CheckOut, 7), event("a", EventKind::CheckIn, 9)];
        assert_eq!(decide_event_kind("a", &events), EventKind::CheckOut);
    }

    #[test]
    fn test_ignores_other_identities() {
        let events = vec![event("b", EventKind::CheckIn, 9)];
        assert_eq!(decide_event_kind("a", &events), EventKind::CheckIn);
    }

    #[test]
    fn test_presence_counts() {
        let events = vec![
            event("a", EventKind::CheckOut, 17),
            event("a", EventKind::CheckIn, 8),
            event("b", EventKind::CheckIn, 9),
            event("c", EventKind::CheckIn, 8),
            event("c", EventKind::CheckOut, 12),
            event("c", EventKind::CheckIn, 13),
        ];
        let counts = presence_counts(&events);
        assert_eq!(
            counts,
            PresenceCounts {
                checked_in: 3,
                checked_out: 2,
                present: 2,
            }
        );
        assert_eq!(presence_counts(&[]), PresenceCounts::default());
    }

    #[test]
    fn test_recording_alternates() {
        let store = empty_store();
        let start = Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap();
        let identity = matched("emp_001");

        let kinds: Vec<EventKind> = (0..3)
            .map(|i| {
                record_attendance_at(&store, &identity, 0.9, None, start + Duration::hours(i))
                    .unwrap()
                    .kind
            })
            .collect();
        assert_eq!(kinds, vec![EventKind::CheckIn, EventKind::CheckOut, EventKind::CheckIn]);
        assert_eq!(store.count_attendance_events().unwrap(), 3);
    }

    #[test]
    fn test_record_verdict_only_for_accepted() {
        let store = empty_store();

        let rejected = MatchVerdict::rejected("Low confidence match");
        assert!(record_verdict(&store, &rejected, None).unwrap().is_none());

        let accepted = MatchVerdict {
            is_match: true,
            confidence: 0.78,
            status: MatchStatus::Unverified,
            matched_identity: Some(matched("emp_002")),
            reason: None,
        };
        let event = record_verdict(&store, &accepted, Some("Main Office".into()))
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, EventKind::CheckIn);
        assert_eq!(event.confidence, Some(0.78));
        assert_eq!(event.identity_name, "Sarah Johnson");
        assert_eq!(store.count_attendance_events().unwrap(), 1);
    }
}

use crate::error::{Result, StoreError};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rollcall_core::FaceTemplate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Direction of an attendance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "check-in")]
    CheckIn,
    #[serde(rename = "check-out")]
    CheckOut,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check-in",
            Self::CheckOut => "check-out",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "check-in" => Ok(Self::CheckIn),
            "check-out" => Ok(Self::CheckOut),
            other => Err(StoreError::Validation {
                field: "type",
                reason: format!("unknown attendance type {other:?}"),
            }),
        }
    }
}

/// One time-stamped check-in or check-out. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub id: String,
    #[serde(alias = "employeeId")]
    pub identity_id: String,
    /// Name at the time the event was written.
    #[serde(alias = "employeeName")]
    pub identity_name: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AttendanceEvent {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StoreError::missing("id"));
        }
        if self.identity_id.trim().is_empty() {
            return Err(StoreError::missing("identityId"));
        }
        if self.identity_name.trim().is_empty() {
            return Err(StoreError::missing("identityName"));
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(StoreError::Validation {
                    field: "confidence",
                    reason: format!("{c} outside [0, 1]"),
                });
            }
        }
        Ok(())
    }

    /// UTC calendar date the event belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Partial edit of an enrolled identity. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub reference_vector: Option<FaceTemplate>,
}

/// Conjunctive filter over attendance events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub identity_id: Option<String>,
    /// Prefix of the ISO-8601 timestamp, e.g. `2024-01-15` or `2024-01`.
    pub date_prefix: Option<String>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn for_identity(identity_id: impl Into<String>) -> Self {
        Self {
            identity_id: Some(identity_id.into()),
            ..Self::default()
        }
    }

    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            date_prefix: Some(date.format("%Y-%m-%d").to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, event: &AttendanceEvent) -> bool {
        if let Some(id) = &self.identity_id {
            if &event.identity_id != id {
                return false;
            }
        }
        if let Some(prefix) = &self.date_prefix {
            if !iso_timestamp(&event.timestamp).starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Check-in/check-out summary for one identity on one date. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub identity_id: String,
    pub identity_name: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
}

/// Millisecond ISO-8601 rendering with a `Z` suffix, as used for date filtering.
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate an id of the form `<prefix>_<millis>_<9 chars>`.
pub fn generate_id(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", at.timestamp_millis(), &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(kind: EventKind) -> AttendanceEvent {
        AttendanceEvent {
            id: "att_1".into(),
            identity_id: "emp_001".into(),
            identity_name: "Sarah Johnson".into(),
            kind,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 8, 15, 0).unwrap(),
            location: Some("Main Office".into()),
            confidence: Some(0.91),
        }
    }

    #[test]
    fn test_event_kind_wire_names() {
        let json = serde_json::to_value(event(EventKind::CheckOut)).unwrap();
        assert_eq!(json["type"], "check-out");
        assert_eq!(json["identityId"], "emp_001");
        assert_eq!("check-in".parse::<EventKind>().unwrap(), EventKind::CheckIn);
        assert!("checkin".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_accepts_legacy_field_names() {
        let raw = r#"{"id":"att_9","employeeId":"emp_002","employeeName":"Michael Chen",
                      "type":"check-in","timestamp":"2024-01-16T09:30:00.000Z"}"#;
        let parsed: AttendanceEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.identity_id, "emp_002");
        assert_eq!(parsed.confidence, None);
    }

    #[test]
    fn test_event_validation() {
        assert!(event(EventKind::CheckIn).validate().is_ok());

        let mut bad = event(EventKind::CheckIn);
        bad.confidence = Some(1.5);
        assert!(matches!(
            bad.validate(),
            Err(StoreError::Validation { field: "confidence", .. })
        ));

        let mut bad = event(EventKind::CheckIn);
        bad.identity_name = "  ".into();
        assert!(matches!(
            bad.validate(),
            Err(StoreError::Validation { field: "identityName", .. })
        ));
    }

    #[test]
    fn test_filter_date_prefix() {
        let e = event(EventKind::CheckIn);
        assert!(EventFilter::on_date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()).matches(&e));
        let month = EventFilter {
            date_prefix: Some("2024-03".into()),
            ..EventFilter::default()
        };
        assert!(month.matches(&e));
        assert!(!EventFilter::for_identity("emp_002").matches(&e));
    }

    #[test]
    fn test_generated_id_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let id = generate_id("att", at);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "att");
        assert_eq!(parts[1], at.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
    }
}

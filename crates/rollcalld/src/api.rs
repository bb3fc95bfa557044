//! Request boundary for the identity and attendance collections.
//!
//! Each handler returns an HTTP-style status with a uniform envelope
//! `{success, data?, error?, message?, total?}`. The transport (D-Bus here)
//! only forwards strings in and serialized responses out.

use crate::engine::{EngineError, EngineHandle};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rollcall_core::extractor::lookalike;
use rollcall_core::{
    ConfidenceLevel, FaceTemplate, FeatureVector, Identity, MatchVerdict, QualityGrade,
};
use rollcall_store::model::generate_id;
use rollcall_store::{
    presence_counts, record_verdict, AttendanceEvent, EventFilter, EventKind, IdentityPatch, IdentityStore,
    StoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;
pub const INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Envelope,
}

impl ApiResponse {
    fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                status: OK,
                body: Envelope {
                    success: true,
                    data: Some(value),
                    error: None,
                    message: None,
                    total: None,
                },
            },
            Err(e) => Self::error(INTERNAL_ERROR, format!("failed to encode response: {e}")),
        }
    }

    fn with_message(mut self, message: &str) -> Self {
        self.body.message = Some(message.to_string());
        self
    }

    fn with_total(mut self, total: usize) -> Self {
        self.body.total = Some(total);
        self
    }

    fn error(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            body: Envelope {
                success: false,
                data: None,
                error: Some(error.into()),
                message: None,
                total: None,
            },
        }
    }

    fn from_store(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Validation { .. } | StoreError::Decode(_) => BAD_REQUEST,
            StoreError::NotFound(_) => NOT_FOUND,
            StoreError::Conflict(_) => CONFLICT,
            StoreError::Storage(_) => INTERNAL_ERROR,
        };
        if status == INTERNAL_ERROR {
            tracing::error!(error = %err, "store failure");
        }
        Self::error(status, err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status < BAD_REQUEST
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Body of an identity create request. Required fields are checked by hand
/// so a missing field yields a 400 rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub reference_vector: Option<FeatureVector>,
    #[serde(alias = "createdAt")]
    pub enrolled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityPatchInput {
    name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    reference_vector: Option<FeatureVector>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventInput {
    id: Option<String>,
    #[serde(alias = "employeeId")]
    identity_id: Option<String>,
    #[serde(alias = "employeeName")]
    identity_name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    location: Option<String>,
    confidence: Option<f64>,
}

/// Query parameters accepted by the attendance listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub identity_id: Option<String>,
    pub date: Option<String>,
    pub limit: Option<usize>,
}

impl From<&AttendanceQuery> for EventFilter {
    fn from(query: &AttendanceQuery) -> Self {
        EventFilter {
            identity_id: query.identity_id.clone(),
            date_prefix: query.date.clone(),
            limit: query.limit,
        }
    }
}

/// Result of one attendance attempt: the verdict plus the event it produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceOutcome {
    #[serde(flatten)]
    pub verdict: MatchVerdict,
    pub confidence_level: ConfidenceLevel,
    pub status_description: &'static str,
    /// Grade of the capture; absent when no face was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<QualityGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_type: Option<EventKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<AttendanceEvent>,
}

impl AttendanceOutcome {
    fn new(
        verdict: MatchVerdict,
        quality_grade: Option<QualityGrade>,
        event: Option<AttendanceEvent>,
    ) -> Self {
        Self {
            confidence_level: verdict.confidence_level(),
            status_description: verdict.status.description(),
            quality_grade,
            attendance_type: event.as_ref().map(|e| e.kind),
            event,
            verdict,
        }
    }
}

/// A freshly enrolled identity with the grade of the capture it was enrolled from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollOutcome {
    #[serde(flatten)]
    pub identity: Identity,
    pub quality_grade: QualityGrade,
}

/// Handlers over one identity store. The mutex makes the store single-writer.
pub struct Api {
    store: Mutex<IdentityStore>,
    location: String,
}

impl Api {
    pub fn new(store: IdentityStore, location: impl Into<String>) -> Self {
        Self {
            store: Mutex::new(store),
            location: location.into(),
        }
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&IdentityStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let store = self
            .store
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))?;
        f(&store)
    }

    fn respond<T: Serialize>(&self, result: Result<T, StoreError>) -> ApiResponse {
        match result {
            Ok(data) => ApiResponse::ok(&data),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    /// Stored totals plus today's check-in, check-out and presence counts.
    pub fn status(&self) -> ApiResponse {
        let result = self.with_store(|s| {
            let today = presence_counts(&s.today_events()?);
            Ok(serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "identities": s.list_identities()?.len(),
                "attendanceRecords": s.count_attendance_events()?,
                "checkedIn": today.checked_in,
                "checkedOut": today.checked_out,
                "present": today.present,
                "location": self.location,
            }))
        });
        self.respond(result)
    }

    // --- identities ---

    pub fn list_identities(&self) -> ApiResponse {
        self.respond(self.with_store(|s| s.list_identities()))
    }

    pub fn create_identity(&self, body: &str) -> ApiResponse {
        let input: IdentityInput = match serde_json::from_str(body) {
            Ok(input) => input,
            Err(e) => return ApiResponse::error(BAD_REQUEST, format!("Invalid request body: {e}")),
        };
        match self.insert_identity(input) {
            Ok(identity) => {
                ApiResponse::ok(&identity).with_message("Employee created successfully")
            }
            Err(response) => response,
        }
    }

    fn insert_identity(&self, input: IdentityInput) -> Result<Identity, ApiResponse> {
        let (Some(name), Some(email), Some(department)) = (
            non_empty(input.name),
            non_empty(input.email),
            non_empty(input.department),
        ) else {
            return Err(ApiResponse::error(BAD_REQUEST, "Missing required fields"));
        };

        let reference_vector = input
            .reference_vector
            .as_ref()
            .map(encode_enrollable)
            .transpose()?;

        let now = Utc::now();
        let identity = Identity {
            id: non_empty(input.id).unwrap_or_else(|| generate_id("emp", now)),
            name,
            email,
            department,
            reference_vector,
            enrolled_at: input.enrolled_at.unwrap_or(now),
        };

        // Creation never replaces; the store enforces email uniqueness.
        let result = self.with_store(|s| {
            if s.list_identities()?.iter().any(|i| i.id == identity.id) {
                return Err(StoreError::Conflict("Employee with this id already exists".into()));
            }
            s.upsert_identity(identity)
        });

        let identity = result.map_err(ApiResponse::from_store)?;
        tracing::info!(id = %identity.id, "identity created");
        Ok(identity)
    }

    pub fn update_identity(&self, id: &str, body: &str) -> ApiResponse {
        if id.trim().is_empty() {
            return ApiResponse::error(BAD_REQUEST, "Employee ID is required");
        }
        let input: IdentityPatchInput = match serde_json::from_str(body) {
            Ok(input) => input,
            Err(e) => return ApiResponse::error(BAD_REQUEST, format!("Invalid request body: {e}")),
        };
        let reference_vector = match input.reference_vector.as_ref().map(encode_enrollable) {
            Some(Ok(template)) => Some(template),
            Some(Err(response)) => return response,
            None => None,
        };
        let patch = IdentityPatch {
            name: input.name,
            email: input.email,
            department: input.department,
            reference_vector,
        };

        match self.with_store(|s| s.update_identity(id, patch)) {
            Ok(identity) => ApiResponse::ok(&identity).with_message("Employee updated successfully"),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    pub fn delete_identity(&self, id: &str) -> ApiResponse {
        if id.trim().is_empty() {
            return ApiResponse::error(BAD_REQUEST, "Employee ID is required");
        }
        match self.with_store(|s| s.delete_identity(id)) {
            Ok(identity) => ApiResponse::ok(&identity).with_message("Employee deleted successfully"),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    // --- attendance ---

    pub fn list_attendance(&self, query: &AttendanceQuery) -> ApiResponse {
        let filter = EventFilter::from(query);
        let result = self.with_store(|s| {
            let events = s.list_attendance_events(&filter)?;
            Ok((events, s.count_attendance_events()?))
        });
        match result {
            Ok((events, total)) => ApiResponse::ok(&events).with_total(total),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    pub fn create_attendance(&self, body: &str) -> ApiResponse {
        let input: EventInput = match serde_json::from_str(body) {
            Ok(input) => input,
            Err(e) => return ApiResponse::error(BAD_REQUEST, format!("Invalid request body: {e}")),
        };
        let (Some(identity_id), Some(identity_name), Some(kind)) = (
            non_empty(input.identity_id),
            non_empty(input.identity_name),
            non_empty(input.kind),
        ) else {
            return ApiResponse::error(BAD_REQUEST, "Missing required fields");
        };
        let Ok(kind) = kind.parse::<EventKind>() else {
            return ApiResponse::error(BAD_REQUEST, "Invalid attendance type");
        };

        let now = Utc::now();
        let event = AttendanceEvent {
            id: non_empty(input.id).unwrap_or_else(|| generate_id("att", now)),
            identity_id,
            identity_name,
            kind,
            timestamp: input.timestamp.unwrap_or(now),
            location: input.location,
            confidence: input.confidence,
        };

        match self.with_store(|s| s.append_attendance_event(event)) {
            Ok(event) => ApiResponse::ok(&event).with_message("Attendance recorded successfully"),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    pub fn delete_attendance(&self, id: &str) -> ApiResponse {
        if id.trim().is_empty() {
            return ApiResponse::error(BAD_REQUEST, "Record ID is required");
        }
        match self.with_store(|s| s.delete_attendance_event(id)) {
            Ok(event) => {
                ApiResponse::ok(&event).with_message("Attendance record deleted successfully")
            }
            Err(e) => ApiResponse::from_store(e),
        }
    }

    pub fn daily_summaries(&self, query: &AttendanceQuery) -> ApiResponse {
        let filter = EventFilter {
            limit: None,
            ..EventFilter::from(query)
        };
        self.respond(self.with_store(|s| s.daily_summaries(&filter)))
    }

    // --- bulk ---

    pub fn reset_demo_data(&self) -> ApiResponse {
        match self.with_store(|s| s.reset_to_seed_data()) {
            Ok(()) => ApiResponse::ok(&Value::Null).with_message("Demo data reset"),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    pub fn clear_all(&self) -> ApiResponse {
        match self.with_store(|s| s.clear_all()) {
            Ok(()) => ApiResponse::ok(&Value::Null).with_message("All data cleared"),
            Err(e) => ApiResponse::from_store(e),
        }
    }

    // --- capture flows ---

    /// Capture a face and create an identity enrolled with it.
    pub async fn enroll(&self, engine: &EngineHandle, body: &str, image: Vec<u8>) -> ApiResponse {
        let mut input: IdentityInput = match serde_json::from_str(body) {
            Ok(input) => input,
            Err(e) => return ApiResponse::error(BAD_REQUEST, format!("Invalid request body: {e}")),
        };
        match engine.capture(image).await {
            Ok(vector) => {
                let quality_grade = vector.quality_grade();
                input.reference_vector = Some(vector);
                match self.insert_identity(input) {
                    Ok(identity) => ApiResponse::ok(&EnrollOutcome {
                        identity,
                        quality_grade,
                    })
                    .with_message("Employee created successfully"),
                    Err(response) => response,
                }
            }
            Err(EngineError::NoFaceDetected) => {
                ApiResponse::error(BAD_REQUEST, "No face detected - please try again")
            }
            Err(e) => ApiResponse::error(INTERNAL_ERROR, e.to_string()),
        }
    }

    /// Capture a face, match it, and record attendance on acceptance.
    pub async fn attend(&self, engine: &EngineHandle, image: Vec<u8>) -> ApiResponse {
        match engine.capture(image).await {
            Ok(captured) => self.match_and_record(engine, captured).await,
            Err(EngineError::NoFaceDetected) => ApiResponse::ok(&AttendanceOutcome::new(
                MatchVerdict::rejected("No face detected - please try again"),
                None,
                None,
            )),
            Err(e) => ApiResponse::error(INTERNAL_ERROR, e.to_string()),
        }
    }

    /// Attendance for a simulated fresh capture of an enrolled identity.
    pub async fn attend_demo(&self, engine: &EngineHandle, identity_id: &str) -> ApiResponse {
        let identity = match self.with_store(|s| s.get_identity(identity_id)) {
            Ok(identity) => identity,
            Err(e) => return ApiResponse::from_store(e),
        };
        let Some(template) = identity.reference_vector else {
            return ApiResponse::error(BAD_REQUEST, "Employee has no enrolled face");
        };
        let reference = match template.decode() {
            Ok(v) => v,
            Err(e) => return ApiResponse::from_store(StoreError::Decode(e)),
        };
        let captured = lookalike(&reference, &mut StdRng::from_entropy());
        self.match_and_record(engine, captured).await
    }

    async fn match_and_record(&self, engine: &EngineHandle, captured: FeatureVector) -> ApiResponse {
        let gallery = match self.with_store(|s| s.list_identities()) {
            Ok(gallery) => gallery,
            Err(e) => return ApiResponse::from_store(e),
        };
        let quality_grade = captured.quality_grade();
        let verdict = match engine.match_gallery(captured, gallery).await {
            Ok(verdict) => verdict,
            Err(e) => return ApiResponse::error(INTERNAL_ERROR, e.to_string()),
        };

        let location = Some(self.location.clone());
        match self.with_store(|s| record_verdict(s, &verdict, location)) {
            Ok(event) => ApiResponse::ok(&AttendanceOutcome::new(verdict, Some(quality_grade), event)),
            Err(e) => ApiResponse::from_store(e),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn encode_enrollable(vector: &FeatureVector) -> Result<FaceTemplate, ApiResponse> {
    if !vector.is_enrollable() {
        return Err(ApiResponse::error(BAD_REQUEST, "Invalid face data"));
    }
    FaceTemplate::encode(vector).map_err(|e| ApiResponse::error(BAD_REQUEST, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{spawn_engine, Latency};
    use rollcall_core::{FixedExtractor, WeightedMatcher};
    use rollcall_store::seed::demo_face;
    use serde_json::json;

    fn seeded_api() -> Api {
        Api::new(IdentityStore::in_memory(), "Main Office")
    }

    fn empty_api() -> Api {
        let store = IdentityStore::in_memory();
        store.clear_all().unwrap();
        Api::new(store, "Main Office")
    }

    fn engine(extractor: FixedExtractor) -> EngineHandle {
        spawn_engine(Box::new(extractor), Box::new(WeightedMatcher), Latency::default()).unwrap()
    }

    fn person(email: &str) -> String {
        json!({ "name": "Ana Lima", "email": email, "department": "Finance" }).to_string()
    }

    #[test]
    fn test_status_counts() {
        let data = seeded_api().status().body.data.unwrap();
        assert_eq!(data["identities"], 6);
        assert_eq!(data["location"], "Main Office");
        assert!(data["attendanceRecords"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_status_counts_today() {
        let api = empty_api();
        let day = Utc::now().format("%Y-%m-%d").to_string();
        for (id, kind, time) in [
            ("emp_001", "check-in", "00:00:01"),
            ("emp_002", "check-in", "00:00:02"),
            ("emp_002", "check-out", "00:00:03"),
        ] {
            let body = json!({
                "identityId": id, "identityName": "Someone", "type": kind,
                "timestamp": format!("{day}T{time}Z"),
            })
            .to_string();
            assert_eq!(api.create_attendance(&body).status, OK);
        }
        let old = json!({
            "identityId": "emp_003", "identityName": "Someone", "type": "check-in",
            "timestamp": "2020-01-01T08:00:00Z",
        })
        .to_string();
        assert_eq!(api.create_attendance(&old).status, OK);

        let data = api.status().body.data.unwrap();
        assert_eq!(data["attendanceRecords"], 4);
        assert_eq!(data["checkedIn"], 2);
        assert_eq!(data["checkedOut"], 1);
        assert_eq!(data["present"], 1);
    }

    #[test]
    fn test_list_identities_envelope() {
        let response = seeded_api().list_identities();
        assert_eq!(response.status, OK);
        assert!(response.body.success);
        assert_eq!(response.body.data.unwrap().as_array().unwrap().len(), 6);
        assert!(response.body.error.is_none());
    }

    #[test]
    fn test_create_identity_assigns_id() {
        let api = empty_api();
        let response = api.create_identity(&person("ana@x.com"));
        assert_eq!(response.status, OK);
        assert_eq!(response.body.message.as_deref(), Some("Employee created successfully"));
        let data = response.body.data.unwrap();
        assert!(data["id"].as_str().unwrap().starts_with("emp_"));
        assert!(data.get("enrolledAt").is_some());
    }

    #[test]
    fn test_create_identity_missing_fields() {
        let api = empty_api();
        let body = json!({ "name": "Ana", "email": "" }).to_string();
        let response = api.create_identity(&body);
        assert_eq!(response.status, BAD_REQUEST);
        assert_eq!(response.body.error.as_deref(), Some("Missing required fields"));
        assert!(!response.body.success);
    }

    #[test]
    fn test_create_identity_malformed_body() {
        assert_eq!(empty_api().create_identity("{not json").status, BAD_REQUEST);
    }

    #[test]
    fn test_create_identity_duplicate_email() {
        let api = empty_api();
        assert_eq!(api.create_identity(&person("ana@x.com")).status, OK);
        let response = api.create_identity(&person("ana@x.com"));
        assert_eq!(response.status, CONFLICT);
        assert_eq!(
            response.body.error.as_deref(),
            Some("Employee with this email already exists")
        );
    }

    #[test]
    fn test_create_identity_rejects_poor_face() {
        let api = empty_api();
        let mut face = demo_face("ana", Utc::now());
        face.quality = 0.2;
        let body = json!({
            "name": "Ana", "email": "ana@x.com", "department": "Finance",
            "referenceVector": face,
        })
        .to_string();
        let response = api.create_identity(&body);
        assert_eq!(response.status, BAD_REQUEST);
        assert_eq!(response.body.error.as_deref(), Some("Invalid face data"));
    }

    #[test]
    fn test_update_identity() {
        let api = seeded_api();
        let response = api.update_identity("emp_001", &json!({ "department": "Research" }).to_string());
        assert_eq!(response.status, OK);
        assert_eq!(response.body.data.unwrap()["department"], "Research");

        assert_eq!(api.update_identity("", "{}").status, BAD_REQUEST);
        assert_eq!(api.update_identity("emp_999", "{}").status, NOT_FOUND);

        let clash = json!({ "email": "michael.chen@company.com" }).to_string();
        assert_eq!(api.update_identity("emp_001", &clash).status, CONFLICT);
    }

    #[test]
    fn test_delete_identity() {
        let api = seeded_api();
        assert_eq!(api.delete_identity("emp_003").status, OK);
        let response = api.delete_identity("emp_003");
        assert_eq!(response.status, NOT_FOUND);
        assert_eq!(response.body.error.as_deref(), Some("Employee not found"));
    }

    #[test]
    fn test_create_attendance_validation() {
        let api = empty_api();
        let missing = json!({ "identityId": "emp_001", "type": "check-in" }).to_string();
        assert_eq!(api.create_attendance(&missing).status, BAD_REQUEST);

        let bad_type = json!({
            "employeeId": "emp_001", "employeeName": "Sarah", "type": "lunch"
        })
        .to_string();
        let response = api.create_attendance(&bad_type);
        assert_eq!(response.status, BAD_REQUEST);
        assert_eq!(response.body.error.as_deref(), Some("Invalid attendance type"));

        let bad_confidence = json!({
            "identityId": "emp_001", "identityName": "Sarah", "type": "check-in", "confidence": 3.0
        })
        .to_string();
        assert_eq!(api.create_attendance(&bad_confidence).status, BAD_REQUEST);
    }

    #[test]
    fn test_create_and_list_attendance() {
        let api = empty_api();
        for (kind, ts) in [("check-in", "2024-03-01T08:00:00Z"), ("check-out", "2024-03-01T17:30:00Z")] {
            let body = json!({
                "identityId": "emp_001", "identityName": "Sarah", "type": kind, "timestamp": ts
            })
            .to_string();
            let response = api.create_attendance(&body);
            assert_eq!(response.status, OK);
            assert_eq!(response.body.message.as_deref(), Some("Attendance recorded successfully"));
        }

        let query = AttendanceQuery {
            identity_id: Some("emp_001".into()),
            date: Some("2024-03-01".into()),
            limit: Some(1),
        };
        let response = api.list_attendance(&query);
        assert_eq!(response.body.total, Some(2));
        let data = response.body.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["type"], "check-out");

        let summaries = api.daily_summaries(&query).body.data.unwrap();
        assert_eq!(summaries[0]["totalHours"], 9.5);
    }

    #[test]
    fn test_delete_attendance() {
        let api = empty_api();
        let body = json!({
            "id": "att_1", "identityId": "emp_001", "identityName": "Sarah", "type": "check-in"
        })
        .to_string();
        assert_eq!(api.create_attendance(&body).status, OK);
        assert_eq!(api.delete_attendance("").status, BAD_REQUEST);
        assert_eq!(api.delete_attendance("att_1").status, OK);
        let response = api.delete_attendance("att_1");
        assert_eq!(response.status, NOT_FOUND);
        assert_eq!(response.body.error.as_deref(), Some("Attendance record not found"));
    }

    #[test]
    fn test_clear_and_reset() {
        let api = seeded_api();
        assert_eq!(api.clear_all().status, OK);
        assert_eq!(api.list_identities().body.data.unwrap().as_array().unwrap().len(), 0);
        assert_eq!(api.reset_demo_data().status, OK);
        assert_eq!(api.list_identities().body.data.unwrap().as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_attend_records_check_in_then_check_out() {
        let api = empty_api();
        let face = demo_face("ana", Utc::now());
        let engine = engine(FixedExtractor::new(face.clone()));
        assert_eq!(api.enroll(&engine, &person("ana@x.com"), b"img".to_vec()).await.status, OK);

        let first = api.attend(&engine, b"img".to_vec()).await.body.data.unwrap();
        assert_eq!(first["matchStatus"], "verified");
        assert_eq!(first["attendanceType"], "check-in");
        assert_eq!(first["employee"]["name"], "Ana Lima");
        assert_eq!(first["confidence"], 1.0);
        assert_eq!(first["confidenceLevel"], "Excellent");
        assert_eq!(first["statusDescription"], "Verified Match");
        assert_eq!(first["qualityGrade"], "excellent");

        let second = api.attend(&engine, b"img".to_vec()).await.body.data.unwrap();
        assert_eq!(second["attendanceType"], "check-out");
        assert_eq!(second["event"]["location"], "Main Office");
    }

    #[tokio::test]
    async fn test_attend_without_face_is_a_verdict() {
        let api = seeded_api();
        let engine = engine(FixedExtractor::failing());
        let response = api.attend(&engine, b"img".to_vec()).await;
        assert_eq!(response.status, OK);
        let data = response.body.data.unwrap();
        assert_eq!(data["matchStatus"], "rejected");
        assert_eq!(data["statusDescription"], "Match Rejected");
        assert_eq!(data["confidenceLevel"], "Low");
        assert!(data.get("qualityGrade").is_none());
        assert!(data.get("attendanceType").is_none());
    }

    #[tokio::test]
    async fn test_attend_unknown_face_records_nothing() {
        let api = empty_api();
        let engine = engine(FixedExtractor::new(demo_face("stranger", Utc::now())));
        let response = api.attend(&engine, b"img".to_vec()).await;
        let data = response.body.data.unwrap();
        assert_eq!(data["matchStatus"], "no_match");
        assert_eq!(data["statusDescription"], "No Match Found");
        assert_eq!(api.list_attendance(&AttendanceQuery::default()).body.total, Some(0));
    }

    #[tokio::test]
    async fn test_attend_demo() {
        let api = seeded_api();
        let engine = engine(FixedExtractor::failing());
        let response = api.attend_demo(&engine, "emp_004").await;
        let data = response.body.data.unwrap();
        assert_eq!(data["matchStatus"], "verified");
        assert_eq!(data["employee"]["id"], "emp_004");
        assert!(data.get("attendanceType").is_some());

        assert_eq!(api.attend_demo(&engine, "emp_404").await.status, NOT_FOUND);
    }

    #[tokio::test]
    async fn test_enroll_reports_quality_grade() {
        let api = empty_api();
        let mut face = demo_face("ana", Utc::now());
        face.quality = 0.82;
        let engine = engine(FixedExtractor::new(face));
        let response = api.enroll(&engine, &person("ana@x.com"), b"img".to_vec()).await;
        assert_eq!(response.status, OK);
        assert_eq!(response.body.message.as_deref(), Some("Employee created successfully"));
        let data = response.body.data.unwrap();
        assert_eq!(data["qualityGrade"], "good");
        assert_eq!(data["email"], "ana@x.com");
        assert!(data["referenceVector"].is_string());
    }

    #[tokio::test]
    async fn test_enroll_without_face() {
        let api = empty_api();
        let engine = engine(FixedExtractor::failing());
        let response = api.enroll(&engine, &person("ana@x.com"), b"img".to_vec()).await;
        assert_eq!(response.status, BAD_REQUEST);
        assert_eq!(api.list_identities().body.data.unwrap().as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                StoreError::Validation {
                    field: "name",
                    reason: "is required".into(),
                },
                BAD_REQUEST,
            ),
            (StoreError::NotFound("x".into()), NOT_FOUND),
            (StoreError::Conflict("x".into()), CONFLICT),
            (StoreError::Storage("x".into()), INTERNAL_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiResponse::from_store(err).status, status);
        }
    }
}

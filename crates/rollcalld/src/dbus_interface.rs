use crate::api::{Api, ApiResponse, AttendanceQuery};
use crate::engine::EngineHandle;
use std::sync::Arc;
use zbus::interface;

/// D-Bus interface for the Rollcall attendance daemon.
///
/// Bus name: org.rollcall.Rollcall1
/// Object path: /org/rollcall/Rollcall1
///
/// Every method returns a JSON `{status, body}` document. Request-level
/// failures (bad input, missing records) travel inside it; D-Bus errors are
/// reserved for responses that cannot be encoded.
pub struct RollcallService {
    api: Arc<Api>,
    engine: EngineHandle,
}

impl RollcallService {
    pub fn new(api: Arc<Api>, engine: EngineHandle) -> Self {
        Self { api, engine }
    }
}

fn reply(response: ApiResponse) -> zbus::fdo::Result<String> {
    if !response.is_success() {
        tracing::debug!(status = response.status, error = ?response.body.error, "request failed");
    }
    response
        .to_json()
        .map_err(|e| zbus::fdo::Error::Failed(format!("failed to encode response: {e}")))
}

/// Empty strings and zero mean "not set" on the wire.
fn attendance_query(identity_id: &str, date: &str, limit: u32) -> AttendanceQuery {
    let text = |s: &str| (!s.is_empty()).then(|| s.to_string());
    AttendanceQuery {
        identity_id: text(identity_id),
        date: text(date),
        limit: (limit > 0).then_some(limit as usize),
    }
}

#[interface(name = "org.rollcall.Rollcall1")]
impl RollcallService {
    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        reply(self.api.status())
    }

    async fn list_identities(&self) -> zbus::fdo::Result<String> {
        reply(self.api.list_identities())
    }

    /// Create an identity from a JSON body, optionally carrying a reference vector.
    async fn create_identity(&self, body: &str) -> zbus::fdo::Result<String> {
        tracing::info!("create_identity requested");
        reply(self.api.create_identity(body))
    }

    async fn update_identity(&self, id: &str, body: &str) -> zbus::fdo::Result<String> {
        tracing::info!(id, "update_identity requested");
        reply(self.api.update_identity(id, body))
    }

    async fn delete_identity(&self, id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(id, "delete_identity requested");
        reply(self.api.delete_identity(id))
    }

    async fn list_attendance(
        &self,
        identity_id: &str,
        date: &str,
        limit: u32,
    ) -> zbus::fdo::Result<String> {
        reply(self.api.list_attendance(&attendance_query(identity_id, date, limit)))
    }

    async fn create_attendance(&self, body: &str) -> zbus::fdo::Result<String> {
        reply(self.api.create_attendance(body))
    }

    async fn delete_attendance(&self, id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(id, "delete_attendance requested");
        reply(self.api.delete_attendance(id))
    }

    /// Per-identity, per-day latest check-in, latest check-out and hours worked.
    async fn daily_summaries(&self, identity_id: &str, date: &str) -> zbus::fdo::Result<String> {
        reply(self.api.daily_summaries(&attendance_query(identity_id, date, 0)))
    }

    /// Capture a face from `image` and enroll it as a new identity described by `body`.
    async fn enroll(&self, body: &str, image: Vec<u8>) -> zbus::fdo::Result<String> {
        tracing::info!(bytes = image.len(), "enroll requested");
        reply(self.api.enroll(&self.engine, body, image).await)
    }

    /// Capture, match against every enrolled identity, and record attendance.
    async fn attend(&self, image: Vec<u8>) -> zbus::fdo::Result<String> {
        tracing::info!(bytes = image.len(), "attend requested");
        reply(self.api.attend(&self.engine, image).await)
    }

    /// Attend with a simulated capture of an enrolled identity's face.
    async fn attend_demo(&self, identity_id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(identity_id, "attend_demo requested");
        reply(self.api.attend_demo(&self.engine, identity_id).await)
    }

    async fn reset_demo_data(&self) -> zbus::fdo::Result<String> {
        tracing::info!("reset_demo_data requested");
        reply(self.api.reset_demo_data())
    }

    async fn clear_all(&self) -> zbus::fdo::Result<String> {
        tracing::warn!("clear_all requested");
        reply(self.api.clear_all())
    }
}

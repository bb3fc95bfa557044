//! Identity and attendance persistence over a [`KvBackend`].
//!
//! Each collection is a single JSON record that every write replaces
//! whole. The store assumes a single writer: callers sharing one instance
//! serialize access (the daemon holds it behind a mutex).

use crate::error::{Result, StoreError};
use crate::kv::{KvBackend, KvOp, MemoryBackend};
use crate::model::{AttendanceEvent, DailySummary, EventFilter, IdentityPatch};
use crate::seed::{self, SeedPolicy};
use crate::summary::daily_summaries;
use chrono::Utc;
use rollcall_core::Identity;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const IDENTITIES_KEY: &str = "identities";
pub const ATTENDANCE_KEY: &str = "attendance";
pub const SEEDED_KEY: &str = "demo_data_initialized";

pub struct IdentityStore {
    backend: Box<dyn KvBackend>,
    seed_policy: SeedPolicy,
}

impl IdentityStore {
    pub fn new(backend: impl KvBackend + 'static, seed_policy: SeedPolicy) -> Self {
        Self {
            backend: Box::new(backend),
            seed_policy,
        }
    }

    /// Store backed by process memory with the default seed policy.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new(), SeedPolicy::default())
    }

    /// Seed the demo gallery and a week of attendance on first access.
    ///
    /// Runs at most once per store: the persisted flag short-circuits later
    /// calls, and a store that already holds identities or attendance is only
    /// flagged, never overwritten. Returns whether seed data was written.
    pub fn initialize(&self) -> Result<bool> {
        if self.backend.get(SEEDED_KEY)?.is_some() {
            return Ok(false);
        }

        if self.backend.get(IDENTITIES_KEY)?.is_some() || self.backend.get(ATTENDANCE_KEY)?.is_some()
        {
            tracing::debug!("existing data found, marking store as initialized");
            self.backend.set(SEEDED_KEY, b"true".to_vec())?;
            return Ok(false);
        }

        let (identities, events) = self.seed_collections();
        self.backend.commit(&[
            KvOp::set(IDENTITIES_KEY, encode(&identities)?),
            KvOp::set(ATTENDANCE_KEY, encode(&events)?),
            KvOp::set(SEEDED_KEY, b"true".to_vec()),
        ])?;

        tracing::info!(
            identities = identities.len(),
            events = events.len(),
            "seeded demo data"
        );
        Ok(true)
    }

    fn seed_collections(&self) -> (Vec<Identity>, Vec<AttendanceEvent>) {
        let identities = seed::demo_identities();
        let events = seed::demo_attendance(&identities, Utc::now().date_naive(), self.seed_policy);
        (identities, events)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.backend.get(key)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn identities(&self) -> Result<Vec<Identity>> {
        self.initialize()?;
        self.load(IDENTITIES_KEY)
    }

    fn events(&self) -> Result<Vec<AttendanceEvent>> {
        self.initialize()?;
        self.load(ATTENDANCE_KEY)
    }

    /// All identities in insertion order.
    pub fn list_identities(&self) -> Result<Vec<Identity>> {
        self.identities()
    }

    pub fn get_identity(&self, id: &str) -> Result<Identity> {
        self.identities()?
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound("Employee not found".into()))
    }

    /// Insert a new identity or replace the one with the same id in place.
    pub fn upsert_identity(&self, identity: Identity) -> Result<Identity> {
        validate_identity(&identity)?;

        let mut identities = self.identities()?;
        ensure_unique_email(&identities, &identity)?;

        match identities.iter_mut().find(|i| i.id == identity.id) {
            Some(existing) => {
                tracing::debug!(id = %identity.id, "replacing identity");
                *existing = identity.clone();
            }
            None => {
                tracing::debug!(id = %identity.id, "adding identity");
                identities.push(identity.clone());
            }
        }

        self.backend.set(IDENTITIES_KEY, encode(&identities)?)?;
        Ok(identity)
    }

    /// Apply a partial edit to an existing identity.
    pub fn update_identity(&self, id: &str, patch: IdentityPatch) -> Result<Identity> {
        let mut updated = self.get_identity(id)?;
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(email) = patch.email {
            updated.email = email;
        }
        if let Some(department) = patch.department {
            updated.department = department;
        }
        if let Some(reference) = patch.reference_vector {
            updated.reference_vector = Some(reference);
        }
        self.upsert_identity(updated)
    }

    /// Remove an identity, returning it. Its attendance events are kept.
    pub fn delete_identity(&self, id: &str) -> Result<Identity> {
        let mut identities = self.identities()?;
        let index = identities
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound("Employee not found".into()))?;
        let removed = identities.remove(index);
        self.backend.set(IDENTITIES_KEY, encode(&identities)?)?;
        tracing::info!(id, "deleted identity");
        Ok(removed)
    }

    /// Record a new event at the front of the newest-first collection.
    pub fn append_attendance_event(&self, event: AttendanceEvent) -> Result<AttendanceEvent> {
        event.validate()?;
        let mut events = self.events()?;
        if events.iter().any(|e| e.id == event.id) {
            return Err(StoreError::Conflict(format!(
                "Attendance record {} already exists",
                event.id
            )));
        }
        events.insert(0, event.clone());
        self.backend.set(ATTENDANCE_KEY, encode(&events)?)?;
        Ok(event)
    }

    /// Matching events, newest first, truncated to `filter.limit`.
    pub fn list_attendance_events(&self, filter: &EventFilter) -> Result<Vec<AttendanceEvent>> {
        let mut events: Vec<AttendanceEvent> = self
            .events()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    pub fn count_attendance_events(&self) -> Result<usize> {
        Ok(self.events()?.len())
    }

    pub fn events_for_identity(&self, identity_id: &str) -> Result<Vec<AttendanceEvent>> {
        self.list_attendance_events(&EventFilter::for_identity(identity_id))
    }

    pub fn today_events(&self) -> Result<Vec<AttendanceEvent>> {
        self.list_attendance_events(&EventFilter::on_date(Utc::now().date_naive()))
    }

    pub fn delete_attendance_event(&self, id: &str) -> Result<AttendanceEvent> {
        let mut events = self.events()?;
        let index = events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound("Attendance record not found".into()))?;
        let removed = events.remove(index);
        self.backend.set(ATTENDANCE_KEY, encode(&events)?)?;
        Ok(removed)
    }

    /// Daily summaries over the events selected by `filter`.
    pub fn daily_summaries(&self, filter: &EventFilter) -> Result<Vec<DailySummary>> {
        Ok(daily_summaries(&self.list_attendance_events(filter)?))
    }

    /// Drop every identity and event. The store stays initialized, so it is
    /// not reseeded on the next read.
    pub fn clear_all(&self) -> Result<()> {
        self.backend.commit(&[
            KvOp::delete(IDENTITIES_KEY),
            KvOp::delete(ATTENDANCE_KEY),
            KvOp::set(SEEDED_KEY, b"true".to_vec()),
        ])?;
        tracing::info!("cleared all identities and attendance");
        Ok(())
    }

    /// Replace everything with freshly generated demo data.
    pub fn reset_to_seed_data(&self) -> Result<()> {
        let (identities, events) = self.seed_collections();
        self.backend.commit(&[
            KvOp::set(IDENTITIES_KEY, encode(&identities)?),
            KvOp::set(ATTENDANCE_KEY, encode(&events)?),
            KvOp::set(SEEDED_KEY, b"true".to_vec()),
        ])?;
        tracing::info!(
            identities = identities.len(),
            events = events.len(),
            policy = ?self.seed_policy,
            "reset to demo data"
        );
        Ok(())
    }
}

fn encode<T: Serialize>(items: &[T]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(items)?)
}

fn validate_identity(identity: &Identity) -> Result<()> {
    if identity.id.trim().is_empty() {
        return Err(StoreError::missing("id"));
    }
    if identity.name.trim().is_empty() {
        return Err(StoreError::missing("name"));
    }
    if identity.email.trim().is_empty() {
        return Err(StoreError::missing("email"));
    }
    if identity.department.trim().is_empty() {
        return Err(StoreError::missing("department"));
    }
    if let Some(template) = &identity.reference_vector {
        template.decode()?;
    }
    Ok(())
}

fn ensure_unique_email(existing: &[Identity], candidate: &Identity) -> Result<()> {
    if existing
        .iter()
        .any(|i| i.email == candidate.email && i.id != candidate.id)
    {
        return Err(StoreError::Conflict(
            "Employee with this email already exists".into(),
        ));
    }
    Ok(())
}

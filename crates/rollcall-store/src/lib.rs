//! rollcall-store: Enrolled identities and attendance history.
//!
//! Persists the identity gallery and append-only attendance events over a
//! pluggable key-value backend, seeds demo data on first use, derives
//! daily summaries, and decides check-in vs check-out on accepted matches.

pub mod error;
pub mod kv;
pub mod model;
pub mod seed;
pub mod session;
pub mod store;
pub mod summary;

pub use error::StoreError;
pub use kv::{KvBackend, KvOp, MemoryBackend, SqliteBackend};
pub use model::{AttendanceEvent, DailySummary, EventFilter, EventKind, IdentityPatch};
pub use seed::SeedPolicy;
pub use session::{
    decide_event_kind, presence_counts, record_verdict, record_verified_attendance,
    PresenceCounts,
};
pub use store::IdentityStore;
pub use summary::daily_summaries;

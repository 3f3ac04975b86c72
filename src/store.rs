//! Persistence seams: versioned vector-state storage and prescription output.
//!
//! The engine talks to storage through two traits so callers can swap the
//! in-memory implementations for a database without touching decision logic.
//!
//! The state store is the second line of defence for the permanence
//! guarantees: [`VectorStateStore::put`] enforces optimistic-concurrency
//! versioning, rejects any write that would clear a persisted `locked_in`
//! flag, and records the applied idempotency key atomically with the state
//! it belongs to. A crash can therefore never leave a state applied but its
//! key unrecorded, or vice versa.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::VectorId;
use crate::error::{EngineError, Result};
use crate::prescribe::DailyPrescription;
use crate::progress::IrreversibilityMarker;
use crate::state::UserVectorState;

// ─── Versioned state ────────────────────────────────────────────────────────

/// A vector state paired with its storage version for optimistic concurrency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedState {
    /// The state itself.
    pub state: UserVectorState,
    /// Monotonically increasing write counter, starting at 1.
    pub version: u64,
}

// ─── Traits ─────────────────────────────────────────────────────────────────

/// Versioned storage for per-vector user state.
pub trait VectorStateStore: Send + Sync {
    /// Fetch the current state and version for a vector, if any exists.
    fn get(&self, vector_id: &VectorId) -> Result<Option<VersionedState>>;

    /// Write a state, expecting `expected_version` to still be current
    /// (`None` means "must not exist yet"). When `applied_key` is given it
    /// is recorded atomically with the state.
    ///
    /// Fails with [`EngineError::Conflict`] on a version mismatch or on any
    /// attempt to persist a state whose lock-in flag is clear over one whose
    /// flag is set.
    fn put(
        &self,
        state: &UserVectorState,
        expected_version: Option<u64>,
        applied_key: Option<Uuid>,
    ) -> Result<u64>;

    /// Whether an idempotency key has already been applied.
    fn was_applied(&self, key: Uuid) -> Result<bool>;
}

/// Output side: where generated prescriptions and emitted markers land.
pub trait PrescriptionSink: Send + Sync {
    /// Store a daily prescription, superseding any previously active one.
    fn store_prescription(&self, prescription: &DailyPrescription) -> Result<()>;

    /// The currently active prescription at `now`, if one exists.
    fn active_prescription(&self, now: DateTime<Utc>) -> Result<Option<DailyPrescription>>;

    /// Store an irreversibility marker. A marker for a (vector, milestone)
    /// pair that already exists is silently kept — the first record wins.
    fn store_marker(&self, marker: &IrreversibilityMarker) -> Result<()>;

    /// Mark a stored marker acknowledged. Unknown ids are
    /// [`EngineError::NotFound`]; acknowledging twice is a no-op.
    fn acknowledge_marker(&self, marker_id: Uuid) -> Result<()>;

    /// All stored markers, in insertion order.
    fn markers(&self) -> Result<Vec<IrreversibilityMarker>>;
}

// ─── In-memory state store ──────────────────────────────────────────────────

#[derive(Default)]
struct StateInner {
    states: HashMap<VectorId, VersionedState>,
    applied: HashSet<Uuid>,
}

/// Process-local [`VectorStateStore`] backed by a read-write lock.
#[derive(Default)]
pub struct InMemoryStateStore {
    inner: RwLock<StateInner>,
}

impl InMemoryStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStateStore for InMemoryStateStore {
    fn get(&self, vector_id: &VectorId) -> Result<Option<VersionedState>> {
        Ok(self.inner.read().states.get(vector_id).cloned())
    }

    fn put(
        &self,
        state: &UserVectorState,
        expected_version: Option<u64>,
        applied_key: Option<Uuid>,
    ) -> Result<u64> {
        let mut inner = self.inner.write();
        let current = inner.states.get(&state.vector_id);

        let current_version = current.map(|v| v.version);
        if current_version != expected_version {
            return Err(EngineError::Conflict {
                vector_id: state.vector_id.to_string(),
                detail: format!(
                    "version mismatch: expected {:?}, found {:?}",
                    expected_version, current_version
                ),
            });
        }
        if let Some(existing) = current {
            if existing.state.is_locked_in() && !state.is_locked_in() {
                return Err(EngineError::Conflict {
                    vector_id: state.vector_id.to_string(),
                    detail: "write would clear a persisted lock-in flag".into(),
                });
            }
        }

        let version = current_version.unwrap_or(0) + 1;
        inner.states.insert(
            state.vector_id.clone(),
            VersionedState {
                state: state.clone(),
                version,
            },
        );
        if let Some(key) = applied_key {
            inner.applied.insert(key);
        }
        Ok(version)
    }

    fn was_applied(&self, key: Uuid) -> Result<bool> {
        Ok(self.inner.read().applied.contains(&key))
    }
}

// ─── In-memory prescription sink ────────────────────────────────────────────

#[derive(Default)]
struct SinkInner {
    active: Option<DailyPrescription>,
    markers: Vec<IrreversibilityMarker>,
}

/// Process-local [`PrescriptionSink`].
#[derive(Default)]
pub struct InMemorySink {
    inner: RwLock<SinkInner>,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrescriptionSink for InMemorySink {
    fn store_prescription(&self, prescription: &DailyPrescription) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(previous) = &inner.active {
            tracing::debug!(
                superseded = %previous.id,
                replacement = %prescription.id,
                "active prescription superseded"
            );
        }
        inner.active = Some(prescription.clone());
        Ok(())
    }

    fn active_prescription(&self, now: DateTime<Utc>) -> Result<Option<DailyPrescription>> {
        let inner = self.inner.read();
        Ok(inner.active.as_ref().filter(|p| p.is_active(now)).cloned())
    }

    fn store_marker(&self, marker: &IrreversibilityMarker) -> Result<()> {
        let mut inner = self.inner.write();
        let duplicate = inner.markers.iter().any(|m| {
            m.vector_id == marker.vector_id && m.milestone_name == marker.milestone_name
        });
        if duplicate {
            tracing::debug!(
                vector = %marker.vector_id,
                milestone = %marker.milestone_name,
                "marker already stored, keeping the first record"
            );
            return Ok(());
        }
        inner.markers.push(marker.clone());
        Ok(())
    }

    fn acknowledge_marker(&self, marker_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.markers.iter_mut().find(|m| m.id == marker_id) {
            Some(marker) => {
                marker.acknowledged = true;
                Ok(())
            }
            None => Err(EngineError::NotFound(format!(
                "no marker with id {}",
                marker_id
            ))),
        }
    }

    fn markers(&self) -> Result<Vec<IrreversibilityMarker>> {
        Ok(self.inner.read().markers.clone())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

//! The engine facade — one entry point wiring catalog, scorer, prescription
//! generator, progress application and learning together over the storage
//! seams.
//!
//! ```text
//!                    ┌───────────────┐
//!   UserContext ───► │ score_all     │ ───► Vec<VectorScore>
//!                    └──────┬────────┘
//!                           ▼
//!                    ┌───────────────┐
//!                    │ prescribe     │ ───► DailyPrescription ──► sink
//!                    └───────────────┘
//!                    ┌───────────────┐
//!   Engagement ────► │ apply_progress│ ───► VectorProgressUpdate
//!                    └──────┬────────┘        (markers ──► sink)
//!                           ▼
//!                      state store (versioned, idempotency-keyed)
//! ```
//!
//! Progress application is a read-modify-write against the state store under
//! optimistic concurrency. A version conflict surfaces as
//! [`EngineError::Conflict`] and is never retried here; the caller decides
//! whether to re-read and re-apply. Replaying an idempotency key returns an
//! `already_applied` update with zero effects.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::catalog::{VectorCatalog, VectorId};
use crate::context::UserContext;
use crate::error::{EngineError, Result};
use crate::learning::{
    derive_profile, EngagementHistory, EngagementRecord, UserLearningProfile,
};
use crate::prescribe::{
    assemble_daily, generate, DailyPrescription, PrescriptionConfig, VectorPrescription,
};
use crate::progress::{
    apply_progress, lock_in_status, LockInStatus, QualityDeltaPolicy, VectorProgressUpdate,
};
use crate::score::{score_all, ScoringConfig, VectorScore};
use crate::state::UserVectorState;
use crate::store::{PrescriptionSink, VectorStateStore};

// ─── Configuration ──────────────────────────────────────────────────────────

/// Complete engine configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EngineConfig {
    /// Scorer settings.
    pub scoring: ScoringConfig,
    /// Prescription-generator settings.
    pub prescription: PrescriptionConfig,
    /// Engagement-quality → progress-delta mapping.
    pub quality_policy: QualityDeltaPolicy,
}

impl EngineConfig {
    /// Validate every tunable up front, so a misconfigured engine fails at
    /// construction rather than mid-request.
    pub fn validate(&self) -> Result<()> {
        self.scoring.weights.validate()?;
        self.quality_policy.validate()?;
        if !self.prescription.locked_in_discount.is_finite()
            || !(0.0..=1.0).contains(&self.prescription.locked_in_discount)
        {
            return Err(EngineError::InvalidInput(format!(
                "locked_in_discount {} outside [0, 1]",
                self.prescription.locked_in_discount
            )));
        }
        Ok(())
    }
}

// ─── ProgressVectorEngine ───────────────────────────────────────────────────

/// The decision engine: scoring, prescription, progress and learning for one
/// user over a compiled catalog.
pub struct ProgressVectorEngine {
    catalog: VectorCatalog,
    config: EngineConfig,
    store: Arc<dyn VectorStateStore>,
    sink: Arc<dyn PrescriptionSink>,
    history: RwLock<EngagementHistory>,
}

impl ProgressVectorEngine {
    /// Build an engine over a compiled catalog and storage backends.
    /// Rejects invalid configuration immediately.
    pub fn new(
        catalog: VectorCatalog,
        config: EngineConfig,
        store: Arc<dyn VectorStateStore>,
        sink: Arc<dyn PrescriptionSink>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!(vectors = catalog.len(), "progress vector engine ready");
        Ok(Self {
            catalog,
            config,
            store,
            sink,
            history: RwLock::new(EngagementHistory::new()),
        })
    }

    /// The compiled catalog this engine serves.
    pub fn catalog(&self) -> &VectorCatalog {
        &self.catalog
    }

    /// Load every stored state, keyed by vector id. Vectors with no stored
    /// state are simply absent; the scorer defaults them.
    fn load_states(&self) -> Result<HashMap<VectorId, UserVectorState>> {
        let mut states = HashMap::new();
        for def in self.catalog.iter() {
            if let Some(versioned) = self.store.get(&def.id)? {
                states.insert(def.id.clone(), versioned.state);
            }
        }
        Ok(states)
    }

    // ── Scoring & prescription ────────────────────────────────────────────

    /// Score every catalog vector under the given context, with the learning
    /// profile derived from recorded engagements.
    pub fn score_all_vectors(&self, context: &UserContext) -> Result<Vec<VectorScore>> {
        let states = self.load_states()?;
        let profile = self.derive_learning_profile();
        score_all(
            &self.catalog,
            &states,
            context,
            Some(&profile),
            &self.config.scoring,
        )
    }

    /// Score and rank into the bounded prescription list, without assembling
    /// or persisting a daily prescription.
    pub fn generate_prescriptions(
        &self,
        context: &UserContext,
    ) -> Result<Vec<VectorPrescription>> {
        let states = self.load_states()?;
        let profile = self.derive_learning_profile();
        let scores = score_all(
            &self.catalog,
            &states,
            context,
            Some(&profile),
            &self.config.scoring,
        )?;
        Ok(generate(
            &self.catalog,
            &scores,
            &states,
            context,
            &self.config.prescription,
        ))
    }

    /// Full pipeline: score, rank, assemble the day's prescription and store
    /// it in the sink, superseding any previously active one.
    pub fn generate_daily_prescription(
        &self,
        user_id: &str,
        context: &UserContext,
    ) -> Result<DailyPrescription> {
        let states = self.load_states()?;
        let profile = self.derive_learning_profile();
        let scores = score_all(
            &self.catalog,
            &states,
            context,
            Some(&profile),
            &self.config.scoring,
        )?;
        let prescriptions = generate(
            &self.catalog,
            &scores,
            &states,
            context,
            &self.config.prescription,
        );
        let daily = assemble_daily(
            user_id,
            &self.catalog,
            prescriptions,
            &states,
            context,
            &self.config.prescription,
        );
        self.sink.store_prescription(&daily)?;
        tracing::info!(
            prescription = %daily.id,
            vectors = daily.prescriptions.len(),
            minutes = daily.total_estimated_minutes,
            "daily prescription generated"
        );
        Ok(daily)
    }

    /// The currently active daily prescription, if one exists and has not
    /// expired.
    pub fn active_prescription(&self, now: DateTime<Utc>) -> Result<Option<DailyPrescription>> {
        self.sink.active_prescription(now)
    }

    // ── Progress application ──────────────────────────────────────────────

    /// Apply a progress delta to one vector, keyed for idempotency.
    ///
    /// Read-modify-write against the state store: the applied key is
    /// persisted atomically with the new state, emitted markers land in the
    /// sink, and a replayed key returns an `already_applied` update with no
    /// effects. A concurrent writer surfaces as [`EngineError::Conflict`];
    /// no retry happens here.
    pub fn apply_progress(
        &self,
        idempotency_key: Uuid,
        vector_id: &VectorId,
        delta: f64,
        engagement_minutes: i64,
        sub_component: Option<(&str, f64)>,
        recorded_at: DateTime<Utc>,
    ) -> Result<VectorProgressUpdate> {
        let def = self
            .catalog
            .get_by_id(vector_id)
            .ok_or_else(|| EngineError::NotFound(format!("unknown vector `{}`", vector_id)))?;

        let versioned = self.store.get(vector_id)?;
        let (mut state, expected_version) = match versioned {
            Some(v) => (v.state, Some(v.version)),
            None => (UserVectorState::new(vector_id.clone()), None),
        };

        if self.store.was_applied(idempotency_key)? {
            tracing::debug!(key = %idempotency_key, vector = %vector_id, "replayed idempotency key");
            return Ok(VectorProgressUpdate::replayed(&state));
        }

        let update = apply_progress(
            &mut state,
            def,
            delta,
            engagement_minutes,
            sub_component,
            recorded_at,
        )?;
        self.store.put(&state, expected_version, Some(idempotency_key))?;

        for marker in &update.new_markers {
            self.sink.store_marker(marker)?;
        }
        Ok(update)
    }

    /// Apply a recorded engagement as progress, mapping its quality to a
    /// delta through the configured policy. The record's id is the
    /// idempotency key.
    pub fn apply_engagement(&self, record: &EngagementRecord) -> Result<VectorProgressUpdate> {
        let delta = if record.was_followed {
            self.config.quality_policy.delta_for(record.quality)
        } else {
            0.0
        };
        self.apply_progress(
            record.id,
            &record.vector_id,
            delta,
            i64::from(record.duration_minutes),
            None,
            record.recorded_at,
        )
    }

    // ── Learning ──────────────────────────────────────────────────────────

    /// Append an engagement record to the history. Unknown vectors are
    /// rejected; nothing else is — skipped and poor engagements are signal.
    pub fn record_engagement(&self, record: EngagementRecord) -> Result<()> {
        if self.catalog.get_by_id(&record.vector_id).is_none() {
            return Err(EngineError::NotFound(format!(
                "unknown vector `{}`",
                record.vector_id
            )));
        }
        record.context.validate()?;
        self.history.write().push(record);
        Ok(())
    }

    /// Derive the learning profile from everything recorded so far. An empty
    /// history yields the neutral profile.
    pub fn derive_learning_profile(&self) -> UserLearningProfile {
        derive_profile(&self.history.read())
    }

    // ── Status views ──────────────────────────────────────────────────────

    /// Permanence standing of one vector.
    pub fn lock_in_status(&self, vector_id: &VectorId) -> Result<LockInStatus> {
        let def = self
            .catalog
            .get_by_id(vector_id)
            .ok_or_else(|| EngineError::NotFound(format!("unknown vector `{}`", vector_id)))?;
        let state = match self.store.get(vector_id)? {
            Some(v) => v.state,
            None => UserVectorState::new(vector_id.clone()),
        };
        Ok(lock_in_status(def, &state))
    }

    /// All stored irreversibility markers.
    pub fn markers(&self) -> Result<Vec<crate::progress::IrreversibilityMarker>> {
        self.sink.markers()
    }

    /// Acknowledge a stored marker by id.
    pub fn acknowledge_marker(&self, marker_id: Uuid) -> Result<()> {
        self.sink.acknowledge_marker(marker_id)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

//! Per-user, per-vector mutable state.
//!
//! A [`UserVectorState`] is created lazily at level 0 on first engagement and
//! never deleted. Its two structural invariants:
//!
//! - `current_level` stays in [0.0, 10.0] and always equals the weight-blended
//!   sum of the sub-component scores once those are initialised.
//! - `locked_in` is monotonic: it moves false → true exactly once and no code
//!   path can move it back. The field is private and the sole mutator is
//!   one-way, so the type system enforces the permanence guarantee inside
//!   this crate; the state store re-enforces it at the persistence boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{VectorId, LEVEL_MAX};

/// Number of recent per-engagement level deltas kept for trend derivation.
pub const TREND_WINDOW: usize = 5;

/// Deadband below which movement differences read as steady.
const TREND_DEADBAND: f64 = 0.02;

// ─── VelocityTrend ──────────────────────────────────────────────────────────

/// Direction of recent movement, derived from the rolling delta window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityTrend {
    /// Recent movement outpaces the prior average.
    Accelerating,
    /// Movement roughly matches the prior average.
    #[default]
    Steady,
    /// Still moving forward, but slower than before.
    Stalling,
    /// Recent movement is net negative. Treated as urgent need by the
    /// scorer, not as disqualification.
    Regressing,
}

impl VelocityTrend {
    /// Derive a trend from a window of recent level deltas, oldest first.
    ///
    /// Fewer than two samples read as steady — a fresh vector has no
    /// history to accelerate or stall against. Otherwise the mean of the
    /// newest two samples is compared against the mean of the rest with a
    /// small deadband.
    pub fn from_window(deltas: &[f64]) -> Self {
        if deltas.len() < 2 {
            return VelocityTrend::Steady;
        }
        let split = deltas.len() - 2;
        let (prior, recent) = deltas.split_at(split);
        let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;

        if recent_avg < -TREND_DEADBAND {
            return VelocityTrend::Regressing;
        }
        // With exactly two samples there is no prior to compare against.
        if prior.is_empty() {
            return VelocityTrend::Steady;
        }
        let prior_avg = prior.iter().sum::<f64>() / prior.len() as f64;
        if recent_avg > prior_avg + TREND_DEADBAND {
            VelocityTrend::Accelerating
        } else if recent_avg < prior_avg - TREND_DEADBAND {
            VelocityTrend::Stalling
        } else {
            VelocityTrend::Steady
        }
    }
}

// ─── UserVectorState ────────────────────────────────────────────────────────

/// Mutable per-vector progress record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserVectorState {
    /// The vector this state belongs to.
    pub vector_id: VectorId,
    /// Continuous level in [0.0, 10.0].
    pub current_level: f64,
    /// Per-sub-component scores on the same 0–10 scale. Empty until the
    /// first engagement initialises them from the definition.
    pub sub_scores: BTreeMap<String, f64>,
    /// Trend derived from the rolling delta window.
    pub velocity_trend: VelocityTrend,
    /// Timestamp of the most recent engagement, if any.
    pub last_activity: Option<DateTime<Utc>>,
    /// Lifetime engagement minutes.
    pub total_engagement_minutes: u64,
    /// Consecutive engagement days for this vector.
    pub streak_days: u32,
    /// Highest level ever reached.
    pub peak_level: f64,
    /// One-way lock-in flag. Private: see [`UserVectorState::mark_locked_in`].
    locked_in: bool,
    /// When lock-in happened, if it has.
    lock_in_date: Option<DateTime<Utc>>,
    /// Names of irreversible milestones already emitted, so a marker can
    /// never be produced twice for the same milestone.
    emitted_irreversible: std::collections::BTreeSet<String>,
    /// Rolling window of recent level deltas, oldest first.
    recent_deltas: Vec<f64>,
}

impl UserVectorState {
    /// Fresh state at level 0 with steady trend — the lazy default every
    /// vector is scoreable from.
    pub fn new(vector_id: VectorId) -> Self {
        Self {
            vector_id,
            current_level: 0.0,
            sub_scores: BTreeMap::new(),
            velocity_trend: VelocityTrend::Steady,
            last_activity: None,
            total_engagement_minutes: 0,
            streak_days: 0,
            peak_level: 0.0,
            locked_in: false,
            lock_in_date: None,
            emitted_irreversible: std::collections::BTreeSet::new(),
            recent_deltas: Vec::new(),
        }
    }

    /// Fresh state pre-positioned at a level, for seeding and tests. The
    /// level is clamped to [0.0, 10.0]; sub-scores stay uninitialised.
    pub fn at_level(vector_id: VectorId, level: f64) -> Self {
        let mut state = Self::new(vector_id);
        state.current_level = level.clamp(0.0, LEVEL_MAX);
        state.peak_level = state.current_level;
        state
    }

    /// Whether this vector has locked in.
    pub fn is_locked_in(&self) -> bool {
        self.locked_in
    }

    /// When lock-in happened, if it has.
    pub fn lock_in_date(&self) -> Option<DateTime<Utc>> {
        self.lock_in_date
    }

    /// Whether an irreversibility marker was already emitted for a milestone.
    pub fn has_emitted_marker(&self, milestone: &str) -> bool {
        self.emitted_irreversible.contains(milestone)
    }

    /// The rolling delta window, oldest first.
    pub fn recent_deltas(&self) -> &[f64] {
        &self.recent_deltas
    }

    /// Set the lock-in flag. One-way: calling this again, or after the level
    /// later drops, changes nothing. Returns `true` only on the first call.
    pub(crate) fn mark_locked_in(&mut self, at: DateTime<Utc>) -> bool {
        if self.locked_in {
            return false;
        }
        self.locked_in = true;
        self.lock_in_date = Some(at);
        true
    }

    /// Record that an irreversibility marker was emitted for a milestone.
    /// Returns `false` if one already was, making emission idempotent.
    pub(crate) fn record_marker_emitted(&mut self, milestone: &str) -> bool {
        self.emitted_irreversible.insert(milestone.to_owned())
    }

    /// Push a level delta into the rolling window and refresh the trend.
    pub(crate) fn push_delta(&mut self, delta: f64) {
        if self.recent_deltas.len() == TREND_WINDOW {
            self.recent_deltas.remove(0);
        }
        self.recent_deltas.push(delta);
        self.velocity_trend = VelocityTrend::from_window(&self.recent_deltas);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

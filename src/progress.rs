//! Progress application and lock-in evaluation.
//!
//! [`apply_progress`] is the only function that moves a vector's level. It
//! validates its inputs up front and mutates nothing on rejection, clamps
//! the resulting level to [0, 10], walks the milestone ladder for newly
//! crossed rungs, and evaluates lock-in.
//!
//! Two permanence rules dominate this module:
//!
//! - Once `current_level` reaches the definition's lock-in threshold,
//!   `locked_in` becomes true and stays true. Later negative deltas may pull
//!   the level back below the threshold; the flag never follows.
//! - An irreversible milestone emits its [`IrreversibilityMarker`] exactly
//!   once per (vector, milestone), ever. The state records emitted
//!   milestones, so re-crossing after a regression emits nothing.
//!
//! There are no retries anywhere in this path. A failed write surfaces to
//! the caller; replays are handled by idempotency keys at the engine
//! boundary, never by this module guessing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{VectorDefinition, VectorId, LEVEL_MAX};
use crate::error::{EngineError, Result};
use crate::state::{UserVectorState, VelocityTrend};

// ─── Engagement quality → delta policy ──────────────────────────────────────

/// Self-reported or inferred quality of one engagement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementQuality {
    /// Barely showed up.
    Poor,
    /// Went through the motions.
    Mediocre,
    /// Solid session.
    Good,
    /// Fully present, real movement.
    Excellent,
}

/// Replaceable mapping from engagement quality to progress delta.
///
/// Any substitute must keep the mapping monotone — higher quality never
/// yields a smaller delta — which [`validate`](Self::validate) enforces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityDeltaPolicy {
    /// Delta for [`EngagementQuality::Poor`].
    pub poor: f64,
    /// Delta for [`EngagementQuality::Mediocre`].
    pub mediocre: f64,
    /// Delta for [`EngagementQuality::Good`].
    pub good: f64,
    /// Delta for [`EngagementQuality::Excellent`].
    pub excellent: f64,
}

impl Default for QualityDeltaPolicy {
    fn default() -> Self {
        Self {
            poor: 0.03,
            mediocre: 0.10,
            good: 0.20,
            excellent: 0.30,
        }
    }
}

impl QualityDeltaPolicy {
    /// Reject non-finite, negative, or non-monotone mappings.
    pub fn validate(&self) -> Result<()> {
        let ladder = [self.poor, self.mediocre, self.good, self.excellent];
        if ladder.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(EngineError::InvalidInput(
                "quality deltas must be finite and non-negative".into(),
            ));
        }
        if ladder.windows(2).any(|w| w[1] < w[0]) {
            return Err(EngineError::InvalidInput(
                "quality deltas must be monotone in quality".into(),
            ));
        }
        Ok(())
    }

    /// Delta for a quality band.
    pub fn delta_for(&self, quality: EngagementQuality) -> f64 {
        match quality {
            EngagementQuality::Poor => self.poor,
            EngagementQuality::Mediocre => self.mediocre,
            EngagementQuality::Good => self.good,
            EngagementQuality::Excellent => self.excellent,
        }
    }
}

// ─── Output records ─────────────────────────────────────────────────────────

/// One-time permanent record of an irreversible milestone crossing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IrreversibilityMarker {
    /// Marker id.
    pub id: Uuid,
    /// The vector whose milestone was crossed.
    pub vector_id: VectorId,
    /// Name of the crossed milestone.
    pub milestone_name: String,
    /// When the crossing happened.
    pub achieved_at: DateTime<Utc>,
    /// Level at the moment of crossing.
    pub level: f64,
    /// Whether the user has acknowledged the marker. The only field that
    /// ever changes after creation.
    pub acknowledged: bool,
}

/// Read-only view of a vector's permanence standing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockInStatus {
    /// The vector.
    pub vector_id: VectorId,
    /// Whether lock-in has happened.
    pub is_locked_in: bool,
    /// The threshold that was (or must be) crossed.
    pub lock_in_level: f64,
    /// How strongly accumulated engagement resists regression, in [0, 1).
    /// Grows asymptotically with lifetime engagement.
    pub regression_resistance: f64,
    /// Blend of resistance and headroom above the threshold, in [0, 1].
    pub permanence_score: f64,
}

/// Structured diff returned by [`apply_progress`]. Carries no presentation
/// concerns; the caller decides what to celebrate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorProgressUpdate {
    /// The updated vector.
    pub vector_id: VectorId,
    /// Level before the update.
    pub previous_level: f64,
    /// Level after clamping.
    pub new_level: f64,
    /// Trend after refreshing the rolling window.
    pub velocity_trend: VelocityTrend,
    /// Names of milestones newly crossed by this update, ladder order.
    pub achieved_milestones: Vec<String>,
    /// True only on the update that crossed the lock-in threshold.
    pub newly_locked_in: bool,
    /// Markers emitted by this update (first crossings of irreversible
    /// milestones only).
    pub new_markers: Vec<IrreversibilityMarker>,
    /// True when an idempotency key was replayed and nothing was applied.
    pub already_applied: bool,
}

impl VectorProgressUpdate {
    /// The no-op diff returned for a replayed idempotency key.
    pub(crate) fn replayed(state: &UserVectorState) -> Self {
        Self {
            vector_id: state.vector_id.clone(),
            previous_level: state.current_level,
            new_level: state.current_level,
            velocity_trend: state.velocity_trend,
            achieved_milestones: Vec::new(),
            newly_locked_in: false,
            new_markers: Vec::new(),
            already_applied: true,
        }
    }
}

// ─── apply_progress ─────────────────────────────────────────────────────────

/// Apply one engagement's progress to a vector's state.
///
/// `delta` is distributed across all sub-components (each sub-score moves by
/// `delta`, so the level moves by exactly `delta` and each sub-component's
/// level contribution moves in proportion to its weight). When
/// `sub_component` targets one facet, only that sub-score moves and the
/// level moves by `weight × delta`.
///
/// Rejects with [`EngineError::InvalidInput`] — and mutates nothing — on
/// non-finite deltas, negative minutes, a state/definition id mismatch, or
/// an unknown sub-component id.
pub fn apply_progress(
    state: &mut UserVectorState,
    def: &VectorDefinition,
    delta: f64,
    engagement_minutes: i64,
    sub_component: Option<(&str, f64)>,
    recorded_at: DateTime<Utc>,
) -> Result<VectorProgressUpdate> {
    // ── Validation, before any mutation ───────────────────────────────────
    if state.vector_id != def.id {
        return Err(EngineError::InvalidInput(format!(
            "state is for `{}` but definition is `{}`",
            state.vector_id, def.id
        )));
    }
    if !delta.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "progress delta {} is not finite",
            delta
        )));
    }
    if engagement_minutes < 0 {
        return Err(EngineError::InvalidInput(format!(
            "engagement minutes {} is negative",
            engagement_minutes
        )));
    }
    if let Some((sub_id, sub_delta)) = sub_component {
        if !sub_delta.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "sub-component delta {} is not finite",
                sub_delta
            )));
        }
        if !def.sub_components.iter().any(|s| s.id == sub_id) {
            return Err(EngineError::InvalidInput(format!(
                "vector `{}` has no sub-component `{}`",
                def.id, sub_id
            )));
        }
    }

    // Lazily initialise sub-scores from the definition at the current level.
    for sub in &def.sub_components {
        state
            .sub_scores
            .entry(sub.id.clone())
            .or_insert(state.current_level);
    }

    let previous_level = state.current_level;

    // ── Apply the delta ───────────────────────────────────────────────────
    match sub_component {
        Some((sub_id, sub_delta)) => {
            let score = state
                .sub_scores
                .get_mut(sub_id)
                .ok_or_else(|| EngineError::InvalidInput(format!("unknown sub `{}`", sub_id)))?;
            *score = (*score + sub_delta).clamp(0.0, LEVEL_MAX);
        }
        None => {
            for score in state.sub_scores.values_mut() {
                *score = (*score + delta).clamp(0.0, LEVEL_MAX);
            }
        }
    }

    let new_level = def
        .sub_components
        .iter()
        .map(|sub| sub.weight * state.sub_scores.get(&sub.id).copied().unwrap_or(0.0))
        .sum::<f64>()
        .clamp(0.0, LEVEL_MAX);
    state.current_level = new_level;
    state.peak_level = state.peak_level.max(new_level);

    // ── Bookkeeping ───────────────────────────────────────────────────────
    state.push_delta(new_level - previous_level);
    state.streak_days = next_streak(state.streak_days, state.last_activity, recorded_at);
    state.last_activity = Some(recorded_at);
    state.total_engagement_minutes += engagement_minutes as u64;

    // ── Milestone ladder walk, ascending ──────────────────────────────────
    let mut achieved = Vec::new();
    let mut markers = Vec::new();
    for milestone in &def.milestones {
        let crossed = previous_level < milestone.level && milestone.level <= new_level;
        if !crossed {
            continue;
        }
        achieved.push(milestone.name.clone());
        if milestone.irreversible && state.record_marker_emitted(&milestone.name) {
            tracing::info!(
                vector = %def.id,
                milestone = %milestone.name,
                level = new_level,
                "irreversible milestone crossed"
            );
            markers.push(IrreversibilityMarker {
                id: Uuid::new_v4(),
                vector_id: def.id.clone(),
                milestone_name: milestone.name.clone(),
                achieved_at: recorded_at,
                level: new_level,
                acknowledged: false,
            });
        }
    }

    // ── Lock-in evaluation: one-way, permanent ────────────────────────────
    let newly_locked_in =
        new_level >= def.lock_in_threshold && state.mark_locked_in(recorded_at);
    if newly_locked_in {
        tracing::info!(vector = %def.id, level = new_level, "vector locked in permanently");
    }

    Ok(VectorProgressUpdate {
        vector_id: def.id.clone(),
        previous_level,
        new_level,
        velocity_trend: state.velocity_trend,
        achieved_milestones: achieved,
        newly_locked_in,
        new_markers: markers,
        already_applied: false,
    })
}

/// Streak arithmetic: consecutive calendar days extend, same day holds,
/// a gap resets to 1.
fn next_streak(
    streak_days: u32,
    last_activity: Option<DateTime<Utc>>,
    recorded_at: DateTime<Utc>,
) -> u32 {
    let Some(last) = last_activity else {
        return 1;
    };
    let last_day = last.date_naive();
    let today = recorded_at.date_naive();
    if today == last_day {
        streak_days.max(1)
    } else if (today - last_day).num_days() == 1 {
        streak_days + 1
    } else {
        1
    }
}

// ─── Lock-in status view ────────────────────────────────────────────────────

/// Fifteen-minute blocks count as one engagement-equivalent for resistance.
const RESISTANCE_SESSION_MINUTES: f64 = 15.0;

/// Compute the permanence standing of a vector.
///
/// `regression_resistance` follows an asymptotic saturation curve over
/// lifetime engagement — never immune, increasingly resilient:
///
/// ```text
/// resistance = 1 − 1 / (1 + sessions / 20)     sessions = minutes / 15
/// ```
pub fn lock_in_status(def: &VectorDefinition, state: &UserVectorState) -> LockInStatus {
    let sessions = state.total_engagement_minutes as f64 / RESISTANCE_SESSION_MINUTES;
    let resistance = 1.0 - 1.0 / (1.0 + sessions / 20.0);

    let permanence = if state.is_locked_in() {
        let headroom_span = (LEVEL_MAX - def.lock_in_threshold).max(f64::EPSILON);
        let above = ((state.peak_level - def.lock_in_threshold) / headroom_span).clamp(0.0, 1.0);
        (0.7 * resistance + 0.3 * above).min(1.0).max(0.5)
    } else {
        resistance * (state.current_level / LEVEL_MAX)
    };

    LockInStatus {
        vector_id: state.vector_id.clone(),
        is_locked_in: state.is_locked_in(),
        lock_in_level: def.lock_in_threshold,
        regression_resistance: resistance,
        permanence_score: permanence,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Milestone, SubComponent};
    use chrono::Duration;

    // ── Helpers ──────────────────────────────────────────────────────────

    fn single_sub_def(id: &str) -> VectorDefinition {
        VectorDefinition {
            id: id.into(),
            category: "appearance".into(),
            sub_components: vec![SubComponent {
                id: "practice".into(),
                weight: 1.0,
            }],
            milestones: vec![
                Milestone {
                    name: "started".into(),
                    level: 1.0,
                    irreversible: false,
                },
                Milestone {
                    name: "committed".into(),
                    level: 4.0,
                    irreversible: false,
                },
                Milestone {
                    name: "second_nature".into(),
                    level: 7.0,
                    irreversible: true,
                },
            ],
            context_factors: vec![],
            prerequisites: vec![],
            lock_in_threshold: 7.0,
            typical_session_minutes: 15,
        }
    }

    fn two_sub_def(id: &str) -> VectorDefinition {
        let mut def = single_sub_def(id);
        def.sub_components = vec![
            SubComponent {
                id: "technique".into(),
                weight: 0.7,
            },
            SubComponent {
                id: "confidence".into(),
                weight: 0.3,
            },
        ];
        def
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ── Validation tests ──────────────────────────────────────────────────

    #[test]
    fn test_rejects_non_finite_delta_without_mutation() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 3.0);
        let before = state.clone();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = apply_progress(&mut state, &def, bad, 10, None, now()).unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)));
            assert_eq!(state, before, "no partial mutation on rejection");
        }
    }

    #[test]
    fn test_rejects_negative_minutes() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let err = apply_progress(&mut state, &def, 0.2, -5, None, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_unknown_sub_component() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let err =
            apply_progress(&mut state, &def, 0.0, 10, Some(("ghost", 0.2)), now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_mismatched_definition() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("b".into());
        let err = apply_progress(&mut state, &def, 0.2, 10, None, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    // ── Delta application tests ───────────────────────────────────────────

    #[test]
    fn test_untargeted_delta_moves_level_exactly() {
        let def = two_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let update = apply_progress(&mut state, &def, 0.5, 20, None, now()).unwrap();
        assert_eq!(update.previous_level, 0.0);
        assert!((update.new_level - 0.5).abs() < 1e-9, "level={}", update.new_level);
        // Both sub-scores moved together
        assert!((state.sub_scores["technique"] - 0.5).abs() < 1e-9);
        assert!((state.sub_scores["confidence"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_targeted_delta_moves_level_by_weight() {
        let def = two_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 2.0);
        let update =
            apply_progress(&mut state, &def, 0.0, 20, Some(("technique", 1.0)), now()).unwrap();
        // technique weight 0.7: level moves by 0.7
        assert!((update.new_level - 2.7).abs() < 1e-9, "level={}", update.new_level);
        assert!((state.sub_scores["technique"] - 3.0).abs() < 1e-9);
        assert!((state.sub_scores["confidence"] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_level_clamped_at_ceiling() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 9.8);
        let update = apply_progress(&mut state, &def, 5.0, 20, None, now()).unwrap();
        assert_eq!(update.new_level, LEVEL_MAX);
    }

    #[test]
    fn test_level_clamped_at_floor() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 0.5);
        let update = apply_progress(&mut state, &def, -3.0, 5, None, now()).unwrap();
        assert_eq!(update.new_level, 0.0);
    }

    #[test]
    fn test_bookkeeping_updates() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let at = now();
        apply_progress(&mut state, &def, 0.3, 25, None, at).unwrap();
        assert_eq!(state.last_activity, Some(at));
        assert_eq!(state.total_engagement_minutes, 25);
        assert_eq!(state.streak_days, 1);
        assert!((state.peak_level - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_peak_level_survives_regression() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        apply_progress(&mut state, &def, 5.0, 20, None, now()).unwrap();
        apply_progress(&mut state, &def, -2.0, 20, None, now()).unwrap();
        assert!((state.current_level - 3.0).abs() < 1e-9);
        assert!((state.peak_level - 5.0).abs() < 1e-9);
    }

    // ── Streak tests ──────────────────────────────────────────────────────

    #[test]
    fn test_streak_consecutive_days_extend() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let day1 = now();
        apply_progress(&mut state, &def, 0.1, 10, None, day1).unwrap();
        assert_eq!(state.streak_days, 1);
        apply_progress(&mut state, &def, 0.1, 10, None, day1 + Duration::days(1)).unwrap();
        assert_eq!(state.streak_days, 2);
        // Same day again: holds
        apply_progress(&mut state, &def, 0.1, 10, None, day1 + Duration::days(1)).unwrap();
        assert_eq!(state.streak_days, 2);
    }

    #[test]
    fn test_streak_gap_resets() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let day1 = now();
        apply_progress(&mut state, &def, 0.1, 10, None, day1).unwrap();
        apply_progress(&mut state, &def, 0.1, 10, None, day1 + Duration::days(1)).unwrap();
        assert_eq!(state.streak_days, 2);
        apply_progress(&mut state, &def, 0.1, 10, None, day1 + Duration::days(5)).unwrap();
        assert_eq!(state.streak_days, 1);
    }

    // ── Milestone tests ───────────────────────────────────────────────────

    #[test]
    fn test_milestones_crossed_in_ladder_order() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::new("a".into());
        let update = apply_progress(&mut state, &def, 4.5, 30, None, now()).unwrap();
        assert_eq!(update.achieved_milestones, vec!["started", "committed"]);
        assert!(update.new_markers.is_empty(), "no irreversible rung crossed");
    }

    #[test]
    fn test_exact_threshold_crossing_counts() {
        // previousLevel < level ≤ newLevel: landing exactly on the rung crosses it
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 3.9);
        state.sub_scores.insert("practice".into(), 3.9);
        let update = apply_progress(&mut state, &def, 0.1, 10, None, now()).unwrap();
        assert_eq!(update.achieved_milestones, vec!["committed"]);
    }

    #[test]
    fn test_irreversible_marker_emitted_exactly_once() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 6.9);
        state.sub_scores.insert("practice".into(), 6.9);

        let update = apply_progress(&mut state, &def, 0.1, 10, None, now()).unwrap();
        assert_eq!(update.new_markers.len(), 1, "first crossing emits one marker");
        let marker = &update.new_markers[0];
        assert_eq!(marker.milestone_name, "second_nature");
        assert!(!marker.acknowledged);
        assert!((marker.level - 7.0).abs() < 1e-9);

        // Regress below, then re-cross: no second marker
        apply_progress(&mut state, &def, -1.0, 10, None, now()).unwrap();
        let recross = apply_progress(&mut state, &def, 2.0, 10, None, now()).unwrap();
        assert_eq!(
            recross.achieved_milestones,
            vec!["second_nature"],
            "the rung is re-crossed"
        );
        assert!(recross.new_markers.is_empty(), "but the marker is not re-emitted");
    }

    // ── Lock-in tests ─────────────────────────────────────────────────────

    #[test]
    fn test_lock_in_at_threshold_crossing() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 6.9);
        state.sub_scores.insert("practice".into(), 6.9);

        let update = apply_progress(&mut state, &def, 0.1, 10, None, now()).unwrap();
        assert!(update.newly_locked_in);
        assert!(state.is_locked_in());
        assert!(state.lock_in_date().is_some());
    }

    #[test]
    fn test_lock_in_survives_negative_deltas() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 6.9);
        state.sub_scores.insert("practice".into(), 6.9);
        apply_progress(&mut state, &def, 0.1, 10, None, now()).unwrap();
        assert!(state.is_locked_in());

        // Hammer it with regressions
        for _ in 0..20 {
            let update = apply_progress(&mut state, &def, -1.0, 5, None, now()).unwrap();
            assert!(!update.newly_locked_in);
            assert!(state.is_locked_in(), "lock-in must never clear");
        }
        assert_eq!(state.current_level, 0.0);
        assert!(state.is_locked_in());
    }

    #[test]
    fn test_re_crossing_threshold_not_newly_locked_in() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 6.9);
        state.sub_scores.insert("practice".into(), 6.9);
        apply_progress(&mut state, &def, 0.5, 10, None, now()).unwrap();
        apply_progress(&mut state, &def, -2.0, 10, None, now()).unwrap();
        let update = apply_progress(&mut state, &def, 3.0, 10, None, now()).unwrap();
        assert!(
            !update.newly_locked_in,
            "lock-in fires once; re-crossings are not news"
        );
    }

    // ── Quality policy tests ──────────────────────────────────────────────

    #[test]
    fn test_default_quality_policy_is_monotone() {
        let policy = QualityDeltaPolicy::default();
        assert!(policy.validate().is_ok());
        assert!(policy.delta_for(EngagementQuality::Poor) < policy.delta_for(EngagementQuality::Mediocre));
        assert!(policy.delta_for(EngagementQuality::Mediocre) < policy.delta_for(EngagementQuality::Good));
        assert!(policy.delta_for(EngagementQuality::Good) < policy.delta_for(EngagementQuality::Excellent));
    }

    #[test]
    fn test_non_monotone_policy_rejected() {
        let policy = QualityDeltaPolicy {
            poor: 0.3,
            mediocre: 0.2,
            good: 0.2,
            excellent: 0.1,
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_flat_policy_accepted() {
        // Equal deltas are monotone (never *smaller* for higher quality)
        let policy = QualityDeltaPolicy {
            poor: 0.1,
            mediocre: 0.1,
            good: 0.1,
            excellent: 0.1,
        };
        assert!(policy.validate().is_ok());
    }

    // ── LockInStatus tests ────────────────────────────────────────────────

    #[test]
    fn test_regression_resistance_grows_with_engagement() {
        let def = single_sub_def("a");
        let mut light = UserVectorState::at_level("a".into(), 5.0);
        light.total_engagement_minutes = 60;
        let mut heavy = UserVectorState::at_level("a".into(), 5.0);
        heavy.total_engagement_minutes = 6_000;

        let light_status = lock_in_status(&def, &light);
        let heavy_status = lock_in_status(&def, &heavy);
        assert!(
            heavy_status.regression_resistance > light_status.regression_resistance,
            "heavy={} light={}",
            heavy_status.regression_resistance,
            light_status.regression_resistance
        );
        assert!(heavy_status.regression_resistance < 1.0, "never immune");
    }

    #[test]
    fn test_permanence_floor_once_locked() {
        let def = single_sub_def("a");
        let mut state = UserVectorState::at_level("a".into(), 6.9);
        state.sub_scores.insert("practice".into(), 6.9);
        apply_progress(&mut state, &def, 0.2, 10, None, now()).unwrap();

        let status = lock_in_status(&def, &state);
        assert!(status.is_locked_in);
        assert!(
            status.permanence_score >= 0.5,
            "locked vectors read as durably held: {}",
            status.permanence_score
        );
    }
}

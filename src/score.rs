//! The vector scorer — pure multi-factor ranking over the whole catalog.
//!
//! `score_all` covers **every** catalog vector on every pass. A vector with
//! no stored state is scored from the lazy default (level 0, steady trend),
//! so nothing is ever unscoreable for lack of history.
//!
//! Five terms per vector, combined under [`ScoringWeights`]:
//!
//! | Term | Range | Signal |
//! |------|-------|--------|
//! | `base_score` | [0, 100] | headroom below level 10, trend-adjusted |
//! | `context_multiplier` | [0.5, 2.0] | fraction of declared factors favourable now |
//! | `urgency_boost` | [0, 20] | days of neglect, saturating |
//! | `phase_boost` | [0, 15] | flat bonus for phase-required vectors |
//! | `synergy_boost` | [0, 10] | one-hop prerequisites past their own lock-in |
//!
//! The blend normalises each term to [0, 100] with a strictly increasing map
//! and takes the weighted sum, so the final score is monotone non-decreasing
//! in every raw term by construction.
//!
//! Everything here is synchronous and I/O-free; the only failure mode is a
//! malformed context snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{VectorCatalog, VectorDefinition, VectorId, LEVEL_MAX};
use crate::context::{ArousalLevel, EmotionalState, SafetyLevel, TimeOfDay, UserContext};
use crate::error::{EngineError, Result};
use crate::learning::UserLearningProfile;
use crate::state::{UserVectorState, VelocityTrend};

/// Lower bound of the context multiplier.
pub const CONTEXT_MULTIPLIER_MIN: f64 = 0.5;
/// Upper bound of the context multiplier.
pub const CONTEXT_MULTIPLIER_MAX: f64 = 2.0;
/// Maximum urgency boost, reached at the neglect saturation threshold.
pub const URGENCY_BOOST_MAX: f64 = 20.0;
/// Flat boost granted to phase-required vectors.
pub const PHASE_BOOST_MAX: f64 = 15.0;
/// Maximum synergy boost, reached when every prerequisite is locked in.
pub const SYNERGY_BOOST_MAX: f64 = 10.0;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Per-term blend weights. Must be non-negative and sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the base (headroom × trend) term. Default 0.40.
    pub base: f64,
    /// Weight of the context term. Default 0.25.
    pub context: f64,
    /// Weight of the urgency term. Default 0.15.
    pub urgency: f64,
    /// Weight of the phase term. Default 0.10.
    pub phase: f64,
    /// Weight of the synergy term. Default 0.10.
    pub synergy: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 0.40,
            context: 0.25,
            urgency: 0.15,
            phase: 0.10,
            synergy: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Reject weight sets that are negative or do not sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        let parts = [self.base, self.context, self.urgency, self.phase, self.synergy];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EngineError::InvalidInput(
                "scoring weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::InvalidInput(format!(
                "scoring weights sum to {}, expected 1.0",
                sum
            )));
        }
        Ok(())
    }
}

/// Scorer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Blend weights.
    pub weights: ScoringWeights,
    /// Days of neglect at which the urgency boost saturates.
    pub neglect_saturation_days: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            neglect_saturation_days: 14.0,
        }
    }
}

// ─── VectorScore ────────────────────────────────────────────────────────────

/// Scored ranking entry for one vector. Carries every term plus the
/// human-readable reasoning naming which factors fired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorScore {
    /// The scored vector.
    pub vector_id: VectorId,
    /// Headroom × trend term in [0, 100].
    pub base_score: f64,
    /// Context multiplier in [0.5, 2.0].
    pub context_multiplier: f64,
    /// Neglect boost in [0, 20].
    pub urgency_boost: f64,
    /// Phase-requirement boost in [0, 15].
    pub phase_boost: f64,
    /// Prerequisite-maturity boost in [0, 10].
    pub synergy_boost: f64,
    /// Weighted blend of all terms in [0, 100].
    pub final_score: f64,
    /// Which factors fired and why, for explainability and tests.
    pub reasoning: Vec<String>,
}

// ─── Term computation ───────────────────────────────────────────────────────

/// Trend adjustment applied to the base term. Regression *raises* the
/// weight: a slipping vector needs attention more, not less.
fn trend_factor(trend: VelocityTrend) -> f64 {
    match trend {
        VelocityTrend::Accelerating => 1.0,
        VelocityTrend::Steady => 1.0,
        VelocityTrend::Stalling => 1.05,
        VelocityTrend::Regressing => 1.30,
    }
}

/// Base term: headroom below the ceiling with diminishing returns near
/// level 10, adjusted for trend. Always in [0, 100].
pub fn base_score(level: f64, trend: VelocityTrend) -> f64 {
    let headroom = ((LEVEL_MAX - level.clamp(0.0, LEVEL_MAX)) / LEVEL_MAX).max(0.0);
    (100.0 * headroom.powf(1.25) * trend_factor(trend)).clamp(0.0, 100.0)
}

/// Favourability predicate for one declared context factor.
///
/// Returns `None` for factor names the engine does not recognise; unknown
/// names drop out of the favourable-fraction denominator entirely, so a
/// catalog typo cannot permanently depress a vector's multiplier.
fn factor_favorable(name: &str, def: &VectorDefinition, ctx: &UserContext) -> Option<bool> {
    match name {
        "time" => Some(
            ctx.time_availability.minutes_available >= def.typical_session_minutes,
        ),
        "privacy" => Some(
            ctx.social_safety.level == SafetyLevel::Private || ctx.social_safety.alone,
        ),
        "mood" => Some(matches!(
            ctx.emotional_state,
            EmotionalState::Motivated | EmotionalState::Calm
        )),
        "arousal" => Some(
            ctx.denial_arousal.denial_active
                && ctx.denial_arousal.arousal >= ArousalLevel::Moderate,
        ),
        "energy" => Some(
            !matches!(ctx.emotional_state, EmotionalState::Stressed | EmotionalState::Low)
                && ctx.time_availability.time_of_day != TimeOfDay::Night,
        ),
        "streak" => Some(ctx.recent_activity.active_streak_days >= 3),
        _ => None,
    }
}

/// Context term before learning bias: 1.0 for vectors declaring no
/// (recognised) factors, otherwise scaled by the favourable fraction.
fn raw_context_multiplier(
    def: &VectorDefinition,
    ctx: &UserContext,
    reasoning: &mut Vec<String>,
) -> f64 {
    let verdicts: Vec<bool> = def
        .context_factors
        .iter()
        .filter_map(|f| factor_favorable(f, def, ctx))
        .collect();
    if verdicts.is_empty() {
        return 1.0;
    }
    let favorable = verdicts.iter().filter(|v| **v).count();
    if favorable > 0 {
        reasoning.push(format!(
            "context favorable ({}/{} factors)",
            favorable,
            verdicts.len()
        ));
    }
    CONTEXT_MULTIPLIER_MIN
        + (CONTEXT_MULTIPLIER_MAX - CONTEXT_MULTIPLIER_MIN) * favorable as f64
            / verdicts.len() as f64
}

/// Urgency term: zero within 24 hours of activity, then rising with days of
/// neglect and saturating at the configured threshold. A vector that has
/// never been engaged counts as fully neglected.
fn urgency_boost(
    state: &UserVectorState,
    ctx: &UserContext,
    config: &ScoringConfig,
    reasoning: &mut Vec<String>,
) -> f64 {
    let days = match state.last_activity {
        None => {
            reasoning.push("never engaged".into());
            return URGENCY_BOOST_MAX;
        }
        Some(last) => (ctx.captured_at - last).num_minutes() as f64 / (60.0 * 24.0),
    };
    if days < 1.0 {
        return 0.0;
    }
    let saturation = config.neglect_saturation_days.max(1.0);
    let capped = days.min(saturation);
    reasoning.push(format!("neglected for {} days", days.floor() as i64));
    URGENCY_BOOST_MAX * capped / saturation
}

/// Synergy term: fraction of one-hop prerequisites already at or above their
/// *own* lock-in threshold. Never transitive, so cyclic prerequisite data is
/// harmless.
fn synergy_boost(
    def: &VectorDefinition,
    catalog: &VectorCatalog,
    states: &HashMap<VectorId, UserVectorState>,
    reasoning: &mut Vec<String>,
) -> f64 {
    if def.prerequisites.is_empty() {
        return 0.0;
    }
    let mut met = 0usize;
    for prereq in &def.prerequisites {
        // Existence is validated at catalog compile; guard anyway.
        let Some(prereq_def) = catalog.get_by_id(prereq) else {
            continue;
        };
        let satisfied = states.get(prereq).is_some_and(|s| {
            s.is_locked_in() || s.current_level >= prereq_def.lock_in_threshold
        });
        if satisfied {
            met += 1;
        }
    }
    if met > 0 {
        reasoning.push(format!(
            "{}/{} prerequisites locked in",
            met,
            def.prerequisites.len()
        ));
    }
    SYNERGY_BOOST_MAX * met as f64 / def.prerequisites.len() as f64
}

/// Blend the five terms under the given weights.
///
/// Each term is normalised to [0, 100] with a strictly increasing map before
/// the weighted sum, which makes the result monotone non-decreasing in every
/// raw term.
pub fn combine_terms(
    weights: &ScoringWeights,
    base: f64,
    context_multiplier: f64,
    urgency: f64,
    phase: f64,
    synergy: f64,
) -> f64 {
    let context_norm = (context_multiplier - CONTEXT_MULTIPLIER_MIN)
        / (CONTEXT_MULTIPLIER_MAX - CONTEXT_MULTIPLIER_MIN)
        * 100.0;
    let urgency_norm = urgency / URGENCY_BOOST_MAX * 100.0;
    let phase_norm = phase / PHASE_BOOST_MAX * 100.0;
    let synergy_norm = synergy / SYNERGY_BOOST_MAX * 100.0;

    weights.base * base
        + weights.context * context_norm
        + weights.urgency * urgency_norm
        + weights.phase * phase_norm
        + weights.synergy * synergy_norm
}

// ─── score_all ──────────────────────────────────────────────────────────────

/// Score every catalog vector against the given states and context.
///
/// Pure and synchronous. Missing states default to level 0 / steady. The
/// optional learning profile only ever biases the context multiplier — an
/// absent or empty profile scores identically to a neutral one. Output is in
/// catalog order; ranking belongs to the prescription generator.
pub fn score_all(
    catalog: &VectorCatalog,
    states: &HashMap<VectorId, UserVectorState>,
    context: &UserContext,
    profile: Option<&UserLearningProfile>,
    config: &ScoringConfig,
) -> Result<Vec<VectorScore>> {
    context.validate()?;
    config.weights.validate()?;

    let mut scores = Vec::with_capacity(catalog.len());
    for def in catalog.iter() {
        scores.push(score_vector(def, catalog, states, context, profile, config));
    }
    Ok(scores)
}

fn score_vector(
    def: &VectorDefinition,
    catalog: &VectorCatalog,
    states: &HashMap<VectorId, UserVectorState>,
    context: &UserContext,
    profile: Option<&UserLearningProfile>,
    config: &ScoringConfig,
) -> VectorScore {
    let default_state;
    let state = match states.get(&def.id) {
        Some(s) => s,
        None => {
            default_state = UserVectorState::new(def.id.clone());
            &default_state
        }
    };

    let mut reasoning = Vec::new();

    if state.current_level < 3.0 {
        reasoning.push(format!(
            "low level ({:.1}) leaves headroom",
            state.current_level
        ));
    }
    if state.velocity_trend == VelocityTrend::Regressing {
        reasoning.push("regressing trend raises need".into());
    }

    let base = base_score(state.current_level, state.velocity_trend);

    let mut multiplier = raw_context_multiplier(def, context, &mut reasoning);
    if let Some(profile) = profile {
        let bias = profile.context_bias(&def.id, context);
        if (bias - 1.0).abs() > 1e-9 {
            reasoning.push(format!("learning bias {:.2}", bias));
            multiplier = (multiplier * bias)
                .clamp(CONTEXT_MULTIPLIER_MIN, CONTEXT_MULTIPLIER_MAX);
        }
    }

    let urgency = urgency_boost(state, context, config, &mut reasoning);

    let phase = if context.phase_requirements.contains(&def.id) {
        reasoning.push(format!("required by phase {}", context.phase));
        PHASE_BOOST_MAX
    } else {
        0.0
    };

    let synergy = synergy_boost(def, catalog, states, &mut reasoning);

    let final_score = combine_terms(&config.weights, base, multiplier, urgency, phase, synergy);

    tracing::debug!(
        vector = %def.id,
        base,
        multiplier,
        urgency,
        phase,
        synergy,
        final_score,
        "scored vector"
    );

    VectorScore {
        vector_id: def.id.clone(),
        base_score: base,
        context_multiplier: multiplier,
        urgency_boost: urgency,
        phase_boost: phase,
        synergy_boost: synergy,
        final_score,
        reasoning,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Milestone, SubComponent};
    use crate::context::{
        DenialArousalState, RecentActivity, SocialSafety, TimeAvailability,
    };
    use chrono::{Duration, Utc};

    // ── Helpers ──────────────────────────────────────────────────────────

    fn def(id: &str) -> VectorDefinition {
        VectorDefinition {
            id: id.into(),
            category: "appearance".into(),
            sub_components: vec![SubComponent {
                id: "practice".into(),
                weight: 1.0,
            }],
            milestones: vec![Milestone {
                name: "habit".into(),
                level: 4.0,
                irreversible: false,
            }],
            context_factors: vec![],
            prerequisites: vec![],
            lock_in_threshold: 7.0,
            typical_session_minutes: 15,
        }
    }

    fn catalog(defs: Vec<VectorDefinition>) -> VectorCatalog {
        VectorCatalog::compile(defs).unwrap()
    }

    fn context() -> UserContext {
        UserContext {
            captured_at: Utc::now(),
            denial_arousal: DenialArousalState {
                denial_active: false,
                days_denied: 0,
                arousal: ArousalLevel::Low,
            },
            time_availability: TimeAvailability {
                minutes_available: 30,
                time_of_day: TimeOfDay::Evening,
            },
            social_safety: SocialSafety {
                level: SafetyLevel::Private,
                alone: true,
            },
            emotional_state: EmotionalState::Neutral,
            recent_activity: RecentActivity::default(),
            phase: "foundation".into(),
            phase_requirements: vec![],
        }
    }

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    // ── Weight validation tests ───────────────────────────────────────────

    #[test]
    fn test_default_weights_are_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn test_weights_rejecting_bad_sum() {
        let w = ScoringWeights {
            base: 0.5,
            ..ScoringWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_weights_rejecting_negative() {
        let w = ScoringWeights {
            base: -0.1,
            context: 0.35,
            urgency: 0.25,
            phase: 0.25,
            synergy: 0.25,
        };
        assert!(w.validate().is_err());
    }

    // ── Base term tests ───────────────────────────────────────────────────

    #[test]
    fn test_base_score_high_at_level_zero() {
        let b = base_score(0.0, VelocityTrend::Steady);
        assert!((b - 100.0).abs() < 1e-9, "b={}", b);
    }

    #[test]
    fn test_base_score_vanishes_at_ceiling() {
        let b = base_score(10.0, VelocityTrend::Steady);
        assert!(b.abs() < 1e-9, "b={}", b);
    }

    #[test]
    fn test_base_score_diminishing_returns_near_ceiling() {
        // The marginal value of the last levels shrinks: the drop from
        // 8→9 exceeds the drop from 9→10 under a convex headroom curve.
        let d_mid = base_score(8.0, VelocityTrend::Steady) - base_score(9.0, VelocityTrend::Steady);
        let d_top = base_score(9.0, VelocityTrend::Steady) - base_score(10.0, VelocityTrend::Steady);
        assert!(d_mid > d_top, "d_mid={} d_top={}", d_mid, d_top);
    }

    #[test]
    fn test_base_score_regression_elevated_not_reduced() {
        let steady = base_score(5.0, VelocityTrend::Steady);
        let regressing = base_score(5.0, VelocityTrend::Regressing);
        assert!(
            regressing > steady,
            "regressing={} should exceed steady={}",
            regressing,
            steady
        );
    }

    #[test]
    fn test_base_score_monotone_in_need() {
        let mut prev = f64::INFINITY;
        for level in [0.0, 2.0, 4.0, 6.0, 8.0, 10.0] {
            let b = base_score(level, VelocityTrend::Steady);
            assert!(b <= prev, "base must fall as level rises: {} at {}", b, level);
            prev = b;
        }
    }

    // ── Context multiplier tests ──────────────────────────────────────────

    #[test]
    fn test_context_multiplier_neutral_without_factors() {
        let d = def("a");
        let mut r = Vec::new();
        assert_eq!(raw_context_multiplier(&d, &context(), &mut r), 1.0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_context_multiplier_unknown_factors_ignored() {
        let mut d = def("a");
        d.context_factors = vec!["moon_phase".into()];
        let mut r = Vec::new();
        assert_eq!(raw_context_multiplier(&d, &context(), &mut r), 1.0);
    }

    #[test]
    fn test_context_multiplier_all_favorable_hits_max() {
        let mut d = def("a");
        d.context_factors = vec!["time".into(), "privacy".into()];
        let ctx = context(); // 30 min available, private & alone
        let mut r = Vec::new();
        let m = raw_context_multiplier(&d, &ctx, &mut r);
        assert!((m - CONTEXT_MULTIPLIER_MAX).abs() < 1e-9, "m={}", m);
        assert!(r.iter().any(|s| s.contains("2/2")), "reasoning={:?}", r);
    }

    #[test]
    fn test_context_multiplier_none_favorable_hits_min() {
        let mut d = def("a");
        d.context_factors = vec!["time".into(), "privacy".into()];
        let mut ctx = context();
        ctx.time_availability.minutes_available = 5; // below typical 15
        ctx.social_safety = SocialSafety {
            level: SafetyLevel::Public,
            alone: false,
        };
        let mut r = Vec::new();
        let m = raw_context_multiplier(&d, &ctx, &mut r);
        assert!((m - CONTEXT_MULTIPLIER_MIN).abs() < 1e-9, "m={}", m);
    }

    #[test]
    fn test_arousal_factor_requires_active_denial() {
        let mut d = def("a");
        d.context_factors = vec!["arousal".into()];
        let mut ctx = context();
        ctx.denial_arousal = DenialArousalState {
            denial_active: true,
            days_denied: 3,
            arousal: ArousalLevel::High,
        };
        let mut r = Vec::new();
        assert!(raw_context_multiplier(&d, &ctx, &mut r) > 1.0);

        ctx.denial_arousal.denial_active = false;
        ctx.denial_arousal.days_denied = 0;
        let mut r = Vec::new();
        assert!(raw_context_multiplier(&d, &ctx, &mut r) < 1.0);
    }

    // ── Urgency tests ─────────────────────────────────────────────────────

    #[test]
    fn test_urgency_zero_within_a_day() {
        let ctx = context();
        let mut state = UserVectorState::new("a".into());
        state.last_activity = Some(ctx.captured_at - Duration::hours(20));
        let mut r = Vec::new();
        let u = urgency_boost(&state, &ctx, &config(), &mut r);
        assert_eq!(u, 0.0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_urgency_saturates_at_neglect_threshold() {
        let ctx = context();
        let mut state = UserVectorState::new("a".into());
        state.last_activity = Some(ctx.captured_at - Duration::days(30));
        let mut r = Vec::new();
        let u = urgency_boost(&state, &ctx, &config(), &mut r);
        assert!((u - URGENCY_BOOST_MAX).abs() < 1e-9, "u={}", u);
    }

    #[test]
    fn test_urgency_grows_with_neglect() {
        let ctx = context();
        let mut two = UserVectorState::new("a".into());
        two.last_activity = Some(ctx.captured_at - Duration::days(2));
        let mut seven = UserVectorState::new("a".into());
        seven.last_activity = Some(ctx.captured_at - Duration::days(7));

        let mut r = Vec::new();
        let u2 = urgency_boost(&two, &ctx, &config(), &mut r);
        let u7 = urgency_boost(&seven, &ctx, &config(), &mut r);
        assert!(u2 > 0.0 && u7 > u2, "u2={} u7={}", u2, u7);
    }

    #[test]
    fn test_urgency_never_engaged_counts_as_fully_neglected() {
        let mut r = Vec::new();
        let u = urgency_boost(&UserVectorState::new("a".into()), &context(), &config(), &mut r);
        assert!((u - URGENCY_BOOST_MAX).abs() < 1e-9, "u={}", u);
        assert!(r.iter().any(|s| s.contains("never engaged")));
    }

    // ── Synergy tests ─────────────────────────────────────────────────────

    #[test]
    fn test_synergy_zero_without_prerequisites() {
        let cat = catalog(vec![def("a")]);
        let mut r = Vec::new();
        let s = synergy_boost(cat.get_by_id(&"a".into()).unwrap(), &cat, &HashMap::new(), &mut r);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_synergy_counts_prereqs_past_their_own_threshold() {
        let mut b = def("b");
        b.prerequisites = vec!["p1".into(), "p2".into()];
        let cat = catalog(vec![def("p1"), def("p2"), b]);

        let mut states = HashMap::new();
        // p1 past its threshold (7.0), p2 well below
        states.insert(VectorId::new("p1"), UserVectorState::at_level("p1".into(), 7.5));
        states.insert(VectorId::new("p2"), UserVectorState::at_level("p2".into(), 2.0));

        let mut r = Vec::new();
        let s = synergy_boost(cat.get_by_id(&"b".into()).unwrap(), &cat, &states, &mut r);
        assert!((s - SYNERGY_BOOST_MAX / 2.0).abs() < 1e-9, "s={}", s);
        assert!(r.iter().any(|m| m.contains("1/2")), "reasoning={:?}", r);
    }

    // ── Blend monotonicity tests ──────────────────────────────────────────

    #[test]
    fn test_combine_terms_monotone_in_every_term() {
        let w = ScoringWeights::default();
        let baseline = combine_terms(&w, 50.0, 1.0, 10.0, 0.0, 5.0);

        assert!(combine_terms(&w, 60.0, 1.0, 10.0, 0.0, 5.0) >= baseline);
        assert!(combine_terms(&w, 50.0, 1.5, 10.0, 0.0, 5.0) >= baseline);
        assert!(combine_terms(&w, 50.0, 1.0, 15.0, 0.0, 5.0) >= baseline);
        assert!(combine_terms(&w, 50.0, 1.0, 10.0, 15.0, 5.0) >= baseline);
        assert!(combine_terms(&w, 50.0, 1.0, 10.0, 0.0, 8.0) >= baseline);
    }

    #[test]
    fn test_combine_terms_bounded() {
        let w = ScoringWeights::default();
        let max = combine_terms(
            &w,
            100.0,
            CONTEXT_MULTIPLIER_MAX,
            URGENCY_BOOST_MAX,
            PHASE_BOOST_MAX,
            SYNERGY_BOOST_MAX,
        );
        assert!((max - 100.0).abs() < 1e-9, "max={}", max);
        let min = combine_terms(&w, 0.0, CONTEXT_MULTIPLIER_MIN, 0.0, 0.0, 0.0);
        assert!(min.abs() < 1e-9, "min={}", min);
    }

    // ── score_all tests ───────────────────────────────────────────────────

    #[test]
    fn test_score_all_covers_every_vector_with_empty_states() {
        let cat = catalog(vec![def("a"), def("b"), def("c")]);
        let scores = score_all(&cat, &HashMap::new(), &context(), None, &config()).unwrap();
        assert_eq!(scores.len(), 3);
        for s in &scores {
            // Default level 0 / steady: full base term
            assert!((s.base_score - 100.0).abs() < 1e-9, "base={}", s.base_score);
            assert!(s.final_score > 0.0);
        }
    }

    #[test]
    fn test_score_all_phase_boost_applies_to_required_vector() {
        let cat = catalog(vec![def("a"), def("b")]);
        let mut ctx = context();
        ctx.phase_requirements = vec!["b".into()];
        let scores = score_all(&cat, &HashMap::new(), &ctx, None, &config()).unwrap();
        let a = scores.iter().find(|s| s.vector_id.as_str() == "a").unwrap();
        let b = scores.iter().find(|s| s.vector_id.as_str() == "b").unwrap();
        assert_eq!(a.phase_boost, 0.0);
        assert!((b.phase_boost - PHASE_BOOST_MAX).abs() < 1e-9);
        assert!(b.final_score > a.final_score);
        assert!(b.reasoning.iter().any(|r| r.contains("phase")));
    }

    #[test]
    fn test_score_all_rejects_malformed_context() {
        let cat = catalog(vec![def("a")]);
        let mut ctx = context();
        ctx.phase.clear();
        let err = score_all(&cat, &HashMap::new(), &ctx, None, &config()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_score_all_identical_without_profile_and_with_empty_profile() {
        let cat = catalog(vec![def("a"), def("b")]);
        let ctx = context();
        let empty = UserLearningProfile::default();
        let without = score_all(&cat, &HashMap::new(), &ctx, None, &config()).unwrap();
        let with = score_all(&cat, &HashMap::new(), &ctx, Some(&empty), &config()).unwrap();
        assert_eq!(without, with, "cold start must be exactly neutral");
    }

    #[test]
    fn test_reasoning_names_fired_factors() {
        let mut d = def("a");
        d.context_factors = vec!["privacy".into()];
        let cat = catalog(vec![d]);
        let scores = score_all(&cat, &HashMap::new(), &context(), None, &config()).unwrap();
        let r = &scores[0].reasoning;
        assert!(r.iter().any(|s| s.contains("never engaged")), "r={:?}", r);
        assert!(r.iter().any(|s| s.contains("context favorable")), "r={:?}", r);
        assert!(r.iter().any(|s| s.contains("headroom")), "r={:?}", r);
    }
}

//! The user context snapshot — point-in-time situational facts.
//!
//! The engine never produces a context; the caller captures one per scoring
//! pass and hands it in as an immutable value. Strict parameter passing is a
//! hard rule here: there is no ambient or shared-mutable context anywhere in
//! the crate, so two concurrent scoring passes with different snapshots can
//! never observe each other.
//!
//! Like a sensor vocabulary, the situational dimensions are quantised into
//! small discrete bands rather than raw measurements. Discrete bands are
//! what the learning recorder correlates against outcome quality, so every
//! dimension also exposes a stable `(dimension, value)` string pair via
//! [`UserContext::discrete_dimensions`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::VectorId;
use crate::error::EngineError;

/// Minutes in a day; upper bound for a plausible availability claim.
const MINUTES_PER_DAY: u32 = 24 * 60;

// ─── Dimension bands ────────────────────────────────────────────────────────

/// Coarse arousal band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArousalLevel {
    /// Baseline.
    Low,
    /// Noticeably elevated.
    Moderate,
    /// Strongly elevated.
    High,
}

/// Denial/arousal drive state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenialArousalState {
    /// Whether a denial protocol is currently active.
    pub denial_active: bool,
    /// Consecutive days the protocol has run (0 when inactive).
    pub days_denied: u32,
    /// Current arousal band.
    pub arousal: ArousalLevel,
}

/// Coarse time-of-day band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Waking through late morning.
    Morning,
    /// Midday block.
    Midday,
    /// Evening block.
    Evening,
    /// Late night.
    Night,
}

/// How much time the user can commit right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAvailability {
    /// Minutes available for engagement. Zero yields an empty prescription.
    pub minutes_available: u32,
    /// Current time-of-day band.
    pub time_of_day: TimeOfDay,
}

/// How observable the user currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// In public or otherwise exposed.
    Public,
    /// Around people who may notice.
    SemiPrivate,
    /// Fully private.
    Private,
}

/// Social-safety snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialSafety {
    /// Current exposure band.
    pub level: SafetyLevel,
    /// Whether the user is physically alone.
    pub alone: bool,
}

/// Coarse emotional band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    /// Energised and ready.
    Motivated,
    /// Settled and receptive.
    Calm,
    /// Neither up nor down.
    Neutral,
    /// Under pressure.
    Stressed,
    /// Depleted.
    Low,
}

/// Recent-activity summary carried into scoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    /// Current all-vector engagement streak in days.
    pub active_streak_days: u32,
    /// Vectors already engaged today (used for insight text, not exclusion).
    pub engaged_today: Vec<VectorId>,
}

// ─── UserContext ────────────────────────────────────────────────────────────

/// Complete immutable situational snapshot for one scoring pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// When the snapshot was captured. Scoring treats this as "now", so a
    /// pass is reproducible from its inputs alone.
    pub captured_at: DateTime<Utc>,
    /// Denial/arousal drive state.
    pub denial_arousal: DenialArousalState,
    /// Time availability.
    pub time_availability: TimeAvailability,
    /// Social safety.
    pub social_safety: SocialSafety,
    /// Emotional band.
    pub emotional_state: EmotionalState,
    /// Recent-activity summary.
    pub recent_activity: RecentActivity,
    /// Name of the current program phase (opaque to the engine).
    pub phase: String,
    /// Vectors the current phase requires; each receives the phase boost.
    pub phase_requirements: Vec<VectorId>,
}

impl UserContext {
    /// Reject internally inconsistent snapshots. The only request-time error
    /// the pure scoring path can raise.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.time_availability.minutes_available > MINUTES_PER_DAY {
            return Err(EngineError::InvalidInput(format!(
                "minutes_available {} exceeds one day",
                self.time_availability.minutes_available
            )));
        }
        if self.phase.is_empty() {
            return Err(EngineError::InvalidInput("phase name is empty".into()));
        }
        if !self.denial_arousal.denial_active && self.denial_arousal.days_denied > 0 {
            return Err(EngineError::InvalidInput(
                "days_denied > 0 while denial is inactive".into(),
            ));
        }
        Ok(())
    }

    /// The snapshot's discrete `(dimension, value)` pairs.
    ///
    /// These keys are the vocabulary shared between the scorer's learning
    /// bias and the feedback recorder's affinity statistics; the two must
    /// agree on them, so they are produced in exactly one place.
    pub fn discrete_dimensions(&self) -> Vec<(String, String)> {
        let arousal = match self.denial_arousal.arousal {
            ArousalLevel::Low => "low",
            ArousalLevel::Moderate => "moderate",
            ArousalLevel::High => "high",
        };
        let time_of_day = match self.time_availability.time_of_day {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Midday => "midday",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        };
        let safety = match self.social_safety.level {
            SafetyLevel::Public => "public",
            SafetyLevel::SemiPrivate => "semi_private",
            SafetyLevel::Private => "private",
        };
        let emotion = match self.emotional_state {
            EmotionalState::Motivated => "motivated",
            EmotionalState::Calm => "calm",
            EmotionalState::Neutral => "neutral",
            EmotionalState::Stressed => "stressed",
            EmotionalState::Low => "low",
        };
        vec![
            ("arousal".into(), arousal.into()),
            ("denial".into(), if self.denial_arousal.denial_active { "active" } else { "inactive" }.into()),
            ("time_of_day".into(), time_of_day.into()),
            ("safety".into(), safety.into()),
            ("emotional_state".into(), emotion.into()),
            ("phase".into(), self.phase.clone()),
        ]
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

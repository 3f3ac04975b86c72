//! Learning feedback recorder — append-only history and frequency statistics.
//!
//! Not a trained model. The "learning" here is a co-occurrence count: for
//! each vector, how often did engagements under a given discrete context
//! value end well? The derived profile only ever *biases* the scorer's
//! context multiplier inside a narrow band; it can never override the hard
//! terms, and an absent or empty profile is exactly neutral. Cold start is
//! therefore safe by construction: until a `(dimension, value)` pair has
//! been observed [`MIN_OBSERVATIONS`] times, its bias stays at 1.0.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::VectorId;
use crate::context::UserContext;
use crate::progress::EngagementQuality;
use crate::prescribe::Priority;

/// Observations of a discrete context value required before its affinity
/// departs from neutral.
pub const MIN_OBSERVATIONS: u32 = 3;

/// Lower bound of the per-pass learning bias.
pub const BIAS_MIN: f64 = 0.85;
/// Upper bound of the per-pass learning bias.
pub const BIAS_MAX: f64 = 1.15;

// ─── EngagementRecord & history ─────────────────────────────────────────────

/// One append-only log entry describing a completed (or skipped) engagement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    /// Unique record id; doubles as the idempotency key when the engagement
    /// is applied as progress.
    pub id: Uuid,
    /// The engaged vector.
    pub vector_id: VectorId,
    /// When the engagement happened.
    pub recorded_at: DateTime<Utc>,
    /// Context snapshot at engagement time.
    pub context: UserContext,
    /// Priority the prescription assigned, if the engagement was prescribed.
    pub prescribed_priority: Option<Priority>,
    /// Whether the user actually followed through.
    pub was_followed: bool,
    /// Self-reported or inferred quality of the engagement.
    pub quality: EngagementQuality,
    /// Minutes spent.
    pub duration_minutes: u32,
}

/// Append-only engagement history.
///
/// Deliberately exposes no mutation beyond [`push`](Self::push): records are
/// never edited or deleted, which is what makes the derived statistics
/// trustworthy over time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementHistory {
    records: Vec<EngagementRecord>,
}

impl EngagementHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. The only mutation this type supports.
    pub fn push(&mut self, record: EngagementRecord) {
        self.records.push(record);
    }

    /// Iterate over all records in append order.
    pub fn iter(&self) -> impl Iterator<Item = &EngagementRecord> {
        self.records.iter()
    }

    /// Records for one vector, in append order.
    pub fn for_vector<'a>(
        &'a self,
        vector_id: &'a VectorId,
    ) -> impl Iterator<Item = &'a EngagementRecord> {
        self.records.iter().filter(move |r| &r.vector_id == vector_id)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no engagements have been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ─── Derived profile ────────────────────────────────────────────────────────

/// Counters for one discrete `(dimension, value)` pair of one vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionAffinity {
    /// Engagements observed under this value.
    pub observations: u32,
    /// How many of those were followed and ended with high quality.
    pub high_quality: u32,
}

impl DimensionAffinity {
    /// Bias contributed by this pair: neutral until [`MIN_OBSERVATIONS`],
    /// then shifted by how far the high-quality rate sits from 50%.
    fn bias(&self) -> f64 {
        if self.observations < MIN_OBSERVATIONS {
            return 1.0;
        }
        let rate = self.high_quality as f64 / self.observations as f64;
        (1.0 + 0.3 * (rate - 0.5)).clamp(BIAS_MIN, BIAS_MAX)
    }
}

/// Per-vector frequency statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorLearningStats {
    /// Total engagements recorded for the vector.
    pub engagements: u32,
    /// Fraction of engagements that were followed through.
    pub completion_rate: f64,
    /// Mean duration of followed engagements, in minutes.
    pub avg_duration_minutes: f64,
    /// Affinity counters keyed by `"dimension=value"`.
    pub context_affinity: BTreeMap<String, DimensionAffinity>,
}

impl VectorLearningStats {
    /// Bias for a context snapshot: the mean of the per-dimension biases for
    /// the snapshot's current discrete values, clamped to
    /// [[`BIAS_MIN`], [`BIAS_MAX`]].
    fn bias_for(&self, context: &UserContext) -> f64 {
        let mut sum = 0.0;
        let mut n = 0usize;
        for (dimension, value) in context.discrete_dimensions() {
            let key = format!("{}={}", dimension, value);
            if let Some(affinity) = self.context_affinity.get(&key) {
                sum += affinity.bias();
                n += 1;
            }
        }
        if n == 0 {
            return 1.0;
        }
        (sum / n as f64).clamp(BIAS_MIN, BIAS_MAX)
    }
}

/// Statistics derived from the full history. Consumed read-only by the
/// scorer; rebuilt wholesale whenever the caller wants fresher numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLearningProfile {
    /// Per-vector statistics.
    pub per_vector: HashMap<VectorId, VectorLearningStats>,
}

impl UserLearningProfile {
    /// Context-multiplier bias for one vector under one snapshot.
    /// 1.0 for vectors with no recorded statistics.
    pub fn context_bias(&self, vector_id: &VectorId, context: &UserContext) -> f64 {
        self.per_vector
            .get(vector_id)
            .map_or(1.0, |stats| stats.bias_for(context))
    }

    /// Statistics for one vector, if any engagements were recorded.
    pub fn stats_for(&self, vector_id: &VectorId) -> Option<&VectorLearningStats> {
        self.per_vector.get(vector_id)
    }
}

/// Derive a profile from history.
///
/// Pure. An empty history yields the default (neutral) profile.
pub fn derive_profile(history: &EngagementHistory) -> UserLearningProfile {
    let mut per_vector: HashMap<VectorId, VectorLearningStats> = HashMap::new();
    let mut followed_minutes: HashMap<VectorId, (u64, u32)> = HashMap::new();

    for record in history.iter() {
        let stats = per_vector.entry(record.vector_id.clone()).or_default();
        stats.engagements += 1;

        let high_quality = record.was_followed
            && matches!(
                record.quality,
                EngagementQuality::Excellent | EngagementQuality::Good
            );

        for (dimension, value) in record.context.discrete_dimensions() {
            let key = format!("{}={}", dimension, value);
            let affinity = stats.context_affinity.entry(key).or_default();
            affinity.observations += 1;
            if high_quality {
                affinity.high_quality += 1;
            }
        }

        if record.was_followed {
            let (minutes, count) = followed_minutes
                .entry(record.vector_id.clone())
                .or_default();
            *minutes += u64::from(record.duration_minutes);
            *count += 1;
        }
    }

    for (vector_id, stats) in per_vector.iter_mut() {
        let followed = followed_minutes
            .get(vector_id)
            .copied()
            .unwrap_or((0, 0));
        stats.completion_rate = if stats.engagements > 0 {
            f64::from(followed.1) / f64::from(stats.engagements)
        } else {
            0.0
        };
        stats.avg_duration_minutes = if followed.1 > 0 {
            followed.0 as f64 / f64::from(followed.1)
        } else {
            0.0
        };
    }

    UserLearningProfile { per_vector }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

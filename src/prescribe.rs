//! Prescription generation — ranked scores into a bounded daily focus set.
//!
//! Deterministic given identical inputs: ranking sorts by final score
//! descending with ties broken by lexical vector-id order, so two runs over
//! the same scores always produce the same list. Locked-in vectors stay
//! eligible but are discounted before ranking — a mastered vector may still
//! be prescribed, it just yields focus bandwidth to less-mature ones.
//!
//! Time allocation splits `minutes_available` across the selected vectors
//! proportionally to priority share weights (primary 3, secondary 2,
//! tertiary 1), capped per vector. The total never exceeds the budget, and a
//! zero budget short-circuits to an empty list.
//!
//! No side effects: persistence of the assembled [`DailyPrescription`] is
//! the caller's job, through the sink interface.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{VectorCatalog, VectorId};
use crate::context::UserContext;
use crate::score::VectorScore;
use crate::state::UserVectorState;

// ─── Priority & configuration ───────────────────────────────────────────────

/// Relative priority of a prescribed vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// The single headline focus of the day.
    Primary,
    /// Supporting focus.
    Secondary,
    /// Fill-in focus.
    Tertiary,
}

impl Priority {
    /// Share weight used for proportional time allocation.
    pub fn share_weight(self) -> u32 {
        match self {
            Priority::Primary => 3,
            Priority::Secondary => 2,
            Priority::Tertiary => 1,
        }
    }
}

/// Prescription-generator configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionConfig {
    /// Minimum final score the top vector must exceed to earn `primary`.
    /// Below it, the day has no primary (partial prescriptions are valid).
    pub primary_min_score: f64,
    /// Maximum number of `secondary` slots.
    pub max_secondary: usize,
    /// Maximum number of `tertiary` slots.
    pub max_tertiary: usize,
    /// Per-vector ceiling on suggested duration, in minutes.
    pub max_minutes_per_vector: u32,
    /// Score multiplier applied to locked-in vectors before ranking.
    pub locked_in_discount: f64,
    /// How long a generated prescription stays valid.
    pub validity_hours: i64,
}

impl Default for PrescriptionConfig {
    fn default() -> Self {
        Self {
            primary_min_score: 40.0,
            max_secondary: 2,
            max_tertiary: 2,
            max_minutes_per_vector: 45,
            locked_in_discount: 0.3,
            validity_hours: 24,
        }
    }
}

// ─── Prescription records ───────────────────────────────────────────────────

/// One prescribed vector with its slice of the day's time budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorPrescription {
    /// The prescribed vector.
    pub vector_id: VectorId,
    /// Slot this vector was assigned.
    pub priority: Priority,
    /// Effective score the ranking used (after any lock-in discount).
    pub score: f64,
    /// Minutes allocated out of the day's budget.
    pub suggested_duration_minutes: u32,
    /// Concrete task suggestions templated from the definition.
    pub suggested_tasks: Vec<String>,
    /// Why this vector was chosen, templated from the top reasoning strings.
    pub context_notes: String,
}

/// The day's complete focus set for one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyPrescription {
    /// Unique id of this prescription.
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Expiry; the sink treats a prescription past this as inactive.
    pub valid_until: DateTime<Utc>,
    /// The context snapshot the prescriptions were generated under.
    pub context: UserContext,
    /// Prescribed vectors, highest priority first.
    pub prescriptions: Vec<VectorPrescription>,
    /// Sum of all suggested durations; never exceeds the budget.
    pub total_estimated_minutes: u32,
    /// One-line summary of the day's focus.
    pub focus_message: String,
    /// Observations about streaks, near lock-ins and neglect.
    pub insights: Vec<String>,
}

impl DailyPrescription {
    /// Whether this prescription is still active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }
}

// ─── Generation ─────────────────────────────────────────────────────────────

/// Rank scores and produce the bounded, time-budgeted focus set.
///
/// Pure and deterministic; see the module docs for the ordering and
/// allocation rules.
pub fn generate(
    catalog: &VectorCatalog,
    scores: &[VectorScore],
    states: &HashMap<VectorId, UserVectorState>,
    context: &UserContext,
    config: &PrescriptionConfig,
) -> Vec<VectorPrescription> {
    let minutes = context.time_availability.minutes_available;
    if minutes == 0 {
        return Vec::new();
    }

    // Discount locked-in vectors, then rank: score descending, id ascending.
    let mut ranked: Vec<(f64, &VectorScore)> = scores
        .iter()
        .map(|s| {
            let locked = states
                .get(&s.vector_id)
                .is_some_and(UserVectorState::is_locked_in);
            let effective = if locked {
                s.final_score * config.locked_in_discount
            } else {
                s.final_score
            };
            (effective, s)
        })
        .filter(|(effective, _)| *effective > 0.0)
        .collect();
    ranked.sort_by(|(ea, sa), (eb, sb)| {
        eb.partial_cmp(ea)
            .unwrap_or(core::cmp::Ordering::Equal)
            .then_with(|| sa.vector_id.cmp(&sb.vector_id))
    });

    // Slot assignment: at most one primary (threshold-gated), then capped
    // secondary and tertiary slots in rank order.
    let mut selected: Vec<(Priority, f64, &VectorScore)> = Vec::new();
    let mut rest = ranked.into_iter();
    let mut carried: Option<(f64, &VectorScore)> = None;

    if let Some((effective, score)) = rest.next() {
        if effective >= config.primary_min_score {
            selected.push((Priority::Primary, effective, score));
        } else {
            carried = Some((effective, score));
        }
    }
    for (effective, score) in carried.into_iter().chain(&mut rest) {
        let secondaries = selected
            .iter()
            .filter(|(p, _, _)| *p == Priority::Secondary)
            .count();
        let tertiaries = selected
            .iter()
            .filter(|(p, _, _)| *p == Priority::Tertiary)
            .count();
        if secondaries < config.max_secondary {
            selected.push((Priority::Secondary, effective, score));
        } else if tertiaries < config.max_tertiary {
            selected.push((Priority::Tertiary, effective, score));
        } else {
            break;
        }
    }

    // Proportional time allocation, capped per vector, never over budget.
    let total_shares: u32 = selected.iter().map(|(p, _, _)| p.share_weight()).sum();
    if total_shares == 0 {
        return Vec::new();
    }

    let mut prescriptions = Vec::with_capacity(selected.len());
    for (priority, effective, score) in selected {
        let share = u64::from(minutes) * u64::from(priority.share_weight())
            / u64::from(total_shares);
        let duration = (share as u32).min(config.max_minutes_per_vector);
        if duration == 0 {
            continue;
        }
        prescriptions.push(VectorPrescription {
            vector_id: score.vector_id.clone(),
            priority,
            score: effective,
            suggested_duration_minutes: duration,
            suggested_tasks: suggested_tasks(catalog, &score.vector_id, duration),
            context_notes: context_notes(score),
        });
    }
    prescriptions
}

/// Wrap generated prescriptions into the day's [`DailyPrescription`],
/// deriving the focus message and insights.
pub fn assemble_daily(
    user_id: impl Into<String>,
    catalog: &VectorCatalog,
    prescriptions: Vec<VectorPrescription>,
    states: &HashMap<VectorId, UserVectorState>,
    context: &UserContext,
    config: &PrescriptionConfig,
) -> DailyPrescription {
    let total_estimated_minutes = prescriptions
        .iter()
        .map(|p| p.suggested_duration_minutes)
        .sum();

    DailyPrescription {
        id: Uuid::new_v4(),
        user_id: user_id.into(),
        generated_at: context.captured_at,
        valid_until: context.captured_at + Duration::hours(config.validity_hours),
        context: context.clone(),
        focus_message: focus_message(&prescriptions),
        insights: insights(catalog, states, context),
        total_estimated_minutes,
        prescriptions,
    }
}

// ─── Templating helpers ─────────────────────────────────────────────────────

fn suggested_tasks(catalog: &VectorCatalog, vector_id: &VectorId, duration: u32) -> Vec<String> {
    let Some(def) = catalog.get_by_id(vector_id) else {
        return vec![format!("{} minutes on {}", duration, vector_id)];
    };
    let mut tasks: Vec<String> = def
        .sub_components
        .iter()
        .take(2)
        .map(|sub| format!("work on {}", sub.id.replace('_', " ")))
        .collect();
    tasks.push(format!("{} focused minutes", duration));
    tasks
}

fn context_notes(score: &VectorScore) -> String {
    score
        .reasoning
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ")
}

fn focus_message(prescriptions: &[VectorPrescription]) -> String {
    match prescriptions.first() {
        Some(first) if first.priority == Priority::Primary => {
            if first.context_notes.is_empty() {
                format!("Primary focus: {}", first.vector_id)
            } else {
                format!("Primary focus: {} — {}", first.vector_id, first.context_notes)
            }
        }
        Some(_) => format!(
            "Light day: {} supporting vector(s), no single headline focus",
            prescriptions.len()
        ),
        None => "Rest day — nothing urgent today".into(),
    }
}

fn insights(
    catalog: &VectorCatalog,
    states: &HashMap<VectorId, UserVectorState>,
    context: &UserContext,
) -> Vec<String> {
    let mut insights = Vec::new();
    let mut locked = 0usize;

    // Catalog order keeps the insight list deterministic.
    for def in catalog.iter() {
        let Some(state) = states.get(&def.id) else {
            continue;
        };
        if state.is_locked_in() {
            locked += 1;
            continue;
        }
        if state.streak_days >= 7 {
            insights.push(format!("{}: {}-day streak", def.id, state.streak_days));
        }
        if state.current_level >= def.lock_in_threshold - 0.5 {
            insights.push(format!(
                "{} is close to locking in ({:.1}/{:.1})",
                def.id, state.current_level, def.lock_in_threshold
            ));
        }
        if let Some(last) = state.last_activity {
            let days = (context.captured_at - last).num_days();
            if days >= 14 {
                insights.push(format!("{} untouched for {} days", def.id, days));
            }
        }
    }
    if locked > 0 {
        insights.push(format!("{} vector(s) permanently locked in", locked));
    }
    insights
}

// ─── Tests ──────────────────────────────────────────────────────────────────

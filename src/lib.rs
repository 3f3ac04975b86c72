//! # pve-core
//!
//! Progress Vector Engine — a single-user decision engine over independent
//! progress vectors.
//!
//! ---
//!
//! ## This is not a task list. It is a prioritisation architecture.
//!
//! Three primitives combine to produce a coherent daily focus without any
//! scheduling code.
//!
//! **Independent progress vectors** — development is not a single global
//! score. Every trackable dimension carries its own continuous 0–10 level,
//! its own milestone ladder, its own velocity trend and streak. Voice work
//! and posture never share state; mastering one says nothing about the other.
//!
//! **Multi-factor scoring** — each scoring pass blends five signals per
//! vector: headroom below the ceiling, situational fit, days of neglect,
//! phase requirements, and prerequisite maturity. Regression *raises* a
//! vector's score — a slipping vector needs attention more, not less.
//!
//! **Permanent lock-in** — past a per-vector threshold, progress becomes
//! part of the baseline. The flag is one-way in the type system and the
//! state store refuses any write that would clear it. Irreversible
//! milestones emit a marker exactly once, ever.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! Catalog → UserContext → score_all → generate → DailyPrescription
//!    ↑           ↑            ↑
//! validation  snapshot   UserLearningProfile
//!                             ↑
//!              EngagementHistory (append-only)
//!
//! EngagementRecord → apply_progress → milestones / lock-in / markers
//!                          ↓
//!                  VectorStateStore (versioned, idempotency-keyed)
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`catalog`] | [`VectorCatalog`], [`VectorDefinition`] | Static vector definitions, validated at load |
//! | [`context`] | [`UserContext`] | Point-in-time situational snapshot, strictly passed |
//! | [`state`] | [`UserVectorState`], [`VelocityTrend`] | Per-vector mutable state with one-way lock-in |
//! | [`score`] | [`VectorScore`], [`score_all`] | Five-term blend with reasoning, monotone by construction |
//! | [`prescribe`] | [`DailyPrescription`], [`generate`] | Bounded, time-budgeted, deterministic focus set |
//! | [`progress`] | [`apply_progress`], [`IrreversibilityMarker`] | Delta application, milestone walk, lock-in |
//! | [`learning`] | [`EngagementHistory`], [`UserLearningProfile`] | Cold-start-safe context affinity from outcomes |
//! | [`store`] | [`VectorStateStore`], [`PrescriptionSink`] | Versioned persistence seams + in-memory backends |
//! | [`engine`] | [`ProgressVectorEngine`] | The facade wiring it all together |
//!
//! Everything below the [`engine`] facade is pure and synchronous: scoring
//! and prescription generation are functions of their inputs, so identical
//! catalog, states, context and profile always produce identical output.

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod catalog;
pub mod context;
pub mod engine;
pub mod error;
pub mod learning;
pub mod prescribe;
pub mod progress;
pub mod score;
pub mod state;
pub mod store;

pub use catalog::{Milestone, SubComponent, VectorCatalog, VectorDefinition, VectorId};
pub use context::UserContext;
pub use engine::{EngineConfig, ProgressVectorEngine};
pub use error::{CatalogError, EngineError, Result};
pub use learning::{EngagementHistory, EngagementRecord, UserLearningProfile};
pub use prescribe::{
    generate, DailyPrescription, PrescriptionConfig, Priority, VectorPrescription,
};
pub use progress::{
    apply_progress, EngagementQuality, IrreversibilityMarker, LockInStatus, QualityDeltaPolicy,
    VectorProgressUpdate,
};
pub use score::{score_all, ScoringConfig, ScoringWeights, VectorScore};
pub use state::{UserVectorState, VelocityTrend};
pub use store::{
    InMemorySink, InMemoryStateStore, PrescriptionSink, VectorStateStore, VersionedState,
};

//! Error taxonomy for the engine.
//!
//! Two layers, mirroring when a failure can occur:
//!
//! - [`CatalogError`] — fatal configuration errors detected once at load time.
//!   A catalog that fails validation never becomes a [`VectorCatalog`], so no
//!   request-time path ever sees a malformed definition.
//! - [`EngineError`] — request-time failures. Scoring and prescription
//!   generation are pure and can only reject malformed input; `Conflict` and
//!   `Unavailable` arise solely at the collaborator I/O boundary.
//!
//! The engine never retries internally. A `Conflict` means the caller must
//! reload state and reapply; silent retries near the lock-in path could
//! duplicate permanent effects.
//!
//! [`VectorCatalog`]: crate::catalog::VectorCatalog

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, EngineError>;

// ─── Catalog (load-time) errors ─────────────────────────────────────────────

/// Fatal configuration error raised while compiling a vector catalog.
///
/// All variants are detected at load time; a process that starts with a
/// valid catalog never sees one of these afterwards.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// The same vector id appears twice in the definition list.
    #[error("duplicate vector id `{0}` in catalog")]
    DuplicateVector(String),

    /// A definition declares no sub-components.
    #[error("vector `{0}` has no sub-components")]
    NoSubComponents(String),

    /// The same sub-component id appears twice within one definition.
    #[error("vector `{vector}` declares sub-component `{sub}` twice")]
    DuplicateSubComponent {
        /// Owning vector id.
        vector: String,
        /// Repeated sub-component id.
        sub: String,
    },

    /// A sub-component weight is outside (0.0, 1.0].
    #[error("vector `{vector}` sub-component `{sub}` has invalid weight {weight}")]
    InvalidWeight {
        /// Owning vector id.
        vector: String,
        /// Offending sub-component id.
        sub: String,
        /// The rejected weight.
        weight: f64,
    },

    /// Sub-component weights do not sum to 1.0 (within tolerance).
    #[error("vector `{vector}` sub-component weights sum to {sum}, expected 1.0")]
    WeightSum {
        /// Owning vector id.
        vector: String,
        /// Actual sum of the declared weights.
        sum: f64,
    },

    /// Milestone levels are not strictly ascending.
    #[error("vector `{vector}` milestone `{milestone}` breaks ascending level order")]
    MilestoneOrder {
        /// Owning vector id.
        vector: String,
        /// The milestone whose level is out of order.
        milestone: String,
    },

    /// A milestone level is outside (0.0, 10.0].
    #[error("vector `{vector}` milestone `{milestone}` level {level} outside (0, 10]")]
    MilestoneLevel {
        /// Owning vector id.
        vector: String,
        /// Offending milestone name.
        milestone: String,
        /// The rejected level.
        level: f64,
    },

    /// The lock-in threshold is outside (0.0, 10.0].
    #[error("vector `{vector}` lock-in threshold {threshold} outside (0, 10]")]
    LockInThreshold {
        /// Owning vector id.
        vector: String,
        /// The rejected threshold.
        threshold: f64,
    },

    /// A prerequisite references a vector id absent from the catalog.
    #[error("vector `{vector}` requires unknown prerequisite `{prerequisite}`")]
    UnknownPrerequisite {
        /// Owning vector id.
        vector: String,
        /// The missing prerequisite id.
        prerequisite: String,
    },

    /// A vector lists itself as its own prerequisite.
    #[error("vector `{0}` lists itself as a prerequisite")]
    SelfPrerequisite(String),
}

// ─── Engine (request-time) errors ───────────────────────────────────────────

/// Request-time failure surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed caller input: non-finite delta, negative minutes, unknown
    /// sub-component, inconsistent context. Rejected synchronously with no
    /// partial mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lookup named an id absent from the catalog. The catalog is the
    /// source of truth, so this is a defensive guard, not an expected path.
    #[error("vector `{0}` is not in the catalog")]
    NotFound(String),

    /// Optimistic-concurrency mismatch on a state write. The caller reloads
    /// the state and reapplies; the engine never retries on its own.
    #[error("state conflict for vector `{vector_id}`: {detail}")]
    Conflict {
        /// The vector whose write was rejected.
        vector_id: String,
        /// What the store observed.
        detail: String,
    },

    /// A collaborator (state store, persistence sink) failed. Pure scoring
    /// and prescription paths never raise this.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Fatal configuration error from catalog or config validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// ─── Tests ──────────────────────────────────────────────────────────────────

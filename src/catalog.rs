//! The vector catalog — the immutable registry of progress dimensions.
//!
//! A [`VectorDefinition`] describes one trackable dimension: its weighted
//! sub-components, its ascending milestone ladder, the context factors it is
//! sensitive to, its one-hop prerequisites, and the level at which it locks
//! in permanently. The engine is generic over what a vector *means* — ids
//! like `voice_resonance` or `hair_styling` are opaque labels here.
//!
//! [`VectorCatalog::compile`] validates every definition once at load time:
//!
//! - sub-component weights sum to 1.0 (±[`WEIGHT_SUM_TOLERANCE`]),
//! - milestone levels are strictly ascending within (0, 10],
//! - prerequisites name ids that exist in the catalog.
//!
//! Prerequisite edges may form cycles in the data. That is deliberate and
//! harmless: the scorer consumes them one hop only (never a transitive
//! closure), so no cycle detection is needed.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Upper bound of the continuous level scale shared by levels, sub-scores,
/// milestones and lock-in thresholds.
pub const LEVEL_MAX: f64 = 10.0;

/// Tolerance when checking that sub-component weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ─── VectorId ───────────────────────────────────────────────────────────────

/// Opaque identifier of a progress vector, e.g. `"hair_styling"`.
///
/// Ordering is lexical and is used as the deterministic tie-breaker when two
/// vectors score identically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(String);

impl VectorId {
    /// Construct an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VectorId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for VectorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ─── Definition pieces ──────────────────────────────────────────────────────

/// One weighted facet of a vector. Sub-scores live on the same 0–10 scale as
/// the level; the level is always the weight-blended sum of its sub-scores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubComponent {
    /// Facet id, unique within the owning vector.
    pub id: String,
    /// Blend weight in (0.0, 1.0]. All weights of a vector sum to 1.0.
    pub weight: f64,
}

/// One rung of a vector's milestone ladder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Human-oriented name, unique within the ladder.
    pub name: String,
    /// Level at which the milestone is crossed, in (0.0, 10.0].
    pub level: f64,
    /// Irreversible milestones emit a one-time permanent marker when crossed.
    pub irreversible: bool,
}

/// Immutable definition of a single progress vector. Compiled once into a
/// [`VectorCatalog`] and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorDefinition {
    /// Unique vector id.
    pub id: VectorId,
    /// Grouping label used by [`VectorCatalog::get_by_category`].
    pub category: String,
    /// Weighted facets; weights sum to 1.0 (validated at load).
    pub sub_components: Vec<SubComponent>,
    /// Milestone ladder, strictly ascending by level (validated at load).
    pub milestones: Vec<Milestone>,
    /// Names of the context factors this vector is sensitive to. Unknown
    /// names are ignored by the scorer.
    pub context_factors: Vec<String>,
    /// One-hop prerequisite vectors feeding the synergy term. May contain
    /// cycles across the catalog; only ever followed one hop.
    pub prerequisites: Vec<VectorId>,
    /// Level at which this vector locks in permanently, in (0.0, 10.0].
    pub lock_in_threshold: f64,
    /// Typical minutes of one engagement session. Drives the `time` context
    /// factor predicate and task suggestions.
    pub typical_session_minutes: u32,
}

impl VectorDefinition {
    /// Validate this definition in isolation (everything except
    /// prerequisite existence, which needs the whole catalog).
    fn validate(&self) -> core::result::Result<(), CatalogError> {
        let vector = self.id.as_str().to_owned();

        if self.sub_components.is_empty() {
            return Err(CatalogError::NoSubComponents(vector));
        }

        let mut seen = std::collections::HashSet::new();
        let mut sum = 0.0;
        for sub in &self.sub_components {
            if !seen.insert(sub.id.as_str()) {
                return Err(CatalogError::DuplicateSubComponent {
                    vector: vector.clone(),
                    sub: sub.id.clone(),
                });
            }
            if !sub.weight.is_finite() || sub.weight <= 0.0 || sub.weight > 1.0 {
                return Err(CatalogError::InvalidWeight {
                    vector: vector.clone(),
                    sub: sub.id.clone(),
                    weight: sub.weight,
                });
            }
            sum += sub.weight;
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CatalogError::WeightSum { vector, sum });
        }

        let mut prev = 0.0;
        for m in &self.milestones {
            if !m.level.is_finite() || m.level <= 0.0 || m.level > LEVEL_MAX {
                return Err(CatalogError::MilestoneLevel {
                    vector: vector.clone(),
                    milestone: m.name.clone(),
                    level: m.level,
                });
            }
            if m.level <= prev {
                return Err(CatalogError::MilestoneOrder {
                    vector: vector.clone(),
                    milestone: m.name.clone(),
                });
            }
            prev = m.level;
        }

        if !self.lock_in_threshold.is_finite()
            || self.lock_in_threshold <= 0.0
            || self.lock_in_threshold > LEVEL_MAX
        {
            return Err(CatalogError::LockInThreshold {
                vector,
                threshold: self.lock_in_threshold,
            });
        }

        if self.prerequisites.contains(&self.id) {
            return Err(CatalogError::SelfPrerequisite(vector));
        }

        Ok(())
    }
}

// ─── Catalog ────────────────────────────────────────────────────────────────

/// The compiled, immutable vector registry.
///
/// Iteration order is the definition order given at compile time, so a fixed
/// catalog yields identical scoring passes across runs.
#[derive(Clone, Debug)]
pub struct VectorCatalog {
    definitions: Vec<VectorDefinition>,
    index: HashMap<VectorId, usize>,
}

impl VectorCatalog {
    /// Compile a catalog from raw definitions, running all load-time
    /// validation. A failure here is fatal configuration: nothing downstream
    /// ever sees a half-valid catalog.
    pub fn compile(
        definitions: Vec<VectorDefinition>,
    ) -> core::result::Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            def.validate()?;
            if index.insert(def.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateVector(def.id.as_str().to_owned()));
            }
        }
        // Prerequisites may be cyclic but must at least exist.
        for def in &definitions {
            for prereq in &def.prerequisites {
                if !index.contains_key(prereq) {
                    return Err(CatalogError::UnknownPrerequisite {
                        vector: def.id.as_str().to_owned(),
                        prerequisite: prereq.as_str().to_owned(),
                    });
                }
            }
        }
        tracing::debug!(vectors = definitions.len(), "catalog compiled");
        Ok(Self { definitions, index })
    }

    /// Look up a definition by id.
    pub fn get_by_id(&self, id: &VectorId) -> Option<&VectorDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    /// All definitions in a category, in catalog order.
    pub fn get_by_category(&self, category: &str) -> Vec<&VectorDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    /// Iterate over all definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &VectorDefinition> {
        self.definitions.iter()
    }

    /// Number of vectors in the catalog.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when the catalog holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

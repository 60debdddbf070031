//! Model-routing data types.
//!
//! [`ModelDescriptor`] entries come from an externally supplied registry
//! document, so every field is lenient: identifiers are optional (resolved
//! via [`ModelDescriptor::resolved_id`]) and capacity/quality fields carry
//! serde defaults.  Structural validation happens entry-by-entry at load
//! time so one malformed entry never poisons the pool.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default context window when the registry omits one.
pub const DEFAULT_CONTEXT_LENGTH: u64 = 8192;

/// Default static quality weight when the registry omits one.
pub const DEFAULT_TIER_SCORE: f64 = 0.7;

// ─────────────────────────────────────────────────────────────────────────────
// ModelDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// One routable backend model, as declared in the model registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Preferred identifier injected into routed bodies.
    #[serde(default)]
    pub name: Option<String>,
    /// Fallback identifier when `name` is absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Pool this model belongs to; candidate selection is restricted by group.
    #[serde(default)]
    pub group: Option<String>,
    /// Hard capacity ceiling in tokens.  A model whose context length is
    /// below the request's estimated token count is never selectable.
    #[serde(default = "default_context_length")]
    pub context_length: u64,
    /// Static quality weight in the selector's base score.
    #[serde(default = "default_tier_score")]
    pub tier_score: f64,
    /// Domain tags earning the specialization bonus.
    #[serde(default)]
    pub specializations: HashSet<String>,
}

fn default_context_length() -> u64 {
    DEFAULT_CONTEXT_LENGTH
}

fn default_tier_score() -> f64 {
    DEFAULT_TIER_SCORE
}

impl ModelDescriptor {
    /// Construct a descriptor with the given name and registry defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            id: None,
            group: None,
            context_length: DEFAULT_CONTEXT_LENGTH,
            tier_score: DEFAULT_TIER_SCORE,
            specializations: HashSet::new(),
        }
    }

    /// Builder: set the group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Builder: set the context length.
    pub fn with_context_length(mut self, tokens: u64) -> Self {
        self.context_length = tokens;
        self
    }

    /// Builder: set the tier score.
    pub fn with_tier_score(mut self, score: f64) -> Self {
        self.tier_score = score;
        self
    }

    /// Builder: add a specialization tag.
    pub fn with_specialization(mut self, tag: impl Into<String>) -> Self {
        self.specializations.insert(tag.into());
        self
    }

    /// The identifier used downstream: `name`, falling back to `id`.
    ///
    /// Returns `None` for a descriptor with neither — such an entry is
    /// malformed and must be skipped by the selector.
    pub fn resolved_id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RequestFeatures
// ─────────────────────────────────────────────────────────────────────────────

/// Per-request signal vector consumed by the selector.
///
/// Computed fresh for every request by the routing stage; never cached or
/// shared across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFeatures {
    /// Rough token count of the request payload.
    pub estimated_tokens: u64,
    /// Task complexity weight (> 0).
    pub complexity_score: f64,
    /// Optional domain tag from the caller.
    pub domain: Option<String>,
}

impl RequestFeatures {
    pub fn new(estimated_tokens: u64, complexity_score: f64, domain: Option<String>) -> Self {
        Self {
            estimated_tokens,
            complexity_score,
            domain,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry / policy documents
// ─────────────────────────────────────────────────────────────────────────────

/// The model registry: the full pool of routable models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// All models belonging to the given group, in registry order.
    pub fn candidates_for_group<'a>(&'a self, group: &str) -> Vec<&'a ModelDescriptor> {
        self.models
            .iter()
            .filter(|m| m.group.as_deref() == Some(group))
            .collect()
    }
}

/// The routing policy: default pool plus static failover order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPolicy {
    /// Pool used when the caller supplies no group header.
    #[serde(default = "default_group")]
    pub default_group: String,
    /// Ordered fallback identifiers used when selection yields nothing.
    #[serde(default)]
    pub failover_order: Vec<String>,
}

fn default_group() -> String {
    "default".to_string()
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            default_group: default_group(),
            failover_order: Vec::new(),
        }
    }
}

//! Model selection algorithm.
//!
//! Pure scoring/ranking over a candidate pool.  No I/O, no shared mutable
//! state — safe to call concurrently for independent requests.
//!
//! Per candidate:
//! 1. hard capacity check — over-capacity candidates score `-inf` and are
//!    excluded outright, never merely penalized;
//! 2. base score `min(1.0, tier_score / max(complexity, ε))`;
//! 3. dynamic adjustments — load penalty in `[0,1]`, performance bonus in
//!    `[-1,+1]` (both from [`SelectionSignals`]), plus a fixed
//!    specialization bonus when the request domain matches;
//! 4. final `base * (1 - load) + perf + specialization`.
//!
//! Highest score wins; ties go to the earlier candidate in input order.

use super::features::{NoSignals, SelectionSignals};
use hx_gateway_core::{ModelDescriptor, RequestFeatures};
use tracing::warn;

/// Fixed bonus for a domain match against a candidate's specializations.
pub const SPECIALIZATION_BONUS: f64 = 0.3;

/// Guard against division by zero in the base score.
const COMPLEXITY_EPSILON: f64 = 1e-6;

/// Scoring/ranking selector over externally supplied model descriptors.
pub struct ModelSelector {
    signals: Box<dyn SelectionSignals>,
}

impl ModelSelector {
    /// Selector with no dynamic signals (pure registry-driven scoring).
    pub fn new() -> Self {
        Self::with_signals(Box::new(NoSignals))
    }

    /// Selector with injected dynamic signals.
    pub fn with_signals(signals: Box<dyn SelectionSignals>) -> Self {
        Self { signals }
    }

    /// Score a single candidate.  `-inf` marks a hard rejection.
    pub fn score(&self, model: &ModelDescriptor, features: &RequestFeatures) -> f64 {
        if features.estimated_tokens > model.context_length {
            return f64::NEG_INFINITY;
        }

        let base =
            (model.tier_score / features.complexity_score.max(COMPLEXITY_EPSILON)).min(1.0);
        let load = self.signals.load_penalty(model).clamp(0.0, 1.0);
        let perf = self.signals.performance_bonus(model).clamp(-1.0, 1.0);
        let specialization = match features.domain.as_deref() {
            Some(domain) if model.specializations.contains(domain) => SPECIALIZATION_BONUS,
            _ => 0.0,
        };

        base * (1.0 - load) + perf + specialization
    }

    /// Pick the best candidate, or `None` when the pool is empty or every
    /// entry is hard-rejected or malformed.
    ///
    /// The registry is externally supplied configuration, so an entry with
    /// no resolvable identifier is skipped rather than an error.  Ranking
    /// uses a strict `>` comparison, so equal scores keep the earliest
    /// candidate — deterministic for a fixed input.
    pub fn select<'a>(
        &self,
        candidates: &[&'a ModelDescriptor],
        features: &RequestFeatures,
    ) -> Option<&'a ModelDescriptor> {
        let mut best: Option<(&'a ModelDescriptor, f64)> = None;
        for &model in candidates {
            if model.resolved_id().is_none() {
                warn!("skipping registry entry with no name or id");
                continue;
            }
            let score = self.score(model, features);
            if score == f64::NEG_INFINITY {
                continue;
            }
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((model, score));
            }
        }
        best.map(|(model, _)| model)
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(tokens: u64, complexity: f64, domain: Option<&str>) -> RequestFeatures {
        RequestFeatures::new(tokens, complexity, domain.map(str::to_string))
    }

    #[test]
    fn selection_is_deterministic() {
        let a = ModelDescriptor::named("a").with_tier_score(0.6);
        let b = ModelDescriptor::named("b").with_tier_score(0.9);
        let pool = vec![&a, &b];
        let f = features(512, 1.0, None);
        let selector = ModelSelector::new();
        for _ in 0..10 {
            assert_eq!(
                selector.select(&pool, &f).unwrap().resolved_id(),
                Some("b")
            );
        }
    }

    #[test]
    fn over_capacity_candidate_is_never_selected_even_alone() {
        let small = ModelDescriptor::named("small").with_context_length(4096);
        let pool = vec![&small];
        let f = features(5000, 1.0, None);
        assert!(ModelSelector::new().select(&pool, &f).is_none());
    }

    #[test]
    fn capacity_beats_tier_score() {
        // The under-capacity model wins regardless of tier ordering.
        let small = ModelDescriptor::named("small")
            .with_context_length(4096)
            .with_tier_score(0.99);
        let large = ModelDescriptor::named("large")
            .with_context_length(16384)
            .with_tier_score(0.1);
        let pool = vec![&small, &large];
        let f = features(5000, 1.0, None);
        assert_eq!(
            ModelSelector::new().select(&pool, &f).unwrap().resolved_id(),
            Some("large")
        );
    }

    #[test]
    fn ties_break_by_input_order() {
        let first = ModelDescriptor::named("first").with_tier_score(0.7);
        let second = ModelDescriptor::named("second").with_tier_score(0.7);
        let pool = vec![&first, &second];
        let f = features(512, 1.0, None);
        assert_eq!(
            ModelSelector::new().select(&pool, &f).unwrap().resolved_id(),
            Some("first")
        );
    }

    #[test]
    fn specialization_bonus_outranks_a_small_tier_gap() {
        let generalist = ModelDescriptor::named("generalist").with_tier_score(0.9);
        let specialist = ModelDescriptor::named("specialist")
            .with_tier_score(0.8)
            .with_specialization("code");
        let pool = vec![&generalist, &specialist];

        let with_domain = features(512, 1.0, Some("code"));
        let selector = ModelSelector::new();
        assert_eq!(
            selector.select(&pool, &with_domain).unwrap().resolved_id(),
            Some("specialist")
        );

        let without_domain = features(512, 1.0, None);
        assert_eq!(
            selector.select(&pool, &without_domain).unwrap().resolved_id(),
            Some("generalist")
        );
    }

    #[test]
    fn base_score_is_capped_at_one() {
        // tier 0.9 / complexity 0.1 would be 9.0 uncapped; the cap keeps a
        // specialist's +0.3 decisive.
        let selector = ModelSelector::new();
        let m = ModelDescriptor::named("m").with_tier_score(0.9);
        let f = features(512, 0.1, None);
        assert!((selector.score(&m, &f) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn load_penalty_scales_the_base_score() {
        struct HalfLoad;
        impl SelectionSignals for HalfLoad {
            fn load_penalty(&self, _m: &ModelDescriptor) -> f64 {
                0.5
            }
        }
        let selector = ModelSelector::with_signals(Box::new(HalfLoad));
        let m = ModelDescriptor::named("m").with_tier_score(0.8);
        let f = features(512, 1.0, None);
        assert!((selector.score(&m, &f) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn entry_without_identifier_is_skipped() {
        let mut anonymous = ModelDescriptor::named("x");
        anonymous.name = None;
        let named = ModelDescriptor::named("named").with_tier_score(0.1);
        let pool = vec![&anonymous, &named];
        let f = features(512, 1.0, None);
        assert_eq!(
            ModelSelector::new().select(&pool, &f).unwrap().resolved_id(),
            Some("named")
        );
    }

    #[test]
    fn empty_pool_returns_none() {
        let f = features(512, 1.0, None);
        assert!(ModelSelector::new().select(&[], &f).is_none());
    }
}

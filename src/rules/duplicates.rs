// Duplicate-pair detector.
// Buckets records by exact (date, amount-in-cents), then scores every
// unordered pair inside a bucket on counterparty and description similarity.

use std::collections::{BTreeMap, HashSet};

use crate::record::Record;
use crate::recommendation::{
    Recommendation, RecommendationKind, DUPLICATE_ACTION_DELETE,
};
use crate::rules::{expenses, RecommendationRule};
use crate::similarity::{normalize, normalized_edit_similarity};

// ============================================================================
// DUPLICATE RULE
// ============================================================================

pub struct DuplicateRule {
    /// Minimum confidence to emit a recommendation (default: 0.75)
    pub emit_threshold: f64,

    /// A counterparty name above this similarity counts as "high" (default: 0.8)
    pub name_high_threshold: f64,

    /// A description above this similarity counts as "high" (default: 0.7)
    pub description_high_threshold: f64,
}

impl DuplicateRule {
    pub fn new() -> Self {
        DuplicateRule {
            emit_threshold: 0.75,
            name_high_threshold: 0.8,
            description_high_threshold: 0.7,
        }
    }

    /// Similarity with a containment fast path: when one normalized string
    /// contains the other and their lengths are within 5 chars, score 0.8
    /// without running the edit-distance matrix.
    fn pair_similarity(a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }

        let na = normalize(a);
        let nb = normalize(b);
        let len_a = na.chars().count();
        let len_b = nb.chars().count();
        let diff = len_a.abs_diff(len_b);

        if diff < 5 && !na.is_empty() && !nb.is_empty() && (na.contains(&nb) || nb.contains(&na)) {
            return 0.8;
        }

        normalized_edit_similarity(a, b)
    }

    /// Confidence ladder, highest priority first, first match wins.
    /// Returns 0.0 when the pair is not worth flagging.
    fn pair_confidence(&self, a: &Record, b: &Record) -> f64 {
        let name_exact = a.paid_to == b.paid_to;
        let desc_exact = a.description == b.description;
        let name_sim = Self::pair_similarity(&a.paid_to, &b.paid_to);
        let desc_sim = Self::pair_similarity(&a.description, &b.description);

        let name_high = name_sim > self.name_high_threshold;
        let desc_high = desc_sim > self.description_high_threshold;

        if name_high && desc_high {
            if name_exact && desc_exact {
                return 1.0;
            }
            return 0.9;
        }
        if desc_exact && name_sim >= 0.6 {
            return 0.95;
        }
        if name_exact && desc_sim >= 0.5 {
            return 0.95;
        }
        if name_high || desc_high {
            return 0.75;
        }

        0.0
    }
}

impl Default for DuplicateRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRule for DuplicateRule {
    fn name(&self) -> &'static str {
        "duplicates"
    }

    fn generate(&self, active: &[&Record], _all: &[Record]) -> Vec<Recommendation> {
        let records = expenses(active);

        // Exact (date, cents) buckets. BTreeMap keeps bucket iteration
        // deterministic, which the engine's idempotence relies on.
        let mut buckets: BTreeMap<(String, i64), Vec<&Record>> = BTreeMap::new();
        for record in records {
            let cents = (record.amount * 100.0).round() as i64;
            buckets
                .entry((record.date.clone(), cents))
                .or_default()
                .push(record);
        }

        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
        let mut recommendations = Vec::new();

        for bucket in buckets.values() {
            if bucket.len() < 2 {
                continue;
            }

            for i in 0..bucket.len() {
                for j in (i + 1)..bucket.len() {
                    let (a, b) = (bucket[i], bucket[j]);

                    let mut pair = [a.id.as_str(), b.id.as_str()];
                    pair.sort();
                    let key = (pair[0].to_string(), pair[1].to_string());
                    if !seen_pairs.insert(key) {
                        continue;
                    }

                    let confidence = self.pair_confidence(a, b);
                    if confidence < self.emit_threshold {
                        continue;
                    }

                    recommendations.push(Recommendation::new(
                        RecommendationKind::Duplicate,
                        vec![pair[0].to_string(), pair[1].to_string()],
                        None,
                        String::new(),
                        DUPLICATE_ACTION_DELETE.to_string(),
                        confidence,
                        format!(
                            "Possible duplicate on {}: \"{}\" and \"{}\" for ${:.2}",
                            a.date, a.paid_to, b.paid_to, a.amount
                        ),
                    ));
                }
            }
        }

        recommendations
    }
}

// ============================================================================
// TESTS
// ============================================================================

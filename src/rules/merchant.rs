// Merchant-name normalizer.
// Greedy single-pass clustering: distinct names in descending frequency
// order either join an existing canonical or seed a new one and sweep
// forward. Not globally optimal; later names can anchor looser clusters
// than an earlier pass would have chosen. That trade-off is intentional.

use std::collections::HashMap;

use crate::record::{Record, RecordField};
use crate::recommendation::{Recommendation, RecommendationKind};
use crate::rules::{expenses, RecommendationRule};
use crate::similarity::normalized_edit_similarity;

// ============================================================================
// MERCHANT NORMALIZATION RULE
// ============================================================================

pub struct MerchantNormalizationRule {
    /// Similarity at or above which two name variants cluster (default: 0.65)
    pub cluster_threshold: f64,
}

impl MerchantNormalizationRule {
    pub fn new() -> Self {
        MerchantNormalizationRule {
            cluster_threshold: 0.65,
        }
    }

    /// Distinct trimmed names with occurrence counts, ordered by descending
    /// frequency. The stable sort keeps first-seen order between ties.
    fn ranked_names(records: &[&Record]) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for record in records {
            let name = record.paid_to.trim();
            if name.is_empty() {
                continue;
            }
            match counts.iter_mut().find(|(n, _)| n == name) {
                Some((_, count)) => *count += 1,
                None => counts.push((name.to_string(), 1)),
            }
        }

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Assign every distinct name a canonical spelling.
    fn build_canonical_map(&self, ranked: &[(String, usize)]) -> HashMap<String, String> {
        let mut canonical_of: HashMap<String, String> = HashMap::new();
        let mut canonicals: Vec<String> = Vec::new();

        for (i, (name, _)) in ranked.iter().enumerate() {
            if canonical_of.contains_key(name) {
                continue;
            }

            // Phase one: join an existing canonical when close enough
            let joined = canonicals.iter().find(|canonical| {
                normalized_edit_similarity(name, canonical) >= self.cluster_threshold
            });
            if let Some(canonical) = joined {
                canonical_of.insert(name.clone(), canonical.clone());
                continue;
            }

            // Phase two: this name seeds a new canonical; sweep forward and
            // claim every later, still-unmapped similar name
            canonical_of.insert(name.clone(), name.clone());
            for (later, _) in &ranked[i + 1..] {
                if canonical_of.contains_key(later) {
                    continue;
                }
                if normalized_edit_similarity(later, name) >= self.cluster_threshold {
                    canonical_of.insert(later.clone(), name.clone());
                }
            }
            canonicals.push(name.clone());
        }

        canonical_of
    }
}

impl Default for MerchantNormalizationRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRule for MerchantNormalizationRule {
    fn name(&self) -> &'static str {
        "merchant-normalization"
    }

    fn generate(&self, active: &[&Record], _all: &[Record]) -> Vec<Recommendation> {
        let records = expenses(active);
        let ranked = Self::ranked_names(&records);
        let canonical_of = self.build_canonical_map(&ranked);

        let mut recommendations = Vec::new();
        for record in records {
            let name = record.paid_to.trim();
            let Some(canonical) = canonical_of.get(name) else {
                continue;
            };
            if name == canonical {
                continue;
            }

            let similarity = normalized_edit_similarity(name, canonical);
            let confidence = (0.6 + similarity * 0.35).clamp(0.5, 0.95);

            recommendations.push(Recommendation::new(
                RecommendationKind::MerchantNormalization,
                vec![record.id.clone()],
                Some(RecordField::PaidTo),
                name.to_string(),
                canonical.clone(),
                confidence,
                format!("Normalize \"{}\" to \"{}\"", name, canonical),
            ));
        }

        recommendations
    }
}

// ============================================================================
// TESTS
// ============================================================================

// Classification suggester.
// Two independent paths: the static keyword table and the counterparty's
// historical (category, subcategory) pairs. Both may fire for the same
// record with different confidences; the consumer picks between competing
// suggestions, the engine only collapses exact identity collisions.

use std::collections::HashMap;

use crate::record::{Record, RecordField, RecordKind};
use crate::recommendation::{Recommendation, RecommendationKind};
use crate::rules::{expenses, keyword_match, RecommendationRule};

// ============================================================================
// CLASSIFICATION RULE
// ============================================================================

pub struct ClassificationRule;

impl ClassificationRule {
    pub fn new() -> Self {
        ClassificationRule
    }

    /// Historical (category, subcategory) pairs per lowercased counterparty,
    /// in observation order. Only non-deleted records with a category count.
    fn build_history(all: &[Record]) -> HashMap<String, Vec<(String, String)>> {
        let mut history: HashMap<String, Vec<(String, String)>> = HashMap::new();

        for record in all {
            if !record.is_active() || record.kind != RecordKind::Expense {
                continue;
            }
            let key = record.paid_to.trim().to_lowercase();
            let category = record.category.trim();
            if key.is_empty() || category.is_empty() {
                continue;
            }
            history
                .entry(key)
                .or_default()
                .push((category.to_string(), record.subcategory.trim().to_string()));
        }

        history
    }

    /// Most frequent pair, ties to the pair seen first.
    fn top_pair(observed: &[(String, String)]) -> Option<&(String, String)> {
        let mut best: Option<(&(String, String), usize)> = None;
        for (index, pair) in observed.iter().enumerate() {
            if observed[..index].contains(pair) {
                continue;
            }
            let count = observed.iter().filter(|p| *p == pair).count();
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((pair, count)),
            }
        }
        best.map(|(pair, _)| pair)
    }

    fn recommend(
        record: &Record,
        field: RecordField,
        suggested: &str,
        confidence: f64,
        source: &str,
    ) -> Recommendation {
        Recommendation::new(
            RecommendationKind::Classification,
            vec![record.id.clone()],
            Some(field),
            record.field(field).trim().to_string(),
            suggested.to_string(),
            confidence,
            format!(
                "Classify {} of \"{}\" as \"{}\" ({})",
                field.as_str(),
                record.paid_to,
                suggested,
                source
            ),
        )
    }
}

impl Default for ClassificationRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRule for ClassificationRule {
    fn name(&self) -> &'static str {
        "classification"
    }

    fn generate(&self, active: &[&Record], all: &[Record]) -> Vec<Recommendation> {
        let history = Self::build_history(all);

        let mut recommendations = Vec::new();
        for record in expenses(active) {
            let category = record.category.trim();
            let subcategory = record.subcategory.trim();

            // Keyword path, independent of whether the fields are missing
            if let Some(rule) = keyword_match(record) {
                let differs = !rule.category.eq_ignore_ascii_case(category)
                    || (!rule.subcategory.is_empty()
                        && !rule.subcategory.eq_ignore_ascii_case(subcategory));

                if differs {
                    if category.is_empty() {
                        recommendations.push(Self::recommend(
                            record,
                            RecordField::Category,
                            rule.category,
                            0.85,
                            "keyword match",
                        ));
                        if !rule.subcategory.is_empty() && subcategory.is_empty() {
                            recommendations.push(Self::recommend(
                                record,
                                RecordField::Subcategory,
                                rule.subcategory,
                                0.80,
                                "keyword match",
                            ));
                        }
                    } else if rule.category.eq_ignore_ascii_case(category)
                        && subcategory.is_empty()
                        && !rule.subcategory.is_empty()
                    {
                        recommendations.push(Self::recommend(
                            record,
                            RecordField::Subcategory,
                            rule.subcategory,
                            0.75,
                            "keyword match",
                        ));
                    }
                }
            }

            // Historical path
            let key = record.paid_to.trim().to_lowercase();
            let Some(top) = history.get(&key).and_then(|obs| Self::top_pair(obs)) else {
                continue;
            };
            let (top_category, top_subcategory) = (top.0.as_str(), top.1.as_str());

            if category.is_empty() && subcategory.is_empty() {
                recommendations.push(Self::recommend(
                    record,
                    RecordField::Category,
                    top_category,
                    0.7,
                    "from history",
                ));
                if !top_subcategory.is_empty() {
                    recommendations.push(Self::recommend(
                        record,
                        RecordField::Subcategory,
                        top_subcategory,
                        0.65,
                        "from history",
                    ));
                }
            } else if subcategory.is_empty()
                && category.eq_ignore_ascii_case(top_category)
                && !top_subcategory.is_empty()
            {
                recommendations.push(Self::recommend(
                    record,
                    RecordField::Subcategory,
                    top_subcategory,
                    0.65,
                    "from history",
                ));
            }
        }

        recommendations
    }
}

// ============================================================================
// TESTS
// ============================================================================

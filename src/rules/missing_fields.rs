// Missing-field completer.
// Fills empty category / subcategory / transaction-type fields from what
// this counterparty looked like historically, falling back to the static
// keyword table for category and subcategory.

use std::collections::HashMap;

use crate::record::{Record, RecordField, RecordKind};
use crate::recommendation::{Recommendation, RecommendationKind};
use crate::rules::{expenses, keyword_match, keyword_match_in_category, RecommendationRule};

// ============================================================================
// FREQUENCY TABLES
// ============================================================================

/// Observed values per key, in record-iteration order. The mode breaks ties
/// by first occurrence, so insertion order is load-bearing.
#[derive(Debug, Default)]
struct FrequencyTable {
    values: HashMap<String, Vec<String>>,
}

impl FrequencyTable {
    fn observe(&mut self, key: String, value: &str) {
        if value.is_empty() {
            return;
        }
        self.values.entry(key).or_default().push(value.to_string());
    }

    /// Most frequent value for `key`; ties go to the value seen first.
    fn mode(&self, key: &str) -> Option<&str> {
        let observed = self.values.get(key)?;

        let mut best: Option<(&str, usize)> = None;
        for (index, value) in observed.iter().enumerate() {
            if observed[..index].iter().any(|v| v == value) {
                continue; // already counted at its first occurrence
            }
            let count = observed.iter().filter(|v| *v == value).count();
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((value.as_str(), count)),
            }
        }

        best.map(|(value, _)| value)
    }
}

fn counterparty_key(record: &Record) -> String {
    record.paid_to.trim().to_lowercase()
}

fn scoped_key(record: &Record, category: &str) -> String {
    format!("{}\u{1f}{}", counterparty_key(record), category.trim().to_lowercase())
}

// ============================================================================
// MISSING FIELD RULE
// ============================================================================

pub struct MissingFieldRule;

impl MissingFieldRule {
    pub fn new() -> Self {
        MissingFieldRule
    }

    /// Build the three lookup tables from the non-deleted history.
    fn build_tables(all: &[Record]) -> (FrequencyTable, FrequencyTable, FrequencyTable) {
        let mut category_by_name = FrequencyTable::default();
        let mut subcategory_by_name_category = FrequencyTable::default();
        let mut tx_type_by_name = FrequencyTable::default();

        for record in all {
            if !record.is_active() || record.kind != RecordKind::Expense {
                continue;
            }
            let key = counterparty_key(record);
            if key.is_empty() {
                continue;
            }

            category_by_name.observe(key.clone(), record.category.trim());
            if !record.category.trim().is_empty() {
                subcategory_by_name_category.observe(
                    scoped_key(record, &record.category),
                    record.subcategory.trim(),
                );
            }
            tx_type_by_name.observe(key, record.transaction_type.trim());
        }

        (category_by_name, subcategory_by_name_category, tx_type_by_name)
    }

    fn recommend(
        record: &Record,
        field: RecordField,
        suggested: &str,
        confidence: f64,
        source: &str,
    ) -> Recommendation {
        Recommendation::new(
            RecommendationKind::MissingField,
            vec![record.id.clone()],
            Some(field),
            String::new(),
            suggested.to_string(),
            confidence,
            format!(
                "Fill missing {} for \"{}\" with \"{}\" ({})",
                field.as_str(),
                record.paid_to,
                suggested,
                source
            ),
        )
    }
}

impl Default for MissingFieldRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationRule for MissingFieldRule {
    fn name(&self) -> &'static str {
        "missing-fields"
    }

    fn generate(&self, active: &[&Record], all: &[Record]) -> Vec<Recommendation> {
        let (category_table, subcategory_table, tx_type_table) = Self::build_tables(all);

        let mut recommendations = Vec::new();
        for record in expenses(active) {
            let key = counterparty_key(record);
            let category = record.category.trim();
            let subcategory = record.subcategory.trim();
            let tx_type = record.transaction_type.trim();

            if category.is_empty() {
                if let Some(mode) = category_table.mode(&key) {
                    recommendations.push(Self::recommend(
                        record,
                        RecordField::Category,
                        mode,
                        0.65,
                        "from history",
                    ));
                } else if let Some(rule) = keyword_match(record) {
                    recommendations.push(Self::recommend(
                        record,
                        RecordField::Category,
                        rule.category,
                        0.8,
                        "keyword match",
                    ));
                }
            } else if subcategory.is_empty() {
                let scoped = scoped_key(record, category);
                if let Some(mode) = subcategory_table.mode(&scoped) {
                    recommendations.push(Self::recommend(
                        record,
                        RecordField::Subcategory,
                        mode,
                        0.6,
                        "from history",
                    ));
                } else if let Some(rule) = keyword_match_in_category(record, category) {
                    recommendations.push(Self::recommend(
                        record,
                        RecordField::Subcategory,
                        rule.subcategory,
                        0.75,
                        "keyword match",
                    ));
                }
            }

            if tx_type.is_empty() {
                if let Some(mode) = tx_type_table.mode(&key) {
                    recommendations.push(Self::recommend(
                        record,
                        RecordField::TransactionType,
                        mode,
                        0.6,
                        "from history",
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

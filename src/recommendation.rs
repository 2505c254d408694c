// Recommendation model + identity key.
// A recommendation's `id` is for the UI; its *identity* across engine runs
// is the derived tuple (kind, sorted target ids, field, original value).

use serde::{Deserialize, Serialize};

use crate::record::RecordField;

// ============================================================================
// KIND & STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationKind {
    /// Two records that look like the same real-world transaction
    Duplicate,

    /// Counterparty-name variant that should fold into a canonical spelling
    MerchantNormalization,

    /// Empty field with a suggested fill (history or keyword based)
    MissingField,

    /// Category/subcategory suggestion independent of missing-ness
    Classification,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Duplicate => "duplicate",
            RecommendationKind::MerchantNormalization => "merchant-normalization",
            RecommendationKind::MissingField => "missing-field",
            RecommendationKind::Classification => "classification",
        }
    }
}

/// Pending -> Applied or Pending -> Ignored; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationStatus {
    Pending,
    Applied,
    Ignored,
}

impl RecommendationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecommendationStatus::Pending)
    }
}

// ============================================================================
// RECOMMENDATION
// ============================================================================

/// The action token a Duplicate recommendation suggests. Not a field value:
/// applying it soft-deletes the second record of the pair.
pub const DUPLICATE_ACTION_DELETE: &str = "delete-duplicate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,

    pub kind: RecommendationKind,

    /// Targets. Exactly two ids (sorted) for Duplicate, exactly one for the
    /// other kinds. May shrink as referenced records are hard-deleted.
    pub transaction_ids: Vec<String>,

    /// Which record field this would change; absent for Duplicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_field: Option<RecordField>,

    pub original_value: String,

    /// Proposed value; for Duplicate this is an action token.
    pub suggested_value: String,

    /// Heuristic quality score in [0, 1], not a calibrated probability.
    pub confidence: f64,

    /// Render-only explanation, never used in logic.
    pub description: String,

    pub status: RecommendationStatus,
}

impl Recommendation {
    /// Fresh pending recommendation with a new id. Duplicate target lists
    /// must be sorted by the caller before construction.
    pub fn new(
        kind: RecommendationKind,
        transaction_ids: Vec<String>,
        affected_field: Option<RecordField>,
        original_value: String,
        suggested_value: String,
        confidence: f64,
        description: String,
    ) -> Self {
        Recommendation {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            transaction_ids,
            affected_field,
            original_value,
            suggested_value,
            confidence,
            description,
            status: RecommendationStatus::Pending,
        }
    }

    /// Canonical, hashable identity key. Two recommendations with equal keys
    /// represent the same proposed edit across engine runs, whatever their
    /// ids are. The original value participates for every kind except
    /// Duplicate (where the pair of ids already pins the edit down).
    pub fn identity_key(&self) -> String {
        let mut ids = self.transaction_ids.clone();
        ids.sort();

        let field = self.affected_field.map(|f| f.as_str()).unwrap_or("");
        let original = match self.kind {
            RecommendationKind::Duplicate => "",
            _ => self.original_value.as_str(),
        };

        format!("{}|{}|{}|{}", self.kind.as_str(), ids.join(","), field, original)
    }
}

// ============================================================================
// TESTS
// ============================================================================

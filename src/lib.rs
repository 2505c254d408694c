// Ledger Advisor - Core Library
// Record model, rule modules, reconciliation engine and session surface

pub mod engine;
pub mod record;
pub mod recommendation;
pub mod rules;
pub mod session;
pub mod similarity;
pub mod store;

// Re-export commonly used types
pub use engine::RecommendationEngine;
pub use record::{
    coerce_amount, coerce_date, normalize_row, OriginalValues, RawRow, Record, RecordField,
    RecordFlags, RecordKind,
};
pub use recommendation::{
    Recommendation, RecommendationKind, RecommendationStatus, DUPLICATE_ACTION_DELETE,
};
pub use rules::{
    default_rules, keyword_match, keyword_match_in_category, ClassificationRule, DuplicateRule,
    KeywordRule, MerchantNormalizationRule, MissingFieldRule, RecommendationRule, KEYWORD_RULES,
};
pub use session::AdvisorSession;
pub use similarity::{levenshtein_distance, normalize, normalized_edit_similarity};
pub use store::RecordStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

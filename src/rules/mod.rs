// Rule modules - each one a pure function of the current record set.
// The engine runs them in a fixed order; adding a rule means adding an entry
// to `default_rules`, the reconciliation algorithm never changes.

use crate::record::{Record, RecordKind};
use crate::recommendation::Recommendation;

pub mod classification;
pub mod duplicates;
pub mod merchant;
pub mod missing_fields;

pub use classification::ClassificationRule;
pub use duplicates::DuplicateRule;
pub use merchant::MerchantNormalizationRule;
pub use missing_fields::MissingFieldRule;

// ============================================================================
// RULE TRAIT
// ============================================================================

/// A recommendation rule. `active` is the non-deleted view the rule scans;
/// `all` is the full record set (soft-deleted included) for history-based
/// statistics. Rules are total: they never fail, they return an empty list
/// when there is nothing to suggest.
pub trait RecommendationRule {
    fn name(&self) -> &'static str;

    fn generate(&self, active: &[&Record], all: &[Record]) -> Vec<Recommendation>;
}

/// The default rule set, in execution order.
pub fn default_rules() -> Vec<Box<dyn RecommendationRule>> {
    vec![
        Box::new(DuplicateRule::new()),
        Box::new(MerchantNormalizationRule::new()),
        Box::new(MissingFieldRule::new()),
        Box::new(ClassificationRule::new()),
    ]
}

// ============================================================================
// KEYWORD TABLE
// ============================================================================

/// Static keyword-to-category rule. Keywords are lowercase substrings
/// matched against counterparty name and description; first rule wins.
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub category: &'static str,
    /// Empty when the rule only pins down a category
    pub subcategory: &'static str,
}

pub const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule { keywords: &["starbucks", "coffee", "cafe"], category: "Dining", subcategory: "Coffee" },
    KeywordRule { keywords: &["restaurant", "pizza", "burger", "mcdonald", "chipotle"], category: "Dining", subcategory: "Restaurants" },
    KeywordRule { keywords: &["grocery", "supermarket", "whole foods", "trader joe", "kroger", "safeway"], category: "Groceries", subcategory: "" },
    KeywordRule { keywords: &["uber", "lyft", "taxi"], category: "Transportation", subcategory: "Rideshare" },
    KeywordRule { keywords: &["parking", "toll"], category: "Transportation", subcategory: "Parking" },
    KeywordRule { keywords: &["airline", "delta air", "united air", "flight"], category: "Travel", subcategory: "Flights" },
    KeywordRule { keywords: &["hotel", "airbnb", "motel"], category: "Travel", subcategory: "Lodging" },
    KeywordRule { keywords: &["netflix", "spotify", "hulu", "disney+"], category: "Entertainment", subcategory: "Streaming" },
    KeywordRule { keywords: &["cinema", "movie"], category: "Entertainment", subcategory: "Movies" },
    KeywordRule { keywords: &["amazon", "amzn"], category: "Shopping", subcategory: "Online" },
    KeywordRule { keywords: &["walmart", "costco", "target"], category: "Shopping", subcategory: "" },
    KeywordRule { keywords: &["pharmacy", "cvs", "walgreens"], category: "Health", subcategory: "Pharmacy" },
    KeywordRule { keywords: &["clinic", "dental", "hospital"], category: "Health", subcategory: "Medical" },
    KeywordRule { keywords: &["gym", "fitness", "yoga"], category: "Health", subcategory: "Fitness" },
    KeywordRule { keywords: &["rent", "landlord"], category: "Housing", subcategory: "Rent" },
    KeywordRule { keywords: &["internet", "comcast", "verizon"], category: "Utilities", subcategory: "Internet" },
    KeywordRule { keywords: &["electric", "water bill"], category: "Utilities", subcategory: "" },
    KeywordRule { keywords: &["insurance"], category: "Insurance", subcategory: "" },
    KeywordRule { keywords: &["tuition", "udemy", "coursera"], category: "Education", subcategory: "" },
];

/// First keyword rule matching the record's counterparty name or
/// description (case-insensitive substring).
pub fn keyword_match(record: &Record) -> Option<&'static KeywordRule> {
    let haystack = format!("{} {}", record.paid_to, record.description).to_lowercase();
    KEYWORD_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| haystack.contains(k)))
}

/// First keyword rule matching the record that also belongs to `category`
/// and carries a subcategory. Used for subcategory completion.
pub fn keyword_match_in_category(record: &Record, category: &str) -> Option<&'static KeywordRule> {
    let haystack = format!("{} {}", record.paid_to, record.description).to_lowercase();
    KEYWORD_RULES.iter().find(|rule| {
        rule.category.eq_ignore_ascii_case(category)
            && !rule.subcategory.is_empty()
            && rule.keywords.iter().any(|k| haystack.contains(k))
    })
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Only Expense records are recommendation-bearing.
pub(crate) fn expenses<'a>(records: &[&'a Record]) -> Vec<&'a Record> {
    records
        .iter()
        .copied()
        .filter(|r| r.kind == RecordKind::Expense)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

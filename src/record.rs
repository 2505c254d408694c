// Canonical record model + row normalization.
// Raw imported rows are coerced here into typed records with stable UUIDs;
// everything downstream (rules, engine, session) works on these.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// RECORD KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// Money out (the only kind the rule modules scan)
    Expense,

    /// Money in
    Income,

    /// Investment or transfer event
    InvestmentTransfer,
}

// ============================================================================
// RECORD FIELD
// ============================================================================

/// The fields a recommendation may target. Fixed vocabulary: the applier and
/// the identity key both depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    PaidTo,
    Category,
    Subcategory,
    TransactionType,
}

impl RecordField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::PaidTo => "paid_to",
            RecordField::Category => "category",
            RecordField::Subcategory => "subcategory",
            RecordField::TransactionType => "transaction_type",
        }
    }
}

// ============================================================================
// FLAGS
// ============================================================================

/// Fixed-shape flag set. `is_deleted` is the soft-delete marker; the rest
/// are provenance flags set when a recommendation of that kind is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFlags {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub merchant_normalized: bool,

    #[serde(default)]
    pub category_suggested: bool,

    #[serde(default)]
    pub fields_filled: bool,

    #[serde(default)]
    pub is_duplicate_candidate: bool,
}

// ============================================================================
// ORIGINAL VALUES
// ============================================================================

/// Lazy snapshot of pre-recommendation field values. Each slot is written at
/// most once: the first applied recommendation that overwrites the field
/// captures the original import value, later applies leave it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
}

impl OriginalValues {
    /// Capture `value` for `field` unless a snapshot already exists.
    pub fn snapshot_once(&mut self, field: RecordField, value: &str) {
        let slot = match field {
            RecordField::PaidTo => &mut self.paid_to,
            RecordField::Category => &mut self.category,
            RecordField::Subcategory => &mut self.subcategory,
            RecordField::TransactionType => &mut self.transaction_type,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    pub fn get(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::PaidTo => self.paid_to.as_deref(),
            RecordField::Category => self.category.as_deref(),
            RecordField::Subcategory => self.subcategory.as_deref(),
            RecordField::TransactionType => self.transaction_type.as_deref(),
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Canonical financial record.
///
/// `id` is the only identity: assigned once at normalization time, never
/// reused, never compared by value. Amounts are non-negative with cents
/// precision semantics; dates are `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    pub kind: RecordKind,

    pub date: String,

    /// Counterparty name
    pub paid_to: String,

    pub amount: f64,

    pub category: String,

    pub subcategory: String,

    pub description: String,

    /// Expense only; empty for other kinds
    #[serde(default)]
    pub transaction_type: String,

    #[serde(default)]
    pub original_values: OriginalValues,

    #[serde(default)]
    pub flags: RecordFlags,

    /// Original source-row reference, cosmetic only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_num: Option<u64>,
}

impl Record {
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::PaidTo => &self.paid_to,
            RecordField::Category => &self.category,
            RecordField::Subcategory => &self.subcategory,
            RecordField::TransactionType => &self.transaction_type,
        }
    }

    pub fn set_field(&mut self, field: RecordField, value: &str) {
        let slot = match field {
            RecordField::PaidTo => &mut self.paid_to,
            RecordField::Category => &mut self.category,
            RecordField::Subcategory => &mut self.subcategory,
            RecordField::TransactionType => &mut self.transaction_type,
        };
        *slot = value.to_string();
    }

    pub fn is_active(&self) -> bool {
        !self.flags.is_deleted
    }
}

// ============================================================================
// RAW ROW + NORMALIZATION
// ============================================================================

/// A raw imported row, as it comes off a spreadsheet export. All fields are
/// strings; coercion happens in `normalize_row`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub paid_to: String,

    #[serde(default)]
    pub amount: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub subcategory: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub transaction_type: String,

    #[serde(default)]
    pub row_num: Option<u64>,
}

/// Convert a raw row into a canonical record: trim every string field,
/// coerce amount and date, assign a fresh id, initialize empty flags.
/// Never fails; malformed values fall back to defaults (zero amount,
/// best-effort date passthrough).
pub fn normalize_row(raw: &RawRow, kind: RecordKind) -> Record {
    Record {
        id: uuid::Uuid::new_v4().to_string(),
        kind,
        date: coerce_date(&raw.date),
        paid_to: raw.paid_to.trim().to_string(),
        amount: coerce_amount(&raw.amount),
        category: raw.category.trim().to_string(),
        subcategory: raw.subcategory.trim().to_string(),
        description: raw.description.trim().to_string(),
        transaction_type: match kind {
            RecordKind::Expense => raw.transaction_type.trim().to_string(),
            _ => String::new(),
        },
        original_values: OriginalValues::default(),
        flags: RecordFlags::default(),
        row_num: raw.row_num,
    }
}

/// Parse an amount string: strips currency symbols, commas and whitespace,
/// takes the absolute value. Defaults to 0.0 when nothing parses.
pub fn coerce_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    cleaned.parse::<f64>().map(f64::abs).unwrap_or(0.0)
}

/// Coerce a date string to `YYYY-MM-DD`. Tries the common spreadsheet
/// formats; unparseable input passes through trimmed (the core never
/// rejects a record over its date).
pub fn coerce_date(raw: &str) -> String {
    let trimmed = raw.trim();

    let formats = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];
    for fmt in &formats {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    trimmed.to_string()
}

// ============================================================================
// TESTS
// ============================================================================

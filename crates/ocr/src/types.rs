use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Structured fields recovered from receipt text.
///
/// `None` means the pattern did not match; it is never collapsed into an
/// empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedFields {
    /// Keyword plus trailing context, e.g. `"MART STORE #12"`. Not a clean name.
    pub merchant: Option<String>,
    /// Date token exactly as it appears, unvalidated.
    pub date: Option<String>,
    /// Amount with two fraction digits, `.` or `,` separated.
    pub total: Option<String>,
    pub items: Vec<String>,
}

impl ExtractedFields {
    /// The total as a decimal, treating `,` as the fraction separator too.
    pub fn total_amount(&self) -> Option<Decimal> {
        let raw = self.total.as_deref()?;
        Decimal::from_str(&raw.replace(',', ".")).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.merchant.is_none() && self.date.is_none() && self.total.is_none() && self.items.is_empty()
    }
}

/// The result of scanning one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Text handed to the field parser, or the warning when recognition failed.
    pub text: String,
    /// Human-readable summary; the warning itself on failure.
    pub report: String,
    /// Absent when recognition failed.
    pub fields: Option<ExtractedFields>,
    /// Parsed `fields.total`, serialized as a decimal string.
    pub total_amount: Option<Decimal>,
}

impl ScanOutcome {
    pub fn is_failure(&self) -> bool {
        self.fields.is_none()
    }
}

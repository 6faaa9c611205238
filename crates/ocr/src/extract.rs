use std::sync::OnceLock;

use regex::Regex;

use crate::report;
use crate::rules::{self, FieldPatterns, RuleError};
use crate::types::ExtractedFields;

fn re_non_ascii() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^\x00-\x7F]+").expect("invalid regex"))
}

/// Pattern-based extraction of merchant, date, total and line items.
#[derive(Debug, Clone)]
pub struct FieldParser {
    merchant: Regex,
    date: Regex,
    total: Regex,
    item: Regex,
}

impl FieldParser {
    pub fn new(patterns: &FieldPatterns) -> Result<Self, RuleError> {
        Ok(Self {
            merchant: rules::compile("merchant", &patterns.merchant)?,
            date: rules::compile_with_group("date", &patterns.date, "date")?,
            total: rules::compile_with_group("total", &patterns.total, "amount")?,
            item: rules::compile("item", &patterns.item)?,
        })
    }

    /// Extract fields and render the report in one call.
    pub fn parse(&self, text: &str) -> (String, ExtractedFields) {
        let fields = self.extract(text);
        (report::render(&fields), fields)
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        let text = normalize(text);

        ExtractedFields {
            merchant: self.merchant.find(&text).map(|m| m.as_str().to_string()),
            date: capture(&self.date, &text, "date"),
            total: capture(&self.total, &text, "amount"),
            items: split_lines(&text)
                .filter(|l| self.item.is_match(l) && !self.total.is_match(l))
                .map(str::to_string)
                .collect(),
        }
    }
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new(&FieldPatterns::default()).expect("built-in field patterns are valid")
    }
}

/// Non-ASCII runs become one space, then a single pass folds `"  "` into
/// `" "`. Longer runs of spaces are only partially collapsed.
fn normalize(text: &str) -> String {
    re_non_ascii().replace_all(text, " ").replace("  ", " ")
}

/// Trimmed, non-empty lines. A bare `\r` also ends a line.
pub(crate) fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', '\r']).map(str::trim).filter(|l| !l.is_empty())
}

fn capture(re: &Regex, text: &str, group: &str) -> Option<String> {
    re.captures(text)?.name(group).map(|m| m.as_str().to_string())
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid pattern for '{field}': {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("Pattern for '{field}' must define the named group '{group}'")]
    MissingGroup {
        field: &'static str,
        group: &'static str,
    },
}

/// A literal find-and-replace applied to raw recognizer output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Known misreads, in application order. Later entries see the output of
/// earlier ones: `S -> $` runs before `EXPIRES` and `CASUNNGE` are checked.
const DEFAULT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Toial", "Total"),
    ("S", "$"),
    ("Am", ""),
    ("EXPIRES", ""),
    ("PAYMENT", ""),
    ("CAED", "CARD"),
    ("GIei", "GIFT"),
    ("CASUNNGE", "CASH"),
];

/// Lines made only of digits, whitespace and `/ . , $`.
pub const DEFAULT_NOISE_LINE: &str = r"^[\d\s/.,$]+$";

pub const DEFAULT_MERCHANT: &str =
    r"(?i)(store|shop|market|mart|supermarket|inc|co|ltd|llc|receipt|invoice)\s?.{0,60}";
pub const DEFAULT_DATE: &str =
    r"(?P<date>\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b)";
pub const DEFAULT_TOTAL: &str =
    r"(?i)(total|amount\s+due|balance\s+due|grand\s+total)[^\d]*(?P<amount>\d+[.,]\d{2})";
pub const DEFAULT_ITEM: &str = r"[A-Za-z]{2,}.*\d+[.,]\d{2}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningRules {
    pub substitutions: Vec<Substitution>,
    pub noise_line: String,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            substitutions: DEFAULT_SUBSTITUTIONS
                .iter()
                .map(|(from, to)| Substitution::new(*from, *to))
                .collect(),
            noise_line: DEFAULT_NOISE_LINE.to_string(),
        }
    }
}

/// Extraction patterns. `date` must capture `(?P<date>…)` and `total` must
/// capture `(?P<amount>…)`; `merchant` uses the whole match and `item` is
/// tested per line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldPatterns {
    pub merchant: String,
    pub date: String,
    pub total: String,
    pub item: String,
}

impl Default for FieldPatterns {
    fn default() -> Self {
        Self {
            merchant: DEFAULT_MERCHANT.to_string(),
            date: DEFAULT_DATE.to_string(),
            total: DEFAULT_TOTAL.to_string(),
            item: DEFAULT_ITEM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleSet {
    pub cleaning: CleaningRules,
    pub fields: FieldPatterns,
}

impl RuleSet {
    /// Parse a rules file. Sections or keys left out keep their defaults;
    /// a `substitutions` list, when present, replaces the built-in table.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        Ok(toml::from_str(toml_content)?)
    }
}

pub(crate) fn compile(field: &'static str, pattern: &str) -> Result<regex::Regex, RuleError> {
    regex::Regex::new(pattern).map_err(|source| RuleError::Pattern { field, source })
}

pub(crate) fn compile_with_group(
    field: &'static str,
    pattern: &str,
    group: &'static str,
) -> Result<regex::Regex, RuleError> {
    let re = compile(field, pattern)?;
    if !re.capture_names().flatten().any(|name| name == group) {
        return Err(RuleError::MissingGroup { field, group });
    }
    Ok(re)
}

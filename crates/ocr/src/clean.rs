use regex::Regex;

use crate::extract::split_lines;
use crate::rules::{self, CleaningRules, RuleError, Substitution};

/// Corrects known misreads and drops lines with no alphabetic content.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    substitutions: Vec<Substitution>,
    noise_line: Regex,
}

impl TextCleaner {
    pub fn new(rules: &CleaningRules) -> Result<Self, RuleError> {
        Ok(Self {
            substitutions: rules.substitutions.clone(),
            noise_line: rules::compile("noise_line", &rules.noise_line)?,
        })
    }

    pub fn clean(&self, raw_text: &str) -> String {
        // Substitutions must run to completion before filtering: a rule that
        // strips a label can leave a numeric-only line behind.
        let substituted = self
            .substitutions
            .iter()
            .fold(raw_text.to_string(), |text, s| text.replace(&s.from, &s.to));

        split_lines(&substituted)
            .filter(|l| !self.noise_line.is_match(l))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new(&CleaningRules::default()).expect("built-in cleaning rules are valid")
    }
}

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::AssistError;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_lone_i, r"\bi\b");
re!(re_dont, r"\bdont\b");
re!(re_cant, r"\bcant\b");
re!(re_sorry, r"\bsorry\b");
re!(re_please, r"\bplease\b");

const CONCISE_WORD_LIMIT: usize = 100;
const PERSUASIVE_CLOSING: &str = "\n\nI truly believe this will make a positive impact!";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditGoal {
    Concise,
    Grammar,
    Tone,
    Persuasive,
    Simplify,
}

/// Rewrite `text` toward the chosen goal.
pub fn editorial_support(text: &str, goal: EditGoal) -> Result<String, AssistError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AssistError::EmptyInput);
    }

    let improved = match goal {
        EditGoal::Concise => {
            let words: Vec<&str> = text.split_whitespace().collect();
            let mut out = words
                .iter()
                .take(CONCISE_WORD_LIMIT)
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            if words.len() > CONCISE_WORD_LIMIT {
                out.push_str("...");
            }
            out
        }
        EditGoal::Grammar => {
            let out = re_lone_i().replace_all(text, "I");
            let out = re_dont().replace_all(&out, "don't");
            re_cant().replace_all(&out, "can't").into_owned()
        }
        EditGoal::Tone => {
            let out = re_sorry().replace_all(text, "I apologize");
            re_please().replace_all(&out, "kindly").into_owned()
        }
        EditGoal::Persuasive => format!("{text}{PERSUASIVE_CLOSING}"),
        EditGoal::Simplify => text.to_string(),
    };

    Ok(improved)
}

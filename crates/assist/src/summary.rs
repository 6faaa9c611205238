use serde::{Deserialize, Serialize};

use crate::AssistError;

const SENTENCE_BREAK: &str = ". ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLength {
    /// One to two lines.
    VeryShort,
    /// Three to five lines.
    #[default]
    Short,
    /// A paragraph.
    Detailed,
}

impl SummaryLength {
    pub fn max_sentences(self) -> usize {
        match self {
            SummaryLength::VeryShort => 2,
            SummaryLength::Short => 5,
            SummaryLength::Detailed => 10,
        }
    }
}

/// Extractive summary: the leading sentences, with `...` when any were cut.
pub fn summarize(text: &str, length: SummaryLength) -> Result<String, AssistError> {
    if text.trim().is_empty() {
        return Err(AssistError::EmptyInput);
    }

    let sentences: Vec<&str> = text.split(SENTENCE_BREAK).collect();
    let keep = length.max_sentences().min(sentences.len());
    let summary = sentences[..keep].join(SENTENCE_BREAK);
    let ellipsis = if sentences.len() > keep { "..." } else { "" };

    Ok(format!("{}{ellipsis}", summary.trim()))
}

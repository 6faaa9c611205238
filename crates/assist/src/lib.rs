pub mod document;
pub mod edit;
pub mod email;
pub mod summary;

pub use document::{extract_text, DocumentError, DocumentKind};
pub use edit::{editorial_support, EditGoal};
pub use email::{draft_email, EmailRequest, Tone};
pub use summary::{summarize, SummaryLength};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssistError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("No text provided")]
    EmptyInput,
}

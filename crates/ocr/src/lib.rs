pub mod clean;
pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod report;
pub mod rules;
pub mod types;

pub use clean::TextCleaner;
pub use extract::FieldParser;
pub use pipeline::{PipelineError, ReceiptPipeline, WARNING_MARKER};
pub use preprocess::{preprocess, preprocess_bytes, preprocess_file, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
pub use rules::{CleaningRules, FieldPatterns, RuleError, RuleSet, Substitution};
pub use types::{ExtractedFields, ScanOutcome};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;

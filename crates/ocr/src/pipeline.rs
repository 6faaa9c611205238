use image::{DynamicImage, GrayImage};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clean::TextCleaner;
use crate::extract::FieldParser;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::rules::{RuleError, RuleSet};
use crate::types::ScanOutcome;

/// Prefix of every recovered recognition failure.
pub const WARNING_MARKER: &str = "⚠️";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
}

/// Orchestrates: preprocess → recognize → (clean) → parse → render.
///
/// The recognizer is built once by the caller and reused for every scan.
/// Cleaning is off unless enabled with [`ReceiptPipeline::with_cleaning`].
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    cleaner: TextCleaner,
    parser: FieldParser,
    cleaning: bool,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            cleaner: TextCleaner::default(),
            parser: FieldParser::default(),
            cleaning: false,
        }
    }

    pub fn with_rules(recognizer: R, rules: &RuleSet) -> Result<Self, RuleError> {
        Ok(Self {
            recognizer,
            cleaner: TextCleaner::new(&rules.cleaning)?,
            parser: FieldParser::new(&rules.fields)?,
            cleaning: false,
        })
    }

    pub fn with_cleaning(mut self, enabled: bool) -> Self {
        self.cleaning = enabled;
        self
    }

    pub fn cleaning_enabled(&self) -> bool {
        self.cleaning
    }

    /// Process a file on disk.
    pub fn scan_file(&self, path: &Path) -> Result<ScanOutcome, PipelineError> {
        Ok(self.scan_normalized(&preprocess::preprocess_file(path)?))
    }

    /// Process raw upload bytes.
    pub fn scan_bytes(&self, data: &[u8]) -> Result<ScanOutcome, PipelineError> {
        Ok(self.scan_normalized(&preprocess::preprocess_bytes(data)?))
    }

    /// Process an already decoded image. Never fails: recognition problems
    /// come back as a warning-only outcome.
    pub fn scan_image(&self, img: &DynamicImage) -> ScanOutcome {
        self.scan_normalized(&preprocess::preprocess(img))
    }

    fn scan_normalized(&self, normalized: &GrayImage) -> ScanOutcome {
        let started = Instant::now();
        debug!(width = normalized.width(), height = normalized.height(), "Image preprocessed");

        let raw_text = match self.recognize(normalized) {
            Ok(text) => text,
            Err(e) => {
                warn!("Receipt recognition failed: {e}");
                let warning = format!("{WARNING_MARKER} OCR failed: {e}");
                return ScanOutcome {
                    text: warning.clone(),
                    report: warning,
                    fields: None,
                    total_amount: None,
                };
            }
        };

        let text = if self.cleaning { self.cleaner.clean(&raw_text) } else { raw_text };
        let (report, fields) = self.parser.parse(&text);
        debug!(
            merchant = fields.merchant.is_some(),
            date = fields.date.is_some(),
            total = fields.total.is_some(),
            items = fields.items.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Receipt fields extracted"
        );

        let total_amount = fields.total_amount();
        ScanOutcome { text, report, fields: Some(fields), total_amount }
    }

    fn recognize(&self, img: &GrayImage) -> Result<String, OcrError> {
        let fragments = self.recognizer.recognize(img)?;
        let text = fragments.join("\n").trim().to_string();
        if text.is_empty() {
            return Err(OcrError::NoText);
        }
        Ok(text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

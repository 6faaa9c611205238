use image::GrayImage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("no text recognized")]
    NoText,
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
///
/// Implementations receive the preprocessed single-channel image and return
/// text fragments in reading order, one logical line or paragraph each.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, OcrError> {
        (**self).recognize(image)
    }
}

impl<T: OcrBackend + ?Sized> OcrBackend for Arc<T> {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, OcrError> {
        (**self).recognize(image)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set fragments, one per line of the given text.
pub struct MockRecognizer {
    pub fragments: Vec<String>,
}

impl MockRecognizer {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self { fragments: text.as_ref().lines().map(str::to_string).collect() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &GrayImage) -> Result<Vec<String>, OcrError> {
        Ok(self.fragments.clone())
    }
}

/// Stand-in used when no engine was compiled in.
pub struct UnavailableRecognizer;

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _image: &GrayImage) -> Result<Vec<String>, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{GrayImage, OcrBackend, OcrError};
    use crate::preprocess::encode_png;
    use leptess::LepTess;
    use std::sync::Mutex;

    /// One loaded engine, shared by every scan. Calls are serialized.
    pub struct TesseractRecognizer {
        engine: Mutex<LepTess>,
    }

    impl TesseractRecognizer {
        /// Load the trained data for `lang`. Fails when the data path or
        /// language pack is missing.
        pub fn new(data_path: Option<&str>, lang: &str) -> Result<Self, OcrError> {
            let engine = LepTess::new(data_path, lang).map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(Self { engine: Mutex::new(engine) })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, OcrError> {
            let png = encode_png(image).map_err(|e| OcrError::ImageEncode(e.to_string()))?;
            let mut lt = self
                .engine
                .lock()
                .map_err(|_| OcrError::Engine("engine lock poisoned".to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
            // Tesseract already groups words into lines; keep those as fragments.
            Ok(text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect())
        }
    }
}

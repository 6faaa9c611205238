use anyhow::{Context, Result};
use scrivener_ocr::{OcrBackend, ReceiptPipeline, RuleSet};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod config;
mod error;
mod routes;
mod telemetry;

use config::{OcrSection, ServerConfig};
use routes::{AppState, RouterOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load()?;
    telemetry::init(&config.logging);

    // ── Receipt pipeline ──────────────────────────────────────────────────────
    // Built once; every OCR request shares this recognizer handle.
    let (recognizer, engine) = build_recognizer(&config.ocr)?;
    let pipeline = build_pipeline(&config.ocr, recognizer)?;
    info!(engine, cleaning = pipeline.cleaning_enabled(), "Receipt pipeline ready");

    let state = AppState { pipeline: Arc::new(pipeline), engine };
    let app = routes::router(
        state,
        &RouterOptions {
            max_upload_bytes: config.server.max_upload_bytes,
            allowed_origins: config.server.allowed_origins.clone(),
        },
    );

    let listener = TcpListener::bind(config.server.bind.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Scrivener listening on {}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_pipeline(
    ocr: &OcrSection,
    recognizer: Box<dyn OcrBackend>,
) -> Result<ReceiptPipeline<Box<dyn OcrBackend>>> {
    let pipeline = match &ocr.rules_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
            let rules = RuleSet::from_toml(&raw)
                .with_context(|| format!("Invalid rules file: {}", path.display()))?;
            info!(path = %path.display(), "Loaded receipt rules");
            ReceiptPipeline::with_rules(recognizer, &rules)
                .with_context(|| format!("Invalid rules file: {}", path.display()))?
        }
        None => ReceiptPipeline::new(recognizer),
    };
    Ok(pipeline.with_cleaning(ocr.cleaning))
}

#[cfg(feature = "tesseract")]
fn build_recognizer(ocr: &OcrSection) -> Result<(Box<dyn OcrBackend>, &'static str)> {
    let recognizer = scrivener_ocr::TesseractRecognizer::new(ocr.tessdata_path.as_deref(), &ocr.language)
        .with_context(|| format!("Failed to load Tesseract language '{}'", ocr.language))?;
    Ok((Box::new(recognizer), "tesseract"))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(ocr: &OcrSection) -> Result<(Box<dyn OcrBackend>, &'static str)> {
    if ocr.tessdata_path.is_some() {
        warn!("ocr.tessdata_path is set but the server was built without the `tesseract` feature");
    }
    warn!("No OCR engine compiled in; image scans will return a warning");
    Ok((Box::new(scrivener_ocr::UnavailableRecognizer), "none"))
}

//! Plain-text extraction from uploaded documents (`.txt`, `.pdf`, `.docx`).

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported document type: {0}")]
    Unsupported(String),
    #[error("Text file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("DOCX XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "txt" => Some(DocumentKind::Text),
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

/// Extract trimmed text, choosing the reader by file extension.
pub fn extract_text(file_name: &str, data: &[u8]) -> Result<String, DocumentError> {
    let kind = DocumentKind::from_file_name(file_name)
        .ok_or_else(|| DocumentError::Unsupported(file_name.to_string()))?;

    let text = match kind {
        DocumentKind::Text => String::from_utf8(data.to_vec())?,
        DocumentKind::Pdf => pdf_text(data)?,
        DocumentKind::Docx => docx_text(data)?,
    };
    debug!(file_name, ?kind, chars = text.len(), "Document text extracted");
    Ok(text.trim().to_string())
}

fn pdf_text(data: &[u8]) -> Result<String, DocumentError> {
    // pdf_extract can panic on malformed input.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Pdf(e.to_string())),
        Err(_) => Err(DocumentError::Pdf("malformed PDF".to_string())),
    }
}

/// Paragraphs (`w:p`) become lines; `w:tab` and `w:br` map to `\t` and `\n`.
fn docx_text(data: &[u8]) -> Result<String, DocumentError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

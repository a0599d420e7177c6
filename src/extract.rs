//! Text extraction for uploaded documents.
//!
//! Only two kinds are accepted, chosen by file-name suffix:
//!   - `.txt`: decoded as UTF-8 and trimmed
//!   - `.pdf`: text pulled out by a [`PdfBackend`] and then normalized
//!
//! Everything else is rejected before the bytes are looked at.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, instrument};

static CRLF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
  #[error("Unsupported file type. Please upload a .txt or .pdf file.")]
  UnsupportedFileType { file_name: String },

  #[error("The text file appears to be empty.")]
  EmptyContent,

  #[error("Failed to read the text file. Please make sure it's a valid UTF-8 encoded text file.")]
  DecodeError,

  #[error("Failed to extract text from the PDF. Please ensure it contains searchable text.")]
  ExtractionFailed { reason: String },
}

/// Supported upload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  PlainText,
  Pdf,
}

impl FileKind {
  pub fn from_file_name(name: &str) -> Option<Self> {
    let lower = name.to_lowercase();
    if lower.ends_with(".txt") {
      Some(FileKind::PlainText)
    } else if lower.ends_with(".pdf") {
      Some(FileKind::Pdf)
    } else {
      None
    }
  }
}

/// Raw PDF text source. The default wraps `pdf-extract`; tests plug in fakes.
pub trait PdfBackend: Send + Sync {
  fn extract_text(&self, bytes: &[u8]) -> Result<String, String>;
}

/// `pdf-extract` over the whole document (no page limit).
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractBackend;

impl PdfBackend for PdfExtractBackend {
  fn extract_text(&self, bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed inputs.
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
      Ok(Ok(text)) => Ok(text),
      Ok(Err(e)) => Err(e.to_string()),
      Err(_) => Err("PDF parser panicked on malformed input".into()),
    }
  }
}

#[derive(Clone)]
pub struct Extractor {
  pdf: Arc<dyn PdfBackend>,
}

impl Default for Extractor {
  fn default() -> Self {
    Self::new(Arc::new(PdfExtractBackend))
  }
}

impl Extractor {
  pub fn new(pdf: Arc<dyn PdfBackend>) -> Self {
    Self { pdf }
  }

  /// Turn an uploaded file into non-empty plain text.
  #[instrument(level = "info", skip(self, bytes), fields(%file_name, size = bytes.len()))]
  pub fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    match FileKind::from_file_name(file_name) {
      Some(FileKind::PlainText) => extract_plain_text(bytes),
      Some(FileKind::Pdf) => self.extract_pdf(bytes),
      None => Err(ExtractionError::UnsupportedFileType { file_name: file_name.to_string() }),
    }
  }

  fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
    let raw = self.pdf.extract_text(bytes).map_err(|reason| {
      error!(target: "extract", error = %reason, "PDF backend failed");
      ExtractionError::ExtractionFailed { reason }
    })?;
    debug!(target: "extract", raw_len = raw.len(), "PDF text extracted");

    if raw.trim().is_empty() {
      return Err(ExtractionError::ExtractionFailed {
        reason: "Could not extract text from PDF. The file might be empty, scanned, or contain only images.".into(),
      });
    }
    let clean = normalize_pdf_text(&raw);
    if clean.is_empty() {
      return Err(ExtractionError::ExtractionFailed {
        reason: "The PDF appears to be empty after cleaning the text.".into(),
      });
    }
    Ok(clean)
  }
}

fn extract_plain_text(bytes: &[u8]) -> Result<String, ExtractionError> {
  let text = std::str::from_utf8(bytes).map_err(|e| {
    error!(target: "extract", error = %e, "Text file is not valid UTF-8");
    ExtractionError::DecodeError
  })?;
  let text = text.strip_prefix('\u{feff}').unwrap_or(text);
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Err(ExtractionError::EmptyContent);
  }
  Ok(trimmed.to_string())
}

/// Clean up PDF text: unify line endings, cap blank lines, collapse every
/// whitespace run to a single space, then trim.
pub fn normalize_pdf_text(raw: &str) -> String {
  let s = raw.trim();
  let s = CRLF.replace_all(s, "\n");
  let s = EXCESS_NEWLINES.replace_all(&s, "\n\n");
  let s = WHITESPACE_RUN.replace_all(&s, " ");
  s.trim().to_string()
}

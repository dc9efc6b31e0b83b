//! Text extraction from uploaded byte buffers
//!
//! Plain text decodes verbatim. For PDFs only the disguised-text best-effort
//! path is handled here: a buffer carrying the `%PDF` signature needs a real
//! PDF-to-text decoder, which is an external collaborator boundary.

use thiserror::Error;

/// Byte signature present in genuine PDF containers
const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Extraction failures, absorbed by the detached analysis task
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("PDF parsing requires a PDF decoder. Please upload as text file for now.")]
    UnsupportedExtraction,

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File is not valid UTF-8 text")]
    InvalidUtf8,
}

/// Convert an uploaded buffer plus declared MIME type into plain text
pub fn extract_text(buffer: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
    match mime_type {
        "text/plain" | "txt" => String::from_utf8(buffer.to_vec())
            .map_err(|_| ExtractionError::InvalidUtf8),
        "application/pdf" | "pdf" => extract_text_from_pdf(buffer),
        other => Err(ExtractionError::UnsupportedType(other.to_string())),
    }
}

/// Best-effort PDF path: genuine binary PDFs are refused, text files
/// disguised with a .pdf extension are returned as-is.
fn extract_text_from_pdf(buffer: &[u8]) -> Result<String, ExtractionError> {
    if buffer
        .windows(PDF_SIGNATURE.len())
        .any(|window| window == PDF_SIGNATURE)
    {
        return Err(ExtractionError::UnsupportedExtraction);
    }

    Ok(String::from_utf8_lossy(buffer).into_owned())
}

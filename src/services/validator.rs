//! Upload validation
//!
//! Pure predicate, evaluated before any record is created. First failing
//! rule wins: size limit, then type restriction.

use thiserror::Error;

/// Maximum accepted upload size (10 MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const ALLOWED_MIME_TYPES: [&str; 2] = ["application/pdf", "text/plain"];
const ALLOWED_EXTENSIONS: [&str; 2] = [".pdf", ".txt"];

/// Upload rejection reasons, surfaced as 400 at the request boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File size exceeds 10MB limit")]
    FileTooLarge,

    #[error("Only PDF and TXT files are supported")]
    UnsupportedType,
}

/// Validate an upload before processing begins
///
/// A file passes the type check if either its declared MIME type or its
/// filename extension (case-insensitive) is acceptable.
pub fn validate_dpr_file(
    filename: &str,
    size_bytes: u64,
    mime_type: &str,
) -> Result<(), ValidationError> {
    if size_bytes > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge);
    }

    let mime_ok = ALLOWED_MIME_TYPES.contains(&mime_type);
    let lowered = filename.to_lowercase();
    let extension_ok = ALLOWED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext));

    if !mime_ok && !extension_ok {
        return Err(ValidationError::UnsupportedType);
    }

    Ok(())
}

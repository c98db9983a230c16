//! Centralized validation of user-supplied inputs and parameters.
//!
//! The library panics on invariant violations; these checks let the CLI turn
//! bad input into errors before it reaches the library.

/// Largest segment id accepted from input files (DOS protection)
pub const MAX_SEGMENTS: u64 = 10_000_000;

/// Minimum size for an input file to be worth parsing
pub const MIN_FILE_CONTENT_SIZE: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Segment {0} exceeds the maximum of {MAX_SEGMENTS} segments")]
    TooManySegments(u64),
    #[error("Theta must lie in [0, 1), got {0}")]
    InvalidTheta(f64),
    #[error("Wiggle must lie in (0, 1], got {0}")]
    InvalidWiggle(f64),
    #[error("File content appears malformed or invalid")]
    InvalidFileContent,
}

/// Check a segment id against [`MAX_SEGMENTS`].
///
/// Returns an error message if the id is too large, None if it is acceptable.
///
/// # Example
/// ```
/// use ref_scaffold::utils::validation::check_segment_limit;
///
/// assert!(check_segment_limit(12).is_none());
/// assert!(check_segment_limit(u64::MAX).is_some());
/// ```
#[must_use]
pub fn check_segment_limit(id: u64) -> Option<String> {
    if id > MAX_SEGMENTS {
        Some(format!(
            "Segment {id} exceeds maximum of {MAX_SEGMENTS} segments"
        ))
    } else {
        None
    }
}

/// # Errors
///
/// Returns `ValidationError::InvalidTheta` unless `0 <= theta < 1`.
pub fn validate_theta(theta: f64) -> Result<f64, ValidationError> {
    if (0.0..1.0).contains(&theta) {
        Ok(theta)
    } else {
        Err(ValidationError::InvalidTheta(theta))
    }
}

/// # Errors
///
/// Returns `ValidationError::InvalidWiggle` unless `0 < wiggle <= 1`.
pub fn validate_wiggle(wiggle: f64) -> Result<f64, ValidationError> {
    if wiggle > 0.0 && wiggle <= 1.0 {
        Ok(wiggle)
    } else {
        Err(ValidationError::InvalidWiggle(wiggle))
    }
}

/// Validate that file content looks like text worth parsing
///
/// - Minimum size requirements
/// - Binary content detection
/// - UTF-8 validation
///
/// # Errors
///
/// Returns `ValidationError::InvalidFileContent` if the content is too small,
/// contains unexpected binary data, or fails UTF-8 validation.
pub fn validate_text_content(content: &[u8]) -> Result<&str, ValidationError> {
    if content.len() < MIN_FILE_CONTENT_SIZE {
        return Err(ValidationError::InvalidFileContent);
    }

    let non_printable_count = content
        .iter()
        .filter(|&&b| b < 9 || (b > 13 && b < 32) || b == 127)
        .count();

    // Allow up to 5% non-printable characters
    if content.len() > 100 && non_printable_count > content.len() / 20 {
        return Err(ValidationError::InvalidFileContent);
    }

    std::str::from_utf8(content).map_err(|_| ValidationError::InvalidFileContent)
}

// Input Validation
// Per-mode preconditions checked before any network call

use crate::models::AnalysisMode;
use thiserror::Error;

/// Minimum trimmed length (Unicode scalar count) for text-mode analysis.
pub const MIN_TEXT_CHARS: usize = 50;

const ALLOWED_SCHEMES: [&str; 2] = ["http://", "https://"];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty")]
    Empty,
    #[error("too_short")]
    TooShort,
    #[error("bad_scheme")]
    BadScheme,
}

/// Check `content` against the rules for `mode`.
///
/// URL mode only checks the scheme prefix; anything scheme-prefixed is left for the
/// service to accept or reject.
pub fn validate(mode: AnalysisMode, content: &str) -> Result<(), ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    match mode {
        AnalysisMode::Text => {
            if trimmed.chars().count() < MIN_TEXT_CHARS {
                return Err(ValidationError::TooShort);
            }
        }
        AnalysisMode::Url => {
            if !ALLOWED_SCHEMES.iter().any(|s| content.starts_with(s)) {
                return Err(ValidationError::BadScheme);
            }
        }
    }

    Ok(())
}

// Error Classification
// Maps every failure of a submission to one user-facing message

use crate::models::{AnalysisMode, DisplayError};
use crate::services::client::ClientError;
use crate::services::validator::ValidationError;
use thiserror::Error;

pub const MSG_TEXT_EMPTY: &str = "Please enter some text to analyze";
pub const MSG_TEXT_TOO_SHORT: &str = "Please enter at least 50 characters for accurate analysis";
pub const MSG_URL_EMPTY: &str = "Please enter a valid URL";
pub const MSG_URL_BAD_SCHEME: &str = "URL must start with http:// or https://";
pub const MSG_EXTRACTION_FAILED: &str = "We cannot currently analyze this article. The website may be blocking automated access or the content structure is not supported. Please try copying the article text and using the Text Detection feature instead.";
pub const MSG_TEXT_NETWORK: &str = "Failed to analyze the text. Please check your connection and try again.";
pub const MSG_URL_NETWORK: &str = "Failed to analyze the URL. Please check your connection and try again.";
pub const MSG_TRAIN_NETWORK: &str = "Failed to reach the analysis service. Please check your connection and try again.";

/// Marker the service puts in its error when it could not read the article page.
const EXTRACTION_FAILURE_MARKER: &str = "Could not extract text";

/// Anything that can end a submission in `Failed`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisFailure {
    #[error("invalid {mode} input: {error}")]
    Invalid { mode: AnalysisMode, error: ValidationError },
    #[error("{mode} request failed: {error}")]
    Client { mode: AnalysisMode, error: ClientError },
}

impl AnalysisFailure {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            Self::Invalid { mode, .. } | Self::Client { mode, .. } => *mode,
        }
    }
}

pub fn classify(failure: &AnalysisFailure) -> DisplayError {
    let message = match failure {
        AnalysisFailure::Invalid { mode, error } => match (mode, error) {
            (AnalysisMode::Text, ValidationError::Empty) => MSG_TEXT_EMPTY,
            (AnalysisMode::Url, ValidationError::Empty) => MSG_URL_EMPTY,
            (_, ValidationError::TooShort) => MSG_TEXT_TOO_SHORT,
            (_, ValidationError::BadScheme) => MSG_URL_BAD_SCHEME,
        },
        AnalysisFailure::Client { error: ClientError::Server { message, .. }, .. } => {
            if message.contains(EXTRACTION_FAILURE_MARKER) {
                MSG_EXTRACTION_FAILED
            } else {
                return DisplayError::new(message.clone());
            }
        }
        AnalysisFailure::Client { mode, error: ClientError::Network { .. } } => match mode {
            AnalysisMode::Text => MSG_TEXT_NETWORK,
            AnalysisMode::Url => MSG_URL_NETWORK,
        },
    };
    DisplayError::new(message)
}

/// Message for a failed `/train` call: server text verbatim, never transport detail.
pub fn classify_train_error(error: &ClientError) -> DisplayError {
    match error {
        ClientError::Server { message, .. } => DisplayError::new(message.clone()),
        ClientError::Network { .. } => DisplayError::new(MSG_TRAIN_NETWORK),
    }
}

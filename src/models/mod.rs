// NewsCheck Data Models
// Wire types for the analysis service plus the display-side request state

use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Request ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Text,
    Url,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /analyze`. Tagged by `mode`, so exactly one payload field is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AnalysisRequest {
    Text { text: String },
    Url { url: String },
}

impl AnalysisRequest {
    pub fn new(mode: AnalysisMode, content: impl Into<String>) -> Self {
        match mode {
            AnalysisMode::Text => Self::Text { text: content.into() },
            AnalysisMode::Url => Self::Url { url: content.into() },
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        match self {
            Self::Text { .. } => AnalysisMode::Text,
            Self::Url { .. } => AnalysisMode::Url,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Url { url } => url,
        }
    }
}

// ============ Response ============

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

/// Raw classifier output. `label == 1` means the article was classified fake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub label: i32,
    pub prob_fake: f64,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Corroboration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeResponse {
    pub result: AnalysisResult,
    pub corroboration: Vec<Corroboration>,
}

impl<'de> Deserialize<'de> for AnalyzeResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // `corroboration` may be absent or null; both collapse to an empty list.
        #[derive(Deserialize)]
        struct Wire {
            result: AnalysisResult,
            #[serde(default)]
            corroboration: Option<Vec<Corroboration>>,
        }

        let wire = Wire::deserialize(deserializer)?;
        Ok(Self {
            result: wire.result,
            corroboration: wire.corroboration.unwrap_or_default(),
        })
    }
}

/// Error payload returned by the service on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainResponse {
    pub status: String,
}

// ============ Display ============

/// Display-ready fields derived from an [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub is_fake: bool,
    pub verdict: String,
    /// `prob_fake` as a percentage with one decimal, e.g. `"87.3"`.
    pub confidence_percent: String,
    pub polarity: String,
    pub sentiment_class: String,
    pub subjectivity: String,
    pub subjectivity_class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedAnalysis {
    pub result: AnalysisResult,
    pub display: DisplayFields,
    pub corroboration: Vec<Corroboration>,
}

/// A single user-facing failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayError {
    pub message: String,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============ Request State ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "data", rename_all = "camelCase")]
pub enum RequestState {
    #[default]
    Idle,
    Validating,
    InFlight,
    Succeeded(CompletedAnalysis),
    Failed(DisplayError),
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::InFlight => "inFlight",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

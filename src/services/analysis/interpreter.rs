// Result Interpretation
// Derives display categories from the raw classifier output

use crate::models::{AnalysisResult, DisplayFields};

/// Above this subjectivity an article reads as opinion rather than reporting.
const SUBJECTIVITY_THRESHOLD: f64 = 0.5;

pub const VERDICT_FAKE: &str = "Likely Fake News";
pub const VERDICT_REAL: &str = "Likely Real News";

/// Verdict comes from `label`, confidence from `prob_fake`. The two are not reconciled.
pub fn interpret(result: &AnalysisResult) -> DisplayFields {
    let is_fake = result.label == 1;
    DisplayFields {
        is_fake,
        verdict: if is_fake { VERDICT_FAKE } else { VERDICT_REAL }.to_string(),
        confidence_percent: confidence_percent(result.prob_fake),
        polarity: to_fixed(result.sentiment.polarity, 3),
        sentiment_class: sentiment_class(result.sentiment.polarity).to_string(),
        subjectivity: to_fixed(result.sentiment.subjectivity, 3),
        subjectivity_class: subjectivity_class(result.sentiment.subjectivity).to_string(),
    }
}

pub fn confidence_percent(prob_fake: f64) -> String {
    to_fixed(prob_fake * 100.0, 1)
}

/// Fixed-point display: exact ties round away from zero and `-0.0` prints as zero.
///
/// `{:.N}` alone rounds exact ties to even (81.25 -> "81.2").
pub fn to_fixed(value: f64, digits: u32) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    // A tie is only exact when the scaled value lands on .5 without loss.
    let rounded = if scaled.abs().fract() == 0.5 && scaled / scale == value {
        scaled.round() / scale
    } else {
        value
    };
    format!("{:.*}", digits as usize, rounded)
}

pub fn sentiment_class(polarity: f64) -> &'static str {
    if polarity > 0.0 {
        "Positive"
    } else if polarity < 0.0 {
        "Negative"
    } else {
        "Neutral"
    }
}

pub fn subjectivity_class(subjectivity: f64) -> &'static str {
    if subjectivity > SUBJECTIVITY_THRESHOLD {
        "Highly subjective"
    } else {
        "More objective"
    }
}

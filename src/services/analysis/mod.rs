// Analysis Module
// Orchestration and interpretation around the remote classifier:
// - classifier: maps validation/transport/server failures to display messages
// - interpreter: derives verdict, confidence and sentiment classes
// - lifecycle: request state machine with stale-response suppression

pub mod classifier;
pub mod interpreter;
pub mod lifecycle;

pub use classifier::{classify, classify_train_error, AnalysisFailure};
pub use interpreter::{confidence_percent, interpret, sentiment_class, subjectivity_class, to_fixed};
pub use lifecycle::{RequestLifecycle, Submission};

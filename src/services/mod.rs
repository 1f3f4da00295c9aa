// NewsCheck Core Services

pub mod analysis;
pub mod client;
pub mod config_store;
pub mod validator;

pub use analysis::{classify, interpret, AnalysisFailure, RequestLifecycle, Submission};
pub use client::{
    resolve_api_base_url, AnalysisBackend, AnalysisClient, ClientError, NetworkErrorKind,
    ANALYZE_TIMEOUT_SECS, DEFAULT_API_BASE_URL,
};
pub use config_store::{AppConfig, ConfigError, ConfigStore, ProxyConfig};
pub use validator::{validate, ValidationError, MIN_TEXT_CHARS};

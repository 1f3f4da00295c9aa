// Request Lifecycle
// Owns the RequestState of one analysis surface and drives
// Idle -> Validating -> InFlight -> Succeeded | Failed.
//
// A new submit supersedes whatever is running. In-flight requests are never
// cancelled; their late results are dropped by the sequence guard instead.

use crate::models::{AnalysisMode, AnalysisRequest, AnalyzeResponse, CompletedAnalysis, RequestState};
use crate::services::client::AnalysisBackend;
use crate::services::validator::validate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::classifier::{classify, AnalysisFailure};
use super::interpreter::interpret;

struct Shared {
    state: watch::Sender<RequestState>,
    /// Sequence number of the current submission. Only bumped inside a state update.
    current_seq: AtomicU64,
}

impl Shared {
    /// Start a new submission: bump the sequence and move to `Validating` in one step.
    fn begin(&self) -> u64 {
        let mut seq = 0;
        self.state.send_modify(|state| {
            seq = self.current_seq.fetch_add(1, Ordering::SeqCst) + 1;
            *state = RequestState::Validating;
        });
        seq
    }

    /// Apply `next` only if `seq` is still the current submission.
    fn apply(&self, seq: u64, next: RequestState) -> bool {
        self.state.send_if_modified(|state| {
            if self.current_seq.load(Ordering::SeqCst) != seq {
                return false;
            }
            *state = next;
            true
        })
    }

    fn complete(&self, seq: u64, outcome: Result<AnalyzeResponse, AnalysisFailure>) {
        let next = match outcome {
            Ok(response) => RequestState::Succeeded(CompletedAnalysis {
                display: interpret(&response.result),
                result: response.result,
                corroboration: response.corroboration,
            }),
            Err(failure) => {
                warn!(seq, mode = %failure.mode(), error = %failure, "analysis.failed");
                RequestState::Failed(classify(&failure))
            }
        };

        let state_name = next.name();
        if self.apply(seq, next) {
            info!(seq, state = state_name, "analysis.completed");
        } else {
            debug!(
                seq,
                current = self.current_seq.load(Ordering::SeqCst),
                "analysis.stale_discarded"
            );
        }
    }
}

/// Handle returned by [`RequestLifecycle::submit`].
///
/// Dropping it is fine; the submission keeps running and still updates the state.
#[derive(Debug)]
pub struct Submission {
    seq: u64,
    handle: Option<JoinHandle<()>>,
}

impl Submission {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether a network request was issued (false when validation rejected the input).
    pub fn dispatched(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait until this submission's outcome has been applied or discarded.
    pub async fn finished(self) {
        if let Some(handle) = self.handle {
            if let Err(e) = handle.await {
                warn!(seq = self.seq, error = %e, "analysis.task_failed");
            }
        }
    }
}

pub struct RequestLifecycle<B> {
    backend: Arc<B>,
    shared: Arc<Shared>,
}

impl<B> Clone for RequestLifecycle<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: AnalysisBackend + 'static> RequestLifecycle<B> {
    pub fn new(backend: B) -> Self {
        Self::with_shared_backend(Arc::new(backend))
    }

    pub fn with_shared_backend(backend: Arc<B>) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            backend,
            shared: Arc::new(Shared {
                state,
                current_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState {
        self.shared.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.shared.state.subscribe()
    }

    /// Start a submission, superseding any previous one.
    ///
    /// Validation runs synchronously. The network call is spawned on the current
    /// tokio runtime, so this must be called from within one.
    pub fn submit(&self, mode: AnalysisMode, content: impl Into<String>) -> Submission {
        let content = content.into();
        let seq = self.shared.begin();
        let submission_id = Uuid::new_v4();
        info!(%submission_id, seq, %mode, chars = content.chars().count(), "analysis.submit");

        if let Err(error) = validate(mode, &content) {
            debug!(seq, %mode, reason = %error, "analysis.invalid_input");
            self.shared.complete(seq, Err(AnalysisFailure::Invalid { mode, error }));
            return Submission { seq, handle: None };
        }

        if !self.shared.apply(seq, RequestState::InFlight) {
            // Superseded between validation and dispatch.
            return Submission { seq, handle: None };
        }

        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.shared);
        let request = AnalysisRequest::new(mode, content);
        let span = info_span!("analysis", %submission_id, seq);

        let handle = tokio::spawn(
            async move {
                let outcome = backend
                    .analyze(&request)
                    .await
                    .map_err(|error| AnalysisFailure::Client { mode, error });
                shared.complete(seq, outcome);
            }
            .instrument(span),
        );

        Submission {
            seq,
            handle: Some(handle),
        }
    }

    /// Submit and wait for this submission to settle, returning the resulting state.
    ///
    /// If a later submission superseded this one, the returned state belongs to it.
    pub async fn submit_and_wait(&self, mode: AnalysisMode, content: impl Into<String>) -> RequestState {
        self.submit(mode, content).finished().await;
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Corroboration, DisplayError, Sentiment};
    use crate::services::analysis::classifier::{MSG_EXTRACTION_FAILED, MSG_TEXT_NETWORK};
    use crate::services::client::{ClientError, NetworkErrorKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type Reply = Result<AnalyzeResponse, ClientError>;

    /// Backend whose replies are released by the test, keyed by request content.
    #[derive(Default)]
    struct ScriptedBackend {
        pending: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
        requests: Mutex<Vec<AnalysisRequest>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn script(&self, content: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().insert(content.to_string(), rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn analyze(&self, request: &AnalysisRequest) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let rx = self.pending.lock().unwrap().remove(request.content());
            match rx {
                Some(rx) => rx.await.unwrap_or_else(|_| {
                    Err(ClientError::Network {
                        kind: NetworkErrorKind::Transport,
                        detail: "reply dropped".to_string(),
                    })
                }),
                None => panic!("unscripted request: {}", request.content()),
            }
        }
    }

    fn response(label: i32, prob_fake: f64, titles: &[&str]) -> AnalyzeResponse {
        AnalyzeResponse {
            result: AnalysisResult {
                label,
                prob_fake,
                sentiment: Sentiment {
                    polarity: 0.0,
                    subjectivity: 0.3,
                },
            },
            corroboration: titles
                .iter()
                .map(|t| Corroboration {
                    title: Some(t.to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn succeeded(state: &RequestState) -> &CompletedAnalysis {
        match state {
            RequestState::Succeeded(done) => done,
            other => panic!("expected succeeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_short_text_fails_without_network() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));

        let submission = lifecycle.submit(AnalysisMode::Text, "a".repeat(49));
        assert!(!submission.dispatched());
        submission.finished().await;

        assert_eq!(
            lifecycle.state(),
            RequestState::Failed(DisplayError::new(
                "Please enter at least 50 characters for accurate analysis"
            ))
        );
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_scheme_url_fails() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));

        let state = lifecycle.submit_and_wait(AnalysisMode::Url, "ftp://x.com").await;
        assert_eq!(
            state,
            RequestState::Failed(DisplayError::new("URL must start with http:// or https://"))
        );
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_interprets_result() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));
        let url = "https://news.example/story";
        let reply = backend.script(url);

        let submission = lifecycle.submit(AnalysisMode::Url, url);
        assert!(submission.dispatched());
        assert_eq!(lifecycle.state(), RequestState::InFlight);

        reply.send(Ok(response(1, 0.873, &["first", "second"]))).unwrap();
        submission.finished().await;

        let state = lifecycle.state();
        let done = succeeded(&state);
        assert!(done.display.is_fake);
        assert_eq!(done.display.confidence_percent, "87.3");
        let titles: Vec<_> = done.corroboration.iter().filter_map(|c| c.title.as_deref()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(
            backend.requests.lock().unwrap()[0],
            AnalysisRequest::Url { url: url.to_string() }
        );
    }

    #[tokio::test]
    async fn test_late_response_from_superseded_request_is_discarded() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));
        let reply_a = backend.script("https://a.example");
        let reply_b = backend.script("https://b.example");

        let a = lifecycle.submit(AnalysisMode::Url, "https://a.example");
        let b = lifecycle.submit(AnalysisMode::Url, "https://b.example");
        assert!(b.seq() > a.seq());

        reply_b.send(Ok(response(0, 0.2, &["b"]))).unwrap();
        b.finished().await;
        assert_eq!(succeeded(&lifecycle.state()).display.confidence_percent, "20.0");

        reply_a.send(Ok(response(1, 0.9, &["a"]))).unwrap();
        a.finished().await;

        let state = lifecycle.state();
        let done = succeeded(&state);
        assert_eq!(done.display.confidence_percent, "20.0");
        assert_eq!(done.corroboration[0].title.as_deref(), Some("b"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_early_response_from_superseded_request_is_discarded() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));
        let reply_a = backend.script("https://a.example");
        let reply_b = backend.script("https://b.example");

        let a = lifecycle.submit(AnalysisMode::Url, "https://a.example");
        let b = lifecycle.submit(AnalysisMode::Url, "https://b.example");

        reply_a
            .send(Err(ClientError::Server {
                status: 400,
                message: "Could not extract text from URL.".to_string(),
            }))
            .unwrap();
        a.finished().await;
        assert_eq!(lifecycle.state(), RequestState::InFlight);

        reply_b.send(Ok(response(0, 0.1, &[]))).unwrap();
        b.finished().await;
        assert!(succeeded(&lifecycle.state()).corroboration.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_resubmit_supersedes_in_flight() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));
        let reply_a = backend.script("https://a.example");

        let a = lifecycle.submit(AnalysisMode::Url, "https://a.example");
        lifecycle.submit(AnalysisMode::Url, "").finished().await;
        assert_eq!(
            lifecycle.state(),
            RequestState::Failed(DisplayError::new("Please enter a valid URL"))
        );

        reply_a.send(Ok(response(1, 0.99, &[]))).unwrap();
        a.finished().await;
        assert!(matches!(lifecycle.state(), RequestState::Failed(_)));
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));
        let text = "x".repeat(80);
        let url = "https://blocked.example";

        let reply = backend.script(url);
        let submission = lifecycle.submit(AnalysisMode::Url, url);
        reply
            .send(Err(ClientError::Server {
                status: 400,
                message: "Could not extract text from page".to_string(),
            }))
            .unwrap();
        submission.finished().await;
        assert_eq!(lifecycle.state(), RequestState::Failed(DisplayError::new(MSG_EXTRACTION_FAILED)));

        let reply = backend.script(&text);
        let submission = lifecycle.submit(AnalysisMode::Text, text.clone());
        reply
            .send(Err(ClientError::Network {
                kind: NetworkErrorKind::Timeout,
                detail: "operation timed out".to_string(),
            }))
            .unwrap();
        submission.finished().await;
        assert_eq!(lifecycle.state(), RequestState::Failed(DisplayError::new(MSG_TEXT_NETWORK)));
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let backend = Arc::new(ScriptedBackend::default());
        let lifecycle = RequestLifecycle::with_shared_backend(Arc::clone(&backend));
        let mut rx = lifecycle.subscribe();
        assert_eq!(*rx.borrow_and_update(), RequestState::Idle);

        let text = "y".repeat(60);
        let reply = backend.script(&text);
        let submission = lifecycle.submit(AnalysisMode::Text, text.clone());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), RequestState::InFlight);

        reply.send(Ok(response(0, 0.05, &[]))).unwrap();
        submission.finished().await;
        rx.changed().await.unwrap();
        assert!(matches!(*rx.borrow(), RequestState::Succeeded(_)));
        assert_eq!(
            backend.requests.lock().unwrap()[0],
            AnalysisRequest::Text { text }
        );
    }
}

//! Assistant Gateway
//!
//! Two stateless call shapes, `ask` and `summarize`, over a `TextProvider`.
//! The gateway never surfaces an error: empty answers, provider failures,
//! panics and timeouts all turn into fixed fallback messages.
//!
//! Each call runs on its own worker thread so the caller can keep working.
//! A `CancelToken` tied to the requesting view lets the caller discard a
//! reply that arrives after the view is gone.

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use crate::ai::client::{AiError, DisabledProvider, GenerationRequest, TextProvider};
use crate::ai::prompts;
use crate::config::AssistantConfig;

pub const ASK_EMPTY_FALLBACK: &str = "抱歉，我无法生成回复。";
pub const ASK_ERROR_FALLBACK: &str = "与 AI 助手通信时发生错误。";
pub const SUMMARY_EMPTY_FALLBACK: &str = "无法生成总结。";
pub const SUMMARY_ERROR_FALLBACK: &str = "总结时发生错误。";

/// How often a blocked `wait` re-checks its cancel token
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Which call produced a reply; selects the fallback messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Ask,
    Summarize,
}

impl CallKind {
    fn empty_fallback(self) -> &'static str {
        match self {
            CallKind::Ask => ASK_EMPTY_FALLBACK,
            CallKind::Summarize => SUMMARY_EMPTY_FALLBACK,
        }
    }

    fn error_fallback(self) -> &'static str {
        match self {
            CallKind::Ask => ASK_ERROR_FALLBACK,
            CallKind::Summarize => SUMMARY_ERROR_FALLBACK,
        }
    }

    /// Turns a provider result into the text shown to the user
    fn resolve(self, result: Result<String, AiError>) -> String {
        match result {
            Ok(text) if text.trim().is_empty() => self.empty_fallback().to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!("Assistant {:?} call failed: {}", self, e);
                self.error_fallback().to_string()
            }
        }
    }
}

/// Shared flag the requesting view flips when it goes away
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State of a background reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyState {
    Pending,
    Ready(String),
    /// The view went away; the reply must not be applied
    Cancelled,
}

/// Handle to an in-flight assistant call
pub struct PendingReply {
    kind: CallKind,
    rx: mpsc::Receiver<Result<String, AiError>>,
    token: CancelToken,
    deadline: Instant,
    timeout: Duration,
    /// The resolved reply, kept so later polls return the same text
    settled: Option<String>,
}

impl PendingReply {
    /// Checks for a reply without blocking
    ///
    /// Once a reply is ready, every later call returns the same text.
    pub fn try_take(&mut self) -> ReplyState {
        if self.token.is_cancelled() {
            return ReplyState::Cancelled;
        }
        if let Some(text) = &self.settled {
            return ReplyState::Ready(text.clone());
        }
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Disconnected) => Err(worker_lost()),
            Err(mpsc::TryRecvError::Empty) if Instant::now() >= self.deadline => {
                Err(self.timed_out())
            }
            Err(mpsc::TryRecvError::Empty) => return ReplyState::Pending,
        };
        let text = self.kind.resolve(result);
        self.settled = Some(text.clone());
        ReplyState::Ready(text)
    }

    /// Blocks until the reply arrives, the timeout passes or the token is
    /// cancelled. Returns `None` only when cancelled.
    pub fn wait(mut self) -> Option<String> {
        loop {
            if self.token.is_cancelled() {
                debug!("Assistant {:?} reply cancelled", self.kind);
                return None;
            }
            if let Some(text) = self.settled.take() {
                return Some(text);
            }

            let now = Instant::now();
            if now >= self.deadline {
                // a reply that made it into the channel in time still counts
                let result = self.rx.try_recv().unwrap_or_else(|_| Err(self.timed_out()));
                return Some(self.kind.resolve(result));
            }

            let slice = (self.deadline - now).min(POLL_INTERVAL);
            match self.rx.recv_timeout(slice) {
                Ok(result) => {
                    if self.token.is_cancelled() {
                        return None;
                    }
                    return Some(self.kind.resolve(result));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Some(self.kind.resolve(Err(worker_lost())));
                }
            }
        }
    }

    fn timed_out(&self) -> AiError {
        AiError::Timeout(self.timeout)
    }
}

fn worker_lost() -> AiError {
    AiError::RequestFailed("provider worker exited without a reply".to_string())
}

/// The gateway to the external text-generation provider
#[derive(Clone)]
pub struct AssistantGateway {
    provider: Arc<dyn TextProvider>,
    model: String,
    timeout: Duration,
}

impl Default for AssistantGateway {
    fn default() -> Self {
        Self::new(Arc::new(DisabledProvider), &AssistantConfig::default())
    }
}

impl AssistantGateway {
    pub fn new(provider: Arc<dyn TextProvider>, config: &AssistantConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            timeout: config.timeout(),
        }
    }

    /// Description of the configured provider
    pub fn describe(&self) -> String {
        format!("{} / {}", self.provider.describe(), self.model)
    }

    /// Answers a question about `context`. Never fails.
    pub fn ask(&self, question: &str, context: &str) -> String {
        self.ask_in_background(question, context, CancelToken::new())
            .wait()
            .unwrap_or_else(|| ASK_ERROR_FALLBACK.to_string())
    }

    /// Summarizes a requirement description. Never fails.
    pub fn summarize(&self, description: &str) -> String {
        self.summarize_in_background(description, CancelToken::new())
            .wait()
            .unwrap_or_else(|| SUMMARY_ERROR_FALLBACK.to_string())
    }

    pub fn ask_in_background(
        &self,
        question: &str,
        context: &str,
        token: CancelToken,
    ) -> PendingReply {
        let prompt = prompts::build_ask_prompt(question, context);
        self.spawn(CallKind::Ask, prompt, token)
    }

    pub fn summarize_in_background(&self, description: &str, token: CancelToken) -> PendingReply {
        let prompt = prompts::build_summary_prompt(description);
        self.spawn(CallKind::Summarize, prompt, token)
    }

    fn spawn(&self, kind: CallKind, prompt: String, token: CancelToken) -> PendingReply {
        let (tx, rx) = mpsc::channel();
        let request = GenerationRequest::new(self.model.clone(), prompt, self.timeout)
            .with_cancel(token.clone());
        let deadline = request.deadline();
        let provider = Arc::clone(&self.provider);

        // A failed spawn drops `tx`, which the reply reports as a lost worker.
        let spawned = thread::Builder::new()
            .name("nexus-assistant".to_string())
            .spawn(move || {
                let result = provider.generate(&request);
                // the receiver may already be gone after a timeout
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            warn!("Could not start assistant worker: {}", e);
        }

        PendingReply {
            kind,
            rx,
            token,
            deadline,
            timeout: self.timeout,
            settled: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedProvider(Result<String, AiError>);

    impl TextProvider for FixedProvider {
        fn generate(&self, _request: &GenerationRequest) -> Result<String, AiError> {
            self.0.clone()
        }

        fn describe(&self) -> String {
            "Fixed".to_string()
        }
    }

    struct PanickingProvider;

    impl TextProvider for PanickingProvider {
        fn generate(&self, _request: &GenerationRequest) -> Result<String, AiError> {
            panic!("provider blew up");
        }

        fn describe(&self) -> String {
            "Panicking".to_string()
        }
    }

    struct SlowProvider(Duration);

    impl TextProvider for SlowProvider {
        fn generate(&self, _request: &GenerationRequest) -> Result<String, AiError> {
            thread::sleep(self.0);
            Ok("late answer".to_string())
        }

        fn describe(&self) -> String {
            "Slow".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingProvider(Mutex<Vec<GenerationRequest>>);

    impl TextProvider for RecordingProvider {
        fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
            self.0.lock().unwrap().push(request.clone());
            Ok("ok".to_string())
        }

        fn describe(&self) -> String {
            "Recording".to_string()
        }
    }

    fn gateway(provider: impl TextProvider + 'static, timeout_ms: u64) -> AssistantGateway {
        AssistantGateway {
            provider: Arc::new(provider),
            model: "test-model".to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn test_ask_returns_provider_text() {
        let gw = gateway(FixedProvider(Ok("## 建议".to_string())), 1000);
        assert_eq!(gw.ask("问题", "上下文"), "## 建议");
    }

    #[test]
    fn test_ask_error_uses_fallback() {
        let gw = gateway(
            FixedProvider(Err(AiError::RequestFailed("500".to_string()))),
            1000,
        );
        assert_eq!(gw.ask("问题", ""), ASK_ERROR_FALLBACK);
        assert_eq!(gw.summarize("需求"), SUMMARY_ERROR_FALLBACK);
    }

    #[test]
    fn test_empty_answer_uses_fallback() {
        let gw = gateway(FixedProvider(Ok("  \n".to_string())), 1000);
        assert_eq!(gw.ask("问题", ""), ASK_EMPTY_FALLBACK);
        assert_eq!(gw.summarize("需求"), SUMMARY_EMPTY_FALLBACK);
    }

    #[test]
    fn test_panicking_provider_uses_fallback() {
        let gw = gateway(PanickingProvider, 1000);
        assert_eq!(gw.ask("问题", ""), ASK_ERROR_FALLBACK);
    }

    #[test]
    fn test_disabled_gateway_uses_fallback() {
        let gw = AssistantGateway::default();
        assert_eq!(gw.summarize("需求"), SUMMARY_ERROR_FALLBACK);
    }

    #[test]
    fn test_timeout_uses_fallback() {
        let gw = gateway(SlowProvider(Duration::from_millis(500)), 50);
        let started = Instant::now();
        assert_eq!(gw.ask("问题", ""), ASK_ERROR_FALLBACK);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_cancelled_reply_is_discarded() {
        let gw = gateway(SlowProvider(Duration::from_millis(200)), 5000);
        let token = CancelToken::new();
        let mut pending = gw.ask_in_background("问题", "", token.clone());
        assert_eq!(pending.try_take(), ReplyState::Pending);
        token.cancel();
        assert_eq!(pending.try_take(), ReplyState::Cancelled);
        assert_eq!(pending.wait(), None);
    }

    #[test]
    fn test_polling_after_ready_keeps_the_answer() {
        let gw = gateway(FixedProvider(Ok("real answer".to_string())), 1000);
        let mut pending = gw.ask_in_background("问题", "", CancelToken::new());

        let started = Instant::now();
        let mut first = pending.try_take();
        while first == ReplyState::Pending && started.elapsed() < Duration::from_secs(1) {
            thread::sleep(Duration::from_millis(5));
            first = pending.try_take();
        }
        assert_eq!(first, ReplyState::Ready("real answer".to_string()));
        assert_eq!(pending.try_take(), first);
        assert_eq!(pending.wait(), Some("real answer".to_string()));
    }

    #[test]
    fn test_reply_queued_at_deadline_is_kept() {
        let (tx, rx) = mpsc::channel();
        tx.send(Ok("just in time".to_string())).unwrap();
        let pending = PendingReply {
            kind: CallKind::Ask,
            rx,
            token: CancelToken::new(),
            deadline: Instant::now(),
            timeout: Duration::ZERO,
            settled: None,
        };
        assert_eq!(pending.wait(), Some("just in time".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_timed_out_command_does_not_keep_running() {
        use crate::ai::client::CommandProvider;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let provider = CommandProvider::new(
            "sh",
            vec![
                "-c".to_string(),
                format!("sleep 1; touch '{}'", marker.display()),
            ],
        );
        let gw = gateway(provider, 100);

        assert_eq!(gw.ask("问题", ""), ASK_ERROR_FALLBACK);
        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_background_reply_arrives() {
        let gw = gateway(FixedProvider(Ok("done".to_string())), 1000);
        let pending = gw.summarize_in_background("需求", CancelToken::new());
        assert_eq!(pending.wait(), Some("done".to_string()));
    }

    #[test]
    fn test_request_carries_model_and_full_prompt() {
        let provider = Arc::new(RecordingProvider::default());
        let gw = AssistantGateway {
            provider: provider.clone(),
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(1),
        };
        gw.ask("怎么部署？", "部署文档");
        gw.summarize("视频上传与处理");

        let requests = provider.0.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.model == "gemini-2.5-flash"));
        assert!(requests[0].prompt.contains("怎么部署？"));
        assert!(requests[0].prompt.contains("部署文档"));
        assert!(requests[1].prompt.contains("视频上传与处理"));
    }
}

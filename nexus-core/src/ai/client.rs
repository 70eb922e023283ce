//! AI Client Module
//!
//! The text-generation provider boundary. A provider receives one composed
//! prompt and returns plain text; everything else lives in the gateway.

use log::warn;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::ai::gateway::CancelToken;

/// How often a running provider command is checked for exit
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors that can occur while talking to a provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Provider command not found: {0}")]
    CommandNotFound(PathBuf),

    #[error("Provider execution failed: {0}")]
    ExecFailed(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Provider call cancelled")]
    Cancelled,

    #[error("AI integration not available")]
    NotAvailable,
}

/// Outbound request: the model identifier and a single self-contained prompt
///
/// Providers that hold external resources stop working on it once the
/// deadline passes or the token is cancelled.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub started: Instant,
    pub timeout: Duration,
    pub cancel: CancelToken,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            started: Instant::now(),
            timeout,
            cancel: CancelToken::new(),
        }
    }

    /// Shares `token` with the caller so it can abandon the call
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Instant {
        self.started + self.timeout
    }

    /// Why the caller no longer wants an answer, if it doesn't
    pub fn abandoned(&self) -> Option<AiError> {
        if self.cancel.is_cancelled() {
            Some(AiError::Cancelled)
        } else if self.started.elapsed() >= self.timeout {
            Some(AiError::Timeout(self.timeout))
        } else {
            None
        }
    }
}

/// An external text-generation collaborator
///
/// Implementations are called from a worker thread, hence `Send + Sync`.
/// An empty string is a valid answer and is mapped to a fallback upstream.
pub trait TextProvider: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AiError>;

    /// Short description for status output
    fn describe(&self) -> String;
}

/// Provider used when nothing is configured. Every call fails.
#[derive(Debug, Clone, Default)]
pub struct DisabledProvider;

impl TextProvider for DisabledProvider {
    fn generate(&self, _request: &GenerationRequest) -> Result<String, AiError> {
        Err(AiError::NotAvailable)
    }

    fn describe(&self) -> String {
        "Disabled".to_string()
    }
}

/// Runs an external command with the prompt as its last argument and reads
/// the answer from stdout
///
/// The model identifier is exported to the child as `NEXUS_MODEL`. The child
/// is killed when the request deadline passes or the call is cancelled.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds a provider from an argv list such as `["claude", "--print", "-p"]`
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program, args.to_vec()))
    }
}

impl TextProvider for CommandProvider {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&request.prompt)
            .env("NEXUS_MODEL", &request.model)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AiError::CommandNotFound(self.program.clone()),
                _ => AiError::ExecFailed(e.to_string()),
            })?;

        // Drain both pipes so a chatty child can't block on a full buffer
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill(&mut child);
                    return Err(AiError::ExecFailed(e.to_string()));
                }
            }
            if let Some(reason) = request.abandoned() {
                warn!("Stopping provider command {}: {}", self.program.display(), reason);
                kill(&mut child);
                return Err(reason);
            }
            thread::sleep(CHILD_POLL_INTERVAL);
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(AiError::ExecFailed(format!(
                "Exit code: {:?}, stderr: {}",
                status.code(),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    fn describe(&self) -> String {
        format!("Command ({})", self.program.display())
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn kill(child: &mut Child) {
    // the child may have exited between the check and the kill
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new("test-model", "hello", Duration::from_secs(5))
    }

    #[test]
    fn test_disabled_provider() {
        let provider = DisabledProvider;
        assert_eq!(provider.generate(&request()), Err(AiError::NotAvailable));
        assert_eq!(provider.describe(), "Disabled");
    }

    #[test]
    fn test_from_argv() {
        assert!(CommandProvider::from_argv(&[]).is_none());
        let argv = vec!["claude".to_string(), "--print".to_string()];
        let provider = CommandProvider::from_argv(&argv).unwrap();
        assert_eq!(provider.describe(), "Command (claude)");
    }

    #[test]
    fn test_missing_command() {
        let provider = CommandProvider::new("/nonexistent/nexus-provider", Vec::new());
        assert!(matches!(
            provider.generate(&request()),
            Err(AiError::CommandNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_echoes_prompt() {
        let provider = CommandProvider::new("echo", Vec::new());
        assert_eq!(provider.generate(&request()).unwrap(), "hello");
    }

    /// `sh -c '<script>' <prompt>`: the prompt lands in `$0` and is ignored
    #[cfg(unix)]
    fn shell(script: String) -> CommandProvider {
        CommandProvider::new("sh", vec!["-c".to_string(), script])
    }

    #[cfg(unix)]
    #[test]
    fn test_command_is_killed_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let provider = shell(format!("sleep 1; touch '{}'", marker.display()));

        let request = GenerationRequest::new("test-model", "hello", Duration::from_millis(100));
        let started = Instant::now();
        assert_eq!(
            provider.generate(&request),
            Err(AiError::Timeout(Duration::from_millis(100)))
        );
        assert!(started.elapsed() < Duration::from_millis(900));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_is_killed_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let provider = shell(format!("sleep 1; touch '{}'", marker.display()));

        let token = CancelToken::new();
        let request = GenerationRequest::new("test-model", "hello", Duration::from_secs(30))
            .with_cancel(token.clone());
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        });

        assert_eq!(provider.generate(&request), Err(AiError::Cancelled));
        canceller.join().unwrap();

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure_reports_stderr() {
        let provider = shell("echo broken >&2; exit 3".to_string());
        match provider.generate(&request()) {
            Err(AiError::ExecFailed(msg)) => {
                assert!(msg.contains("Some(3)"));
                assert!(msg.contains("broken"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

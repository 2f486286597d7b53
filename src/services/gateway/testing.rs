use super::r#trait::{Invocation, ProcessGateway, ProcessOutput};
use crate::error::ProcessError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{sleep, Duration};

/// Scripted gateway for tests: replays queued responses, then repeats the
/// fallback, counting every invocation.
pub struct MockGateway {
    responses: Mutex<VecDeque<Result<String, ProcessError>>>,
    fallback: Mutex<Result<String, ProcessError>>,
    delay: Duration,
    calls: AtomicUsize,
    invocations: Mutex<Vec<Invocation>>,
}

impl MockGateway {
    pub fn returning(stdout: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(stdout.to_string())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProcessError) -> Self {
        let gateway = Self::returning("");
        *gateway.fallback.lock() = Err(error);
        gateway
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a one-shot response served before the fallback.
    pub fn then(self, response: Result<&str, ProcessError>) -> Self {
        self.responses
            .lock()
            .push_back(response.map(|s| s.to_string()));
        self
    }

    pub fn set_fallback(&self, response: Result<&str, ProcessError>) {
        *self.fallback.lock() = response.map(|s| s.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }
}

pub fn exit_error(stderr: &str) -> ProcessError {
    ProcessError::Exit {
        command: "yabai".to_string(),
        exit_code: Some(1),
        stderr: stderr.to_string(),
    }
}

#[async_trait::async_trait]
impl ProcessGateway for MockGateway {
    async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().push(invocation.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let next = self.responses.lock().pop_front();
        let response = next.unwrap_or_else(|| self.fallback.lock().clone());

        response.map(|stdout| ProcessOutput {
            stdout,
            stderr: String::new(),
        })
    }
}

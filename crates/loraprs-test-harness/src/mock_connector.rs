//! Mock relay connector.
//!
//! [`MockConnector`] implements [`Connector`] by handing out fresh
//! [`MockTransport`] sessions. It records every session it opened so a test
//! can check what the relay connection manager wrote to each one, and it can
//! be told to refuse the next few connection attempts.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use loraprs_core::error::{Error, Result};
use loraprs_core::transport::{Connector, Transport};

use crate::mock_serial::MockTransport;

#[derive(Debug, Default)]
struct State {
    attempts: usize,
    refuse_next: usize,
    fail_session_sends: bool,
    sessions: Vec<MockTransport>,
}

/// A mock [`Connector`] producing [`MockTransport`] sessions.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<State>>,
}

impl MockConnector {
    /// Create a connector that accepts every attempt.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refuse the next `n` connection attempts with [`Error::Transport`].
    pub fn refuse_next(&self, n: usize) {
        self.lock().refuse_next = n;
    }

    /// Sessions opened from now on reject every `send()`.
    pub fn fail_session_sends(&self, fail: bool) {
        self.lock().fail_session_sends = fail;
    }

    /// Number of `connect()` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Handles onto every session opened so far, oldest first.
    pub fn sessions(&self) -> Vec<MockTransport> {
        self.lock().sessions.clone()
    }

    /// The text written to each session, oldest first.
    pub fn session_texts(&self) -> Vec<String> {
        self.lock().sessions.iter().map(|s| s.sent_text()).collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let mut state = self.lock();
        state.attempts += 1;

        if state.refuse_next > 0 {
            state.refuse_next -= 1;
            return Err(Error::Transport(format!(
                "connection refused: {}",
                self.endpoint()
            )));
        }

        let session = MockTransport::new();
        session.fail_sends(state.fail_session_sends);
        state.sessions.push(session.clone());
        Ok(Box::new(session))
    }

    fn endpoint(&self) -> String {
        "mock-relay:14580".to_string()
    }
}

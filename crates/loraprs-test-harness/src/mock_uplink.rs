//! Mock wireless uplink.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use loraprs_core::error::{Error, Result};
use loraprs_core::uplink::Uplink;

#[derive(Debug)]
struct State {
    up: bool,
    attempts: usize,
    failures_left: usize,
}

/// A mock [`Uplink`] whose reconnects succeed after a set number of failures.
#[derive(Debug, Clone)]
pub struct MockUplink {
    state: Arc<Mutex<State>>,
}

impl MockUplink {
    /// An uplink that starts in the given state.
    pub fn new(up: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                up,
                attempts: 0,
                failures_left: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Force the link state (e.g. to simulate losing association).
    pub fn set_up(&self, up: bool) {
        self.lock().up = up;
    }

    /// The next `n` reconnect attempts fail with [`Error::UplinkDown`].
    pub fn fail_reconnects(&self, n: usize) {
        self.lock().failures_left = n;
    }

    /// Number of reconnect attempts made.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }
}

#[async_trait]
impl Uplink for MockUplink {
    fn is_up(&self) -> bool {
        self.lock().up
    }

    async fn reconnect(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.attempts += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(Error::UplinkDown);
        }
        state.up = true;
        Ok(())
    }
}

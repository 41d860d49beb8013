//! RelayManager -- lifecycle of the APRS-IS session.
//!
//! The manager opens a session on demand, sends the login line first thing
//! on every new session, writes one text line per [`send`](RelayManager::send)
//! and, unless persistence is enabled, closes the session again straight
//! after. Only one session exists at a time.

use loraprs_core::error::{Error, Result};
use loraprs_core::transport::{Connector, Transport};

use crate::config::LoginLine;

/// Relay session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connected,
}

/// Owns the relay network connection.
pub struct RelayManager {
    connector: Box<dyn Connector>,
    login: LoginLine,
    persistent: bool,
    session: Option<Box<dyn Transport>>,
}

impl RelayManager {
    /// Create a manager; no connection is made until the first send.
    pub fn new(connector: Box<dyn Connector>, login: LoginLine, persistent: bool) -> Self {
        Self {
            connector,
            login,
            persistent,
            session: None,
        }
    }

    /// `Connected` while a live session is held.
    pub fn state(&self) -> RelayState {
        match &self.session {
            Some(session) if session.is_connected() => RelayState::Connected,
            _ => RelayState::Disconnected,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Send one line of APRS text, connecting and logging in first if needed.
    ///
    /// The line goes out byte for byte, with a newline appended when it lacks
    /// one. If the session cannot be opened the line is dropped and
    /// [`Error::RelayConnectFailed`] is returned; the next send tries again.
    pub async fn send(&mut self, text: &[u8]) -> Result<()> {
        if self.state() == RelayState::Disconnected {
            self.connect().await?;
        }
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;

        let mut line = text.to_vec();
        if !line.ends_with(b"\n") {
            line.push(b'\n');
        }

        let sent = session.send(&line).await;
        if let Err(e) = sent {
            tracing::warn!(error = %e, "Relay send failed, dropping session");
            self.disconnect().await;
            return Err(e);
        }
        let shown = String::from_utf8_lossy(&line);
        tracing::info!(line = %shown.trim_end(), "Forwarded to relay");

        if !self.persistent {
            self.disconnect().await;
        }
        Ok(())
    }

    /// Close the current session, if any.
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::debug!(error = %e, "Error closing relay session (ignored)");
            }
        }
    }

    async fn connect(&mut self) -> Result<()> {
        // Drop a dead session left over from an earlier send.
        self.disconnect().await;

        let endpoint = self.connector.endpoint();
        tracing::info!(endpoint = %endpoint, "Connecting to relay");

        let mut session = self.connector.connect().await.map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "Relay connect failed");
            Error::RelayConnectFailed(format!("{endpoint}: {e}"))
        })?;

        if let Err(e) = session.send(self.login.line().as_bytes()).await {
            tracing::warn!(endpoint = %endpoint, error = %e, "Relay login failed");
            // Best-effort close; the session is unusable either way.
            let _ = session.close().await;
            return Err(Error::RelayConnectFailed(format!("{endpoint}: login: {e}")));
        }

        tracing::debug!(endpoint = %endpoint, "Relay login sent");
        self.session = Some(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loraprs_test_harness::MockConnector;

    const LINE: &str = "N0CALL>APRS:>hello";

    fn login() -> LoginLine {
        LoginLine::with_client("N0CALL", "-1", "loraprs", "0.1.0")
    }

    fn manager(connector: &MockConnector, persistent: bool) -> RelayManager {
        RelayManager::new(Box::new(connector.clone()), login(), persistent)
    }

    #[tokio::test]
    async fn starts_disconnected_without_connecting() {
        let connector = MockConnector::new();
        let relay = manager(&connector, true);
        assert_eq!(relay.state(), RelayState::Disconnected);
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn transient_session_closes_after_send() {
        let connector = MockConnector::new();
        let mut relay = manager(&connector, false);

        relay.send(LINE.as_bytes()).await.unwrap();
        assert_eq!(relay.state(), RelayState::Disconnected);

        relay.send(LINE.as_bytes()).await.unwrap();
        assert_eq!(connector.attempts(), 2);

        let expected = format!("user N0CALL pass -1 vers loraprs 0.1.0\n{LINE}\n");
        assert_eq!(connector.session_texts(), vec![expected.clone(), expected]);
        assert!(connector.sessions().iter().all(|s| s.close_count() == 1));
    }

    #[tokio::test]
    async fn persistent_session_is_reused() {
        let connector = MockConnector::new();
        let mut relay = manager(&connector, true);

        relay.send(LINE.as_bytes()).await.unwrap();
        assert_eq!(relay.state(), RelayState::Connected);
        relay.send(b"N0CALL>APRS:>again\n").await.unwrap();
        assert_eq!(relay.state(), RelayState::Connected);

        assert_eq!(connector.attempts(), 1);
        assert_eq!(
            connector.session_texts(),
            vec![format!(
                "user N0CALL pass -1 vers loraprs 0.1.0\n{LINE}\nN0CALL>APRS:>again\n"
            )]
        );
    }

    #[tokio::test]
    async fn persistent_session_reconnects_when_dead() {
        let connector = MockConnector::new();
        let mut relay = manager(&connector, true);

        relay.send(LINE.as_bytes()).await.unwrap();
        connector.sessions()[0].set_connected(false);
        assert_eq!(relay.state(), RelayState::Disconnected);

        relay.send(LINE.as_bytes()).await.unwrap();
        assert_eq!(connector.attempts(), 2);
        assert!(connector.session_texts()[1].starts_with("user N0CALL"));
    }

    #[tokio::test]
    async fn connect_failure_drops_line() {
        let connector = MockConnector::new();
        connector.refuse_next(1);
        let mut relay = manager(&connector, false);

        let result = relay.send(LINE.as_bytes()).await;
        assert!(matches!(result, Err(Error::RelayConnectFailed(_))));
        assert_eq!(relay.state(), RelayState::Disconnected);
        assert!(connector.sessions().is_empty());

        // The next send tries again.
        relay.send(LINE.as_bytes()).await.unwrap();
        assert_eq!(connector.attempts(), 2);
        assert_eq!(connector.sessions().len(), 1);
    }

    #[tokio::test]
    async fn login_failure_is_connect_failure() {
        let connector = MockConnector::new();
        connector.fail_session_sends(true);
        let mut relay = manager(&connector, true);

        let result = relay.send(LINE.as_bytes()).await;
        assert!(matches!(result, Err(Error::RelayConnectFailed(_))));
        assert_eq!(relay.state(), RelayState::Disconnected);
    }

    #[tokio::test]
    async fn send_failure_drops_session() {
        let connector = MockConnector::new();
        let mut relay = manager(&connector, true);

        relay.send(LINE.as_bytes()).await.unwrap();
        connector.sessions()[0].fail_sends(true);

        let result = relay.send(LINE.as_bytes()).await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert_eq!(relay.state(), RelayState::Disconnected);
        assert_eq!(connector.sessions()[0].close_count(), 1);
    }

    #[tokio::test]
    async fn line_bytes_are_sent_verbatim() {
        let connector = MockConnector::new();
        let mut relay = manager(&connector, false);

        relay.send(b"N0CALL>APRS:>\xB0C").await.unwrap();

        let sent = connector.sessions()[0].sent_data();
        assert_eq!(sent.last().unwrap(), &b"N0CALL>APRS:>\xB0C\n".to_vec());
    }

    #[tokio::test]
    async fn disconnect_closes_persistent_session() {
        let connector = MockConnector::new();
        let mut relay = manager(&connector, true);

        relay.send(LINE.as_bytes()).await.unwrap();
        relay.disconnect().await;
        assert_eq!(relay.state(), RelayState::Disconnected);
        assert_eq!(connector.sessions()[0].close_count(), 1);
    }
}

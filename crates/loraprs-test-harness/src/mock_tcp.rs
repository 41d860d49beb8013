//! Mock APRS-IS server for end-to-end relay tests.
//!
//! [`MockTcpServer`] listens on a random loopback port, accepts a fixed
//! number of client connections one after another, and records the text
//! lines received on each. It lets the relay connection manager be tested
//! against a real `TcpConnector` without network infrastructure.
//!
//! # Example
//!
//! ```
//! use loraprs_test_harness::MockTcpServer;
//!
//! # async fn example() -> loraprs_core::Result<()> {
//! let mut server = MockTcpServer::new().await?;
//! server.start(1);
//!
//! let port = server.port();
//! // ... connect a TcpConnector to 127.0.0.1:<port> and send ...
//!
//! let sessions = server.wait().await.unwrap();
//! # Ok(())
//! # }
//! ```

use loraprs_core::error::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How long [`MockTcpServer::wait`] waits for the scripted sessions.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

type Sessions = Vec<Vec<String>>;

/// A mock relay server recording received lines per connection.
pub struct MockTcpServer {
    /// The listener, held until [`start`](MockTcpServer::start) moves it
    /// into the server task.
    listener: Option<TcpListener>,
    /// The address the server is listening on (e.g., "127.0.0.1:54321").
    addr: String,
    port: u16,
    /// Handle to the server task once started.
    server_handle: Option<JoinHandle<std::result::Result<Sessions, String>>>,
}

impl MockTcpServer {
    /// Create a new mock server listening on a random loopback port.
    ///
    /// Connections queue in the OS backlog until
    /// [`start`](MockTcpServer::start) is called.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock TCP server: {}", e)))?;
        let local = listener.local_addr().map_err(Error::Io)?;

        Ok(Self {
            listener: Some(listener),
            addr: local.to_string(),
            port: local.port(),
            server_handle: None,
        })
    }

    /// The `host:port` the server listens on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The port the server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept `connections` clients in turn, reading each until it closes.
    ///
    /// Calling this twice has no effect the second time.
    pub fn start(&mut self, connections: usize) {
        let Some(listener) = self.listener.take() else {
            return;
        };

        let handle = tokio::spawn(async move {
            let mut sessions = Vec::with_capacity(connections);
            for i in 0..connections {
                let (stream, _) = listener
                    .accept()
                    .await
                    .map_err(|e| format!("connection {}: accept failed: {}", i, e))?;

                let mut lines = BufReader::new(stream).lines();
                let mut received = Vec::new();
                while let Some(line) = lines
                    .next_line()
                    .await
                    .map_err(|e| format!("connection {}: read error: {}", i, e))?
                {
                    received.push(line);
                }
                sessions.push(received);
            }
            Ok(sessions)
        });

        self.server_handle = Some(handle);
    }

    /// Wait for every scripted connection to close and return the lines
    /// received on each, oldest connection first.
    ///
    /// Fails if the sessions do not finish within five seconds.
    pub async fn wait(self) -> std::result::Result<Sessions, String> {
        let Some(handle) = self.server_handle else {
            return Ok(Vec::new());
        };

        match tokio::time::timeout(WAIT_TIMEOUT, handle).await {
            Ok(joined) => joined.map_err(|e| format!("server task panicked: {}", e))?,
            Err(_) => Err("timed out waiting for relay sessions to close".to_string()),
        }
    }
}

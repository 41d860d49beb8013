//! Serial transport for the local KISS terminal.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for the Local Terminal Stream. An APRS client paired over Bluetooth
//! SPP shows up as a serial device (`/dev/rfcomm0` on Linux, a `COMn` port on
//! Windows); a wired TNC-style client uses a USB serial adapter. Both speak
//! KISS at 8N1.
//!
//! # Example
//!
//! ```no_run
//! use loraprs_transport::SerialTransport;
//! use loraprs_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> loraprs_core::Result<()> {
//! let mut terminal = SerialTransport::open("/dev/rfcomm0", 115_200).await?;
//!
//! // Echo a heard packet as a KISS data frame
//! terminal.send(&[0xC0, 0x00, 0x41, 0xC0]).await?;
//!
//! let mut buf = [0u8; 256];
//! let n = terminal.receive(&mut buf, Duration::from_millis(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use loraprs_core::error::{Error, Result};
use loraprs_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Serial port configuration for the terminal link.
///
/// Data format is fixed at 8 data bits, 1 stop bit, no parity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate. Ignored by RFCOMM devices but required by the OS.
    pub baud_rate: u32,
    /// Flow control (typically `None`; some USB TNC cables need RTS/CTS).
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            flow_control: FlowControl::None,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial transport for the KISS terminal.
pub struct SerialTransport {
    /// The underlying serial stream, `None` after `close()`.
    port: Option<SerialStream>,
    /// Device path for logging.
    port_name: String,
}

impl SerialTransport {
    /// Open a serial device with the given baud rate and no flow control.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial device with full configuration control.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            flow_control = ?config.flow_control,
            "Opening terminal serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open terminal serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Terminal serial port opened");

        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// Get the device path of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, bytes = data.len(), "Writing to terminal");

        port.write_all(data).await.map_err(map_io_error)?;
        port.flush().await.map_err(map_io_error)?;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(0)) => {
                // The RFCOMM peer hung up.
                tracing::warn!(port = %self.port_name, "Terminal closed the link (0 bytes read)");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = ?&buf[..n],
                    "Read from terminal"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Terminal read failed");
                Err(map_io_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            tracing::info!(port = %self.port_name, "Terminal serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

/// Map a terminal I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

//! # P1 Serial Communication
//!
//! This module provides the transport side of the P1 port: connecting to
//! the serial device and feeding received chunks into a [`P1Decoder`]. The
//! decoder itself performs no I/O; this handle is the collaborator that
//! supplies raw bytes.

use crate::error::P1Error;
use crate::p1::decoder::P1Decoder;
use crate::p1::gas_clock::HostClock;
use crate::p1::reading::ReadingSink;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;

/// Configuration for the P1 serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        // DSMR 4.0+ P1 ports run 115200 8N1
        SerialConfig {
            baudrate: 115200,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Represents a handle to the P1 serial connection, encapsulating the
/// tokio_serial::SerialStream.
pub struct P1DeviceHandle {
    port: tokio_serial::SerialStream,
}

impl P1DeviceHandle {
    /// Establishes a connection to the P1 port using the provided port name
    /// and default settings.
    pub async fn connect(port_name: &str) -> Result<P1DeviceHandle, P1Error> {
        Self::connect_with_config(port_name, SerialConfig::default()).await
    }

    /// Establishes a connection with custom config.
    pub async fn connect_with_config(
        port_name: &str,
        config: SerialConfig,
    ) -> Result<P1DeviceHandle, P1Error> {
        let port = tokio_serial::new(port_name, config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(config.timeout)
            .open_native_async()
            .map_err(|e| P1Error::SerialPortError(e.to_string()))?;

        Ok(P1DeviceHandle { port })
    }

    /// Read chunks from the port and feed them to the decoder until the
    /// port reports end of stream. Readings go to `sink` as they decode.
    pub async fn monitor<C: HostClock>(
        &mut self,
        decoder: &mut P1Decoder<C>,
        rate_limit_secs: i64,
        disable_crc: bool,
        sink: &mut dyn ReadingSink,
    ) -> Result<(), P1Error> {
        let mut buf = [0u8; 512];
        loop {
            let n = self
                .port
                .read(&mut buf)
                .await
                .map_err(|e| P1Error::SerialPortError(e.to_string()))?;
            if n == 0 {
                return Ok(());
            }
            decoder.feed(&buf[..n], rate_limit_secs, disable_crc, sink);
        }
    }
}

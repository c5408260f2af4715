//! # P1 Error Handling
//!
//! This module defines the P1Error enum, which represents the different error
//! types that can occur in the p1-rs crate. Decoding errors are non-fatal:
//! the decoder logs them, discards the current telegram, and resumes cleanly
//! on the next byte.

use thiserror::Error;

/// Represents the different error types that can occur in the P1 crate.
#[derive(Debug, Error)]
pub enum P1Error {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// A line whose value field is undelimited, oversized, or not a number.
    #[error("{0}")]
    MalformedLine(String),

    /// The message buffer filled before the telegram end marker was seen.
    #[error("Telegram oversized")]
    OversizedTelegram,

    /// The telegram CRC trailer does not match the computed checksum.
    #[error("Invalid checksum: expected {expected:04X}, calculated {calculated:04X}")]
    ChecksumMismatch { expected: u16, calculated: u16 },

    /// A new start marker arrived while the previous telegram was incomplete.
    #[error("New telegram started while previous one was incomplete")]
    StaleTelegram,

    /// The gas meter reported a timestamp that cannot be parsed.
    #[error("Invalid gas meter timestamp: {0}")]
    InvalidTimestamp(String),

    /// A catch-all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}

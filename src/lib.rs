//! # p1-rs - A Rust Crate for DSMR P1 Smart Meter Telegram Decoding
//!
//! The p1-rs crate decodes telegrams emitted by a utility smart meter over
//! its local P1 port, following the DSMR telegram format used by
//! residential electricity and gas meters (versions 2.x and 4.x+).
//!
//! ## Features
//!
//! - Reconstruct telegram and line boundaries from arbitrarily chunked
//!   byte input (one byte, one line, or a full telegram per chunk)
//! - Validate DSMR 4.0+ message integrity via the reflected CRC-16
//! - Extract typed power, gas, and voltage readings from the fixed but
//!   versioned P1 field set
//! - Reconcile the gas meter's self-reported timestamp against the host
//!   clock to suppress duplicate and stale gas samples
//! - Connect to the P1 port over a serial connection
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```rust
//! use p1_rs::{P1Decoder, PowerReading, GasReading, VoltageReading, ReadingSink};
//!
//! struct PrintSink;
//!
//! impl ReadingSink for PrintSink {
//!     fn power_reading(&mut self, reading: &PowerReading) {
//!         println!("power: {reading:?}");
//!     }
//!     fn voltage_reading(&mut self, reading: &VoltageReading) {
//!         println!("voltage: {reading:?}");
//!     }
//!     fn gas_reading(&mut self, reading: &GasReading) {
//!         println!("gas: {reading:?}");
//!     }
//! }
//!
//! let mut decoder = P1Decoder::new();
//! let mut sink = PrintSink;
//! decoder.feed(b"/ISK5\\2M550T-1009\r\n", 10, false, &mut sink);
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod p1;

pub use crate::error::P1Error;
pub use crate::logging::{init_logger, log_info};

// Core P1 types
pub use p1::crc::crc16_arc;
pub use p1::decoder::P1Decoder;
pub use p1::gas_clock::{GasClockSync, HostClock, LocalTime, SystemClock};
pub use p1::reading::{GasReading, PowerReading, ReadingSink, VoltageReading};
pub use p1::serial::{P1DeviceHandle, SerialConfig};

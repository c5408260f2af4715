//! The p1 module contains the components responsible for the core DSMR P1
//! protocol implementation: telegram framing, line matching, CRC
//! validation, gas clock synchronization, and serial communication.

pub mod crc;
pub mod decoder;
pub mod gas_clock;
pub mod matcher;
pub mod reading;
pub mod rules;
pub mod serial;

pub use decoder::P1Decoder;
pub use gas_clock::{GasClockSync, HostClock, LocalTime, SystemClock};
pub use reading::{GasReading, PowerReading, ReadingSink, VoltageReading};
pub use serial::{P1DeviceHandle, SerialConfig};

//! Reading types handed to the consumer sink, and the sink trait itself.
//!
//! One `PowerReading` and up to three `VoltageReading`s are emitted per
//! qualifying telegram end; a `GasReading` is emitted only when the gas
//! clock synchronizer accepts the sample.

use serde::{Deserialize, Serialize};

/// Cumulative and instantaneous electricity readings for one meter.
///
/// All values are scaled integers in thousandths of the meter's reported
/// unit (kWh counters become Wh, kW become W).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerReading {
    pub device_id: u8,
    /// Cumulative usage, tariff 1
    pub usage_tariff1: u32,
    /// Cumulative usage, tariff 2
    pub usage_tariff2: u32,
    /// Cumulative delivery back to the grid, tariff 1
    pub deliv_tariff1: u32,
    /// Cumulative delivery back to the grid, tariff 2
    pub deliv_tariff2: u32,
    /// Instantaneous usage
    pub usage_current: u32,
    /// Instantaneous delivery
    pub deliv_current: u32,
}

impl Default for PowerReading {
    fn default() -> Self {
        PowerReading {
            device_id: 1,
            usage_tariff1: 0,
            usage_tariff2: 0,
            deliv_tariff1: 0,
            deliv_tariff2: 0,
            usage_current: 0,
            deliv_current: 0,
        }
    }
}

/// Phase voltage reading (DSMR v5 meters report these).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageReading {
    pub device_id: u8,
    /// Phase number, 1 through 3
    pub phase: u8,
    pub volts: f32,
}

/// Cumulative gas usage reading from the M-Bus sub-channel meter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasReading {
    pub device_id: u8,
    /// Cumulative usage, scaled ×1000
    pub usage: u32,
    /// Timestamp string as reported by the gas meter
    pub timestamp: String,
}

/// Consumer interface receiving decoded readings.
///
/// Calls are synchronous; a slow sink blocks the feeding thread but cannot
/// corrupt decoder state.
pub trait ReadingSink {
    fn power_reading(&mut self, reading: &PowerReading);
    fn voltage_reading(&mut self, reading: &VoltageReading);
    fn gas_reading(&mut self, reading: &GasReading);
}

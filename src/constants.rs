//! DSMR P1 Protocol Constants
//!
//! This module defines constants used in the P1 telegram decoder,
//! based on the DSMR P1 companion standard (versions 2.x and 4.x+).

/// Telegram start marker (`/`), first byte of the meter identification line
pub const TELEGRAM_START: u8 = 0x2F;

/// Telegram end marker (`!`), terminates the message body; an optional
/// 4-hex-digit CRC trailer follows on the same line
pub const TELEGRAM_END: u8 = 0x21;

/// Capacity of the message buffer used for CRC computation
pub const MESSAGE_BUFFER_SIZE: usize = 1400;

/// Capacity of the in-progress line buffer
pub const LINE_BUFFER_SIZE: usize = 128;

/// Chunk length above which a message-buffer overflow is unambiguously a
/// full telegram rather than a partial read, and worth logging
pub const FULL_TELEGRAM_THRESHOLD: usize = 400;

/// Maximum length of a value field between its start offset and the
/// `*`/`)` delimiter
pub const MAX_VALUE_LEN: usize = 19;

// ----------------------------------------------------------------------------
// CRC-16 (DSMR 4.0+ telegram checksum)
// ----------------------------------------------------------------------------

/// CRC-16/ARC polynomial (x^16 + x^15 + x^2 + 1)
pub const CRC16_ARC: u16 = 0x8005;

/// Reflected form of the CRC-16/ARC polynomial
pub const CRC16_ARC_REFL: u16 = 0xA001;

// ----------------------------------------------------------------------------
// Sanity ceilings and emission cadence
// ----------------------------------------------------------------------------

/// Instantaneous power readings (scaled, W) at or above this value are
/// implausible and silently ignored
pub const POWER_SANITY_MAX: u32 = 17250;

/// Voltage readings (V) at or above this value are implausible and
/// silently ignored
pub const VOLTAGE_SANITY_MAX: f32 = 300.0;

/// Minimum interval between gas emissions for an unchanged value, and the
/// step by which the gas accept time advances; also the clock skew at
/// which synchronization to the gas meter clock is abandoned
pub const GAS_INTERVAL_SECS: i64 = 300;

/// M-Bus device type code identifying a gas meter on a sub-channel
pub const MBUS_DEVICE_TYPE_GAS: u32 = 3;

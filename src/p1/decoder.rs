//! Telegram framing and decoder state.
//!
//! [`P1Decoder`] is the per-meter streaming state machine. `feed()` accepts
//! a byte chunk of any size — one byte, one line, or a whole telegram —
//! reconstructs message and line boundaries, drives CRC validation and line
//! matching, and triggers emission as a side effect. All failures discard
//! the current telegram and reset to idle; nothing propagates to the
//! caller.

use bytes::{BufMut, BytesMut};
use log::warn;

use crate::constants::{
    FULL_TELEGRAM_THRESHOLD, GAS_INTERVAL_SECS, LINE_BUFFER_SIZE, MESSAGE_BUFFER_SIZE,
    TELEGRAM_END, TELEGRAM_START,
};
use crate::error::P1Error;
use crate::p1::crc::crc16_arc;
use crate::p1::gas_clock::{GasClockSync, HostClock, SystemClock};
use crate::p1::reading::{GasReading, PowerReading, ReadingSink, VoltageReading};

/// Streaming decoder for one physical meter's P1 port.
///
/// Create one instance per meter connection; it persists across telegrams
/// and is re-armed by each telegram's start marker. Instances share no
/// state and need no synchronization.
pub struct P1Decoder<C: HostClock = SystemClock> {
    pub(crate) clock: C,

    /// Current telegram from start marker through end marker, CRC input only
    pub(crate) message_buffer: BytesMut,
    /// Current in-progress line
    pub(crate) line_buffer: BytesMut,
    /// 0 = no telegram in progress; lines 17/18 carry the legacy gas sample
    pub(crate) line_count: u32,
    pub(crate) end_marker_seen: bool,
    /// A carriage return was observed, so framing is byte-exact
    pub(crate) cr_seen: bool,

    /// DSMR version, selects the expected gas line format
    pub(crate) protocol_version: u8,
    /// M-Bus sub-channel carrying the gas meter, discovered once
    pub(crate) gas_bus_channel: Option<char>,
    /// OBIS prefix for gas lines, parameterized by the discovered channel
    pub(crate) gas_code_prefix: String,
    /// Timestamp string of the pending gas sample
    pub(crate) gas_timestamp: String,
    pub(crate) gas_sync: GasClockSync,

    pub(crate) power: PowerReading,
    pub(crate) voltage: [Option<f32>; 3],
    /// Pending cumulative gas usage, scaled ×1000
    pub(crate) gas_usage: u32,

    pub(crate) last_gas_value: u32,
    pub(crate) last_gas_emit_time: i64,
    pub(crate) last_power_emit_time: i64,
}

impl P1Decoder<SystemClock> {
    /// Create a decoder driven by the system wall clock.
    pub fn new() -> Self {
        P1Decoder::with_clock(SystemClock)
    }
}

impl Default for P1Decoder<SystemClock> {
    fn default() -> Self {
        P1Decoder::new()
    }
}

impl<C: HostClock> P1Decoder<C> {
    /// Create a decoder with a custom host clock.
    pub fn with_clock(clock: C) -> Self {
        P1Decoder {
            clock,
            message_buffer: BytesMut::with_capacity(MESSAGE_BUFFER_SIZE),
            line_buffer: BytesMut::with_capacity(LINE_BUFFER_SIZE),
            line_count: 0,
            end_marker_seen: false,
            cr_seen: false,
            protocol_version: 2,
            gas_bus_channel: None,
            gas_code_prefix: "0-n".to_string(),
            gas_timestamp: String::new(),
            gas_sync: GasClockSync::new(),
            power: PowerReading::default(),
            voltage: [None; 3],
            gas_usage: 0,
            last_gas_value: 0,
            last_gas_emit_time: 0,
            last_power_emit_time: 0,
        }
    }

    /// Reset all state to initial values, as on a fresh connection.
    pub fn reset(&mut self) {
        self.message_buffer.clear();
        self.line_buffer.clear();
        self.line_count = 0;
        self.end_marker_seen = false;
        self.cr_seen = false;
        self.protocol_version = 2;
        self.gas_bus_channel = None;
        self.gas_code_prefix = "0-n".to_string();
        self.gas_timestamp.clear();
        self.gas_sync.reset();
        self.power = PowerReading::default();
        self.voltage = [None; 3];
        self.gas_usage = 0;
        self.last_gas_value = 0;
        self.last_gas_emit_time = 0;
        self.last_power_emit_time = 0;
    }

    /// DSMR version currently in effect.
    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// M-Bus sub-channel of the gas meter, once discovered.
    pub fn gas_bus_channel(&self) -> Option<char> {
        self.gas_bus_channel
    }

    /// Gas clock synchronizer state.
    pub fn gas_sync(&self) -> &GasClockSync {
        &self.gas_sync
    }

    /// Process a chunk of bytes from the transport.
    ///
    /// Power emissions are rate-limited to once per `rate_limit_secs`.
    /// With `disable_crc` set, `!`-lines are matched without checksum
    /// validation.
    pub fn feed(
        &mut self,
        data: &[u8],
        rate_limit_secs: i64,
        disable_crc: bool,
        sink: &mut dyn ReadingSink,
    ) {
        let mut ii = 0;

        // a new message should not start with stray line terminators, but
        // just in case it does (a crude check is sufficient here)
        while self.line_count == 0 && ii < data.len() && data[ii] < 0x10 {
            ii += 1;
        }

        // re-arm on a start marker, flushing any pending end line first
        if data.get(ii) == Some(&TELEGRAM_START) {
            if self.line_buffer.first() == Some(&TELEGRAM_END) && self.line_count > 0 {
                warn!("P1: {}", P1Error::StaleTelegram);
                if disable_crc || self.check_crc() {
                    let line = String::from_utf8_lossy(&self.line_buffer).into_owned();
                    if let Err(e) = self.match_line(&line, rate_limit_secs, sink) {
                        warn!("P1: dismiss stale message - {e}");
                    }
                }
            }
            self.line_count = 1;
            self.line_buffer.clear();
            self.message_buffer.clear();
            self.end_marker_seen = false;
        }

        // assemble the complete message for CRC computation; the CRC
        // trailer after the end marker is excluded
        while ii < data.len()
            && self.line_count > 0
            && !self.end_marker_seen
            && self.message_buffer.len() < MESSAGE_BUFFER_SIZE
        {
            let c = data[ii];
            self.message_buffer.put_u8(c);
            if c == TELEGRAM_END {
                self.end_marker_seen = true;
            } else {
                ii += 1;
            }
        }

        if self.message_buffer.len() == MESSAGE_BUFFER_SIZE {
            // only log when this is clearly framing desync rather than a
            // normal partial read
            if data.len() > FULL_TELEGRAM_THRESHOLD || data.first() == Some(&TELEGRAM_END) {
                warn!("P1: dismiss incoming - {}", P1Error::OversizedTelegram);
            }
            self.line_count = 0;
            return;
        }

        // split the same chunk into lines; stop on any validation failure
        let mut ii = 0;
        while ii < data.len() && self.line_count > 0 {
            let c = data[ii];
            ii += 1;

            if c == 0x0d {
                self.cr_seen = true;
                continue;
            }

            if c == 0x0a {
                // line complete: dispatch it, then clear
                self.line_count += 1;
                if !self.line_buffer.is_empty() && self.line_buffer.len() < LINE_BUFFER_SIZE {
                    // don't try to match empty or oversized lines
                    if self.line_buffer[0] == TELEGRAM_END && !disable_crc && !self.check_crc() {
                        self.line_count = 0;
                        self.line_buffer.clear();
                        return;
                    }
                    let line = String::from_utf8_lossy(&self.line_buffer).into_owned();
                    if let Err(e) = self.match_line(&line, rate_limit_secs, sink) {
                        warn!("P1: dismiss incoming - {e}");
                        self.line_count = 0;
                    }
                }
                self.line_buffer.clear();
            } else if self.line_buffer.len() < LINE_BUFFER_SIZE {
                self.line_buffer.put_u8(c);
            }
        }
    }

    /// Validate the CRC trailer held in the line buffer against the
    /// assembled message.
    pub(crate) fn check_crc(&self) -> bool {
        let line = &self.line_buffer[..];

        // pre-DSMRv4 messages carry no checksum
        if line.len() < 2 {
            return true;
        }

        if line.len() > 5 {
            warn!("P1: CRC value in message has trailing characters - skipping CRC validation");
            return true;
        }

        if !self.cr_seen {
            warn!("P1: you appear to have middleware that changes the message content - skipping CRC validation");
            return true;
        }

        let trailer = String::from_utf8_lossy(&line[1..]);
        let Ok(expected) = u16::from_str_radix(&trailer, 16) else {
            warn!("P1: dismiss incoming - CRC trailer is not a hex value");
            return false;
        };

        let calculated = crc16_arc(&self.message_buffer);
        if calculated != expected {
            warn!("P1: dismiss incoming - {}", P1Error::ChecksumMismatch { expected, calculated });
            return false;
        }
        true
    }

    /// End-of-telegram emission: rate-limited power and voltages, then the
    /// gas sample through the clock synchronizer.
    pub(crate) fn end_of_telegram(&mut self, rate_limit_secs: i64, sink: &mut dyn ReadingSink) {
        let now = self.clock.epoch_seconds();
        if now - self.last_power_emit_time >= rate_limit_secs {
            self.last_power_emit_time = now;
            sink.power_reading(&self.power);

            // L2/L3 only follow a present L1, preserving phase ordering
            if let Some(v1) = self.voltage[0] {
                sink.voltage_reading(&VoltageReading { device_id: 0, phase: 1, volts: v1 });
                if let Some(v2) = self.voltage[1] {
                    sink.voltage_reading(&VoltageReading { device_id: 0, phase: 2, volts: v2 });
                    if let Some(v3) = self.voltage[2] {
                        sink.voltage_reading(&VoltageReading { device_id: 0, phase: 3, volts: v3 });
                    }
                }
            }

            // only update gas on a new value, or when 5 minutes have passed
            if self.gas_usage > 0
                && (self.gas_usage != self.last_gas_value
                    || now - self.last_gas_emit_time >= GAS_INTERVAL_SECS)
                && self.gas_sync.evaluate(&self.clock, now, &self.gas_timestamp)
            {
                self.last_gas_emit_time = now;
                self.last_gas_value = self.gas_usage;
                sink.gas_reading(&GasReading {
                    device_id: 1,
                    usage: self.gas_usage,
                    timestamp: self.gas_timestamp.clone(),
                });
            }
        }
        self.line_count = 0;
    }
}

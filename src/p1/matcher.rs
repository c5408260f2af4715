//! Line matching against the field rule table.
//!
//! One completed line is matched against [`RULE_TABLE`] in order; the
//! first rule whose pattern matches wins. Value fields sit between a fixed
//! start offset and the next `*` or `)` delimiter, are bounded to 19
//! characters, and must parse as the field's numeric type — anything else
//! rejects the whole telegram. Implausible values (instantaneous power and
//! voltage beyond their physical ceilings) are silently ignored without
//! aborting the telegram.

use log::{debug, info};
use nom::bytes::complete::take_till;
use nom::IResult;

use crate::constants::{MAX_VALUE_LEN, MBUS_DEVICE_TYPE_GAS, POWER_SANITY_MAX, VOLTAGE_SANITY_MAX};
use crate::error::P1Error;
use crate::p1::decoder::P1Decoder;
use crate::p1::gas_clock::HostClock;
use crate::p1::reading::ReadingSink;
use crate::p1::rules::{Field, Rule, RULE_TABLE};

/// Take the value field up to the `*`/`)` delimiter.
fn take_value(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == '*' || c == ')')(input)
}

/// Extract the value substring of `line` starting at `start`.
fn extract_value(line: &str, start: usize) -> Result<&str, P1Error> {
    let tail = line.get(start..).unwrap_or("");
    let (rest, value) = take_value(tail)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| malformed(line, "value scan failed"))?;
    if rest.is_empty() {
        return Err(malformed(line, "value is not delimited"));
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(malformed(line, "value is oversized"));
    }
    Ok(value)
}

fn malformed(line: &str, reason: &str) -> P1Error {
    P1Error::MalformedLine(format!("{reason} in line \"{line}\""))
}

/// Parse a value as a ×1000-scaled integer.
fn parse_scaled(value: &str, line: &str) -> Result<u32, P1Error> {
    let v: f64 = value
        .parse()
        .map_err(|_| malformed(line, "value is not a number"))?;
    Ok((v * 1000.0).round() as u32)
}

/// Parse a value as a plain float (voltages).
fn parse_float(value: &str, line: &str) -> Result<f32, P1Error> {
    value
        .parse()
        .map_err(|_| malformed(line, "value is not a number"))
}

impl<C: HostClock> P1Decoder<C> {
    /// Match one completed line, mutating decoder state and possibly
    /// triggering emission (end-of-telegram line). An error means the
    /// telegram must be discarded.
    pub(crate) fn match_line(
        &mut self,
        line: &str,
        rate_limit_secs: i64,
        sink: &mut dyn ReadingSink,
    ) -> Result<(), P1Error> {
        for rule in RULE_TABLE {
            match *rule {
                Rule::Start { prefix } => {
                    if line.starts_with(prefix) {
                        // start of data; nothing else is processed on this line
                        self.line_count = 1;
                        return Ok(());
                    }
                }
                Rule::End { prefix } => {
                    if line.starts_with(prefix) {
                        self.end_of_telegram(rate_limit_secs, sink);
                        return Ok(());
                    }
                }
                Rule::Fixed { field, prefix, value_start } => {
                    if line.starts_with(prefix) {
                        self.apply_fixed(field, line, value_start)?;
                        return Ok(());
                    }
                }
                Rule::DeviceType { prefix, value_start } => {
                    if self.gas_bus_channel.is_none() {
                        // the channel byte varies, match from the colon on
                        if line.get(3..).is_some_and(|t| t.starts_with(&prefix[3..])) {
                            self.apply_device_type(line, value_start)?;
                        }
                        // channel still unknown: the gas alternates below
                        // cannot be disambiguated, stop scanning this line
                        return Ok(());
                    }
                }
                Rule::GasSampleV4 { prefix, value_start, ts_start, ts_len } => {
                    if line.starts_with(&self.gas_rule_prefix(prefix)) {
                        self.apply_gas_v4(line, value_start, ts_start, ts_len)?;
                        return Ok(());
                    }
                    if self.protocol_version >= 4 {
                        // a v4+ meter never sends the legacy two-line form
                        return Ok(());
                    }
                }
                Rule::GasTimestamp { prefix, value_start } => {
                    if line.starts_with(&self.gas_rule_prefix(prefix)) {
                        self.line_count = 17;
                        self.gas_timestamp = extract_value(line, value_start)?.to_string();
                        return Ok(());
                    }
                }
                Rule::GasUsageLegacy { prefix, value_start } => {
                    if self.line_count == 18 && line.starts_with(prefix) {
                        self.gas_usage = parse_scaled(extract_value(line, value_start)?, line)?;
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    /// Replace the `0-n` placeholder in a gas rule prefix with the
    /// discovered channel prefix.
    fn gas_rule_prefix(&self, prefix: &'static str) -> String {
        format!("{}{}", self.gas_code_prefix, &prefix[3..])
    }

    fn apply_fixed(&mut self, field: Field, line: &str, value_start: usize) -> Result<(), P1Error> {
        let value = extract_value(line, value_start)?;
        debug!("P1: field {field:?}, value {value}");

        match field {
            Field::Version => {
                let first = value.as_bytes().first().copied().unwrap_or(0);
                if !first.is_ascii_digit() {
                    return Err(malformed(line, "version is not a digit"));
                }
                self.protocol_version = first - b'0';
            }
            Field::PowerUsage1 => self.power.usage_tariff1 = parse_scaled(value, line)?,
            Field::PowerUsage2 => self.power.usage_tariff2 = parse_scaled(value, line)?,
            Field::PowerDeliv1 => self.power.deliv_tariff1 = parse_scaled(value, line)?,
            Field::PowerDeliv2 => self.power.deliv_tariff2 = parse_scaled(value, line)?,
            Field::UsageCurrent => {
                let watt = parse_scaled(value, line)?;
                if watt < POWER_SANITY_MAX {
                    self.power.usage_current = watt;
                }
            }
            Field::DelivCurrent => {
                let watt = parse_scaled(value, line)?;
                if watt < POWER_SANITY_MAX {
                    self.power.deliv_current = watt;
                }
            }
            Field::VoltageL1 => {
                let volt = parse_float(value, line)?;
                if volt < VOLTAGE_SANITY_MAX {
                    self.voltage[0] = Some(volt);
                }
            }
            Field::VoltageL2 => {
                let volt = parse_float(value, line)?;
                if volt < VOLTAGE_SANITY_MAX {
                    self.voltage[1] = Some(volt);
                }
            }
            Field::VoltageL3 => {
                let volt = parse_float(value, line)?;
                if volt < VOLTAGE_SANITY_MAX {
                    self.voltage[2] = Some(volt);
                }
            }
        }
        Ok(())
    }

    /// Device-type line while the gas channel is still unknown: type 3
    /// identifies the gas meter and fixes the channel for the rest of the
    /// decoder's lifetime.
    fn apply_device_type(&mut self, line: &str, value_start: usize) -> Result<(), P1Error> {
        let value = extract_value(line, value_start)?;
        let device_type: f64 = value
            .parse()
            .map_err(|_| malformed(line, "value is not a number"))?;
        if device_type.round() as u32 == MBUS_DEVICE_TYPE_GAS {
            let channel = line.as_bytes()[2] as char;
            self.gas_bus_channel = Some(channel);
            self.gas_code_prefix = format!("0-{channel}");
            info!("P1: found gas meter on M-Bus channel {channel}");
        }
        Ok(())
    }

    /// DSMR v4+ gas sample: usage value plus an embedded timestamp at a
    /// fixed offset within the same line.
    fn apply_gas_v4(
        &mut self,
        line: &str,
        value_start: usize,
        ts_start: usize,
        ts_len: usize,
    ) -> Result<(), P1Error> {
        self.gas_usage = parse_scaled(extract_value(line, value_start)?, line)?;
        let ts_end = line.len().min(ts_start + ts_len);
        self.gas_timestamp = line.get(ts_start..ts_end).unwrap_or("").to_string();
        Ok(())
    }
}

//! The ordered field rule table binding OBIS-style code prefixes to
//! telegram fields.
//!
//! The matcher applies the first rule whose pattern matches and stops
//! there. Order is significant: the device-type and gas-sample variants at
//! the end are mutually exclusive alternates, disambiguated by protocol
//! version and by whether the gas M-Bus channel has been discovered, and
//! must stay in this order at the end of the table.
//!
//! Gas rule prefixes carry the `0-n` channel placeholder; the matcher
//! substitutes the discovered channel character before comparing.

/// Numeric fields written by a [`Rule::Fixed`] match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Single-digit DSMR version
    Version,
    /// Cumulative usage, tariff 1
    PowerUsage1,
    /// Cumulative usage, tariff 2
    PowerUsage2,
    /// Cumulative delivery, tariff 1
    PowerDeliv1,
    /// Cumulative delivery, tariff 2
    PowerDeliv2,
    /// Instantaneous usage
    UsageCurrent,
    /// Instantaneous delivery
    DelivCurrent,
    VoltageL1,
    VoltageL2,
    VoltageL3,
}

/// One pattern-to-field binding. Each variant carries its own match
/// semantics; the matcher dispatches on the variant with explicit guards
/// instead of table index arithmetic.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Telegram identification line; arms the line counter and suppresses
    /// all other matching for that line.
    Start { prefix: &'static str },
    /// End-of-telegram line; triggers emission.
    End { prefix: &'static str },
    /// Literal OBIS prefix with a numeric value at a fixed start offset.
    Fixed {
        field: Field,
        prefix: &'static str,
        value_start: usize,
    },
    /// M-Bus device type line, used to discover the gas sub-channel.
    /// Only consulted while the channel is still unknown.
    DeviceType { prefix: &'static str, value_start: usize },
    /// DSMR v4+ gas sample carrying an embedded timestamp.
    GasSampleV4 {
        prefix: &'static str,
        value_start: usize,
        ts_start: usize,
        ts_len: usize,
    },
    /// DSMR v2/v3 gas timestamp line (line 17 of the telegram).
    GasTimestamp { prefix: &'static str, value_start: usize },
    /// DSMR v2/v3 gas usage line (line 18, bare parenthesis prefix).
    GasUsageLegacy { prefix: &'static str, value_start: usize },
}

/// Ordered rule table for the fixed P1 field set.
pub const RULE_TABLE: &[Rule] = &[
    Rule::Start { prefix: "/" },
    Rule::End { prefix: "!" },
    Rule::Fixed { field: Field::Version, prefix: "1-3:0.2.8", value_start: 10 },
    Rule::Fixed { field: Field::PowerUsage1, prefix: "1-0:1.8.1", value_start: 10 },
    Rule::Fixed { field: Field::PowerUsage2, prefix: "1-0:1.8.2", value_start: 10 },
    Rule::Fixed { field: Field::PowerDeliv1, prefix: "1-0:2.8.1", value_start: 10 },
    Rule::Fixed { field: Field::PowerDeliv2, prefix: "1-0:2.8.2", value_start: 10 },
    Rule::Fixed { field: Field::UsageCurrent, prefix: "1-0:1.7.0", value_start: 10 },
    Rule::Fixed { field: Field::DelivCurrent, prefix: "1-0:2.7.0", value_start: 10 },
    Rule::Fixed { field: Field::VoltageL1, prefix: "1-0:32.7.0", value_start: 11 },
    Rule::Fixed { field: Field::VoltageL2, prefix: "1-0:52.7.0", value_start: 11 },
    Rule::Fixed { field: Field::VoltageL3, prefix: "1-0:72.7.0", value_start: 11 },
    Rule::DeviceType { prefix: "0-n:24.1.0", value_start: 11 },
    Rule::GasSampleV4 { prefix: "0-n:24.2.1", value_start: 26, ts_start: 11, ts_len: 13 },
    Rule::GasTimestamp { prefix: "0-n:24.3.0", value_start: 11 },
    Rule::GasUsageLegacy { prefix: "(", value_start: 1 },
];

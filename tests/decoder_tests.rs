//! Integration tests for the telegram framer and line matcher: end-to-end
//! decoding, chunked delivery, rate limiting, discard paths, and M-Bus
//! channel discovery.


use mock_support::{seal, v4_telegram, RecordingSink, TestClock};
use p1_rs::P1Decoder;

/// 2020-06-15 12:00:00 UTC; 13:00 local on the test clock.
const T: i64 = 1_592_222_400;

/// Gas timestamp well behind the test clock, so samples are accepted
/// immediately.
const PAST_GAS_TS: &str = "200101000000W";

fn decoder_at(epoch: i64) -> (P1Decoder<TestClock>, TestClock) {
    let clock = TestClock::new(epoch);
    (P1Decoder::with_clock(clock.clone()), clock)
}

/// Tests that a complete v5 telegram decodes power, voltage, and gas in
/// one pass.
#[test]
fn test_decode_full_telegram() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    decoder.feed(&v4_telegram(PAST_GAS_TS), 10, false, &mut sink);

    assert_eq!(sink.power.len(), 1);
    let power = &sink.power[0];
    assert_eq!(power.usage_tariff1, 123_456_789);
    assert_eq!(power.usage_tariff2, 234_567_891);
    assert_eq!(power.deliv_tariff1, 123_456);
    assert_eq!(power.deliv_tariff2, 234_567);
    assert_eq!(power.usage_current, 244);
    assert_eq!(power.deliv_current, 0);

    assert_eq!(sink.voltage.len(), 1);
    assert_eq!(sink.voltage[0].phase, 1);
    assert!((sink.voltage[0].volts - 230.1).abs() < 0.001);

    assert_eq!(sink.gas.len(), 1);
    assert_eq!(sink.gas[0].usage, 12_785_123);
    assert_eq!(sink.gas[0].timestamp, PAST_GAS_TS);

    assert_eq!(decoder.protocol_version(), 5);
    assert_eq!(decoder.gas_bus_channel(), Some('1'));
}

/// Tests that an immediate duplicate telegram is suppressed by the power
/// rate limit, and emitted again once the interval has elapsed.
#[test]
fn test_rate_limit_suppresses_duplicate() {
    let (mut decoder, clock) = decoder_at(T);
    let mut sink = RecordingSink::new();
    let telegram = v4_telegram(PAST_GAS_TS);

    decoder.feed(&telegram, 10, false, &mut sink);
    decoder.feed(&telegram, 10, false, &mut sink);
    assert_eq!(sink.power.len(), 1);
    assert_eq!(sink.gas.len(), 1);

    clock.advance(10);
    decoder.feed(&telegram, 10, false, &mut sink);
    assert_eq!(sink.power.len(), 2);
    // unchanged gas value within five minutes stays suppressed
    assert_eq!(sink.gas.len(), 1);
}

/// Tests that feeding a telegram one byte at a time yields the same
/// readings as feeding it whole.
#[test]
fn test_byte_at_a_time_equals_whole() {
    let telegram = v4_telegram(PAST_GAS_TS);

    let (mut whole, _clock) = decoder_at(T);
    let mut whole_sink = RecordingSink::new();
    whole.feed(&telegram, 10, false, &mut whole_sink);

    let (mut chunked, _clock) = decoder_at(T);
    let mut chunked_sink = RecordingSink::new();
    for byte in &telegram {
        chunked.feed(std::slice::from_ref(byte), 10, false, &mut chunked_sink);
    }

    assert_eq!(whole_sink, chunked_sink);
}

/// Tests that stray line terminators before the start marker are
/// tolerated.
#[test]
fn test_leading_control_bytes_skipped() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    let mut stream = b"\r\n\r\n".to_vec();
    stream.extend_from_slice(&v4_telegram(PAST_GAS_TS));
    decoder.feed(&stream, 10, false, &mut sink);

    assert_eq!(sink.power.len(), 1);
}

/// Tests that an undelimited value discards the telegram without mutating
/// any reading.
#[test]
fn test_undelimited_value_discards_telegram() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    let telegram = b"/ISK5\\2M550T-1009\r\n\r\n1-0:1.8.1(123456.789\r\n!\r\n";
    decoder.feed(telegram, 10, true, &mut sink);

    assert!(sink.power.is_empty());
}

/// Tests that a value longer than 19 characters discards the telegram.
#[test]
fn test_oversized_value_discards_telegram() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    let telegram = b"/ISK5\\2M550T-1009\r\n\r\n1-0:1.8.1(123456789012345678901*kWh)\r\n!\r\n";
    decoder.feed(telegram, 10, true, &mut sink);

    assert!(sink.power.is_empty());
}

/// Tests that a non-numeric value discards the telegram.
#[test]
fn test_non_numeric_value_discards_telegram() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    let telegram = b"/ISK5\\2M550T-1009\r\n\r\n1-0:1.8.1(abc.def*kWh)\r\n!\r\n";
    decoder.feed(telegram, 10, true, &mut sink);

    assert!(sink.power.is_empty());
}

/// Tests that implausible instantaneous power and voltage values are
/// ignored without aborting the telegram.
#[test]
fn test_sanity_ceilings_ignore_implausible_values() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    let telegram =
        b"/ISK5\\2M550T-1009\r\n\r\n1-0:1.7.0(99.999*kW)\r\n1-0:32.7.0(999.9*V)\r\n!\r\n";
    decoder.feed(telegram, 10, true, &mut sink);

    assert_eq!(sink.power.len(), 1);
    assert_eq!(sink.power[0].usage_current, 0);
    assert!(sink.voltage.is_empty());
}

/// Tests that the gas channel is discovered exactly once; later
/// device-type lines with a different channel do not rebind it.
#[test]
fn test_gas_channel_discovered_once() {
    let (mut decoder, clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    decoder.feed(&v4_telegram(PAST_GAS_TS), 0, false, &mut sink);
    assert_eq!(decoder.gas_bus_channel(), Some('1'));

    clock.advance(1);
    let body = "/ISK5\\2M550T-1009\r\n\r\n0-2:24.1.0(003)\r\n!";
    decoder.feed(&seal(body), 0, false, &mut sink);
    assert_eq!(decoder.gas_bus_channel(), Some('1'));
}

/// Tests that a message-buffer overflow discards the telegram and does not
/// corrupt subsequent parsing.
#[test]
fn test_oversized_telegram_discarded_then_recovers() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    decoder.feed(b"/ISK5\\2M550T-1009\r\n", 10, false, &mut sink);
    decoder.feed(&vec![b'A'; 1500], 10, false, &mut sink);
    assert!(sink.power.is_empty());

    decoder.feed(&v4_telegram(PAST_GAS_TS), 10, false, &mut sink);
    assert_eq!(sink.power.len(), 1);
}

/// Tests that a new start marker flushes a pending end line from the
/// previous telegram before re-arming.
#[test]
fn test_stale_telegram_flushed_on_new_start() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    // withhold the line feed after the CRC trailer
    let mut truncated = v4_telegram(PAST_GAS_TS);
    truncated.truncate(truncated.len() - 2);
    decoder.feed(&truncated, 0, false, &mut sink);
    assert!(sink.power.is_empty());

    // the next start marker triggers validation of the pending end line
    decoder.feed(&v4_telegram(PAST_GAS_TS), 0, false, &mut sink);
    assert_eq!(sink.power.len(), 2);
}

/// Tests the legacy v2 two-line gas sample (timestamp on line 17, usage on
/// line 18) with no CRC trailer.
#[test]
fn test_v2_two_line_gas_sample() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    let telegram = b"/ISK5\\2MT382-1003\r\n\
                     \r\n\
                     1-0:1.8.1(00123.456*kWh)\r\n\
                     1-0:1.8.2(00234.567*kWh)\r\n\
                     1-0:2.8.1(00012.345*kWh)\r\n\
                     1-0:2.8.2(00023.456*kWh)\r\n\
                     1-0:1.7.0(0001.23*kW)\r\n\
                     1-0:2.7.0(0000.00*kW)\r\n\
                     0-1:24.1.0(3)\r\n\
                     0-1:24.3.0(200101120000)(00)(60)(1)(0-1:24.2.1)(m3)\r\n\
                     (00123.456)\r\n\
                     !\r\n";
    decoder.feed(telegram, 10, false, &mut sink);

    assert_eq!(decoder.protocol_version(), 2);
    assert_eq!(sink.power.len(), 1);
    assert_eq!(sink.gas.len(), 1);
    assert_eq!(sink.gas[0].usage, 123_456);
    assert_eq!(sink.gas[0].timestamp, "200101120000");
}

/// Tests that a gas value change outside the rate-limited window emits a
/// new gas reading while an unchanged value does not.
#[test]
fn test_gas_emitted_on_value_change() {
    let (mut decoder, clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    decoder.feed(&v4_telegram(PAST_GAS_TS), 0, false, &mut sink);
    assert_eq!(sink.gas.len(), 1);

    // same value, within five minutes: suppressed
    clock.advance(30);
    decoder.feed(&v4_telegram(PAST_GAS_TS), 0, false, &mut sink);
    assert_eq!(sink.gas.len(), 1);

    // changed value: emitted right away
    clock.advance(30);
    let body = "/ISK5\\2M550T-1009\r\n\
                \r\n\
                1-3:0.2.8(50)\r\n\
                0-1:24.2.1(200101000000W)(12790.000*m3)\r\n\
                !";
    decoder.feed(&seal(body), 0, false, &mut sink);
    assert_eq!(sink.gas.len(), 2);
    assert_eq!(sink.gas[1].usage, 12_790_000);
}

/// Tests that reset() restores the decoder to its initial state.
#[test]
fn test_reset_restores_initial_state() {
    let (mut decoder, _clock) = decoder_at(T);
    let mut sink = RecordingSink::new();

    decoder.feed(&v4_telegram(PAST_GAS_TS), 0, false, &mut sink);
    assert_eq!(decoder.protocol_version(), 5);
    assert_eq!(decoder.gas_bus_channel(), Some('1'));

    decoder.reset();
    assert_eq!(decoder.protocol_version(), 2);
    assert_eq!(decoder.gas_bus_channel(), None);
    assert_eq!(decoder.gas_sync().skew_seconds(), 0);
    assert_eq!(decoder.gas_sync().next_accept_epoch(), 0);

    // and it still decodes afterwards
    let mut sink = RecordingSink::new();
    decoder.feed(&v4_telegram(PAST_GAS_TS), 0, false, &mut sink);
    assert_eq!(sink.power.len(), 1);
}

//! Tests for the gas clock synchronizer: skew measurement, deferred
//! acceptance while the meter clock is ahead, and the unconditional-accept
//! degraded mode.


use mock_support::{seal, RecordingSink, TestClock};
use p1_rs::p1::gas_clock::{format_meter_timestamp, GasClockSync};
use p1_rs::{HostClock, P1Decoder};

/// 2020-06-15 12:00:00 UTC; 13:00 local on the test clock.
const T: i64 = 1_592_222_400;

fn meter_ts(clock: &TestClock, epoch: i64) -> String {
    format_meter_timestamp(&clock.local_time(epoch))
}

/// Tests immediate acceptance when the host clock is at or ahead of the
/// meter clock, and the 300-second advance of the accept time.
#[test]
fn test_host_ahead_accepts_immediately() {
    let clock = TestClock::new(T);
    let mut sync = GasClockSync::new();

    let ts = meter_ts(&clock, T - 100);
    assert!(sync.evaluate(&clock, T, &ts));
    assert_eq!(sync.skew_seconds(), 0);
    assert_eq!(sync.next_accept_epoch(), 300);
}

/// Tests that a meter clock 200 seconds ahead records the skew, defers
/// emission until the host catches up, then accepts and advances the
/// accept time by 300 seconds.
#[test]
fn test_small_skew_defers_until_host_catches_up() {
    let clock = TestClock::new(T);
    let mut sync = GasClockSync::new();
    let ts = meter_ts(&clock, T + 200);

    assert!(!sync.evaluate(&clock, T, &ts));
    assert_eq!(sync.skew_seconds(), 200);
    assert_eq!(sync.next_accept_epoch(), T + 200);

    // still before the accept time
    assert!(!sync.evaluate(&clock, T + 199, &ts));

    // host caught up: accept, advance by 300
    assert!(sync.evaluate(&clock, T + 200, &ts));
    assert_eq!(sync.next_accept_epoch(), T + 500);
}

/// Tests that a skew of 300 seconds or more abandons synchronization:
/// every subsequent qualifying sample is accepted unconditionally.
#[test]
fn test_large_skew_abandons_synchronization() {
    let clock = TestClock::new(T);
    let mut sync = GasClockSync::new();
    let ts = meter_ts(&clock, T + 400);

    assert!(!sync.evaluate(&clock, T, &ts));
    assert_eq!(sync.skew_seconds(), 400);

    // degraded mode: accepted without looking at the timestamp
    assert!(sync.evaluate(&clock, T, &ts));
    assert!(sync.evaluate(&clock, T + 1, &meter_ts(&clock, T + 900)));
}

/// Tests that an empty meter timestamp does not block acceptance.
#[test]
fn test_empty_timestamp_accepts() {
    let clock = TestClock::new(T);
    let mut sync = GasClockSync::new();

    assert!(sync.evaluate(&clock, T, ""));
}

/// Tests that an unparseable meter timestamp that sorts ahead of the host
/// time defers the sample without recording a skew.
#[test]
fn test_invalid_timestamp_defers_without_skew() {
    let clock = TestClock::new(T);
    let mut sync = GasClockSync::new();

    assert!(!sync.evaluate(&clock, T, "9x9999999999"));
    assert_eq!(sync.skew_seconds(), 0);
    assert_eq!(sync.next_accept_epoch(), 0);
}

/// Tests the deferred gas path end to end through the decoder: no gas
/// reading while the meter clock is ahead, emission once the host clock
/// reaches the accept time.
#[test]
fn test_decoder_defers_gas_until_clock_catches_up() {
    let clock = TestClock::new(T);
    let mut decoder = P1Decoder::with_clock(clock.clone());
    let mut sink = RecordingSink::new();

    let ts = meter_ts(&clock, T + 200);
    let body = format!(
        "/ISK5\\2M550T-1009\r\n\
         \r\n\
         1-3:0.2.8(50)\r\n\
         1-0:1.8.1(123456.789*kWh)\r\n\
         0-1:24.1.0(003)\r\n\
         0-1:24.2.1({ts})(12785.123*m3)\r\n\
         !"
    );
    let telegram = seal(&body);

    decoder.feed(&telegram, 0, false, &mut sink);
    assert_eq!(sink.power.len(), 1);
    assert!(sink.gas.is_empty());
    assert_eq!(decoder.gas_sync().skew_seconds(), 200);
    assert_eq!(decoder.gas_sync().next_accept_epoch(), T + 200);

    clock.advance(200);
    decoder.feed(&telegram, 0, false, &mut sink);
    assert_eq!(sink.gas.len(), 1);
    assert_eq!(sink.gas[0].usage, 12_785_123);
    assert_eq!(decoder.gas_sync().next_accept_epoch(), T + 500);
}

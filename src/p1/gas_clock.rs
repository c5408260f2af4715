//! Gas meter clock synchronization.
//!
//! The gas meter reports samples with its own timestamp, and its internal
//! clock may run ahead of the host. The synchronizer decides whether a
//! qualifying sample is legitimately new: it compares the host time,
//! formatted in the meter's own timestamp representation, against the
//! meter-reported string, defers emission while the meter clock is ahead,
//! and gives up on synchronization entirely once the measured skew reaches
//! five minutes.
//!
//! Host-clock access goes through the [`HostClock`] trait so the decision
//! logic can be driven by a deterministic clock in tests.

use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use log::{error, info, warn};

use crate::constants::GAS_INTERVAL_SECS;
use crate::error::P1Error;

/// A local calendar time with its daylight-saving flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub naive: NaiveDateTime,
    pub dst: bool,
}

/// Host clock access for the gas sample synchronizer.
pub trait HostClock {
    /// Current host time in seconds since the Unix epoch.
    fn epoch_seconds(&self) -> i64;

    /// Local calendar representation of an epoch instant.
    fn local_time(&self, epoch: i64) -> LocalTime;

    /// Absolute epoch seconds for a local calendar time. `dst` resolves
    /// the ambiguous fall-back hour when the meter reported a DST suffix.
    fn epoch_from_local(&self, local: NaiveDateTime, dst: Option<bool>) -> i64;
}

/// [`HostClock`] backed by the system wall clock and local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl HostClock for SystemClock {
    fn epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn local_time(&self, epoch: i64) -> LocalTime {
        let utc = DateTime::from_timestamp(epoch, 0).unwrap_or(DateTime::UNIX_EPOCH);
        let local = utc.with_timezone(&Local);
        LocalTime {
            naive: local.naive_local(),
            dst: offset_is_dst(&local),
        }
    }

    fn epoch_from_local(&self, local: NaiveDateTime, dst: Option<bool>) -> i64 {
        match Local.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.timestamp(),
            // fall-back hour: the earlier instant is the DST reading
            LocalResult::Ambiguous(earliest, latest) => match dst {
                Some(false) => latest.timestamp(),
                _ => earliest.timestamp(),
            },
            // spring-forward gap: interpret with the current offset
            LocalResult::None => {
                let offset = Local::now().offset().fix().local_minus_utc() as i64;
                local.and_utc().timestamp() - offset
            }
        }
    }
}

/// True when the instant's UTC offset exceeds the zone's standard offset.
fn offset_is_dst(local: &DateTime<Local>) -> bool {
    let year = local.year();
    let standard = midyear_offset(year, 1).min(midyear_offset(year, 7));
    local.offset().fix().local_minus_utc() > standard
}

fn midyear_offset(year: i32, month: u32) -> i32 {
    match Local.with_ymd_and_hms(year, month, 1, 12, 0, 0) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            dt.offset().fix().local_minus_utc()
        }
        LocalResult::None => 0,
    }
}

/// Format a local time the way the gas meter reports timestamps:
/// `yymmddhhmmss` plus a `W` (winter) or `S` (summer) DST suffix.
pub fn format_meter_timestamp(local: &LocalTime) -> String {
    format!(
        "{}{}",
        local.naive.format("%y%m%d%H%M%S"),
        if local.dst { 'S' } else { 'W' }
    )
}

/// Parse a meter-reported timestamp into calendar fields plus the DST flag
/// carried by its optional suffix.
pub fn parse_meter_timestamp(ts: &str) -> Result<(NaiveDateTime, Option<bool>), P1Error> {
    let invalid = || P1Error::InvalidTimestamp(ts.to_string());

    let digits = ts.as_bytes().get(..12).ok_or_else(invalid)?;
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let num = |i: usize| ((digits[i] - b'0') as u32) * 10 + (digits[i + 1] - b'0') as u32;

    let naive = NaiveDate::from_ymd_opt(2000 + num(0) as i32, num(2), num(4))
        .and_then(|d| d.and_hms_opt(num(6), num(8), num(10)))
        .ok_or_else(invalid)?;

    let dst = match ts.as_bytes().get(12) {
        None => None,
        Some(b'W') => Some(false),
        Some(_) => Some(true),
    };
    Ok((naive, dst))
}

/// Decides whether a qualifying gas sample may be emitted now.
///
/// `skew_seconds` is 0 while the meter clock offset is unknown or
/// tolerable; once a skew of [`GAS_INTERVAL_SECS`] or more has been
/// measured, synchronization is abandoned and every qualifying sample is
/// accepted. `next_accept_epoch` only moves forward.
#[derive(Debug, Default)]
pub struct GasClockSync {
    skew_seconds: i64,
    next_accept_epoch: i64,
}

impl GasClockSync {
    pub fn new() -> Self {
        GasClockSync::default()
    }

    /// Last measured offset of the meter clock ahead of the host clock.
    pub fn skew_seconds(&self) -> i64 {
        self.skew_seconds
    }

    /// Earliest host time at which the synchronized path accepts a sample.
    pub fn next_accept_epoch(&self) -> i64 {
        self.next_accept_epoch
    }

    pub(crate) fn reset(&mut self) {
        self.skew_seconds = 0;
        self.next_accept_epoch = 0;
    }

    /// Evaluate a gas sample with meter timestamp `meter_timestamp` at
    /// host time `now`. Returns true when the sample should be emitted.
    pub fn evaluate<C: HostClock>(&mut self, clock: &C, now: i64, meter_timestamp: &str) -> bool {
        if self.skew_seconds >= GAS_INTERVAL_SECS {
            // synchronization was abandoned, accept unconditionally
            return true;
        }
        if now < self.next_accept_epoch {
            return false;
        }

        let host_ts = format_meter_timestamp(&clock.local_time(now));
        let cmp_len = meter_timestamp.len().min(host_ts.len());
        if host_ts.as_bytes()[..cmp_len] >= meter_timestamp.as_bytes()[..cmp_len] {
            self.next_accept_epoch += GAS_INTERVAL_SECS;
            return true;
        }

        // gas meter clock is ahead of ours
        match parse_meter_timestamp(meter_timestamp) {
            Ok((naive, dst)) => {
                let meter_epoch = clock.epoch_from_local(naive, dst);
                self.skew_seconds = meter_epoch - now;
                if self.skew_seconds >= GAS_INTERVAL_SECS {
                    error!(
                        "P1: unable to synchronize to the gas meter clock because it is more than 5 minutes ahead of my time"
                    );
                } else {
                    self.next_accept_epoch = meter_epoch;
                    info!(
                        "P1: gas meter clock is {} seconds ahead - wait for my clock to catch up",
                        self.skew_seconds
                    );
                }
            }
            Err(e) => warn!("P1: cannot synchronize gas sample - {e}"),
        }
        false
    }
}

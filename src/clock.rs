//! Time source for message timestamps.

use chrono::{Local, NaiveDateTime};

/// HL7 `TS` precision used throughout: `yyyyMMddHHmmss`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Supplies the current time to builders.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// The current time as a 14 digit HL7 timestamp.
    fn timestamp(&self) -> String {
        format_timestamp(&self.now())
    }
}

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant. Used to make builds reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(NaiveDateTime);

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Parses a `yyyyMMddHHmmss` timestamp.
    pub fn parse(timestamp: &str) -> Option<Self> {
        parse_timestamp(timestamp).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp, accepting only exactly 14 digits that form a real date and time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_formats_fourteen_digits() {
        let clock = FixedClock::parse("20240229235959").unwrap();
        assert_eq!(clock.timestamp(), "20240229235959");
    }

    #[test]
    fn system_clock_timestamp_is_well_formed() {
        let ts = SystemClock.timestamp();
        assert_eq!(ts.len(), 14);
        assert!(parse_timestamp(&ts).is_some());
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for bad in ["2024022923595", "202402292359590", "2024-02-29T23:5", "20230229120000", "20240101126000"] {
            assert!(parse_timestamp(bad).is_none(), "{} should be rejected", bad);
        }
    }
}

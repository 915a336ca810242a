//! Timestamps shown on issues and comments

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{Error, Result};

/// Display format for `time_found`, `time_resolved` and comment times
pub const STAMP_FORMAT: &str = "%d/%m %H:%M";

/// Wall clock rendering timestamps in a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
    frozen: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| Error::config(format!("invalid UTC offset: {}", utc_offset_hours)))?;
        Ok(Self {
            offset,
            frozen: None,
        })
    }

    /// A clock that always reports `instant`
    pub fn frozen(utc_offset_hours: i32, instant: DateTime<Utc>) -> Result<Self> {
        let mut clock = Self::new(utc_offset_hours)?;
        clock.frozen = Some(instant);
        Ok(clock)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.frozen.unwrap_or_else(Utc::now)
    }

    /// Current time as `DD/MM HH:MM`
    pub fn stamp(&self) -> String {
        self.format(self.now())
    }

    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(STAMP_FORMAT)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamp_applies_offset() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 31, 20, 5, 0).unwrap();
        let clock = Clock::frozen(7, instant).unwrap();
        assert_eq!(clock.stamp(), "01/04 03:05");
    }

    #[test]
    fn test_negative_offset() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 2, 30, 0).unwrap();
        let clock = Clock::frozen(-5, instant).unwrap();
        assert_eq!(clock.stamp(), "31/12 21:30");
    }

    #[test]
    fn test_invalid_offset() {
        assert!(Clock::new(30).is_err());
    }
}

//! Decoding of time coordinates into [`Timestamp`]s
//!
//! Model output encodes time as an offset from a reference date in one of several
//! calendars (CF `units = "days since 1850-01-01"` plus a `calendar` attribute), while
//! observational products often use fractional years where `1850.0417` is the middle of
//! January 1850. Both are decoded into the same calendar-agnostic [`Timestamp`] so that
//! year bucketing and baseline windows work identically for every source.
//!
//! # Examples
//!
//! ```rust
//! use climfuse_core::calendar::{decode_times, TimeEncoding};
//! use climfuse_core::timeseries::Timestamp;
//!
//! let encoding = TimeEncoding::cf("days since 2015-01-01", "noleap").unwrap();
//! let times = decode_times(&[14.5, 45.0, 365.0], &encoding).unwrap();
//! assert_eq!(times[0], Timestamp::new(2015, 1, 15));
//! assert_eq!(times[1], Timestamp::new(2015, 2, 15));
//! assert_eq!(times[2], Timestamp::new(2016, 1, 1));
//! ```

use crate::errors::{FusionError, FusionResult};
use crate::timeseries::{FloatValue, Timestamp, MONTHS_PER_YEAR};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const SECONDS_PER_DAY: FloatValue = 86_400.0;

/// Calendars used by climate model output
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Calendar {
    /// Mixed Julian/Gregorian in CF; treated as proleptic Gregorian since every supported
    /// dataset starts after 1582
    Standard,
    ProlepticGregorian,
    /// Every year has 365 days
    NoLeap,
    /// Every year has 366 days
    AllLeap,
    /// Twelve 30-day months
    Day360,
}

impl FromStr for Calendar {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(FusionError::UnsupportedCalendar(other.to_string())),
        }
    }
}

const CUMULATIVE_DAYS_365: [i64; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const CUMULATIVE_DAYS_366: [i64; 13] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

fn is_gregorian_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl Calendar {
    /// Number of days in `month` of `year`
    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        let m = month as usize;
        match self {
            Calendar::Day360 => 30,
            Calendar::NoLeap => (CUMULATIVE_DAYS_365[m] - CUMULATIVE_DAYS_365[m - 1]) as u32,
            Calendar::AllLeap => (CUMULATIVE_DAYS_366[m] - CUMULATIVE_DAYS_366[m - 1]) as u32,
            Calendar::Standard | Calendar::ProlepticGregorian => {
                if is_gregorian_leap(year as i64) {
                    (CUMULATIVE_DAYS_366[m] - CUMULATIVE_DAYS_366[m - 1]) as u32
                } else {
                    (CUMULATIVE_DAYS_365[m] - CUMULATIVE_DAYS_365[m - 1]) as u32
                }
            }
        }
    }

    fn validate(&self, date: Timestamp) -> FusionResult<()> {
        if !(1..=MONTHS_PER_YEAR as u32).contains(&date.month)
            || date.day < 1
            || date.day > self.days_in_month(date.year, date.month)
        {
            return Err(FusionError::InvalidTimeEncoding(format!(
                "{} is not a valid date in the {:?} calendar",
                date, self
            )));
        }
        Ok(())
    }

    /// Days elapsed from this calendar's epoch to `date`
    fn day_number(&self, date: Timestamp) -> i64 {
        let (y, m, d) = (date.year as i64, date.month as i64, date.day as i64);
        match self {
            Calendar::Day360 => y * 360 + (m - 1) * 30 + (d - 1),
            Calendar::NoLeap => y * 365 + CUMULATIVE_DAYS_365[(m - 1) as usize] + (d - 1),
            Calendar::AllLeap => y * 366 + CUMULATIVE_DAYS_366[(m - 1) as usize] + (d - 1),
            Calendar::Standard | Calendar::ProlepticGregorian => {
                // days_from_civil, relative to 1970-01-01
                let y = if m <= 2 { y - 1 } else { y };
                let era = y.div_euclid(400);
                let yoe = y - era * 400;
                let mp = if m > 2 { m - 3 } else { m + 9 };
                let doy = (153 * mp + 2) / 5 + d - 1;
                let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
                era * 146_097 + doe - 719_468
            }
        }
    }

    /// Inverse of [`day_number`](Self::day_number)
    fn date_of_day(&self, n: i64) -> Timestamp {
        let from_fixed = |n: i64, year_len: i64, cumulative: &[i64; 13]| {
            let year = n.div_euclid(year_len);
            let doy = n.rem_euclid(year_len);
            let month = (1..=12).find(|&m| doy < cumulative[m]).unwrap_or(12);
            Timestamp::new(
                year as i32,
                month as u32,
                (doy - cumulative[month - 1] + 1) as u32,
            )
        };
        match self {
            Calendar::Day360 => {
                let year = n.div_euclid(360);
                let doy = n.rem_euclid(360);
                Timestamp::new(year as i32, (doy / 30 + 1) as u32, (doy % 30 + 1) as u32)
            }
            Calendar::NoLeap => from_fixed(n, 365, &CUMULATIVE_DAYS_365),
            Calendar::AllLeap => from_fixed(n, 366, &CUMULATIVE_DAYS_366),
            Calendar::Standard | Calendar::ProlepticGregorian => {
                // civil_from_days
                let z = n + 719_468;
                let era = z.div_euclid(146_097);
                let doe = z - era * 146_097;
                let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
                let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
                let mp = (5 * doy + 2) / 153;
                let day = doy - (153 * mp + 2) / 5 + 1;
                let month = if mp < 10 { mp + 3 } else { mp - 9 };
                let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
                Timestamp::new(year as i32, month as u32, day as u32)
            }
        }
    }
}

/// How the raw values of a time coordinate are to be interpreted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimeEncoding {
    /// CF-style offset from a reference date
    Cf {
        /// Length of one unit of the offset, in seconds
        seconds_per_unit: FloatValue,
        reference: Timestamp,
        /// Seconds past midnight of the reference date
        reference_seconds: FloatValue,
        calendar: Calendar,
    },
    /// Fractional years, `year + (month - 0.5) / 12` for monthly means
    DecimalYear,
}

impl TimeEncoding {
    /// Parse a CF `units` string (e.g. `"days since 1850-01-01 00:00:00"`) and calendar name
    pub fn cf(units: &str, calendar: &str) -> FusionResult<Self> {
        let calendar: Calendar = calendar.parse()?;
        let invalid =
            || FusionError::InvalidTimeEncoding(format!("unrecognised units `{}`", units));

        let (unit, since) = units.split_once(" since ").ok_or_else(invalid)?;
        let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => SECONDS_PER_DAY,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            _ => return Err(invalid()),
        };

        let since = since.trim();
        let (date_part, time_part) = match since.split_once(|c: char| c == ' ' || c == 'T') {
            Some((d, t)) => (d, Some(t.trim())),
            None => (since, None),
        };

        let reference = parse_date(date_part).ok_or_else(invalid)?;
        calendar.validate(reference)?;
        let reference_seconds = match time_part {
            Some(t) if !t.is_empty() => parse_time_of_day(t).ok_or_else(invalid)?,
            _ => 0.0,
        };

        Ok(TimeEncoding::Cf {
            seconds_per_unit,
            reference,
            reference_seconds,
            calendar,
        })
    }

    /// Decode a single raw value
    pub fn decode(&self, value: FloatValue) -> FusionResult<Timestamp> {
        if !value.is_finite() {
            return Err(FusionError::InvalidTimeEncoding(format!(
                "non-finite time value {}",
                value
            )));
        }
        match self {
            TimeEncoding::Cf {
                seconds_per_unit,
                reference,
                reference_seconds,
                calendar,
            } => {
                let elapsed_days =
                    (value * seconds_per_unit + reference_seconds) / SECONDS_PER_DAY;
                let day = calendar.day_number(*reference) + elapsed_days.floor() as i64;
                Ok(calendar.date_of_day(day))
            }
            TimeEncoding::DecimalYear => {
                let year = value.floor();
                let month = (((value - year) * MONTHS_PER_YEAR as FloatValue).floor() as u32 + 1)
                    .min(MONTHS_PER_YEAR as u32);
                Ok(Timestamp::mid_month(year as i32, month))
            }
        }
    }
}

/// Decode every value of a time coordinate
pub fn decode_times(
    values: &[FloatValue],
    encoding: &TimeEncoding,
) -> FusionResult<Vec<Timestamp>> {
    values.iter().map(|&v| encoding.decode(v)).collect()
}

fn parse_date(s: &str) -> Option<Timestamp> {
    let mut parts = s.splitn(3, '-');
    let year = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    Some(Timestamp::new(year, month, day))
}

fn parse_time_of_day(s: &str) -> Option<FloatValue> {
    let s = s.trim_end_matches('Z');
    let mut parts = s.split(':');
    let hours: FloatValue = parts.next()?.parse().ok()?;
    let mut component = || parts.next().map(str::parse::<FloatValue>).transpose().ok();
    let minutes = component()?.unwrap_or(0.0);
    let seconds = component()?.unwrap_or(0.0);
    Some(hours * 3_600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calendar_names() {
        assert_eq!("gregorian".parse::<Calendar>().unwrap(), Calendar::Standard);
        assert_eq!("365_day".parse::<Calendar>().unwrap(), Calendar::NoLeap);
        assert_eq!("366_day".parse::<Calendar>().unwrap(), Calendar::AllLeap);
        assert_eq!("360_day".parse::<Calendar>().unwrap(), Calendar::Day360);
        assert!(matches!(
            "julian".parse::<Calendar>(),
            Err(FusionError::UnsupportedCalendar(_))
        ));
    }

    #[test]
    fn gregorian_day_numbers_round_trip_known_dates() {
        let cal = Calendar::ProlepticGregorian;
        assert_eq!(cal.day_number(Timestamp::new(1970, 1, 1)), 0);
        assert_eq!(cal.day_number(Timestamp::new(2000, 3, 1)), 11_017);
        assert_eq!(cal.date_of_day(-1), Timestamp::new(1969, 12, 31));
        assert_eq!(cal.date_of_day(11_016), Timestamp::new(2000, 2, 29));
    }

    #[test]
    fn standard_calendar_handles_leap_years() {
        let encoding = TimeEncoding::cf("days since 1900-01-01", "standard").unwrap();
        // 1900 is not a leap year, 2000 is
        assert_eq!(encoding.decode(59.0).unwrap(), Timestamp::new(1900, 3, 1));
        let encoding = TimeEncoding::cf("days since 2000-01-01", "standard").unwrap();
        assert_eq!(encoding.decode(59.0).unwrap(), Timestamp::new(2000, 2, 29));
    }

    #[test]
    fn noleap_calendar_skips_february_29() {
        let encoding = TimeEncoding::cf("days since 2000-01-01", "noleap").unwrap();
        assert_eq!(encoding.decode(59.0).unwrap(), Timestamp::new(2000, 3, 1));
        assert_eq!(encoding.decode(365.0 * 10.0).unwrap(), Timestamp::new(2010, 1, 1));
    }

    #[test]
    fn all_leap_calendar() {
        let encoding = TimeEncoding::cf("days since 2001-01-01", "all_leap").unwrap();
        assert_eq!(encoding.decode(59.0).unwrap(), Timestamp::new(2001, 2, 29));
    }

    #[test]
    fn day360_calendar_has_february_30() {
        let encoding = TimeEncoding::cf("days since 1850-01-01", "360_day").unwrap();
        assert_eq!(encoding.decode(59.0).unwrap(), Timestamp::new(1850, 2, 30));
        assert_eq!(encoding.decode(360.0).unwrap(), Timestamp::new(1851, 1, 1));
    }

    #[test]
    fn hours_and_reference_time_of_day() {
        let encoding = TimeEncoding::cf("hours since 1950-01-01 12:00:00", "standard").unwrap();
        assert_eq!(encoding.decode(11.0).unwrap(), Timestamp::new(1950, 1, 1));
        assert_eq!(encoding.decode(12.0).unwrap(), Timestamp::new(1950, 1, 2));
        let encoding = TimeEncoding::cf("seconds since 1970-01-01T00:00:00Z", "gregorian").unwrap();
        assert_eq!(encoding.decode(86_400.0).unwrap(), Timestamp::new(1970, 1, 2));
    }

    #[test]
    fn negative_offsets_precede_the_reference() {
        let encoding = TimeEncoding::cf("days since 1850-01-01", "noleap").unwrap();
        assert_eq!(encoding.decode(-1.0).unwrap(), Timestamp::new(1849, 12, 31));
    }

    #[test]
    fn decimal_year_maps_to_mid_month() {
        let encoding = TimeEncoding::DecimalYear;
        assert_eq!(encoding.decode(1850.041_666).unwrap(), Timestamp::new(1850, 1, 15));
        assert_eq!(encoding.decode(1850.958_333).unwrap(), Timestamp::new(1850, 12, 15));
        assert_eq!(encoding.decode(2024.458_333).unwrap(), Timestamp::new(2024, 6, 15));
    }

    #[test]
    fn rejects_malformed_units_and_values() {
        assert!(TimeEncoding::cf("days after 1850-01-01", "standard").is_err());
        assert!(TimeEncoding::cf("fortnights since 1850-01-01", "standard").is_err());
        assert!(TimeEncoding::cf("days since 1850-02-30", "standard").is_err());
        assert!(TimeEncoding::DecimalYear.decode(FloatValue::NAN).is_err());
    }
}

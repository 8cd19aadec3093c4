//! Date and time values
//!
//! Every temporal value is stored as a wall-clock `NaiveDateTime` (fields the
//! kind does not carry take the reference values 2000-01-01T00:00:00), the
//! fraction-of-second digits, an optional timezone offset in minutes and a
//! leap-second flag. A leap second is stored as second 59 with the flag set,
//! so it orders after every instant of second 59 and before the next minute.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};

/// Maximum timezone offset in minutes (14:00)
pub const MAX_TZ_MINUTES: i32 = 14 * 60;

/// Kind of temporal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemporalKind {
    /// `xs:dateTime`
    DateTime,
    /// `xs:date`
    Date,
    /// `xs:time`
    Time,
    /// `xs:gYearMonth`
    GYearMonth,
    /// `xs:gYear`
    GYear,
    /// `xs:gMonthDay`
    GMonthDay,
    /// `xs:gDay`
    GDay,
    /// `xs:gMonth`
    GMonth,
}

impl TemporalKind {
    /// XSD type name
    pub fn name(self) -> &'static str {
        match self {
            TemporalKind::DateTime => "dateTime",
            TemporalKind::Date => "date",
            TemporalKind::Time => "time",
            TemporalKind::GYearMonth => "gYearMonth",
            TemporalKind::GYear => "gYear",
            TemporalKind::GMonthDay => "gMonthDay",
            TemporalKind::GDay => "gDay",
            TemporalKind::GMonth => "gMonth",
        }
    }

    fn has_year(self) -> bool {
        matches!(
            self,
            TemporalKind::DateTime | TemporalKind::Date | TemporalKind::GYearMonth | TemporalKind::GYear
        )
    }

    fn has_time(self) -> bool {
        matches!(self, TemporalKind::DateTime | TemporalKind::Time)
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed temporal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Temporal {
    kind: TemporalKind,
    value: NaiveDateTime,
    fraction: String,
    tz: Option<i32>,
    leap: bool,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    lexical: &'a str,
    kind: TemporalKind,
}

impl<'a> Cursor<'a> {
    fn lexical_error(&self) -> Error {
        Error::lexical(self.kind.name(), self.lexical)
    }

    fn range_error(&self, component: &'static str) -> Error {
        Error::ComponentRange {
            component,
            value: self.lexical.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.lexical_error())
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn digit_run(&mut self) -> &'a [u8] {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        &self.bytes[start..self.pos]
    }

    fn two_digits(&mut self) -> Result<u32> {
        let run = self.digit_run();
        if run.len() != 2 {
            return Err(self.lexical_error());
        }
        Ok(((run[0] - b'0') * 10 + (run[1] - b'0')) as u32)
    }

    fn year(&mut self) -> Result<i64> {
        let negative = self.eat(b'-');
        let run = self.digit_run();
        if run.len() < 4 || (run.len() > 4 && run[0] == b'0') {
            return Err(self.lexical_error());
        }
        let mut year: i64 = 0;
        for &d in run {
            year = year
                .checked_mul(10)
                .and_then(|y| y.checked_add((d - b'0') as i64))
                .ok_or_else(|| self.range_error("year"))?;
        }
        if year == 0 {
            return Err(self.range_error("year"));
        }
        Ok(if negative { -year } else { year })
    }

    fn timezone(&mut self) -> Result<Option<i32>> {
        match self.peek() {
            None => Ok(None),
            Some(b'Z') => {
                self.pos += 1;
                Ok(Some(0))
            }
            Some(sign @ (b'+' | b'-')) => {
                self.pos += 1;
                let hh = self.two_digits()? as i32;
                self.expect(b':')?;
                let mm = self.two_digits()? as i32;
                let total = hh * 60 + mm;
                if mm > 59 || total > MAX_TZ_MINUTES {
                    return Err(self.range_error("timezone"));
                }
                Ok(Some(if sign == b'-' { -total } else { total }))
            }
            Some(_) => Err(self.lexical_error()),
        }
    }
}

fn to_chrono_year(year: i64) -> i64 {
    // no year zero in the lexical space; -0001 is the year before 0001
    if year < 0 {
        year + 1
    } else {
        year
    }
}

fn from_chrono_year(year: i32) -> i64 {
    if year <= 0 {
        year as i64 - 1
    } else {
        year as i64
    }
}

impl Temporal {
    /// Parse the lexical form of the given kind
    pub fn parse(kind: TemporalKind, lexical: &str) -> Result<Self> {
        let mut c = Cursor {
            bytes: lexical.as_bytes(),
            pos: 0,
            lexical,
            kind,
        };

        let mut year = 2000i64;
        let mut month = 1u32;
        let mut day = 1u32;
        match kind {
            TemporalKind::DateTime | TemporalKind::Date => {
                year = c.year()?;
                c.expect(b'-')?;
                month = c.two_digits()?;
                c.expect(b'-')?;
                day = c.two_digits()?;
            }
            TemporalKind::GYearMonth => {
                year = c.year()?;
                c.expect(b'-')?;
                month = c.two_digits()?;
            }
            TemporalKind::GYear => year = c.year()?,
            TemporalKind::GMonthDay => {
                c.expect(b'-')?;
                c.expect(b'-')?;
                month = c.two_digits()?;
                c.expect(b'-')?;
                day = c.two_digits()?;
            }
            TemporalKind::GDay => {
                for _ in 0..3 {
                    c.expect(b'-')?;
                }
                day = c.two_digits()?;
            }
            TemporalKind::GMonth => {
                c.expect(b'-')?;
                c.expect(b'-')?;
                month = c.two_digits()?;
                // legacy "--MM--" form
                if c.bytes[c.pos..].starts_with(b"--") {
                    c.pos += 2;
                }
            }
            TemporalKind::Time => {}
        }

        let (mut hour, mut minute, mut second) = (0u32, 0u32, 0u32);
        let mut fraction = String::new();
        if kind.has_time() {
            if kind == TemporalKind::DateTime {
                c.expect(b'T')?;
            }
            hour = c.two_digits()?;
            c.expect(b':')?;
            minute = c.two_digits()?;
            c.expect(b':')?;
            second = c.two_digits()?;
            if c.eat(b'.') {
                let run = c.digit_run();
                if run.is_empty() {
                    return Err(c.lexical_error());
                }
                let trimmed = run.iter().rposition(|&d| d != b'0').map_or(0, |p| p + 1);
                fraction = String::from_utf8_lossy(&run[..trimmed]).into_owned();
            }
        }

        let tz = c.timezone()?;
        if c.pos != c.bytes.len() {
            return Err(c.lexical_error());
        }

        if !(1..=12).contains(&month) {
            return Err(c.range_error("month"));
        }
        if !(1..=31).contains(&day) {
            return Err(c.range_error("day"));
        }
        if minute > 59 {
            return Err(c.range_error("minute"));
        }

        let mut end_of_day = false;
        if hour == 24 {
            if minute != 0 || second != 0 || !fraction.is_empty() {
                return Err(c.range_error("hour"));
            }
            hour = 0;
            end_of_day = true;
        } else if hour > 23 {
            return Err(c.range_error("hour"));
        }

        let mut leap = false;
        if second == 60 {
            if minute != 59 {
                return Err(c.range_error("second"));
            }
            second = 59;
            leap = true;
        } else if second > 59 {
            return Err(c.range_error("second"));
        }

        let chrono_year = i32::try_from(to_chrono_year(year)).map_err(|_| c.range_error("year"))?;
        let date = if kind.has_year() {
            match NaiveDate::from_ymd_opt(chrono_year, month, 1) {
                None => return Err(c.range_error("year")),
                Some(_) => NaiveDate::from_ymd_opt(chrono_year, month, day)
                    .ok_or_else(|| c.range_error("day"))?,
            }
        } else {
            NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(|| c.range_error("day"))?
        };
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| c.range_error("second"))?;
        let mut value = NaiveDateTime::new(date, time);
        if end_of_day && kind == TemporalKind::DateTime {
            value = value
                .checked_add_signed(Duration::days(1))
                .ok_or_else(|| c.range_error("year"))?;
        }

        Ok(Temporal {
            kind,
            value,
            fraction,
            tz,
            leap,
        })
    }

    /// Kind of the value
    pub fn kind(&self) -> TemporalKind {
        self.kind
    }

    /// Timezone offset in minutes, if known
    pub fn timezone(&self) -> Option<i32> {
        self.tz
    }

    /// Whether the value is a leap second
    pub fn is_leap_second(&self) -> bool {
        self.leap
    }

    /// Wall-clock value, normalized to UTC when the timezone is known
    fn normalized(&self) -> NaiveDateTime {
        match self.tz {
            Some(tz) => self
                .value
                .checked_sub_signed(Duration::minutes(tz as i64))
                .unwrap_or(self.value),
            None => self.value,
        }
    }

    fn sort_key(&self, shift_minutes: i64) -> (NaiveDateTime, bool, &str) {
        let base = self.normalized();
        let value = base
            .checked_add_signed(Duration::minutes(shift_minutes))
            .unwrap_or(base);
        (value, self.leap, self.fraction.as_str())
    }

    /// Equality in the value space
    ///
    /// Values with and without a timezone are never equal.
    pub fn equal(&self, other: &Temporal) -> bool {
        self.kind == other.kind
            && self.tz.is_some() == other.tz.is_some()
            && self.sort_key(0) == other.sort_key(0)
    }

    /// Order in the value space
    ///
    /// A value without a timezone is bracketed by +-14:00 against a value
    /// with one; when the other value falls inside the bracket the result is
    /// indeterminate.
    pub fn compare(&self, other: &Temporal) -> Result<Ordering> {
        if self.kind != other.kind {
            return Err(Error::IndeterminateComparison);
        }
        match (self.tz.is_some(), other.tz.is_some()) {
            (true, false) => compare_mixed(self, other),
            (false, true) => compare_mixed(other, self).map(Ordering::reverse),
            _ => Ok(self.sort_key(0).cmp(&other.sort_key(0))),
        }
    }

    /// Canonical lexical form
    pub fn to_canonical(&self) -> String {
        let utc = self.kind.has_time() && self.tz.is_some();
        let value = if utc { self.normalized() } else { self.value };
        let mut out = String::new();

        let year = from_chrono_year(value.year());
        let year_str = if year < 0 {
            format!("-{:04}", -year)
        } else {
            format!("{:04}", year)
        };
        match self.kind {
            TemporalKind::DateTime | TemporalKind::Date => {
                out.push_str(&format!("{}-{:02}-{:02}", year_str, value.month(), value.day()));
            }
            TemporalKind::GYearMonth => out.push_str(&format!("{}-{:02}", year_str, value.month())),
            TemporalKind::GYear => out.push_str(&year_str),
            TemporalKind::GMonthDay => out.push_str(&format!("--{:02}-{:02}", value.month(), value.day())),
            TemporalKind::GDay => out.push_str(&format!("---{:02}", value.day())),
            TemporalKind::GMonth => out.push_str(&format!("--{:02}", value.month())),
            TemporalKind::Time => {}
        }

        if self.kind.has_time() {
            if self.kind == TemporalKind::DateTime {
                out.push('T');
            }
            let second = if self.leap { 60 } else { value.second() };
            out.push_str(&format!("{:02}:{:02}:{:02}", value.hour(), value.minute(), second));
            if !self.fraction.is_empty() {
                out.push('.');
                out.push_str(&self.fraction);
            }
        }

        match self.tz {
            None => {}
            Some(_) if utc => out.push('Z'),
            Some(0) => out.push('Z'),
            Some(tz) => {
                let sign = if tz < 0 { '-' } else { '+' };
                let abs = tz.abs();
                out.push_str(&format!("{}{:02}:{:02}", sign, abs / 60, abs % 60));
            }
        }
        out
    }

    /// Value key bytes
    pub fn key_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.kind as u8];
        out.extend_from_slice(self.to_canonical().as_bytes());
        out
    }
}

// p has a timezone, q does not
fn compare_mixed(p: &Temporal, q: &Temporal) -> Result<Ordering> {
    let pk = p.sort_key(0);
    let max = MAX_TZ_MINUTES as i64;
    if pk < q.sort_key(-max) {
        Ok(Ordering::Less)
    } else if pk > q.sort_key(max) {
        Ok(Ordering::Greater)
    } else {
        Err(Error::IndeterminateComparison)
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(kind: TemporalKind, s: &str) -> Temporal {
        Temporal::parse(kind, s).unwrap()
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(t(TemporalKind::Date, "2024-02-29").to_canonical(), "2024-02-29");
        assert_eq!(t(TemporalKind::GYearMonth, "1999-05").to_canonical(), "1999-05");
        assert_eq!(t(TemporalKind::GYear, "-0044").to_canonical(), "-0044");
        assert_eq!(t(TemporalKind::GMonthDay, "--02-29").to_canonical(), "--02-29");
        assert_eq!(t(TemporalKind::GDay, "---31").to_canonical(), "---31");
        assert_eq!(t(TemporalKind::GMonth, "--12--").to_canonical(), "--12");
        assert_eq!(t(TemporalKind::GYear, "12345").to_canonical(), "12345");
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            Temporal::parse(TemporalKind::Date, "2023-02-29"),
            Err(Error::ComponentRange { component: "day", .. })
        ));
        assert!(matches!(
            Temporal::parse(TemporalKind::Date, "2023-13-01"),
            Err(Error::ComponentRange { component: "month", .. })
        ));
        assert!(matches!(
            Temporal::parse(TemporalKind::Time, "12:00:00+14:01"),
            Err(Error::ComponentRange { component: "timezone", .. })
        ));
        assert!(matches!(
            Temporal::parse(TemporalKind::Time, "12:00:61"),
            Err(Error::ComponentRange { component: "second", .. })
        ));
        assert!(Temporal::parse(TemporalKind::GYear, "0000").is_err());
        assert!(Temporal::parse(TemporalKind::GYear, "099").is_err());
        assert!(Temporal::parse(TemporalKind::GYear, "01999").is_err());
        assert!(Temporal::parse(TemporalKind::Date, "2023-1-01").is_err());
        assert!(Temporal::parse(TemporalKind::Time, "12:00:00.").is_err());
        assert!(Temporal::parse(TemporalKind::Date, "2023-01-01T").is_err());
        assert!(Temporal::parse(TemporalKind::Date, "2023-02-29").is_err());
    }

    #[test]
    fn test_fraction_has_no_fixed_precision() {
        let v = t(TemporalKind::Time, "10:00:00.1234567890123000");
        assert_eq!(v.to_canonical(), "10:00:00.1234567890123");
    }

    #[test]
    fn test_end_of_day() {
        assert_eq!(
            t(TemporalKind::DateTime, "1999-12-31T24:00:00").to_canonical(),
            "2000-01-01T00:00:00"
        );
        assert!(Temporal::parse(TemporalKind::Time, "24:00:01").is_err());
    }

    #[test]
    fn test_timezone_normalization() {
        let a = t(TemporalKind::DateTime, "2002-10-10T12:00:00-05:00");
        let b = t(TemporalKind::DateTime, "2002-10-10T17:00:00Z");
        assert!(a.equal(&b));
        assert_eq!(a.to_canonical(), "2002-10-10T17:00:00Z");
        assert_eq!(t(TemporalKind::Date, "2002-10-10+13:00").to_canonical(), "2002-10-10+13:00");
    }

    #[test]
    fn test_leap_second() {
        let leap = t(TemporalKind::Time, "23:59:60");
        let midnight = t(TemporalKind::Time, "00:00:00");
        assert!(!leap.equal(&midnight));
        assert_eq!(t(TemporalKind::Time, "23:59:60Z").to_canonical(), "23:59:60Z");

        let before = t(TemporalKind::DateTime, "1998-12-31T23:59:59.999");
        let leap_dt = t(TemporalKind::DateTime, "1998-12-31T23:59:60");
        let after = t(TemporalKind::DateTime, "1999-01-01T00:00:00");
        assert_eq!(before.compare(&leap_dt).unwrap(), Ordering::Less);
        assert_eq!(leap_dt.compare(&after).unwrap(), Ordering::Less);
        assert!(Temporal::parse(TemporalKind::Time, "23:58:60").is_err());
    }

    #[test]
    fn test_indeterminate_mixed_timezone() {
        let with_tz = t(TemporalKind::DateTime, "2000-01-15T12:00:00Z");
        let without = t(TemporalKind::DateTime, "2000-01-15T20:00:00");
        assert_eq!(with_tz.compare(&without), Err(Error::IndeterminateComparison));
        assert!(!with_tz.equal(&without));

        let far = t(TemporalKind::DateTime, "2000-01-16T12:00:00");
        assert_eq!(with_tz.compare(&far).unwrap(), Ordering::Less);
        assert_eq!(far.compare(&with_tz).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_compare_kinds_must_match() {
        let a = t(TemporalKind::GYear, "2000");
        let b = t(TemporalKind::Date, "2000-01-01");
        assert_eq!(a.compare(&b), Err(Error::IndeterminateComparison));
    }
}

//! `xs:duration`
//!
//! Durations are partially ordered: `P1M` and `P30D` are incomparable. Order
//! is decided by adding both durations to four reference instants and
//! requiring every instant to agree.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::values::decimal::{Dec, Int};

// (year, month) of the reference instants, all on day 1 at 00:00:00Z
const REFERENCE_INSTANTS: [(i128, i128); 4] = [(1696, 9), (1697, 2), (1903, 3), (1903, 7)];

const SECONDS_PER_DAY: i128 = 86_400;

/// A parsed duration value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Duration {
    negative: bool,
    years: u64,
    months: u64,
    days: u64,
    hours: u64,
    minutes: u64,
    seconds: Dec,
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar
fn days_from_civil(year: i128, month: i128, day: i128) -> i128 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn parse_component(digits: &str, lexical: &str) -> Result<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::lexical("duration", lexical));
    }
    Int::parse(digits)?.to_u64().map_err(|_| {
        Error::Overflow(format!("duration component '{}' in '{}'", digits, lexical))
    })
}

impl Duration {
    /// The zero duration
    pub fn zero() -> Self {
        Duration {
            negative: false,
            years: 0,
            months: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: Dec::zero(),
        }
    }

    /// Parse the `xs:duration` lexical form
    pub fn parse(lexical: &str) -> Result<Self> {
        let invalid = || Error::lexical("duration", lexical);
        let (negative, rest) = match lexical.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, lexical),
        };
        let rest = rest.strip_prefix('P').ok_or_else(invalid)?;
        let (date_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => {
                if t.is_empty() {
                    return Err(invalid());
                }
                (d, Some(t))
            }
            None => (rest, None),
        };
        if date_part.is_empty() && time_part.is_none() {
            return Err(invalid());
        }

        let mut out = Duration::zero();
        out.negative = negative;

        let mut remaining = date_part;
        for (designator, slot) in [('Y', &mut out.years), ('M', &mut out.months), ('D', &mut out.days)] {
            if let Some(pos) = remaining.find(designator) {
                *slot = parse_component(&remaining[..pos], lexical)?;
                remaining = &remaining[pos + 1..];
            }
        }
        if !remaining.is_empty() {
            return Err(invalid());
        }

        if let Some(time) = time_part {
            let mut remaining = time;
            for (designator, slot) in [('H', &mut out.hours), ('M', &mut out.minutes)] {
                if let Some(pos) = remaining.find(designator) {
                    *slot = parse_component(&remaining[..pos], lexical)?;
                    remaining = &remaining[pos + 1..];
                }
            }
            if let Some(number) = remaining.strip_suffix('S') {
                let (int, frac) = match number.split_once('.') {
                    Some((i, f)) => (i, Some(f)),
                    None => (number, None),
                };
                let digits_ok = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
                if !digits_ok(int) || frac.map_or(false, |f| !digits_ok(f)) {
                    return Err(invalid());
                }
                out.seconds = Dec::parse(number)?;
                out.seconds.trunc().to_u64().map_err(|_| {
                    Error::Overflow(format!("duration seconds in '{}'", lexical))
                })?;
            } else if !remaining.is_empty() {
                return Err(invalid());
            }
        }
        Ok(out)
    }

    /// Whether the duration is negative (and non-zero)
    pub fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    /// Whether every component is zero
    pub fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds.is_zero()
    }

    /// Whether the duration has only day and time components
    pub fn is_day_time(&self) -> bool {
        self.years == 0 && self.months == 0
    }

    fn sign(&self) -> i128 {
        if self.negative {
            -1
        } else {
            1
        }
    }

    fn signed_seconds(&self) -> Dec {
        if self.negative {
            self.seconds.neg()
        } else {
            self.seconds.clone()
        }
    }

    /// Total seconds of the day and time components
    fn day_time_seconds(&self) -> Dec {
        let whole = self.days as i128 * SECONDS_PER_DAY
            + self.hours as i128 * 3600
            + self.minutes as i128 * 60;
        Dec::from_i128(self.sign() * whole).add(&self.signed_seconds())
    }

    /// Seconds since the epoch after adding this duration to a reference instant
    fn added_to(&self, ref_year: i128, ref_month: i128) -> Dec {
        let months = self.years as i128 * 12 + self.months as i128;
        let total_months = (ref_month - 1) + self.sign() * months;
        let year = ref_year + total_months.div_euclid(12);
        let month = total_months.rem_euclid(12) + 1;
        let start = Dec::from_i128(days_from_civil(year, month, 1) * SECONDS_PER_DAY);
        start.add(&self.day_time_seconds())
    }

    /// Order in the value space
    pub fn compare(&self, other: &Duration) -> Result<Ordering> {
        if self.is_day_time() && other.is_day_time() {
            return Ok(self.day_time_seconds().cmp(&other.day_time_seconds()));
        }
        let mut result: Option<Ordering> = None;
        for (year, month) in REFERENCE_INSTANTS {
            let ord = self.added_to(year, month).cmp(&other.added_to(year, month));
            match result {
                Some(prev) if prev != ord => return Err(Error::IndeterminateComparison),
                _ => result = Some(ord),
            }
        }
        result.ok_or(Error::IndeterminateComparison)
    }

    /// Conversion to a wall-clock duration
    ///
    /// Fails when the duration has year or month components, whose length in
    /// seconds depends on the starting instant.
    pub fn to_wall_clock(&self) -> Result<chrono::Duration> {
        if !self.is_day_time() {
            return Err(Error::IndeterminateConversion(format!(
                "duration {} has year or month components",
                self
            )));
        }
        let total = self.day_time_seconds();
        let whole = total.trunc();
        let secs = whole.to_i64()?;
        if secs.unsigned_abs() > (i64::MAX / 1000) as u64 {
            return Err(Error::Overflow(format!("duration {} as wall-clock time", self)));
        }
        let frac = total.sub(whole.as_dec());
        let nanos = frac.shift(9).trunc().to_i64()?;
        Ok(chrono::Duration::seconds(secs) + chrono::Duration::nanoseconds(nanos))
    }

    /// Canonical lexical form
    ///
    /// Months carry into years and seconds into minutes, hours and days; zero
    /// components are dropped and the zero duration is `PT0S`.
    pub fn to_canonical(&self) -> String {
        if self.is_zero() {
            return "PT0S".to_string();
        }
        let total_months = self.years as u128 * 12 + self.months as u128;
        let (years, months) = (total_months / 12, total_months % 12);

        let whole = self.seconds.trunc();
        let frac = self.seconds.sub(whole.as_dec());
        // parse guarantees whole seconds fit u64
        let whole = whole.to_u64().unwrap_or(0) as u128;

        let total_minutes = self.minutes as u128 + whole / 60;
        let seconds = Dec::from_i128((whole % 60) as i128).add(&frac);
        let total_hours = self.hours as u128 + total_minutes / 60;
        let minutes = total_minutes % 60;
        let days = self.days as u128 + total_hours / 24;
        let hours = total_hours % 24;

        let mut out = String::new();
        if self.negative {
            out.push('-');
        }
        out.push('P');
        if years > 0 {
            out.push_str(&format!("{}Y", years));
        }
        if months > 0 {
            out.push_str(&format!("{}M", months));
        }
        if days > 0 {
            out.push_str(&format!("{}D", days));
        }
        if hours > 0 || minutes > 0 || !seconds.is_zero() {
            out.push('T');
            if hours > 0 {
                out.push_str(&format!("{}H", hours));
            }
            if minutes > 0 {
                out.push_str(&format!("{}M", minutes));
            }
            if !seconds.is_zero() {
                if seconds.is_integer() {
                    out.push_str(&seconds.trunc().to_canonical());
                } else {
                    out.push_str(&seconds.to_canonical());
                }
                out.push('S');
            }
        }
        out
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

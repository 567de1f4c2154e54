//! Half-open time intervals on the weekly minute axis and the overlap predicate.

use crate::types::Minute;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: Minute,
    pub end: Minute,
}

impl Interval {
    pub fn new(start: Minute, end: Minute) -> Self {
        Self { start, end }
    }

    /// Interval on `day` between two minute-of-day offsets.
    pub fn on(day: Weekday, start_minute: Minute, end_minute: Minute) -> Self {
        let base = day.num_days_from_monday() * MINUTES_PER_DAY;
        Self {
            start: base + start_minute,
            end: base + end_minute,
        }
    }

    /// `start < end`. Zero-length intervals are not well formed.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        overlaps(self, other)
    }

    pub fn duration(&self) -> Minute {
        self.end.saturating_sub(self.start)
    }
}

/// Weekday and minute-of-day of an axis position, e.g. `Tue 09:30`.
pub fn format_minute(minute: Minute) -> String {
    let day = (0..minute / MINUTES_PER_DAY % 7).fold(Weekday::Mon, |day, _| day.succ());
    let of_day = minute % MINUTES_PER_DAY;
    format!("{} {:02}:{:02}", day, of_day / 60, of_day % 60)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = format_minute(self.end);
        let same_day = self.start / MINUTES_PER_DAY == self.end / MINUTES_PER_DAY;
        match end.split_once(' ') {
            Some((_, clock)) if same_day => write!(f, "{}-{}", format_minute(self.start), clock),
            _ => write!(f, "{}-{}", format_minute(self.start), end),
        }
    }
}

/// Accepts raw axis minutes (`600-720`) or a day with clock times
/// (`mon 10:00-12:00`).
impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (day, range) = match s.split_once(char::is_whitespace) {
            Some((day, range)) => {
                let day = day
                    .parse::<Weekday>()
                    .map_err(|_| format!("unknown weekday '{}'", day))?;
                (Some(day), range.trim())
            }
            None => (None, s),
        };
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| format!("expected START-END, got '{}'", range))?;

        match day {
            Some(day) => Ok(Interval::on(day, parse_clock(start)?, parse_clock(end)?)),
            None => Ok(Interval::new(parse_axis(start)?, parse_axis(end)?)),
        }
    }
}

fn parse_axis(raw: &str) -> Result<Minute, String> {
    raw.trim()
        .parse::<Minute>()
        .map_err(|_| format!("invalid minute '{}'", raw.trim()))
}

fn parse_clock(raw: &str) -> Result<Minute, String> {
    let raw = raw.trim();
    let (hours, minutes) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got '{}'", raw))?;
    let hours: Minute = hours.parse().map_err(|_| format!("invalid hour in '{}'", raw))?;
    let minutes: Minute = minutes.parse().map_err(|_| format!("invalid minute in '{}'", raw))?;
    if hours > 24 || minutes > 59 || (hours == 24 && minutes > 0) {
        return Err(format!("time of day out of range: '{}'", raw));
    }
    Ok(hours * 60 + minutes)
}

/// True iff the two half-open intervals share at least one instant.
///
/// Callers reject malformed intervals before they get here.
#[inline]
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.start < b.end && b.start < a.end
}

/// True iff any interval of `a` overlaps any interval of `b`.
pub fn any_overlap(a: &[Interval], b: &[Interval]) -> bool {
    a.iter().any(|x| b.iter().any(|y| overlaps(x, y)))
}

//! Partial-precision dates and the periods built from them.
//!
//! A [`TemporalValue`] may be known only to the year or to the month; a zero
//! field means "unspecified at that granularity". A [`Period`] is a pair of
//! such values that can be completed into concrete calendar bounds when an
//! overlap or containment test needs them.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TemporalValue {
    #[serde(default)]
    pub day: u32,
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub year: i32,
}

impl TemporalValue {
    pub const UNSPECIFIED: TemporalValue = TemporalValue { day: 0, month: 0, year: 0 };

    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { day, month, year }
    }

    pub const fn year(year: i32) -> Self {
        Self::new(year, 0, 0)
    }

    pub const fn year_month(year: i32, month: u32) -> Self {
        Self::new(year, month, 0)
    }

    pub fn is_unspecified(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    /// Field ranges only; whether the day exists in that month is checked on completion.
    pub fn validate(&self) -> Result<()> {
        if self.month > 12 {
            return Err(Error::invalid_input(format!("month {} out of range in {}", self.month, self)));
        }
        if self.day > 31 {
            return Err(Error::invalid_input(format!("day {} out of range in {}", self.day, self)));
        }
        Ok(())
    }

    /// Orders two values on the fields both of them specify, most significant
    /// first. Comparison stops (as `Equal`) at the first field either side
    /// leaves unspecified.
    pub fn cmp_specified(&self, other: &Self) -> Ordering {
        let fields = [
            (self.year as i64, other.year as i64),
            (self.month as i64, other.month as i64),
            (self.day as i64, other.day as i64),
        ];
        for (a, b) in fields {
            if a == 0 || b == 0 {
                return Ordering::Equal;
            }
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// True when every field specified on both sides matches exactly.
    pub fn is_compatible(&self, other: &Self) -> bool {
        let agree = |a: i64, b: i64| a == 0 || b == 0 || a == b;
        agree(self.year as i64, other.year as i64)
            && agree(self.month as i64, other.month as i64)
            && agree(self.day as i64, other.day as i64)
    }

    fn complete_as_start(&self) -> Result<NaiveDate> {
        let month = if self.month == 0 { 1 } else { self.month };
        let day = if self.day == 0 { 1 } else { self.day };
        NaiveDate::from_ymd_opt(self.year, month, day)
            .ok_or_else(|| Error::invalid_date(format!("{:04}-{:02}-{:02}", self.year, month, day)))
    }

    fn complete_as_end(&self) -> Result<NaiveDate> {
        let month = if self.month == 0 { 12 } else { self.month };
        let day = if self.day == 0 {
            days_in_month(self.year, month)
                .ok_or_else(|| Error::invalid_date(format!("{:04}-{:02}", self.year, month)))?
        } else {
            self.day
        };
        NaiveDate::from_ymd_opt(self.year, month, day)
            .ok_or_else(|| Error::invalid_date(format!("{:04}-{:02}-{:02}", self.year, month, day)))
    }
}

impl From<NaiveDate> for TemporalValue {
    fn from(d: NaiveDate) -> Self {
        Self::new(d.year(), d.month(), d.day())
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year == 0 {
            f.write_str("????")?;
        } else {
            write!(f, "{:04}", self.year)?;
        }
        if self.month == 0 {
            f.write_str("-??")?;
        } else {
            write!(f, "-{:02}", self.month)?;
        }
        if self.day == 0 {
            f.write_str("-??")
        } else {
            write!(f, "-{:02}", self.day)
        }
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt().map(|d| d.day())
}

/// An interval between two partial-precision bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Period {
    pub start: TemporalValue,
    pub end: TemporalValue,
}

impl Period {
    pub const fn new(start: TemporalValue, end: TemporalValue) -> Self {
        Self { start, end }
    }

    pub fn is_unspecified(&self) -> bool {
        self.start.is_unspecified() && self.end.is_unspecified()
    }

    pub fn validate(&self) -> Result<()> {
        self.start.validate()?;
        self.end.validate()
    }

    /// Fills every unspecified field: a missing day becomes the 1st for the
    /// start and the last day of the month for the end, a missing month
    /// becomes January / December. A year missing on one side is borrowed
    /// from the other; missing on both sides is an error.
    pub fn complete(&self) -> Result<Period> {
        let (start, end) = self.bounds()?;
        Ok(Period::new(start.into(), end.into()))
    }

    /// Concrete inclusive calendar bounds of the completed period.
    pub fn bounds(&self) -> Result<(NaiveDate, NaiveDate)> {
        let (start_year, end_year) = match (self.start.year, self.end.year) {
            (0, 0) => return Err(Error::incomplete_period(format!("no year in {}", self))),
            (0, y) => (y, y),
            (y, 0) => (y, y),
            (s, e) => (s, e),
        };
        let start = TemporalValue { year: start_year, ..self.start }.complete_as_start()?;
        let end = TemporalValue { year: end_year, ..self.end }.complete_as_end()?;
        if start > end {
            return Err(Error::invalid_input(format!("period {} ends before it starts", self)));
        }
        Ok((start, end))
    }

    /// Inclusive length of the completed period in days.
    pub fn days(&self) -> Result<i64> {
        let (start, end) = self.bounds()?;
        Ok((end - start).num_days() + 1)
    }

    /// Days of intersection over the length of the shorter completed period;
    /// 0 when the periods are disjoint.
    pub fn overlap_ratio(&self, other: &Period) -> Result<f64> {
        let (s1, e1) = self.bounds()?;
        let (s2, e2) = other.bounds()?;
        let lo = s1.max(s2);
        let hi = e1.min(e2);
        if lo > hi {
            return Ok(0.0);
        }
        let intersection = (hi - lo).num_days() + 1;
        let shorter = ((e1 - s1).num_days() + 1).min((e2 - s2).num_days() + 1);
        Ok(intersection as f64 / shorter as f64)
    }

    /// True when `other` lies entirely inside this period, bounds inclusive.
    pub fn contains(&self, other: &Period) -> Result<bool> {
        let (s1, e1) = self.bounds()?;
        let (s2, e2) = other.bounds()?;
        Ok(s1 <= s2 && e2 <= e1)
    }

    /// Widens the period so it covers `other`. Never narrows.
    pub fn merge(&mut self, other: impl Into<Period>) {
        let other = other.into();
        self.merge_value(other.start);
        self.merge_value(other.end);
    }

    fn merge_value(&mut self, value: TemporalValue) {
        if value.is_unspecified() {
            return;
        }
        if widens(&self.start, &value, TemporalValue::complete_as_start, Ordering::Less) {
            self.start = value;
        }
        if widens(&self.end, &value, TemporalValue::complete_as_end, Ordering::Greater) {
            self.end = value;
        }
    }
}

/// Whether `value` should replace `bound` on the side where `outward` points.
/// Dated values compare by their completed dates and the coarser value wins a
/// tie. Values without a year fall back to [`TemporalValue::cmp_specified`].
fn widens(
    bound: &TemporalValue,
    value: &TemporalValue,
    complete: fn(&TemporalValue) -> Result<NaiveDate>,
    outward: Ordering,
) -> bool {
    if bound.is_unspecified() {
        return true;
    }
    if bound.year != 0 && value.year != 0 {
        if let (Ok(b), Ok(v)) = (complete(bound), complete(value)) {
            return match v.cmp(&b) {
                Ordering::Equal => precision(value) < precision(bound),
                ord => ord == outward,
            };
        }
    }
    value.cmp_specified(bound) == outward
}

fn precision(v: &TemporalValue) -> u8 {
    u8::from(v.month != 0) + u8::from(v.day != 0)
}

impl From<TemporalValue> for Period {
    fn from(value: TemporalValue) -> Self {
        Period::new(value, value)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

//!  Kiwi Deals Agent
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Month Ranges
//!
//! Side-effect free calendar-month model for flexible searches, and the
//! compression of a month selection into a short label such as `Nov–Jan, Mar`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, ensure};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator between the first and last month of a run.
pub const RANGE_DASH: &str = "\u{2013}";

/// A calendar month. Only year and month carry meaning.
///
/// Stored as the first day of the month so ordering is chronological and
/// all calendar math goes through chrono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// `None` when `month` is not in 1..=12 or the year is out of chrono's range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            first: date - chrono::Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// First day of the next month, minus one day.
    pub fn last_day(&self) -> NaiveDate {
        self.succ()
            .and_then(|next| next.first.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn succ(&self) -> Option<Self> {
        self.first
            .checked_add_months(Months::new(1))
            .map(|first| Self { first })
    }

    /// `n` months later.
    pub fn plus(&self, n: u32) -> Option<Self> {
        self.first
            .checked_add_months(Months::new(n))
            .map(|first| Self { first })
    }

    /// Short English month name, e.g. `Nov`.
    pub fn short_name(&self) -> String {
        self.first.format("%b").to_string()
    }

    pub fn is_followed_by(&self, other: &YearMonth) -> bool {
        self.succ().as_ref() == Some(other)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    /// Accepts `YYYY-MM` and `YYYY/MM`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (year, month) = s
            .split_once(['-', '/'])
            .context(format!("Invalid month: {}. Use YYYY-MM", s))?;
        let year: i32 = year
            .parse()
            .context(format!("Invalid year in month: {}", s))?;
        let month: u32 = month
            .parse()
            .context(format!("Invalid month number in: {}", s))?;
        ensure!((1..=12).contains(&month), "Month out of range in: {}", s);
        YearMonth::new(year, month).context(format!("Year out of range in: {}", s))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The months picked for a flexible search.
///
/// A set, so one year/month pair appears at most once whatever the insertion
/// path, and iteration is always chronological.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthSelection {
    months: BTreeSet<YearMonth>,
}

impl MonthSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, month: YearMonth) -> bool {
        self.months.insert(month)
    }

    /// Insert the month containing `date`.
    pub fn insert_date(&mut self, date: NaiveDate) -> bool {
        self.insert(YearMonth::of(date))
    }

    pub fn remove(&mut self, month: &YearMonth) -> bool {
        self.months.remove(month)
    }

    /// Add `month` if absent, remove it otherwise. Returns whether it is now selected.
    pub fn toggle(&mut self, month: YearMonth) -> bool {
        if self.months.remove(&month) {
            false
        } else {
            self.months.insert(month);
            true
        }
    }

    pub fn contains(&self, month: &YearMonth) -> bool {
        self.months.contains(month)
    }

    pub fn earliest(&self) -> Option<YearMonth> {
        self.months.first().copied()
    }

    pub fn latest(&self) -> Option<YearMonth> {
        self.months.last().copied()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearMonth> {
        self.months.iter()
    }

    /// See [`compress_month_ranges`].
    pub fn label(&self) -> String {
        compress_month_ranges(self.months.iter().copied())
    }
}

impl FromIterator<YearMonth> for MonthSelection {
    fn from_iter<I: IntoIterator<Item = YearMonth>>(iter: I) -> Self {
        Self {
            months: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MonthSelection {
    type Item = &'a YearMonth;
    type IntoIter = std::collections::btree_set::Iter<'a, YearMonth>;

    fn into_iter(self) -> Self::IntoIter {
        self.months.iter()
    }
}

/// Collapse months into runs of consecutive calendar months.
///
/// Input order and duplicates do not matter. A run of one month renders as
/// its short name, longer runs as `first–last` (crossing year boundaries),
/// and runs are joined with `", "`. No months gives an empty string.
pub fn compress_month_ranges<I>(months: I) -> String
where
    I: IntoIterator<Item = YearMonth>,
{
    let sorted: Vec<YearMonth> = months
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut parts = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let start = sorted[i];
        let mut end = start;
        let mut j = i + 1;
        while j < sorted.len() && end.is_followed_by(&sorted[j]) {
            end = sorted[j];
            j += 1;
        }

        if start == end {
            parts.push(start.short_name());
        } else {
            parts.push(format!(
                "{}{}{}",
                start.short_name(),
                RANGE_DASH,
                end.short_name()
            ));
        }
        i = j;
    }

    parts.join(", ")
}

/// `count` consecutive months starting with the one containing `today`.
pub fn upcoming_months(today: NaiveDate, count: u32) -> Vec<YearMonth> {
    let current = YearMonth::of(today);
    (0..count).filter_map(|i| current.plus(i)).collect()
}

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

//! # Search Form
//!
//! State of the search screen and the labels derived from it.
//! Every setter keeps the state valid, so `to_request` never fails and
//! front-ends can re-derive labels after any change.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use crate::deals_query_builder::{
    DepartureDay, NIGHTS_BOUNDS, PASSENGERS_BOUNDS, SearchRequest, TripType,
};
use crate::month_ranges::{MonthSelection, YearMonth, upcoming_months};

pub const SELECT_MONTHS_PLACEHOLDER: &str = "Select month(s)";
const SHORT_DAY_FORMAT: &str = "%-d %b";
const ANCHOR_MONTHS: u32 = 12;
const DEFAULT_STAY_DAYS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchForm {
    trip_type: TripType,
    origin: String,
    destination: String,
    passengers: u8,
    depart_date: NaiveDate,
    return_date: NaiveDate,
    flexible: bool,
    selected_months: MonthSelection,
    min_nights: u8,
    max_nights: u8,
    departure_days: BTreeSet<DepartureDay>,
}

impl SearchForm {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            trip_type: TripType::RoundTrip,
            origin: "Naples".to_string(),
            destination: String::new(),
            passengers: 1,
            depart_date: today,
            return_date: today
                .checked_add_days(Days::new(DEFAULT_STAY_DAYS))
                .unwrap_or(today),
            flexible: true,
            selected_months: MonthSelection::new(),
            min_nights: 2,
            max_nights: 7,
            departure_days: BTreeSet::from([DepartureDay::Any]),
        }
    }

    pub fn trip_type(&self) -> TripType {
        self.trip_type
    }

    pub fn set_trip_type(&mut self, trip_type: TripType) {
        self.trip_type = trip_type;
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = origin.into();
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn set_destination(&mut self, destination: impl Into<String>) {
        self.destination = destination.into();
    }

    pub fn passengers(&self) -> u8 {
        self.passengers
    }

    pub fn set_passengers(&mut self, passengers: u8) {
        self.passengers = passengers.clamp(*PASSENGERS_BOUNDS.start(), *PASSENGERS_BOUNDS.end());
    }

    pub fn depart_date(&self) -> NaiveDate {
        self.depart_date
    }

    /// Pushes the return date forward if it would now precede departure.
    pub fn set_depart_date(&mut self, date: NaiveDate) {
        self.depart_date = date;
        if self.return_date < date {
            self.return_date = date;
        }
    }

    pub fn return_date(&self) -> NaiveDate {
        self.return_date
    }

    pub fn set_return_date(&mut self, date: NaiveDate) {
        self.return_date = date.max(self.depart_date);
    }

    pub fn is_flexible(&self) -> bool {
        self.flexible
    }

    pub fn set_flexible(&mut self, flexible: bool) {
        self.flexible = flexible;
    }

    pub fn selected_months(&self) -> &MonthSelection {
        &self.selected_months
    }

    /// Returns whether `month` is selected afterwards.
    pub fn toggle_month(&mut self, month: YearMonth) -> bool {
        self.selected_months.toggle(month)
    }

    /// The months offered for selection, starting with the current one.
    pub fn month_anchors(today: NaiveDate) -> Vec<YearMonth> {
        upcoming_months(today, ANCHOR_MONTHS)
    }

    pub fn nights(&self) -> (u8, u8) {
        (self.min_nights, self.max_nights)
    }

    /// Takes the raw bounds of a two-thumb slider.
    pub fn set_nights_range(&mut self, lower: f64, upper: f64) {
        let lo = *NIGHTS_BOUNDS.start() as f64;
        let hi = *NIGHTS_BOUNDS.end() as f64;
        let clamp = |v: f64| if v.is_nan() { lo } else { v.clamp(lo, hi) };

        let upper = clamp(upper.ceil()) as u8;
        let lower = (clamp(lower.floor()) as u8).min(upper);
        self.min_nights = lower;
        self.max_nights = upper;
    }

    /// Screen-only: weekdays are not part of the search request.
    pub fn departure_days(&self) -> &BTreeSet<DepartureDay> {
        &self.departure_days
    }

    /// `Any` is exclusive: picking it clears specific days, picking a
    /// specific day clears `Any`. Deselecting the last day falls back to `Any`.
    pub fn toggle_departure_day(&mut self, day: DepartureDay) {
        if day == DepartureDay::Any {
            self.departure_days = BTreeSet::from([DepartureDay::Any]);
            return;
        }
        self.departure_days.remove(&DepartureDay::Any);
        if !self.departure_days.remove(&day) {
            self.departure_days.insert(day);
        }
        if self.departure_days.is_empty() {
            self.departure_days.insert(DepartureDay::Any);
        }
    }

    pub fn travel_dates_label(&self) -> String {
        describe_travel_dates(&self.to_request())
    }

    pub fn passengers_label(&self) -> String {
        let plural = if self.passengers > 1 { "s" } else { "" };
        format!("{} adult{}", self.passengers, plural)
    }

    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            origin: self.origin.trim().to_string(),
            destination: self.destination.trim().to_string(),
            trip_type: self.trip_type,
            flexible: self.flexible,
            exact_depart_date: self.depart_date,
            exact_return_date: self.return_date,
            selected_months: self.selected_months.clone(),
            min_nights: self.min_nights,
            max_nights: self.max_nights,
            passengers: self.passengers,
        }
    }
}

/// Human-readable travel dates for a request, e.g. `Nov–Jan • 2–7 nights`
/// or `7 Nov – 12 Nov`.
pub fn describe_travel_dates(request: &SearchRequest) -> String {
    if request.flexible {
        let months = request.selected_months.label();
        let months = if months.is_empty() {
            SELECT_MONTHS_PLACEHOLDER.to_string()
        } else {
            months
        };
        match request.trip_type {
            TripType::OneWay => months,
            TripType::RoundTrip => format!(
                "{} • {}–{} nights",
                months, request.min_nights, request.max_nights
            ),
        }
    } else {
        let depart = request.exact_depart_date.format(SHORT_DAY_FORMAT).to_string();
        match request.trip_type {
            TripType::OneWay => depart,
            TripType::RoundTrip => format!(
                "{} – {}",
                depart,
                request.effective_return_date().format(SHORT_DAY_FORMAT)
            ),
        }
    }
}

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

//! # Deals Query Builder
//!
//! Side-effect free query encoding for the Tequila `/v2/search` endpoint.
//! This module turns a search request into the flat GET parameters.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use anyhow::{Result, ensure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::month_ranges::{MonthSelection, YearMonth};

pub const SEARCH_PATH: &str = "/v2/search";
pub const CURRENCY: &str = "EUR";
pub const RESULT_LIMIT: u32 = 30;
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const NIGHTS_BOUNDS: RangeInclusive<u8> = 1..=31;
pub const PASSENGERS_BOUNDS: RangeInclusive<u8> = 1..=9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    #[serde(alias = "oneway", alias = "one-way")]
    OneWay,
    #[default]
    #[serde(alias = "round", alias = "round-trip", alias = "return")]
    RoundTrip,
}

impl TripType {
    /// Value of the `flight_type` parameter.
    pub fn as_flight_type(&self) -> &'static str {
        match self {
            TripType::OneWay => "oneway",
            TripType::RoundTrip => "round",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "oneway" | "one_way" | "one-way" | "one" | "ow" => Some(TripType::OneWay),
            "roundtrip" | "round_trip" | "round-trip" | "round" | "return" | "rt" => {
                Some(TripType::RoundTrip)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum DepartureDay {
    Any,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DepartureDay {
    pub const ALL: [DepartureDay; 8] = [
        DepartureDay::Any,
        DepartureDay::Mon,
        DepartureDay::Tue,
        DepartureDay::Wed,
        DepartureDay::Thu,
        DepartureDay::Fri,
        DepartureDay::Sat,
        DepartureDay::Sun,
    ];

    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "any" => Some(DepartureDay::Any),
            "mon" | "monday" => Some(DepartureDay::Mon),
            "tue" | "tuesday" => Some(DepartureDay::Tue),
            "wed" | "wednesday" => Some(DepartureDay::Wed),
            "thu" | "thursday" => Some(DepartureDay::Thu),
            "fri" | "friday" => Some(DepartureDay::Fri),
            "sat" | "saturday" => Some(DepartureDay::Sat),
            "sun" | "sunday" => Some(DepartureDay::Sun),
            _ => None,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            DepartureDay::Any => "Any",
            DepartureDay::Mon => "Mon",
            DepartureDay::Tue => "Tue",
            DepartureDay::Wed => "Wed",
            DepartureDay::Thu => "Thu",
            DepartureDay::Fri => "Fri",
            DepartureDay::Sat => "Sat",
            DepartureDay::Sun => "Sun",
        }
    }
}

/// GET parameters for one search, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<&'static str, String>);

impl QueryParams {
    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `k=v&k=v` with percent-encoded values.
    pub fn to_query_string(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// A validated search. Only obtainable through [`SearchRequestBuilder::build`]
/// or [`crate::SearchForm::to_request`], both of which keep the ranges valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub(crate) origin: String,
    pub(crate) destination: String,
    pub(crate) trip_type: TripType,
    pub(crate) flexible: bool,
    pub(crate) exact_depart_date: NaiveDate,
    pub(crate) exact_return_date: NaiveDate,
    pub(crate) selected_months: MonthSelection,
    pub(crate) min_nights: u8,
    pub(crate) max_nights: u8,
    pub(crate) passengers: u8,
}

impl SearchRequest {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn trip_type(&self) -> TripType {
        self.trip_type
    }

    pub fn is_flexible(&self) -> bool {
        self.flexible
    }

    pub fn depart_date(&self) -> NaiveDate {
        self.exact_depart_date
    }

    pub fn selected_months(&self) -> &MonthSelection {
        &self.selected_months
    }

    pub fn nights(&self) -> (u8, u8) {
        (self.min_nights, self.max_nights)
    }

    pub fn passengers(&self) -> u8 {
        self.passengers
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            NIGHTS_BOUNDS.contains(&self.min_nights),
            "Minimum nights must be within 1..=31, got {}",
            self.min_nights
        );
        ensure!(
            NIGHTS_BOUNDS.contains(&self.max_nights),
            "Maximum nights must be within 1..=31, got {}",
            self.max_nights
        );
        ensure!(
            self.min_nights <= self.max_nights,
            "Minimum nights ({}) cannot exceed maximum nights ({})",
            self.min_nights,
            self.max_nights
        );
        ensure!(
            PASSENGERS_BOUNDS.contains(&self.passengers),
            "Passengers must be within 1..=9, got {}",
            self.passengers
        );
        Ok(())
    }

    /// Return date actually sent: never before departure.
    pub fn effective_return_date(&self) -> NaiveDate {
        self.exact_return_date.max(self.exact_depart_date)
    }

    /// Months spanned by a flexible search. An empty selection falls back to
    /// the month of the exact departure date.
    pub fn flexible_span(&self) -> (YearMonth, YearMonth) {
        let fallback = YearMonth::of(self.exact_depart_date);
        let earliest = self.selected_months.earliest().unwrap_or(fallback);
        let latest = self.selected_months.latest().unwrap_or(earliest);
        (earliest, latest)
    }

    pub fn build_query(&self) -> QueryParams {
        debug_assert!(self.validate().is_ok(), "invalid search request: {self:?}");
        let mut query = QueryParams::default();
        query.insert("curr", CURRENCY);
        query.insert("adults", self.passengers.to_string());
        query.insert("sort", "price");
        query.insert("limit", RESULT_LIMIT.to_string());
        query.insert("vehicle_type", "aircraft");
        query.insert("flight_type", self.trip_type.as_flight_type());

        if !self.origin.is_empty() {
            query.insert("fly_from", self.origin.clone());
        }
        if !self.destination.is_empty() {
            query.insert("fly_to", self.destination.clone());
        }

        if self.flexible {
            let (earliest, latest) = self.flexible_span();
            query.insert("date_from", format_date(earliest.first_day()));
            query.insert("date_to", format_date(latest.last_day()));

            if self.trip_type == TripType::RoundTrip {
                query.insert("nights_in_dst_from", self.min_nights.to_string());
                query.insert("nights_in_dst_to", self.max_nights.to_string());
            }
        } else {
            let depart = format_date(self.exact_depart_date);
            query.insert("date_from", depart.clone());
            query.insert("date_to", depart);

            if self.trip_type == TripType::RoundTrip {
                let back = format_date(self.effective_return_date());
                query.insert("return_from", back.clone());
                query.insert("return_to", back);
            }
        }

        query
    }

    pub fn search_url(&self, base_url: &str) -> String {
        format!(
            "{}{}?{}",
            base_url.trim_end_matches('/'),
            SEARCH_PATH,
            self.build_query().to_query_string()
        )
    }

    pub fn builder(
        origin: impl Into<String>,
        destination: impl Into<String>,
        depart_date: NaiveDate,
    ) -> SearchRequestBuilder {
        SearchRequestBuilder {
            origin: origin.into(),
            destination: destination.into(),
            trip_type: TripType::RoundTrip,
            flexible: false,
            depart_date,
            return_date: depart_date,
            selected_months: MonthSelection::new(),
            min_nights: 2,
            max_nights: 7,
            passengers: 1,
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Clone)]
pub struct SearchRequestBuilder {
    origin: String,
    destination: String,
    trip_type: TripType,
    flexible: bool,
    depart_date: NaiveDate,
    return_date: NaiveDate,
    selected_months: MonthSelection,
    min_nights: u8,
    max_nights: u8,
    passengers: u8,
}

impl SearchRequestBuilder {
    pub fn trip_type(mut self, trip_type: TripType) -> Self {
        self.trip_type = trip_type;
        self
    }

    pub fn return_date(mut self, return_date: NaiveDate) -> Self {
        self.return_date = return_date;
        self
    }

    pub fn flexible(mut self, flexible: bool) -> Self {
        self.flexible = flexible;
        self
    }

    /// Selecting months switches the request to flexible mode.
    pub fn months(mut self, months: impl IntoIterator<Item = YearMonth>) -> Self {
        self.selected_months = months.into_iter().collect();
        self.flexible = true;
        self
    }

    pub fn nights(mut self, min_nights: u8, max_nights: u8) -> Self {
        self.min_nights = min_nights;
        self.max_nights = max_nights;
        self
    }

    pub fn passengers(mut self, passengers: u8) -> Self {
        self.passengers = passengers;
        self
    }

    pub fn build(self) -> Result<SearchRequest> {
        let request = SearchRequest {
            origin: self.origin,
            destination: self.destination,
            trip_type: self.trip_type,
            flexible: self.flexible,
            exact_depart_date: self.depart_date,
            exact_return_date: self.return_date,
            selected_months: self.selected_months,
            min_nights: self.min_nights,
            max_nights: self.max_nights,
            passengers: self.passengers,
        };
        request.validate()?;
        Ok(request)
    }
}

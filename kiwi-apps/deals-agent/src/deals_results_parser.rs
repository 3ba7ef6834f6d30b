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

//! # Deals Results Parser
//!
//! Side-effect free JSON decoding of Tequila search responses.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::SearchRequest;

pub const DEAL_TIME_FORMAT: &str = "%-d %b, %H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
}

/// One priced itinerary, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDeal {
    #[serde(rename = "cityFrom")]
    pub city_from: String,
    #[serde(rename = "cityTo")]
    pub city_to: String,
    #[serde(rename = "countryTo")]
    pub country_to: Country,
    pub price: f64,
    #[serde(rename = "dTime")]
    pub d_time: i64,
    #[serde(rename = "aTime")]
    pub a_time: i64,
    #[serde(default)]
    pub airlines: Vec<String>,
    #[serde(default)]
    pub deep_link: Option<String>,
}

impl FlightDeal {
    /// Not globally unique, good enough to key a result list.
    pub fn id(&self) -> String {
        format!("{}-{}-{}", self.city_from, self.city_to, self.d_time)
    }

    pub fn departure(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.d_time, 0)
    }

    pub fn arrival(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.a_time, 0)
    }

    pub fn route_label(&self) -> String {
        format!(
            "{} → {}, {}",
            self.city_from, self.city_to, self.country_to.name
        )
    }

    /// Whole euros, fractional part dropped.
    pub fn price_label(&self) -> String {
        format!("€{}", self.price.trunc() as i64)
    }
}

/// Format a Unix timestamp as `d MMM, HH:mm` in `tz`.
pub fn format_epoch<Tz>(epoch: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp(epoch, 0)
        .map(|utc| utc.with_timezone(tz).format(DEAL_TIME_FORMAT).to_string())
}

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse {
    data: Vec<FlightDeal>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DealsSearchResult {
    pub search_params: SearchRequest,
    pub deals: Vec<FlightDeal>,
    pub currency: Option<String>,
}

impl DealsSearchResult {
    /// An empty `data` array is a valid, empty result.
    pub fn from_json(body: &str, search_params: SearchRequest) -> serde_json::Result<Self> {
        let response: SearchResponse = serde_json::from_str(body)?;
        tracing::debug!(
            "Decoded {} deals (currency: {:?})",
            response.data.len(),
            response.currency
        );
        Ok(Self {
            search_params,
            deals: response.data,
            currency: response.currency,
        })
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn cheapest(&self) -> Option<&FlightDeal> {
        self.deals
            .iter()
            .min_by(|a, b| a.price.total_cmp(&b.price))
    }

    pub fn to_mcp_api_response(&self, search_url: String, warnings: Vec<String>) -> DealsApiResponse {
        let params = &self.search_params;
        DealsApiResponse {
            origin: params.origin.clone(),
            destination: params.destination.clone(),
            travel_dates: crate::search_form::describe_travel_dates(params),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| crate::deals_query_builder::CURRENCY.to_string()),
            search_url,
            deals: self
                .deals
                .iter()
                .map(|d| DealSummary {
                    id: d.id(),
                    route: d.route_label(),
                    price: d.price,
                    departure: d.departure().map(|t| t.to_rfc3339()),
                    arrival: d.arrival().map(|t| t.to_rfc3339()),
                    airlines: d.airlines.clone(),
                    deep_link: d.deep_link.clone(),
                })
                .collect(),
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DealSummary {
    pub id: String,
    pub route: String,
    pub price: f64,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub airlines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DealsApiResponse {
    pub origin: String,
    pub destination: String,
    pub travel_dates: String,
    pub currency: String,
    pub search_url: String,
    pub deals: Vec<DealSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

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

// Library for kiwi-deals-agent
// Flight deals search over the Tequila API (CLI + MCP server)

pub mod config;
mod deals_query_builder;
mod deals_results_parser;
mod deals_search;
mod month_ranges;
mod search_form;

pub use config::DealsConfig;

// Re-export commonly used items from deals_query_builder
pub use deals_query_builder::{
    CURRENCY, DATE_FORMAT, DepartureDay, QueryParams, RESULT_LIMIT, SEARCH_PATH, SearchRequest,
    SearchRequestBuilder, TripType, format_date,
};

// Re-export deals_results_parser
pub use deals_results_parser::{
    Country, DealSummary, DealsApiResponse, DealsSearchResult, FlightDeal, format_epoch,
};

// Re-export deals_search
pub use deals_search::{DealsError, SearchSession, TequilaClient};

pub use month_ranges::{MonthSelection, YearMonth, compress_month_ranges, upcoming_months};
pub use search_form::{SELECT_MONTHS_PLACEHOLDER, SearchForm, describe_travel_dates};

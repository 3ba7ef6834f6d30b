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

//! Live integration tests against the Tequila API.
//!
//! These make real HTTP requests and need `TEQUILA_API_KEY` in the
//! environment (or a `.env` file).
//!
//! Run with: cargo test --test t_deals_integration_live -- --include-ignored

use anyhow::{Context, Result};
use chrono::{Days, Months, NaiveDate};
use kiwi_deals_agent::{
    DealsConfig, SearchRequest, SearchSession, TequilaClient, TripType, YearMonth,
};

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn live_client() -> Result<TequilaClient> {
    let config = DealsConfig::from_env().context("TEQUILA_API_KEY is required for live tests")?;
    TequilaClient::new(&config)
}

#[tokio::test]
#[ignore]
async fn test_live_exact_round_trip() -> Result<()> {
    let client = live_client()?;
    let depart = today() + Months::new(2);
    let request = SearchRequest::builder("NAP", "LON", depart)
        .return_date(depart + Days::new(5))
        .build()?;

    let result = client.search_deals(&request).await?;
    println!("{} deals, best: {:?}", result.len(), result.cheapest().map(|d| d.price_label()));
    for deal in &result.deals {
        assert!(deal.price >= 0.0);
        assert!(deal.departure().is_some());
    }
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_live_flexible_anywhere() -> Result<()> {
    let client = live_client()?;
    let first = YearMonth::of(today() + Months::new(1));
    let months = [first, first.succ().context("month overflow")?];
    let request = SearchRequest::builder("NAP", "", today())
        .months(months)
        .nights(2, 5)
        .build()?;

    let session = SearchSession::new(client);
    let result = session
        .submit(&request)
        .await?
        .context("search should not be superseded")?;
    assert!(result.len() <= 30);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_live_one_way_anywhere_to_destination() -> Result<()> {
    let client = live_client()?;
    let request = SearchRequest::builder("", "BCN", today() + Months::new(1))
        .trip_type(TripType::OneWay)
        .build()?;
    let result = client.search_deals(&request).await?;
    if let Some(deal) = result.cheapest() {
        assert!(result.deals.iter().all(|d| d.price >= deal.price));
    }
    Ok(())
}

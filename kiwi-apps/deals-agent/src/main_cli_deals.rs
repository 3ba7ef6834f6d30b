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

//! CLI for Tequila flight-deals search.

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use kiwi_deals_agent::{
    DealsConfig, DealsSearchResult, FlightDeal, SearchRequest, SearchSession,
    TequilaClient, TripType, YearMonth, describe_travel_dates, format_epoch,
};
use std::cmp::max;

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "kiwi-deals")]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Origin city or airport code (omit to search from anywhere)
    #[arg(short, long, default_value = "")]
    from: String,

    /// Destination city or airport code (omit to search anywhere)
    #[arg(short, long, default_value = "")]
    to: String,

    /// Trip type: roundtrip, oneway
    #[arg(long, default_value = "roundtrip")]
    trip: String,

    /// Exact departure date (YYYY-MM-DD or YYYY/MM/DD), defaults to today
    #[arg(short, long)]
    date: Option<String>,

    /// Exact return date for round trips, defaults to departure + 5 days
    #[arg(short = 'R', long)]
    return_date: Option<String>,

    /// Months for a flexible search (comma-separated YYYY-MM, e.g. 2025-11,2025-12)
    #[arg(short, long, value_delimiter = ',')]
    months: Vec<String>,

    /// Flexible search over whole months (implied by --months)
    #[arg(long)]
    flexible: bool,

    /// Minimum nights at destination (flexible round trips)
    #[arg(long, default_value = "2")]
    min_nights: u8,

    /// Maximum nights at destination (flexible round trips)
    #[arg(long, default_value = "7")]
    max_nights: u8,

    /// Number of passengers (adults, 1-9)
    #[arg(short, long, default_value = "1")]
    passengers: u8,

    /// Print travel dates and the request URL without calling the API
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

/// Configure logging based on verbosity level
fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Parse trip type string to TripType enum
fn parse_trip(s: &str) -> Result<TripType> {
    TripType::from_str_name(s)
        .with_context(|| format!("Invalid trip type: {}. Use: roundtrip, oneway", s))
}

/// Parse date string to NaiveDate
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .context(format!(
            "Invalid date format: {}. Use YYYY-MM-DD or YYYY/MM/DD",
            s
        ))
}

fn parse_months(values: &[String]) -> Result<Vec<YearMonth>> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<YearMonth>())
        .collect()
}

fn build_request(args: &CliArgs) -> Result<SearchRequest> {
    let trip = parse_trip(&args.trip)?;
    let today = Local::now().date_naive();
    let depart_date = args
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(today);
    let return_date = match args.return_date.as_deref() {
        Some(d) => parse_date(d)?,
        None => depart_date
            .checked_add_days(Days::new(5))
            .unwrap_or(depart_date),
    };
    let months = parse_months(&args.months)?;

    let mut builder = SearchRequest::builder(args.from.trim(), args.to.trim(), depart_date)
        .trip_type(trip)
        .return_date(return_date)
        .flexible(args.flexible)
        .nights(args.min_nights, args.max_nights)
        .passengers(args.passengers);

    if !months.is_empty() {
        builder = builder.months(months);
    }

    builder.build().context("Failed to build search parameters")
}

/// Get terminal width for responsive tables
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(100)
}

fn dash_bar() -> String {
    "-".repeat(get_terminal_width().min(100))
}

fn fmt_time(epoch: i64) -> String {
    format_epoch(epoch, &Local).unwrap_or_else(|| "??".to_string())
}

fn fmt_airlines(deal: &FlightDeal) -> String {
    if deal.airlines.is_empty() {
        "??".to_string()
    } else {
        deal.airlines.join(",")
    }
}

/// Calculate column widths for route, departure, arrival and airlines
fn calc_column_widths(deals: &[FlightDeal]) -> (usize, usize, usize, usize) {
    let mut route = 5;
    let mut times = 13;
    let mut airlines = 8;

    for deal in deals {
        route = max(route, deal.route_label().chars().count());
        times = max(times, fmt_time(deal.d_time).chars().count());
        times = max(times, fmt_time(deal.a_time).chars().count());
        airlines = max(airlines, fmt_airlines(deal).chars().count());
    }

    let available = get_terminal_width().saturating_sub(4 + 2 * times + airlines + 20);
    if route > available && available > 20 {
        route = available;
    }

    (4, route, times, airlines)
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Render results to stdout
fn render_results(result: &DealsSearchResult, search_url: &str) {
    let params = &result.search_params;
    let from = if params.origin().is_empty() { "Anywhere" } else { params.origin() };
    let to = if params.destination().is_empty() { "Anywhere" } else { params.destination() };

    println!("{}", "=".repeat(96));
    println!("  🛫  {} → {}  |  {}", from, to, describe_travel_dates(params));
    println!("{}\n", "=".repeat(96));

    if let Some(cheapest) = result.cheapest() {
        println!("💰 Best Price:  {}", cheapest.price_label());
    }
    println!("📊 Total Deals: {}", result.len());
    println!("\n🔗 Search URL: {}", search_url);

    if result.is_empty() {
        println!("\nNo deals found");
        return;
    }

    let (nw, rw, tw, aw) = calc_column_widths(&result.deals);

    println!("\n{}", dash_bar());
    println!(
        "{:>nw$}  {:<rw$}  {:<tw$}  {:<tw$}  {:<aw$}  PRICE",
        "#", "ROUTE", "DEPART", "ARRIVE", "AIRLINES"
    );
    println!("{}", dash_bar());

    for (i, deal) in result.deals.iter().enumerate() {
        println!(
            "{:>nw$}  {:<rw$}  {:<tw$}  {:<tw$}  {:<aw$}  {}",
            i + 1,
            truncate(&deal.route_label(), rw),
            fmt_time(deal.d_time),
            fmt_time(deal.a_time),
            fmt_airlines(deal),
            deal.price_label()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    tracing::info!("Starting kiwi-deals CLI");
    tracing::debug!("Args: {:?}", args);

    let request = build_request(&args)?;
    tracing::info!(
        "Parsed request: {:?} {} ({} adult(s))",
        request.trip_type(),
        describe_travel_dates(&request),
        request.passengers()
    );

    if args.dry_run {
        let base_url = kiwi_deals_agent::config::base_url_from_env()
            .context("Failed to load configuration")?;
        println!("Travel dates: {}", describe_travel_dates(&request));
        println!("Search URL:   {}", request.search_url(&base_url));
        return Ok(());
    }

    let config = DealsConfig::from_env().context("Failed to load configuration")?;
    let client = TequilaClient::new(&config)?;
    let search_url = request.search_url(client.base_url());
    let session = SearchSession::new(client);

    let Some(result) = session
        .submit(&request)
        .await
        .context("Search failed")?
    else {
        tracing::warn!("Search was superseded before it completed");
        return Ok(());
    };

    tracing::info!(
        "Search completed: {} deals found, best price: {}",
        result.len(),
        result
            .cheapest()
            .map(|d| d.price_label())
            .unwrap_or_else(|| "n/a".to_string())
    );

    render_results(&result, &search_url);

    Ok(())
}

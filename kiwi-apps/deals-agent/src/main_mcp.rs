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

//! # Unified MCP Server Entry Point
//!
//! Supports stdio and HTTP transports via subcommand.

use anyhow::{Context, Error, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kiwi_deals_agent::{
    DealsConfig, DepartureDay, SearchForm, TequilaClient, TripType, YearMonth,
};
use rmcp::handler::server::{ServerHandler, tool::ToolRouter, wrapper::Parameters};
use rmcp::service::serve_server;
use rmcp::tool;
use rmcp::tool_router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "kiwi-deals-mcp")]
#[command(author, version, about = "MCP server for flight-deals search")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run MCP server over stdio (for Claude Desktop, etc.)
    Stdio,

    /// Run MCP server over HTTP
    Http {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn default_adults() -> u8 {
    1
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DealsInput {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub trip_type: TripType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(default)]
    pub months: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_nights: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nights: Option<u8>,
    #[serde(default)]
    pub departure_days: Vec<DepartureDay>,
    #[serde(default = "default_adults")]
    pub adults: u8,
}

impl Default for DealsInput {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            trip_type: TripType::default(),
            date: None,
            return_date: None,
            months: Vec::new(),
            min_nights: None,
            max_nights: None,
            departure_days: Vec::new(),
            adults: default_adults(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TravelDatesOutput {
    pub travel_dates: String,
    pub passengers: String,
    pub departure_days: Vec<String>,
    pub search_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .map_err(|_| format!("Invalid date format: {s}. Use YYYY-MM-DD"))
}

/// Apply tool input to a fresh form. Out-of-range values are clamped and
/// reported as warnings instead of failing the call.
fn form_from_input(input: DealsInput, today: NaiveDate) -> Result<(SearchForm, Vec<String>), String> {
    let mut warnings = Vec::new();
    let mut form = SearchForm::new(today);
    form.set_origin(input.from);
    form.set_destination(input.to);
    form.set_trip_type(input.trip_type);

    if let Some(date) = input.date.as_deref() {
        form.set_depart_date(parse_date(date)?);
    }
    if let Some(date) = input.return_date.as_deref() {
        let requested = parse_date(date)?;
        form.set_return_date(requested);
        if form.return_date() != requested {
            warnings.push(format!(
                "Return date {requested} precedes departure, using {}.",
                form.return_date()
            ));
        }
    }

    let mut invalid_months = Vec::new();
    for raw in &input.months {
        match raw.parse::<YearMonth>() {
            Ok(month) if !form.selected_months().contains(&month) => {
                form.toggle_month(month);
            }
            Ok(_) => {}
            Err(_) => invalid_months.push(raw.as_str()),
        }
    }
    if !invalid_months.is_empty() {
        warnings.push(format!(
            "Ignored invalid month(s): {}. Use YYYY-MM.",
            invalid_months.join(", ")
        ));
    }
    form.set_flexible(!form.selected_months().is_empty());

    if input.min_nights.is_some() || input.max_nights.is_some() {
        let (min, max) = form.nights();
        let requested = (input.min_nights.unwrap_or(min), input.max_nights.unwrap_or(max));
        form.set_nights_range(f64::from(requested.0), f64::from(requested.1));
        if form.nights() != requested {
            warnings.push(format!(
                "Nights {}..{} adjusted to {}..{} (allowed 1..31, min <= max).",
                requested.0,
                requested.1,
                form.nights().0,
                form.nights().1
            ));
        }
    }

    let days: BTreeSet<DepartureDay> = input.departure_days.into_iter().collect();
    if days.contains(&DepartureDay::Any) {
        form.toggle_departure_day(DepartureDay::Any);
    } else {
        for day in days {
            form.toggle_departure_day(day);
        }
    }

    form.set_passengers(input.adults);
    if form.passengers() != input.adults {
        warnings.push(format!(
            "Adults {} adjusted to {} (allowed 1..9).",
            input.adults,
            form.passengers()
        ));
    }

    Ok((form, warnings))
}

#[derive(Clone)]
pub struct DealsAgentServer {
    deals_client: Option<Arc<TequilaClient>>,
    base_url: String,
    tool_router: ToolRouter<Self>,
}

impl DealsAgentServer {
    pub fn new(deals_client: Option<Arc<TequilaClient>>, base_url: String) -> Self {
        Self {
            deals_client,
            base_url,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl DealsAgentServer {
    #[tool(
        name = "search_deals",
        description = "Search cheapest flight deals (Kiwi.com Tequila API). Parameters: from (city/IATA, optional), to (city/IATA, optional), trip_type (round_trip/one_way), date (YYYY-MM-DD exact departure), return_date (YYYY-MM-DD), months (YYYY-MM list for a flexible search), min_nights/max_nights (1-31, flexible round trips), departure_days (any/mon..sun, kept with the search form but not sent to the API), adults (1-9)."
    )]
    async fn search_deals(&self, params: Parameters<DealsInput>) -> Result<String, String> {
        let client = self
            .deals_client
            .as_ref()
            .ok_or_else(|| "TEQUILA_API_KEY is not configured on the server".to_string())?;

        let today = chrono::Local::now().date_naive();
        let (form, warnings) = form_from_input(params.0, today)?;
        let request = form.to_request();

        let result = client
            .search_deals(&request)
            .await
            .map_err(|e| format!("Deals search failed: {e}"))?;

        let search_url = request.search_url(client.base_url());
        serde_json::to_string(&result.to_mcp_api_response(search_url, warnings))
            .map_err(|e| e.to_string())
    }

    #[tool(
        name = "describe_travel_dates",
        description = "Describe a deals search without running it: returns the compact travel dates label (e.g. 'Nov–Jan • 2–7 nights'), the passengers label and the request URL. Takes the same parameters as search_deals."
    )]
    async fn describe_travel_dates(&self, params: Parameters<DealsInput>) -> Result<String, String> {
        let today = chrono::Local::now().date_naive();
        let (form, warnings) = form_from_input(params.0, today)?;
        let output = TravelDatesOutput {
            travel_dates: form.travel_dates_label(),
            passengers: form.passengers_label(),
            departure_days: form
                .departure_days()
                .iter()
                .map(|d| d.as_str_name().to_string())
                .collect(),
            search_url: form.to_request().search_url(&self.base_url),
            warnings,
        };
        serde_json::to_string(&output).map_err(|e| e.to_string())
    }
}

impl ServerHandler for DealsAgentServer {
    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        tracing::debug!(
            "list_tools called, tools count: {}",
            self.tool_router.list_all().len()
        );
        Box::pin(async move {
            let tools = self.tool_router.list_all();
            Ok(rmcp::model::ListToolsResult::with_all_items(tools))
        })
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        let router = self.tool_router.clone();
        let self_clone = self.clone();
        Box::pin(async move {
            let context =
                rmcp::handler::server::tool::ToolCallContext::new(&self_clone, request, context);
            router.call(context).await
        })
    }

    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2025_03_26,
            capabilities: rmcp::model::ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation::from_build_env(),
            instructions: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".to_string().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    tracing::debug!("Parsed args: {:?}", args);

    let (deals_client, base_url) = match DealsConfig::from_env() {
        Ok(config) => {
            tracing::debug!("Creating deals client with {:?}", config);
            let client = TequilaClient::new(&config).context("Failed to create deals client")?;
            (Some(Arc::new(client)), config.base_url)
        }
        Err(e) => {
            tracing::warn!("{e:#}; search_deals will be unavailable");
            let base_url = kiwi_deals_agent::config::base_url_from_env()
                .context("Failed to load configuration")?;
            (None, base_url)
        }
    };

    match args.command {
        Command::Stdio => {
            eprintln!("Starting MCP server over stdio...");
            let server = DealsAgentServer::new(deals_client, base_url);
            let (stdin, stdout) = rmcp::transport::io::stdio();
            let _running = serve_server(Arc::new(server), (stdin, stdout))
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
            tracing::debug!("Server running. Press Ctrl+C to stop.");
            std::future::pending::<()>().await;
        }
        Command::Http { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .context("Invalid host:port")?;
            tracing::info!("Starting MCP server over HTTP on {}", addr);
            let server = DealsAgentServer::new(deals_client, base_url);
            let session_manager = Arc::new(LocalSessionManager::default());
            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..Default::default()
            };
            let service =
                StreamableHttpService::new(move || Ok(server.clone()), session_manager, config);
            let app = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            tracing::debug!("Listening on {}", addr);
            axum::serve(listener, app)
                .await
                .context("HTTP server error")?;
        }
    }

    Ok(())
}

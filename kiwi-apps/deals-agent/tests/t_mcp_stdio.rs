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

//! MCP server integration tests using subprocess with stdio transport.
//!
//! `describe_travel_dates` runs without an API key. `search_deals` runs against
//! an in-process axum mock of the Tequila search endpoint.
//!
//! Run with:
//!     cargo test --test t_mcp_stdio

#![cfg(test)]

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Once;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

const TIMEOUT: Duration = Duration::from_secs(5);
const BASE_URL: &str = "http://127.0.0.1:9";
const API_KEY: &str = "mcp-test-key";

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::new("debug"))
            .init();
    });
}

struct McpProcess {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl McpProcess {
    /// Server without an API key, so only network-free tools succeed.
    fn spawn() -> Result<Self> {
        Self::spawn_with(None, BASE_URL)
    }

    fn spawn_with(api_key: Option<&str>, base_url: &str) -> Result<Self> {
        let mut command = Command::new(env!("CARGO_BIN_EXE_kiwi-deals-mcp"));
        command
            .arg("stdio")
            .current_dir(std::env::temp_dir())
            .env_remove("TEQUILA_API_KEY")
            .env("TEQUILA_BASE_URL", base_url)
            .env("RUST_LOG", "debug")
            .stdout(Stdio::piped())
            .stdin(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(key) = api_key {
            command.env("TEQUILA_API_KEY", key);
        }
        let mut child = command.spawn().context("Failed to spawn kiwi-deals-mcp")?;

        let stdin = child.stdin.take().context("no stdin")?;
        let stdout = child.stdout.take().context("no stdout")?;
        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    async fn send(&mut self, message: Value) -> Result<()> {
        let mut line = message.to_string();
        line.push('\n');
        tracing::debug!("Sending: {}", line.trim_end());
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the response carrying `id` shows up.
    async fn response(&mut self, id: u64) -> Result<Value> {
        loop {
            let line = tokio::time::timeout(TIMEOUT, self.stdout.next_line())
                .await
                .context("Timed out waiting for a response")??
                .context("Server closed stdout")?;
            tracing::debug!("Received: {}", line);
            let value: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if value["id"] == json!(id) {
                return Ok(value);
            }
        }
    }

    async fn initialize(&mut self) -> Result<Value> {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }
        }))
        .await?;
        let response = self.response(1).await?;
        self.send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await?;
        Ok(response)
    }

    async fn call_tool(&mut self, id: u64, name: &str, arguments: Value) -> Result<Value> {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }))
        .await?;
        self.response(id).await
    }
}

/// Minimal Tequila `/v2/search`: one deal to `fly_to`, 403 without the key.
async fn mock_search(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::FORBIDDEN, "missing apikey".to_string());
    }
    let city_to = params.get("fly_to").cloned().unwrap_or_default();
    let body = json!({
        "currency": "EUR",
        "data": [{
            "cityFrom": "Naples",
            "cityTo": city_to,
            "countryTo": { "name": "United Kingdom" },
            "price": 57.8,
            "dTime": 1762502400,
            "aTime": 1762512000,
            "airlines": ["FR"],
            "deep_link": "https://www.kiwi.com/deep"
        }]
    });
    (StatusCode::OK, body.to_string())
}

async fn spawn_mock() -> Result<String> {
    let app = Router::new().route("/v2/search", get(mock_search));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

fn tool_text(response: &Value) -> Result<&str> {
    response["result"]["content"][0]["text"]
        .as_str()
        .context(format!("No text content in {}", response))
}

#[tokio::test]
async fn test_mcp_initialize_and_list_tools() -> Result<()> {
    init_tracing();
    let mut server = McpProcess::spawn()?;

    let init = server.initialize().await?;
    assert_eq!(init["jsonrpc"], "2.0");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    server
        .send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await?;
    let tools = server.response(2).await?;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .context("tools should be an array")?
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"search_deals"), "tools: {:?}", names);
    assert!(names.contains(&"describe_travel_dates"), "tools: {:?}", names);
    Ok(())
}

#[tokio::test]
async fn test_mcp_describe_flexible_search() -> Result<()> {
    init_tracing();
    let mut server = McpProcess::spawn()?;
    server.initialize().await?;

    let response = server
        .call_tool(
            3,
            "describe_travel_dates",
            json!({
                "from": "NAP",
                "months": ["2026-01", "2025-11", "2025-12"],
                "min_nights": 3,
                "max_nights": 10,
                "adults": 2
            }),
        )
        .await?;

    let output: Value = serde_json::from_str(tool_text(&response)?)?;
    assert_eq!(output["travel_dates"], "Nov–Jan • 3–10 nights");
    assert_eq!(output["passengers"], "2 adults");
    let url = output["search_url"].as_str().context("search_url")?;
    assert!(url.starts_with("http://127.0.0.1:9/v2/search?"), "{}", url);
    assert!(url.contains("date_from=01%2F11%2F2025"), "{}", url);
    assert!(url.contains("date_to=31%2F01%2F2026"), "{}", url);
    assert!(url.contains("nights_in_dst_from=3"), "{}", url);
    assert!(output.get("warnings").is_none());
    assert_eq!(output["departure_days"], json!(["Any"]));
    Ok(())
}

#[tokio::test]
async fn test_mcp_describe_reports_clamping() -> Result<()> {
    init_tracing();
    let mut server = McpProcess::spawn()?;
    server.initialize().await?;

    let response = server
        .call_tool(
            4,
            "describe_travel_dates",
            json!({
                "trip_type": "round_trip",
                "date": "2025-11-10",
                "return_date": "2025-11-01",
                "adults": 12
            }),
        )
        .await?;

    let output: Value = serde_json::from_str(tool_text(&response)?)?;
    assert_eq!(output["travel_dates"], "10 Nov – 10 Nov");
    assert_eq!(output["passengers"], "9 adults");
    let warnings = output["warnings"].as_array().context("warnings")?;
    assert_eq!(warnings.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_mcp_describe_rejects_bad_date() -> Result<()> {
    init_tracing();
    let mut server = McpProcess::spawn()?;
    server.initialize().await?;

    let response = server
        .call_tool(5, "describe_travel_dates", json!({"date": "next friday"}))
        .await?;
    assert_eq!(response["result"]["isError"], true);
    assert!(tool_text(&response)?.contains("Invalid date format"));
    Ok(())
}

#[tokio::test]
async fn test_mcp_search_deals_against_mock() -> Result<()> {
    init_tracing();
    let base_url = spawn_mock().await?;
    let mut server = McpProcess::spawn_with(Some(API_KEY), &base_url)?;
    server.initialize().await?;

    let response = server
        .call_tool(
            6,
            "search_deals",
            json!({
                "from": "NAP",
                "to": "London",
                "date": "2025-11-07",
                "return_date": "2025-11-01",
                "adults": 2
            }),
        )
        .await?;
    assert_ne!(response["result"]["isError"], true, "{}", response);

    let payload: Value = serde_json::from_str(tool_text(&response)?)?;
    assert_eq!(payload["origin"], "NAP");
    assert_eq!(payload["destination"], "London");
    assert_eq!(payload["currency"], "EUR");
    assert_eq!(payload["travel_dates"], "7 Nov – 7 Nov");

    let url = payload["search_url"].as_str().context("search_url")?;
    assert!(url.starts_with(&format!("{}/v2/search?", base_url)), "{}", url);
    assert!(url.contains("adults=2"), "{}", url);
    assert!(url.contains("fly_to=London"), "{}", url);
    assert!(url.contains("return_from=07%2F11%2F2025"), "{}", url);

    let deals = payload["deals"].as_array().context("deals")?;
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0]["route"], "Naples → London, United Kingdom");
    assert_eq!(deals[0]["price"], 57.8);
    assert_eq!(deals[0]["departure"], "2025-11-07T08:00:00+00:00");
    assert_eq!(deals[0]["deep_link"], "https://www.kiwi.com/deep");

    let warnings = payload["warnings"].as_array().context("warnings")?;
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert!(warnings[0].as_str().unwrap_or_default().contains("precedes departure"));
    Ok(())
}

#[tokio::test]
async fn test_mcp_search_deals_reports_upstream_error() -> Result<()> {
    init_tracing();
    let base_url = spawn_mock().await?;
    let mut server = McpProcess::spawn_with(Some("wrong-key"), &base_url)?;
    server.initialize().await?;

    let response = server
        .call_tool(7, "search_deals", json!({"from": "NAP", "to": "LON"}))
        .await?;
    assert_eq!(response["result"]["isError"], true);
    assert!(tool_text(&response)?.contains("bad server response"));
    Ok(())
}

#[tokio::test]
async fn test_mcp_search_deals_without_key() -> Result<()> {
    init_tracing();
    let mut server = McpProcess::spawn()?;
    server.initialize().await?;

    let response = server
        .call_tool(8, "search_deals", json!({"from": "NAP", "to": "LON"}))
        .await?;
    assert_eq!(response["result"]["isError"], true);
    assert!(
        tool_text(&response)?.contains("TEQUILA_API_KEY is not configured"),
        "{}",
        response
    );
    Ok(())
}

#[tokio::test]
async fn test_mcp_help_output() -> Result<()> {
    init_tracing();
    let output = Command::new(env!("CARGO_BIN_EXE_kiwi-deals-mcp"))
        .arg("--help")
        .output()
        .await?;

    assert!(output.status.success(), "Help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kiwi-deals-mcp"), "Help should show binary name");
    assert!(stdout.contains("stdio"), "Help should show stdio command");
    assert!(stdout.contains("http"), "Help should show http command");
    Ok(())
}

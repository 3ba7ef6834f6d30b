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

//! # Tequila Deals Search Client
//!
//! Effectful (network) operations: one GET per search, no retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use kiwi_latest_query::{LatestQuery, LatestQueryError};
use thiserror::Error;

use crate::config::DealsConfig;
use crate::deals_query_builder::{QueryParams, SEARCH_PATH, SearchRequest};
use crate::deals_results_parser::DealsSearchResult;

#[derive(Debug, Error)]
pub enum DealsError {
    #[error("bad server response: HTTP {status}")]
    BadServerResponse { status: u16 },
    #[error("bad server response: {0}")]
    Transport(#[source] wreq::Error),
    #[error("could not decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DealsError {
    /// Transport failures and non-2xx statuses are one condition for callers.
    pub fn is_bad_server_response(&self) -> bool {
        matches!(
            self,
            DealsError::BadServerResponse { .. } | DealsError::Transport(_)
        )
    }
}

#[derive(Clone)]
pub struct TequilaClient {
    client: Arc<wreq::Client>,
    base_url: String,
    api_key: String,
}

impl TequilaClient {
    pub fn new(config: &DealsConfig) -> Result<Self> {
        let client = wreq::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str, query: &QueryParams) -> String {
        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query.to_query_string())
        }
    }

    /// Single GET attempt. Succeeds only on a 2xx status.
    pub async fn get(&self, path: &str, query: &QueryParams) -> Result<String, DealsError> {
        let url = self.build_url(path, query);

        let http_start = Instant::now();
        tracing::trace!("[get] Starting HTTP request to: {}", url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("[get] Request failed after {:?}: {}", http_start.elapsed(), e);
                DealsError::Transport(e)
            })?;

        let status = response.status();
        tracing::debug!(
            "[get] HTTP Status: {} {} in {:?}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            http_start.elapsed()
        );

        if !status.is_success() {
            return Err(DealsError::BadServerResponse {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(DealsError::Transport)?;
        tracing::debug!("[get] Response body: {} KB", body.len() / 1024);
        Ok(body)
    }

    pub async fn search_deals(
        &self,
        request: &SearchRequest,
    ) -> Result<DealsSearchResult, DealsError> {
        let overall_start = Instant::now();

        if request.trip_type == crate::TripType::RoundTrip
            && !request.flexible
            && request.exact_return_date < request.exact_depart_date
        {
            tracing::warn!(
                "Return date {} precedes departure {} - returning on the departure day",
                request.exact_return_date,
                request.exact_depart_date
            );
        }

        let query = request.build_query();
        tracing::info!(
            "Searching deals {} -> {} with {} parameters",
            if request.origin.is_empty() { "anywhere" } else { request.origin.as_str() },
            if request.destination.is_empty() { "anywhere" } else { request.destination.as_str() },
            query.len()
        );

        let body = self.get(SEARCH_PATH, &query).await?;

        match DealsSearchResult::from_json(&body, request.clone()) {
            Ok(result) => {
                tracing::info!(
                    "Search completed in {:?}: {} deals",
                    overall_start.elapsed(),
                    result.len()
                );
                Ok(result)
            }
            Err(e) => {
                let preview = body.chars().take(500).collect::<String>();
                tracing::error!("Decode failed: {}", e);
                tracing::error!("Body preview (first 500 chars):\n{}", preview);
                Err(DealsError::Decode(e))
            }
        }
    }
}

/// A search screen: a newer submission supersedes any pending one.
#[derive(Clone)]
pub struct SearchSession {
    client: Arc<TequilaClient>,
    latest: LatestQuery,
}

impl SearchSession {
    pub fn new(client: TequilaClient) -> Self {
        Self {
            client: Arc::new(client),
            latest: LatestQuery::new(),
        }
    }

    pub fn client(&self) -> &TequilaClient {
        &self.client
    }

    /// `Ok(None)` when a newer submission (or `cancel`) superseded this one;
    /// its outcome, success or failure, is discarded.
    pub async fn submit(
        &self,
        request: &SearchRequest,
    ) -> Result<Option<DealsSearchResult>, DealsError> {
        match self.latest.run(self.client.search_deals(request)).await {
            Ok(outcome) => outcome.map(Some),
            Err(LatestQueryError::Superseded { ticket, latest }) => {
                tracing::debug!("Discarding search {} (latest is {})", ticket, latest);
                Ok(None)
            }
        }
    }

    /// Abandon the pending submission, if any.
    pub fn cancel(&self) {
        self.latest.invalidate();
    }
}

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

//! Client configuration, read from the environment (and `.env` when present).

use anyhow::{Context, Result, ensure};

pub const DEFAULT_BASE_URL: &str = "https://tequila-api.kiwi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_KEY_VAR: &str = "TEQUILA_API_KEY";
pub const BASE_URL_VAR: &str = "TEQUILA_BASE_URL";
pub const TIMEOUT_VAR: &str = "TEQUILA_TIMEOUT_SECS";

#[derive(Clone)]
pub struct DealsConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DealsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DealsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DealsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .context(format!("Missing required environment variable: {API_KEY_VAR}"))?;

        let mut config = Self::new(api_key.trim());

        config.base_url = base_url_from_lookup(&lookup)?;

        if let Some(timeout) = lookup(TIMEOUT_VAR) {
            let timeout_secs: u64 = timeout
                .trim()
                .parse()
                .context(format!("Invalid {TIMEOUT_VAR}: {timeout}"))?;
            ensure!(timeout_secs > 0, "{TIMEOUT_VAR} must be positive");
            config.timeout_secs = timeout_secs;
        }

        Ok(config)
    }
}

/// API base URL without requiring a key, e.g. to print a request URL.
/// Loads `.env` like [`DealsConfig::from_env`].
pub fn base_url_from_env() -> Result<String> {
    dotenvy::dotenv().ok();
    base_url_from_lookup(|key| std::env::var(key).ok())
}

pub fn base_url_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let Some(base_url) = lookup(BASE_URL_VAR).filter(|u| !u.trim().is_empty()) else {
        return Ok(DEFAULT_BASE_URL.to_string());
    };
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    ensure!(
        base_url.starts_with("http://") || base_url.starts_with("https://"),
        "{BASE_URL_VAR} must be an http(s) URL, got {base_url}"
    );
    Ok(base_url)
}

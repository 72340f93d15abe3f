use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::services::openai::DEFAULT_BASE_URL;
use crate::services::sheets::{DEFAULT_SHEET_NAME, DEFAULT_SPREADSHEET_ID};

pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "service-account.json";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub service_account_json: Option<String>,  // raw key file contents
    pub service_account_file: PathBuf,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub bind_host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            service_account_json: get("GOOGLE_SERVICE_ACCOUNT_JSON"),
            service_account_file: get("GOOGLE_SERVICE_ACCOUNT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVICE_ACCOUNT_FILE)),
            spreadsheet_id: get("SHEET_KEY").unwrap_or_else(|| DEFAULT_SPREADSHEET_ID.to_string()),
            sheet_name: get("SHEET_NAME").unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            bind_host: get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

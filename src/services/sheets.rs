use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::credentials::ServiceAccountKey;
use super::meal_log::MealLog;

pub const DEFAULT_SPREADSHEET_ID: &str = "1buZXR5C9LdINSQ3BLaDsNyS036fAV-g6XMkL1Fdji_c";
pub const DEFAULT_SHEET_NAME: &str = "Log";

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<Value>>,
}

/// Google Sheets worksheet used as the meal log.
///
/// Built once at startup; each append authorizes afresh with the service
/// account so an expired session never outlives a request.
pub struct GoogleSheetsLog {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    spreadsheet_id: String,
    sheet_name: String,
    client: reqwest::Client,
}

impl GoogleSheetsLog {
    pub fn new(key: ServiceAccountKey, spreadsheet_id: String, sheet_name: String) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Service account private key is not a valid RSA PEM")?;

        Ok(Self {
            key,
            encoding_key,
            spreadsheet_id,
            sheet_name,
            client: reqwest::Client::new(),
        })
    }

    fn append_url(&self) -> Result<reqwest::Url> {
        append_url(&self.spreadsheet_id, &self.sheet_name)
    }

    fn signed_assertion(&self, now: i64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to sign service account assertion: {e}"))
    }

    async fn access_token(&self) -> Result<String> {
        let assertion = self.signed_assertion(chrono::Utc::now().timestamp())?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Google token exchange failed ({}): {}", status, error_text);
            anyhow::bail!("Google auth error ({}): {}", status, error_text);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

/// `values:append` endpoint for the tab; path segments are percent-encoded.
///
/// Values are sent RAW so Sheets stores every cell exactly as written.
fn append_url(spreadsheet_id: &str, sheet_name: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(SHEETS_API)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Sheets API base URL cannot take path segments"))?
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("{}!A1:append", sheet_name));
    url.query_pairs_mut()
        .append_pair("valueInputOption", "RAW")
        .append_pair("insertDataOption", "INSERT_ROWS");
    Ok(url)
}

#[async_trait::async_trait]
impl MealLog for GoogleSheetsLog {
    async fn append_row(&self, row: Vec<Value>) -> Result<()> {
        let token = self.access_token().await?;
        let request = AppendRequest { values: vec![row] };

        log::debug!("📤 Appending row to sheet '{}'", self.sheet_name);

        let response = self
            .client
            .post(self.append_url()?)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Google Sheets append failed ({}): {}", status, error_text);
            anyhow::bail!("Google Sheets API error ({}): {}", status, error_text);
        }

        log::info!("📝 Row appended to sheet '{}'", self.sheet_name);
        Ok(())
    }
}

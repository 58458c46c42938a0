use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SyncError;

pub const SHEET_NAME_PREFIX: &str = "Season ";

const TEMPLATE_SHEET: &str = "Template";
const USERS_RANGE: &str = "Players!B2:B31";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// One target range plus its values, in the shape the Sheets values API takes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: String,
    /// "ROWS" for the single boss-name cell, "COLUMNS" for player vectors.
    pub major_dimension: &'static str,
    pub values: Vec<Vec<serde_json::Value>>,
}

/// The tabular sink the publisher writes into. A trait so the publish and
/// cycle logic can run against a recording fake in tests.
#[async_trait]
pub trait SheetSink: Send + Sync {
    /// Ordered roster of player ids, read from the fixed roster range.
    async fn player_ids(&self) -> anyhow::Result<Vec<String>>;

    /// Provision the named season sheet from the template if it is missing.
    async fn ensure_sheet(&self, title: &str) -> anyhow::Result<()>;

    /// One batched write. Returns the number of cells the sink reports
    /// updated; a short count is informational, not an error.
    async fn batch_update(&self, data: Vec<ValueRange>) -> anyhow::Result<u64>;
}

/// Service-account key material, the subset of the credentials JSON we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Google Sheets v4 REST client authenticated with a service account.
pub struct SheetsClient {
    http: reqwest::Client,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: String, credentials_json: &str) -> anyhow::Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(credentials_json)
            .context("service account credentials are not valid JSON")?;
        Ok(Self {
            http: reqwest::Client::new(),
            spreadsheet_id,
            key,
            token: Mutex::new(None),
        })
    }

    /// Bearer token for the spreadsheets scope, cached until shortly before
    /// expiry. Obtained via the signed-JWT grant.
    async fn access_token(&self) -> anyhow::Result<String> {
        let mut cache = self.token.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cache.as_ref() {
            if token.expires_at > now + 60 {
                return Ok(token.value.clone());
            }
        }

        let claims = TokenClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
                .context("service account private key is not valid PEM")?,
        )?;

        let response: TokenResponse = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("token exchange failed")?
            .error_for_status()?
            .json()
            .await?;

        let value = response.access_token;
        *cache = Some(CachedToken {
            value: value.clone(),
            expires_at: now + response.expires_in,
        });
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct CellValues {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// One roster row per player, one cell per row. The values API returns a
/// cleared cell mid-range as an empty row; dropping it would shift every
/// later player onto a neighbor's line in the positional damage/battle
/// columns, so a blank entry fails the cycle instead. Row numbers in the
/// error are sheet rows (the roster range starts at row 2).
fn roster_from_rows(values: Vec<Vec<String>>) -> Result<Vec<String>, SyncError> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_iter()
                .next()
                .filter(|cell| !cell.is_empty())
                .ok_or(SyncError::BlankRosterRow(i + 2))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    index: i64,
}

#[async_trait]
impl SheetSink for SheetsClient {
    async fn player_ids(&self) -> anyhow::Result<Vec<String>> {
        let token = self.access_token().await?;
        let url = format!(
            "{SHEETS_API}/{}/values/{}",
            self.spreadsheet_id,
            urlencoding::encode(USERS_RANGE)
        );
        let result: CellValues = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if result.values.is_empty() {
            tracing::warn!("player roster range {USERS_RANGE} is empty");
        }
        Ok(roster_from_rows(result.values)?)
    }

    async fn ensure_sheet(&self, title: &str) -> anyhow::Result<()> {
        let token = self.access_token().await?;
        let url = format!(
            "{SHEETS_API}/{}?fields=sheets.properties",
            self.spreadsheet_id
        );
        let meta: SpreadsheetMeta = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if meta.sheets.iter().any(|s| s.properties.title == title) {
            return Ok(());
        }

        let template = meta
            .sheets
            .iter()
            .find(|s| s.properties.title == TEMPLATE_SHEET)
            .ok_or_else(|| SyncError::MissingTemplateSheet(TEMPLATE_SHEET.to_string()))?;

        tracing::info!("creating sheet '{title}'");
        let body = serde_json::json!({
            "includeSpreadsheetInResponse": false,
            "requests": [{
                "duplicateSheet": {
                    "sourceSheetId": template.properties.sheet_id,
                    "insertSheetIndex": template.properties.index + 1,
                    "newSheetName": title,
                }
            }],
        });
        self.http
            .post(format!("{SHEETS_API}/{}:batchUpdate", self.spreadsheet_id))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn batch_update(&self, data: Vec<ValueRange>) -> anyhow::Result<u64> {
        let token = self.access_token().await?;
        let body = serde_json::json!({
            "valueInputOption": "RAW",
            "data": data,
        });
        let result: serde_json::Value = self
            .http
            .post(format!(
                "{SHEETS_API}/{}/values:batchUpdate",
                self.spreadsheet_id
            ))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let updated = result
            .get("totalUpdatedCells")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        tracing::info!("{updated} cells updated");
        Ok(updated)
    }
}

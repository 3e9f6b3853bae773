use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use arena_core::cell::{Grid, Row};
use arena_core::range::A1Range;
use arena_core::store::{RangeStore, StoreError};

use crate::config::SheetsConfig;
use crate::token::TokenSource;

/// Longest slice of an error body kept in a `Backend` message.
const MAX_ERROR_BODY: usize = 200;

/// Cells are stored exactly as sent; nothing typed by a registrant is
/// parsed as a formula, number or date.
const VALUE_INPUT: (&str, &str) = ("valueInputOption", "RAW");

/// `values` payload shared by reads, appends and updates.
#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Grid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValuesBody<'a> {
    major_dimension: &'static str,
    values: &'a [Row],
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Range store backed by the Google Sheets v4 values API.
pub struct SheetsClient {
    client: reqwest::Client,
    base: Url,
    spreadsheet_id: String,
    token: TokenSource,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("base", &self.base.as_str())
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("auth", &self.token.kind())
            .finish_non_exhaustive()
    }
}

fn backend(context: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{context}: {err}"))
}

impl SheetsClient {
    /// Fails with `Unconfigured` when the spreadsheet id is blank, no
    /// credentials are given, or the service-account key does not parse.
    pub fn new(config: SheetsConfig) -> Result<Self, StoreError> {
        if let Some(field) = config.missing() {
            return Err(StoreError::Unconfigured(format!(
                "google sheets {field} is not set"
            )));
        }
        let token = TokenSource::from_config(&config)?;
        let base = Url::parse(&config.base_url).map_err(|e| backend("invalid base url", e))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("arena-sheets/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| backend("building HTTP client", e))?;
        Ok(Self {
            client,
            base,
            spreadsheet_id: config.spreadsheet_id.trim().to_string(),
            token,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `{base}/v4/spreadsheets/<tail...>` with each tail segment
    /// percent-encoded.
    fn url(&self, tail: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Backend("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(tail);
        Ok(url)
    }

    fn values_url(&self, segment: &str) -> Result<Url, StoreError> {
        self.url(&[self.spreadsheet_id.as_str(), "values", segment])
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, StoreError> {
        let token = self.token.bearer(&self.client).await?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| backend(what, e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.token.invalidate().await;
        }
        let body = resp.text().await.unwrap_or_default();
        // Sheets answers 400 "Unable to parse range" for a tab that does not exist
        let missing = status == StatusCode::NOT_FOUND
            || (status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range"));
        if missing {
            tracing::debug!(what, %status, "sheets reported a missing range");
            return Err(StoreError::NotFound(what.to_string()));
        }
        tracing::warn!(what, %status, "sheets request failed");
        let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
        Err(StoreError::Backend(format!("{what}: HTTP {status}: {excerpt}")))
    }
}

impl RangeStore for SheetsClient {
    async fn read(&self, range: &A1Range) -> Result<Grid, StoreError> {
        let what = range.to_string();
        let url = self.values_url(&what)?;
        let req = self
            .client
            .get(url)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]);
        let body: ValueRange = self
            .send(req, &what)
            .await?
            .json()
            .await
            .map_err(|e| backend(&what, e))?;
        Ok(body.values)
    }

    async fn append(&self, range: &A1Range, rows: Grid) -> Result<(), StoreError> {
        let what = range.to_string();
        let url = self.values_url(&format!("{what}:append"))?;
        let req = self
            .client
            .post(url)
            .query(&[VALUE_INPUT, ("insertDataOption", "INSERT_ROWS")])
            .json(&ValuesBody {
                major_dimension: "ROWS",
                values: &rows,
            });
        self.send(req, &what).await?;
        tracing::debug!(range = %what, rows = rows.len(), "appended rows");
        Ok(())
    }

    async fn write(&self, range: &A1Range, grid: Grid) -> Result<(), StoreError> {
        let what = range.to_string();
        let url = self.values_url(&what)?;
        let req = self
            .client
            .put(url)
            .query(&[VALUE_INPUT])
            .json(&ValuesBody {
                major_dimension: "ROWS",
                values: &grid,
            });
        self.send(req, &what).await?;
        tracing::debug!(range = %what, rows = grid.len(), "wrote block");
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<String>, StoreError> {
        let url = self.url(&[self.spreadsheet_id.as_str()])?;
        let req = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let meta: SpreadsheetMeta = self
            .send(req, &self.spreadsheet_id)
            .await?
            .json()
            .await
            .map_err(|e| backend("spreadsheet metadata", e))?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<(), StoreError> {
        let action = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url(&[action.as_str()])?;
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send(self.client.post(url).json(&body), title).await?;
        tracing::info!(tab = title, "added sheet tab");
        Ok(())
    }
}

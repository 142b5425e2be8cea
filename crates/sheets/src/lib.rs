//! HTTP sheet reader for publicly shared Google spreadsheets.

pub mod decode;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bonusbot_core::config::SheetsConfig;
use bonusbot_core::sheets::{SheetFetchError, SheetRef, SheetSource, SheetTable};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

pub use decode::parse_csv;

const USER_AGENT: &str = concat!("bonusbot/", env!("CARGO_PKG_VERSION"));

/// Reads sheets through the CSV export endpoints. Every call is a fresh request.
#[derive(Clone, Debug)]
pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetFetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| SheetFetchError::Client(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            spreadsheet_id: config.spreadsheet_id.trim().to_owned(),
        })
    }

    /// `gviz/tq` for sheet names, `export` for sheet ids.
    pub fn sheet_url(&self, sheet: &SheetRef) -> Result<Url, SheetFetchError> {
        let spreadsheet = format!("{}/spreadsheets/d/{}", self.base_url, self.spreadsheet_id);
        let parsed = match sheet {
            SheetRef::Name(name) => Url::parse_with_params(
                &format!("{spreadsheet}/gviz/tq"),
                &[("tqx", "out:csv"), ("sheet", name.as_str())],
            ),
            SheetRef::Gid(gid) => Url::parse_with_params(
                &format!("{spreadsheet}/export"),
                &[("format", "csv"), ("gid", gid.as_str())],
            ),
        };
        parsed.map_err(|error| SheetFetchError::Client(format!("invalid sheet url: {error}")))
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn fetch(&self, sheet: &SheetRef) -> Result<SheetTable, SheetFetchError> {
        let url = self.sheet_url(sheet)?;
        let started = Instant::now();
        debug!(event_name = "sheets.fetch.started", sheet = %sheet, "fetching sheet");

        let response = self.client.get(url).send().await.map_err(|error| {
            warn!(
                event_name = "sheets.fetch.failed",
                sheet = %sheet,
                timeout = error.is_timeout(),
                error = %error,
                "sheet request failed"
            );
            if error.is_timeout() {
                SheetFetchError::Timeout { sheet: sheet.to_string() }
            } else {
                SheetFetchError::Transport { sheet: sheet.to_string(), message: error.to_string() }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "sheets.fetch.rejected",
                sheet = %sheet,
                status = status.as_u16(),
                "sheet endpoint returned an error status"
            );
            return Err(SheetFetchError::Status { sheet: sheet.to_string(), status: status.as_u16() });
        }

        // A private spreadsheet answers with a sign-in page instead of CSV.
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
        if is_html {
            return Err(SheetFetchError::Decode {
                sheet: sheet.to_string(),
                message: "received HTML instead of CSV; is the spreadsheet shared by link?"
                    .to_owned(),
            });
        }

        let body = response.text().await.map_err(|error| SheetFetchError::Decode {
            sheet: sheet.to_string(),
            message: error.to_string(),
        })?;
        let table = parse_csv(sheet, &body)?;

        info!(
            event_name = "sheets.fetch.completed",
            sheet = %sheet,
            rows = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sheet fetched"
        );
        Ok(table)
    }
}

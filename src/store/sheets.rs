//! Google Sheets backend (Sheets API v4 over REST).

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{data_offset, RecordStore, RowIndex, FIRST_DATA_ROW, HEADER_ROW};
use crate::config::SheetsConfig;
use crate::errors::StoreError;
use crate::google::{base_url, GoogleClient};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Store backed by one sheet of a Google spreadsheet
pub struct SheetsStore {
    client: GoogleClient,
    config: SheetsConfig,
}

impl SheetsStore {
    pub fn new(client: GoogleClient, config: SheetsConfig) -> Self {
        Self { client, config }
    }

    fn quoted_sheet(&self) -> String {
        quote_sheet_name(&self.config.sheet_name)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = base_url(SHEETS_API)?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed("Sheets API URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<Url, StoreError> {
        self.url(&[self.config.spreadsheet_id.as_str(), "values", range])
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(range)?;
        let body: ValueRange = self.client.get_json(url).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn put_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), StoreError> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "majorDimension": "ROWS", "values": values });
        let _: Value = self.client.send_json(Method::PUT, url, &body).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SheetsStore {
    async fn header(&self) -> Result<Vec<String>, StoreError> {
        let range = format!("{}!{HEADER_ROW}:{HEADER_ROW}", self.quoted_sheet());
        Ok(self.get_range(&range).await?.into_iter().next().unwrap_or_default())
    }

    async fn rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let mut rows = self.get_range(&self.quoted_sheet()).await?;
        if !rows.is_empty() {
            rows.remove(0);
        }
        debug!(sheet = %self.config.sheet_name, rows = rows.len(), "Fetched sheet rows");
        Ok(rows)
    }

    async fn row(&self, index: RowIndex) -> Result<Option<Vec<String>>, StoreError> {
        if index < FIRST_DATA_ROW {
            return Ok(None);
        }
        let range = format!("{}!{index}:{index}", self.quoted_sheet());
        Ok(self.get_range(&range).await?.into_iter().next())
    }

    async fn write_row(&self, index: RowIndex, values: &[String]) -> Result<(), StoreError> {
        data_offset(index)?;
        let range = format!("{}!A{index}", self.quoted_sheet());
        self.put_range(&range, vec![values.to_vec()]).await
    }

    async fn write_cell(&self, index: RowIndex, column: usize, value: &str) -> Result<(), StoreError> {
        data_offset(index)?;
        let range = format!("{}!{}{index}", self.quoted_sheet(), column_letter(column));
        self.put_range(&range, vec![vec![value.to_string()]]).await
    }

    async fn append_row(&self, values: &[String]) -> Result<RowIndex, StoreError> {
        let range = format!("{}!A{HEADER_ROW}", self.quoted_sheet());
        let target = format!("{range}:append");
        let mut url = self.url(&[self.config.spreadsheet_id.as_str(), "values", target.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = json!({ "majorDimension": "ROWS", "values": [values] });
        let response: AppendResponse = self.client.send_json(Method::POST, url, &body).await?;

        parse_row_from_range(&response.updates.updated_range).ok_or_else(|| {
            StoreError::Malformed(format!(
                "unexpected appended range '{}'",
                response.updates.updated_range
            ))
        })
    }

    async fn delete_row(&self, index: RowIndex) -> Result<(), StoreError> {
        data_offset(index)?;
        let target = format!("{}:batchUpdate", self.config.spreadsheet_id);
        let url = self.url(&[target.as_str()])?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": self.config.sheet_gid,
                        "dimension": "ROWS",
                        "startIndex": index - 1,
                        "endIndex": index,
                    }
                }
            }]
        });
        let _: Value = self.client.send_json(Method::POST, url, &body).await?;
        Ok(())
    }
}

/// Quote a sheet name for A1 notation: `My 'Sheet'` -> `'My ''Sheet'''`
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Column letters for a 0-based position: 0 -> A, 25 -> Z, 26 -> AA
pub fn column_letter(position: usize) -> String {
    let mut n = position + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Row number of the first cell of an A1 range such as `'Sheet1'!A5:K5`
pub fn parse_row_from_range(range: &str) -> Option<RowIndex> {
    let cells = range.rsplit_once('!').map(|(_, cells)| cells).unwrap_or(range);
    let first = cells.split(':').next()?;
    let digits: String = first.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use url::Url;

use crate::auth::{AccessToken, exchange_token};
use crate::credentials::ServiceAccountKey;
use crate::{RemoteSheet, clean_error_response, connection_error};

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub sheets: String,
    pub drive: String,
    /// Overrides the key's `token_uri` when set.
    pub token: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sheets: DEFAULT_SHEETS_BASE_URL.to_owned(),
            drive: DEFAULT_DRIVE_BASE_URL.to_owned(),
            token: None,
        }
    }
}

/// Authorized client bound to one service account.
#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    endpoints: Endpoints,
    key: ServiceAccountKey,
    token: AccessToken,
}

impl Client {
    /// Builds the HTTP client and fetches a first access token, so a rejected
    /// key fails here rather than on the first read.
    pub fn authorize(key: ServiceAccountKey, endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let endpoints = Endpoints {
            sheets: endpoints.sheets.trim_end_matches('/').to_owned(),
            drive: endpoints.drive.trim_end_matches('/').to_owned(),
            token: endpoints.token,
        };
        if endpoints.sheets.is_empty() || endpoints.drive.is_empty() {
            return Err(anyhow!("sheets and drive base URLs must not be empty"));
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        let token_url = endpoints.token.clone().unwrap_or_else(|| key.token_uri.clone());
        let token = exchange_token(&http, &token_url, &key, OffsetDateTime::now_utc())?;
        tracing::info!(client = %key.client_email, "authorized service account");

        Ok(Self {
            http,
            endpoints,
            key,
            token,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn bearer(&mut self) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        if !self.token.is_fresh(now) {
            let token_url = self
                .endpoints
                .token
                .clone()
                .unwrap_or_else(|| self.key.token_uri.clone());
            self.token = exchange_token(&self.http, &token_url, &self.key, now)?;
        }
        Ok(self.token.value.clone())
    }

    fn send(&mut self, request: RequestBuilder, target: &str) -> Result<Response> {
        let bearer = self.bearer()?;
        let response = request
            .bearer_auth(bearer)
            .send()
            .map_err(|error| connection_error(target, error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    /// Looks up a spreadsheet the service account can see by exact name.
    pub fn find_spreadsheet(&mut self, name: &str) -> Result<String> {
        let url = format!("{}/files", self.endpoints.drive);
        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            escape_drive_literal(name)
        );
        let request = self.http.get(&url).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("includeItemsFromAllDrives", "true"),
            ("supportsAllDrives", "true"),
        ]);
        let response = self.send(request, &self.endpoints.drive.clone())?;
        let listing: DriveFileList = response.json().context("decode drive file list")?;
        listing
            .files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| {
                anyhow!(
                    "spreadsheet {name:?} not found; share it with {}",
                    self.key.client_email
                )
            })
    }

    /// Opens the spreadsheet by name and binds to its first worksheet.
    pub fn open_first_worksheet(mut self, name: &str) -> Result<Worksheet> {
        let spreadsheet_id = self.find_spreadsheet(name)?;
        let url = format!("{}/spreadsheets/{spreadsheet_id}", self.endpoints.sheets);
        let request = self
            .http
            .get(&url)
            .query(&[("fields", "sheets.properties")]);
        let response = self.send(request, &self.endpoints.sheets.clone())?;
        let metadata: SpreadsheetMetadata =
            response.json().context("decode spreadsheet metadata")?;
        let first = metadata
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .min_by_key(|properties| properties.index)
            .ok_or_else(|| anyhow!("spreadsheet {name:?} has no worksheets"))?;

        tracing::info!(spreadsheet = name, worksheet = %first.title, "opened worksheet");
        Ok(Worksheet {
            client: self,
            spreadsheet_id,
            title: first.title,
            sheet_id: first.sheet_id,
        })
    }
}

/// The first worksheet of a remote spreadsheet.
#[derive(Debug)]
pub struct Worksheet {
    client: Client,
    spreadsheet_id: String,
    title: String,
    sheet_id: i64,
}

impl Worksheet {
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sheet_id(&self) -> i64 {
        self.sheet_id
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.client.endpoints.sheets)
            .with_context(|| format!("parse sheets base URL {}", self.client.endpoints.sheets))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("sheets base URL cannot carry a path"))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }
}

impl RemoteSheet for Worksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn read_all(&mut self) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&a1_range(&self.title, None))?;
        let request = self.client.http.get(url);
        let response = self.client.send(request, &self.title.clone())?;
        let range: ValueRange = response.json().context("decode worksheet values")?;
        let grid: Vec<Vec<String>> = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        tracing::debug!(worksheet = %self.title, rows = grid.len(), "read worksheet");
        Ok(grid)
    }

    fn clear(&mut self) -> Result<()> {
        let url = self.values_url(&format!("{}:clear", a1_range(&self.title, None)))?;
        let request = self
            .client
            .http
            .post(url)
            .json(&serde_json::json!({}));
        self.client.send(request, &self.title.clone())?;
        tracing::debug!(worksheet = %self.title, "cleared worksheet");
        Ok(())
    }

    fn write_all(&mut self, grid: &[Vec<String>]) -> Result<()> {
        let range = a1_range(&self.title, Some("A1"));
        let url = self.values_url(&range)?;
        let request = self
            .client
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&serde_json::json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": grid,
            }));
        self.client.send(request, &self.title.clone())?;
        tracing::debug!(worksheet = %self.title, rows = grid.len(), "wrote worksheet");
        Ok(())
    }
}

/// A1 range for a whole worksheet, or for one anchor cell of it.
pub fn a1_range(title: &str, anchor: Option<&str>) -> String {
    let quoted = format!("'{}'", title.replace('\'', "''"));
    match anchor {
        Some(cell) => format!("{quoted}!{cell}"),
        None => quoted,
    }
}

fn escape_drive_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::{a1_range, cell_text, escape_drive_literal};

    #[test]
    fn a1_range_quotes_titles() {
        assert_eq!(a1_range("Hoja 1", None), "'Hoja 1'");
        assert_eq!(a1_range("Ana's", Some("A1")), "'Ana''s'!A1");
    }

    #[test]
    fn drive_literal_escapes_quotes_and_backslashes() {
        assert_eq!(escape_drive_literal(r"a'b\c"), r"a\'b\\c");
    }

    #[test]
    fn non_string_cells_become_text() {
        assert_eq!(cell_text(serde_json::json!(12)), "12");
        assert_eq!(cell_text(serde_json::json!(true)), "true");
        assert_eq!(cell_text(serde_json::Value::Null), "");
        assert_eq!(cell_text(serde_json::json!("OK")), "OK");
    }
}

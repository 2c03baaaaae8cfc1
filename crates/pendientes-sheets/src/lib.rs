// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod auth;
pub mod client;
pub mod credentials;
pub mod memory;

pub use auth::{AccessToken, exchange_token, sign_assertion};
pub use client::{Client, DEFAULT_DRIVE_BASE_URL, DEFAULT_SHEETS_BASE_URL, Endpoints, Worksheet, a1_range};
pub use credentials::{
    CredentialSource, DEFAULT_TOKEN_URI, SCOPES, SECRET_TABLE, ServiceAccountKey,
    normalize_private_key, resolve_credentials,
};
pub use memory::MemorySheet;

use anyhow::{Result, anyhow};
use reqwest::StatusCode;
use serde::Deserialize;

/// One worksheet of tabular text, addressed as a whole.
///
/// Saving is a full overwrite: `clear` then `write_all` with the header row
/// first. Nothing is transactional across the two calls.
pub trait RemoteSheet {
    fn title(&self) -> &str;
    /// Rows up to the last non-empty one, header first, as displayed text.
    /// Blank rows in between are kept as empty rows.
    fn read_all(&mut self) -> Result<Vec<Vec<String>>>;
    fn clear(&mut self) -> Result<()>;
    fn write_all(&mut self, grid: &[Vec<String>]) -> Result<()>;
}

impl<T: RemoteSheet + ?Sized> RemoteSheet for Box<T> {
    fn title(&self) -> &str {
        (**self).title()
    }

    fn read_all(&mut self) -> Result<Vec<Vec<String>>> {
        (**self).read_all()
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn write_all(&mut self, grid: &[Vec<String>]) -> Result<()> {
        (**self).write_all(grid)
    }
}

pub(crate) fn connection_error(target: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!("cannot reach {target} -- check the network connection ({error})")
}

pub(crate) fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message);
    }

    if let Ok(parsed) = serde_json::from_str::<OAuthErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return match parsed.error_description.filter(|text| !text.is_empty()) {
            Some(description) => {
                anyhow!("server error ({}): {error}: {description}", status.as_u16())
            }
            None => anyhow!("server error ({}): {error}", status.as_u16()),
        };
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorEnvelope {
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::clean_error_response;
    use reqwest::StatusCode;

    #[test]
    fn api_envelope_message_is_surfaced() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let error = clean_error_response(StatusCode::FORBIDDEN, body);
        assert_eq!(
            error.to_string(),
            "server error (403): The caller does not have permission"
        );
    }

    #[test]
    fn oauth_envelope_includes_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#;
        let error = clean_error_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            error.to_string(),
            "server error (400): invalid_grant: Invalid JWT Signature."
        );
    }

    #[test]
    fn short_plain_body_is_kept() {
        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(error.to_string(), "server error (502): upstream down");
    }

    #[test]
    fn opaque_body_falls_back_to_status() {
        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{not json");
        assert_eq!(error.to_string(), "server returned 500");
    }
}

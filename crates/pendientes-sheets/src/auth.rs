// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::credentials::{SCOPES, ServiceAccountKey};
use crate::{clean_error_response, connection_error};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::hours(1);
const REFRESH_MARGIN: Duration = Duration::seconds(60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: OffsetDateTime,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at - now > REFRESH_MARGIN
    }
}

/// RS256-signed JWT asserting the service account's identity for the scopes.
pub fn sign_assertion(key: &ServiceAccountKey, now: OffsetDateTime) -> Result<String> {
    let issued = now.unix_timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES.join(" "),
        aud: &key.token_uri,
        iat: issued,
        exp: issued + ASSERTION_LIFETIME.whole_seconds(),
    };
    let mut header = Header::new(Algorithm::RS256);
    if !key.private_key_id.is_empty() {
        header.kid = Some(key.private_key_id.clone());
    }
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .with_context(|| format!("load private key for {}", key.client_email))?;
    jsonwebtoken::encode(&header, &claims, &signing_key).context("sign token assertion")
}

/// Trades a signed assertion for a bearer token at `token_url`.
pub fn exchange_token(
    http: &HttpClient,
    token_url: &str,
    key: &ServiceAccountKey,
    now: OffsetDateTime,
) -> Result<AccessToken> {
    let assertion = sign_assertion(key, now)?;
    let response = http
        .post(token_url)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .map_err(|error| connection_error(token_url, error))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(clean_error_response(status, &body))
            .with_context(|| format!("authorize {}", key.client_email));
    }

    let parsed: TokenResponse = response.json().context("decode token response")?;
    let lifetime = parsed
        .expires_in
        .map(Duration::seconds)
        .unwrap_or(ASSERTION_LIFETIME);
    tracing::debug!(
        client = %key.client_email,
        expires_in = lifetime.whole_seconds(),
        "access token issued"
    );
    Ok(AccessToken {
        value: parsed.access_token,
        expires_at: now + lifetime,
    })
}

#[cfg(test)]
mod tests {
    use super::AccessToken;
    use time::{Duration, OffsetDateTime};

    #[test]
    fn token_is_stale_inside_refresh_margin() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let token = AccessToken {
            value: "t".to_owned(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(!token.is_fresh(now));
        assert!(token.is_fresh(now - Duration::minutes(5)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let token = AccessToken {
            value: "ya29.secret".to_owned(),
            expires_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(!format!("{token:?}").contains("ya29"));
    }
}

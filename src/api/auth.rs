//! Authentication handling for the Diffy API.
//!
//! The long-lived API key is exchanged for a bearer token via `POST auth/key`.
//! The token is attached to every other request.

use std::fmt;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::{ApiError, Result};

/// Path of the token exchange endpoint, relative to the base URL.
pub(crate) const AUTH_PATH: &str = "auth/key";

/// API key and the bearer token it was exchanged for.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    token: String,
}

impl Credentials {
    /// Create credentials from a key and an already issued token.
    pub fn new(api_key: &str, token: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            token: token.to_string(),
        }
    }

    /// The API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replace the bearer token, keeping the key.
    pub fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }

    /// Get the authorization header value for HTTP requests.
    ///
    /// Returns the complete "Bearer ..." header value.
    pub fn header_value(&self) -> String {
        build_auth_header(&self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("token", &"<redacted>")
            .finish()
    }
}

fn build_auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

#[derive(Serialize)]
struct KeyExchangeRequest<'a> {
    key: &'a str,
}

#[derive(Deserialize)]
struct KeyExchangeResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Exchange an API key for a bearer token.
///
/// Sent without an `Authorization` header since no token exists yet.
///
/// # Errors
///
/// Every failure is reported as `ApiError::Authentication`: transport errors,
/// non-success statuses, undecodable bodies and responses without a `token`.
#[instrument(skip(client, api_key), fields(base_url = %base_url))]
pub(crate) async fn exchange_key(client: &Client, base_url: &str, api_key: &str) -> Result<String> {
    let url = format!("{}/{}", base_url, AUTH_PATH);
    debug!("Exchanging API key for token");

    let response = client
        .post(&url)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json")
        .json(&KeyExchangeRequest { key: api_key })
        .send()
        .await
        .map_err(|e| ApiError::Authentication(format!("token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Authentication(format!(
            "token request returned HTTP {}: {}",
            status, body
        )));
    }

    let parsed: KeyExchangeResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Authentication(format!("could not decode token response: {}", e)))?;

    match parsed.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(ApiError::Authentication(
            "token response did not contain a token".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_auth_header() {
        assert_eq!(build_auth_header("abc"), "Bearer abc");
    }

    #[test]
    fn test_credentials_header_value() {
        let creds = Credentials::new("key", "tok");
        assert_eq!(creds.header_value(), "Bearer tok");
        assert_eq!(creds.api_key(), "key");
    }

    #[test]
    fn test_set_token_keeps_key() {
        let mut creds = Credentials::new("key", "old");
        creds.set_token("new");
        assert_eq!(creds.token(), "new");
        assert_eq!(creds.api_key(), "key");
    }

    #[test]
    fn test_credentials_do_not_expose_secrets() {
        let creds = Credentials::new("secret_key", "secret_token");
        let debug_output = format!("{:?}", creds);

        assert!(!debug_output.contains("secret_key"));
        assert!(!debug_output.contains("secret_token"));
    }

    #[tokio::test]
    async fn test_exchange_key_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/key"))
            .and(body_json(serde_json::json!({ "key": "my-key" })))
            .and(header_eq("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = exchange_key(&Client::new(), &server.uri(), "my-key")
            .await
            .unwrap();
        assert_eq!(token, "abc");
    }

    #[tokio::test]
    async fn test_exchange_key_without_token_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "ok"
            })))
            .mount(&server)
            .await;

        let err = exchange_key(&Client::new(), &server.uri(), "my-key")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
        assert!(err.to_string().contains("did not contain a token"));
    }

    #[tokio::test]
    async fn test_exchange_key_rejected_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/key"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid key"))
            .mount(&server)
            .await;

        let err = exchange_key(&Client::new(), &server.uri(), "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_exchange_key_connection_refused() {
        let err = exchange_key(&Client::new(), "http://127.0.0.1:59998", "key")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }
}

//! Diffy API client implementation.
//!
//! This module provides the gateway every resource call goes through. It owns
//! the shared HTTP client, the base URL and the credentials, exchanges the API
//! key for a bearer token and executes authenticated JSON and multipart
//! requests. Requests are never retried.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::auth::{self, Credentials};
use super::error::{ApiError, Result};
use super::multipart::{self, MultipartField};
use crate::config::Config;

/// Base URL of the hosted Diffy API.
pub const DEFAULT_BASE_URL: &str = "https://app.diffy.website/api/";

/// Extra transport parameters merged into a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Query string pairs appended to the URL.
    pub query: Vec<(String, String)>,
    /// Additional headers. `Authorization` is always set by the client.
    pub headers: HeaderMap,
}

impl RequestParams {
    /// Parameters carrying only query pairs.
    pub fn with_query<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            query: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            headers: HeaderMap::new(),
        }
    }
}

/// The Diffy API client.
///
/// Construct it once and pass it to every `Project`, `Screenshot` and `Diff`
/// call. The client is `Send + Sync`: the token is read by every request and
/// only written by token refreshes, which are serialized.
#[derive(Debug)]
pub struct Diffy {
    /// The HTTP client.
    client: Client,
    /// The base URL, without trailing slash.
    base_url: String,
    /// API key and current bearer token.
    credentials: RwLock<Credentials>,
    /// Held while a token exchange is in flight.
    refresh_lock: Mutex<()>,
}

impl Diffy {
    /// Create a client for the hosted API and exchange `api_key` for a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Authentication` if the token exchange fails.
    pub async fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL).await
    }

    /// Create a client for a self-hosted deployment and exchange `api_key`
    /// for a token.
    #[instrument(skip(api_key))]
    pub async fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        Self::connect(api_key, base_url, Self::build_http_client(None)?).await
    }

    /// Create a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidArguments` when the configuration carries no
    /// API key, otherwise the same errors as [`Diffy::new`].
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::invalid("API key can not be empty"))?;
        let client = Self::build_http_client(config.timeout_secs.map(Duration::from_secs))?;
        Self::connect(api_key, &config.base_url, client).await
    }

    /// Create a client with an already issued token.
    ///
    /// Does NOT contact the API.
    pub fn with_token(base_url: &str, api_key: &str, token: &str) -> Result<Self> {
        Ok(Self::assemble(
            Self::build_http_client(None)?,
            base_url,
            Credentials::new(api_key, token),
        ))
    }

    async fn connect(api_key: &str, base_url: &str, client: Client) -> Result<Self> {
        if api_key.is_empty() {
            return Err(ApiError::invalid("API key can not be empty"));
        }
        let diffy = Self::assemble(client, base_url, Credentials::new(api_key, ""));
        let token = auth::exchange_key(&diffy.client, &diffy.base_url, api_key).await?;
        diffy.write_credentials().set_token(&token);
        info!("Diffy client authenticated");
        Ok(diffy)
    }

    fn assemble(client: Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            credentials: RwLock::new(credentials),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Build the HTTP client. Without a timeout the transport default applies.
    fn build_http_client(timeout: Option<Duration>) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(ApiError::Network)
    }

    /// The API key used for requests.
    pub fn api_key(&self) -> String {
        self.read_credentials().api_key().to_string()
    }

    /// The bearer token attached to requests.
    pub fn api_token(&self) -> String {
        self.read_credentials().token().to_string()
    }

    /// The base URL for API calls.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token without contacting the API.
    pub fn set_api_token(&self, token: &str) {
        self.write_credentials().set_token(token);
    }

    /// Replace the API key and exchange it for a fresh token.
    ///
    /// The key and token are only replaced when the exchange succeeds.
    #[instrument(skip(self, api_key))]
    pub async fn set_api_key(&self, api_key: &str) -> Result<()> {
        if api_key.is_empty() {
            return Err(ApiError::invalid("API key can not be empty"));
        }
        let _guard = self.refresh_lock.lock().await;
        let token = auth::exchange_key(&self.client, &self.base_url, api_key).await?;
        *self.write_credentials() = Credentials::new(api_key, &token);
        info!("API key replaced and token refreshed");
        Ok(())
    }

    /// Exchange the current API key for a fresh token.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        let api_key = self.api_key();
        let token = auth::exchange_key(&self.client, &self.base_url, &api_key).await?;
        self.write_credentials().set_token(&token);
        debug!("Token refreshed");
        Ok(())
    }

    /// Perform an authenticated request with an optional JSON body.
    ///
    /// `body` is only attached when it is not null, `{}` or `[]`.
    pub async fn request(&self, method: Method, path: &str, body: Value) -> Result<Value> {
        self.request_with(method, path, body, RequestParams::default())
            .await
    }

    /// Perform an authenticated request with extra transport parameters.
    #[instrument(skip(self, body, params), fields(method = %method, path = %path))]
    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        body: Value,
        params: RequestParams,
    ) -> Result<Value> {
        let mut builder = self
            .authorized(method, path, params)
            .header(header::ACCEPT, "application/json");

        if !is_empty_body(&body) {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        self.handle_response(response).await
    }

    /// Perform an authenticated request with a multipart body.
    #[instrument(skip(self, parts), fields(method = %method, path = %path, parts = parts.len()))]
    pub async fn multipart_request(
        &self,
        method: Method,
        path: &str,
        parts: Vec<MultipartField>,
    ) -> Result<Value> {
        let form = multipart::build_form(parts)?;
        let response = self
            .authorized(method, path, RequestParams::default())
            .header(header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;
        self.handle_response(response).await
    }

    fn authorized(&self, method: Method, path: &str, params: RequestParams) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, &url)
            .headers(params.headers)
            .header(header::AUTHORIZATION, self.read_credentials().header_value());
        if !params.query.is_empty() {
            builder = builder.query(&params.query);
        }
        builder
    }

    /// Handle the HTTP response, checking the status and decoding JSON.
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!("Error response body: {}", body);
            return Err(ApiError::Request { status, body });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn read_credentials(&self) -> std::sync::RwLockReadGuard<'_, Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_credentials(&self) -> std::sync::RwLockWriteGuard<'_, Credentials> {
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether a JSON body should be left off the request.
fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');

    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}

//! REST client for the polling backend.
//!
//! Every request carries `Content-Type: application/json` and, when the
//! session store holds a token, `Authorization: Bearer <token>`. The token is
//! read from storage per request so a login in one place is visible to every
//! clone of the client immediately.
//!
//! ERROR HANDLING
//! ==============
//! All failures come back as [`ApiError`] with a status callers can branch on:
//! the server's status for HTTP errors, 500 for unparseable success bodies,
//! 0 for transport failures. No retries happen here.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::fmt;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::ApiError;
use crate::config::{ClientConfig, ConfigError};
use crate::storage::session::SessionStore;

// =============================================================================
// REQUEST CONFIG
// =============================================================================

/// Per-request options: method, query params, extra headers and JSON body.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    /// Query parameters in order; `None` values are dropped from the URL.
    pub params: Vec<(String, Option<String>)>,
    /// Extra headers; these override the defaults on conflict.
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestConfig {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self { method, params: Vec::new(), headers: HeaderMap::new(), body: None }
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }

    #[must_use]
    pub fn param_opt<V: fmt::Display>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.params.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an encode [`ApiError`] if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(|e| ApiError::encode(&e))?);
        Ok(self)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    root: String,
    store: SessionStore,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient").field("root", &self.root).finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client rooted at `config.api_root()` that reads its bearer
    /// token from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, store: SessionStore) -> Result<Self, ConfigError> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect());
        let http = builder.build().map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http, root: config.api_root(), store })
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Issue a request and decode the JSON response into `T`.
    ///
    /// A 204 response yields `T`'s empty form without reading the body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or a
    /// success body that is not valid JSON for `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        config: RequestConfig,
    ) -> Result<T, ApiError> {
        let RequestConfig { method, params, headers, body } = config;
        let url = build_url(&self.root, endpoint, &params)?;
        tracing::debug!(%method, %url, "api request");

        let mut merged = self.default_headers();
        merged.extend(headers);

        let mut req = self.http.request(method, url).headers(merged);
        if let Some(body) = body {
            req = req.body(body.to_string());
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default();
            let text = response.text().await.unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), reason, &text);
            tracing::debug!(
                status = err.status,
                code = ?err.code,
                message = %err.message,
                "api error response"
            );
            return Err(err);
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return empty_response();
        }

        let text = response.text().await?;
        decode_body(&text)
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<T, ApiError> {
        let mut config = RequestConfig::new(Method::GET);
        config.params = params.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect();
        self.request(endpoint, config).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(endpoint, RequestConfig::new(Method::POST).json(body)?).await
    }

    /// POST without a request body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestConfig::new(Method::POST)).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(endpoint, RequestConfig::new(Method::PUT).json(body)?).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(endpoint, RequestConfig::new(Method::PATCH).json(body)?).await
    }

    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestConfig::new(Method::DELETE)).await
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.store.token() {
            match bearer_header(&token) {
                Some(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                None => tracing::warn!(
                    "stored auth token is not a valid header value; sending request without it"
                ),
            }
        }
        headers
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Join `root` and `endpoint`, appending only the params that have values.
pub(crate) fn build_url(
    root: &str,
    endpoint: &str,
    params: &[(String, Option<String>)],
) -> Result<reqwest::Url, ApiError> {
    let mut url = reqwest::Url::parse(&format!("{root}{endpoint}"))
        .map_err(|e| {
            ApiError::new(0, format!("invalid request URL `{root}{endpoint}`: {e}"), None)
        })?;

    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key.as_str(), v)))
        .collect();
    if !present.is_empty() {
        url.query_pairs_mut().extend_pairs(present);
    }
    Ok(url)
}

pub(crate) fn bearer_header(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}

/// Parse a success body. Text that is not JSON at all is
/// [`ApiError::invalid_json`]; JSON of the wrong shape is
/// [`ApiError::unexpected_shape`].
pub(crate) fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        tracing::debug!(error = %e, "response body is not valid JSON");
        ApiError::invalid_json()
    })?;
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!(error = %e, "response body does not match the expected type");
        ApiError::unexpected_shape(&e)
    })
}

/// Empty form of `T` for bodiless responses: `{}` first, then `null`.
pub(crate) fn empty_response<T: DeserializeOwned>() -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(Map::new()))
        .or_else(|_| serde_json::from_value(Value::Null))
        .map_err(|_| ApiError::invalid_json())
}

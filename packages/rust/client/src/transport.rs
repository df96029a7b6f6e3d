//! A single HTTP round trip against the API, normalized into JSON.
//!
//! Calls are at-most-once: no retry, backoff or timeout is layered on top
//! of what `reqwest` does by default.

use reqwest::multipart::Form;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use docbot_shared::ApiConfig;

use crate::error::{ClientError, Result};
use crate::form::FormArgs;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("docbot/", env!("CARGO_PKG_VERSION"));

/// Issues requests to `<base>/1/<path>` with optional bearer auth.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Transport {
    pub fn new(api: &ApiConfig, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: api.base_url(),
            token,
        })
    }

    /// Absolute URL for a relative API path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The underlying HTTP client, for fetching non-API content such as blob sources.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// GET `path`, which already carries its query string.
    #[instrument(skip_all, fields(endpoint = endpoint(path)))]
    pub async fn get(&self, path: &str) -> Result<Value> {
        let request = self.http.get(self.url_for(path));
        self.send(path, request).await
    }

    /// POST a url-encoded form body.
    #[instrument(skip_all, fields(endpoint = endpoint(path), fields = args.pairs().len()))]
    pub async fn post_form(&self, path: &str, args: &FormArgs) -> Result<Value> {
        let request = self.http.post(self.url_for(path)).form(args.pairs());
        self.send(path, request).await
    }

    /// POST a multipart body (used for blob streams).
    #[instrument(skip_all, fields(endpoint = endpoint(path)))]
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Value> {
        let request = self.http.post(self.url_for(path)).multipart(form);
        self.send(path, request).await
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Value> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        debug!(%status, body_len = body.len(), "response received");

        let value: Value = serde_json::from_str(&body).map_err(|_| ClientError::Decode {
            path: path.to_string(),
            body,
        })?;

        if status != StatusCode::OK {
            return Err(ClientError::Api {
                path: path.to_string(),
                status,
                headers,
                body: value,
            });
        }

        Ok(value)
    }
}

/// Path without its query string, so credentials in OAuth queries stay out of spans.
fn endpoint(path: &str) -> &str {
    path.split_once('?').map_or(path, |(endpoint, _)| endpoint)
}

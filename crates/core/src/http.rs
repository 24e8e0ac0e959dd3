//! # HTTP
//!
//! The outbound HTTP collaborator used to resolve by-reference parameters
//! (request objects, client metadata, presentation definitions, JWK Sets,
//! certificate bundles) and to post Authorization Responses.

use std::time::Duration;

use http::{HeaderMap, StatusCode};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

/// Default bound on a single outbound request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by the HTTP collaborator.
#[derive(Error, Clone, Debug)]
pub enum Error {
    /// The server answered with a non-success status code.
    #[error("request to {url} returned status {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code returned.
        status: u16,
        /// The response body, if any.
        body: String,
    },

    /// The request could not be completed (DNS, connect, timeout, TLS...).
    #[error("request to {url} failed: {message}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Whether retrying the request may succeed.
        retryable: bool,
        /// Underlying error message.
        message: String,
    },

    /// The response body could not be decoded as expected.
    #[error("response from {url} could not be decoded: {message}")]
    Decode {
        /// The requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The client could not be built.
    #[error("invalid http client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for transient failures such as timeouts and refused
    /// connections.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }
}

fn transport(url: &str, err: &reqwest::Error) -> Error {
    Error::Transport {
        url: url.to_string(),
        retryable: err.is_timeout() || err.is_connect(),
        message: err.to_string(),
    }
}

/// The raw outcome of a POST, returned regardless of status code.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// Response status code.
    pub status: StatusCode,

    /// Response headers.
    pub headers: HeaderMap,

    /// Response body as text.
    pub body: String,
}

/// Thin wrapper around a `reqwest` client with a bounded timeout. Redirects
/// are never followed so `Location` headers can be surfaced to the caller.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client whose requests are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String, Error> {
        let resp = self.client.get(url).send().await.map_err(|e| transport(url, &e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport(url, &e))?;

        if !status.is_success() {
            return Err(Error::Status { url: url.to_string(), status: status.as_u16(), body });
        }
        Ok(body)
    }

    /// Fetch `url` and deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or when the
    /// body is not valid JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Decode { url: url.to_string(), message: e.to_string() })
    }

    /// POST `form` to `url` as `application/x-www-form-urlencoded`.
    ///
    /// The response is returned whatever its status code, leaving the caller
    /// to decide how to treat rejections.
    ///
    /// # Errors
    ///
    /// Returns an error only when the request cannot be completed.
    #[instrument(level = "debug", skip(self, form))]
    pub async fn post_form(
        &self, url: &str, form: &[(String, String)],
    ) -> Result<HttpResponse, Error> {
        let resp = self.client.post(url).form(form).send().await.map_err(|e| transport(url, &e))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await.map_err(|e| transport(url, &e))?;

        tracing::debug!(status = status.as_u16(), "form posted");
        Ok(HttpResponse { status, headers, body })
    }
}

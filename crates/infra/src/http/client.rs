use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;
use upwork_domain::constants::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use upwork_domain::{ClientConfig, UpworkError};

use crate::errors::InfraError;

/// Thin wrapper around a pooled reqwest client.
///
/// Sends exactly one request per call; retry policy lives in the execution
/// engine. Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpworkError::Config`] if the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self, UpworkError> {
        Self::builder().build()
    }

    /// Client honouring the timeout and user agent of `config`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, UpworkError> {
        Self::builder().timeout(config.timeout()).user_agent(config.user_agent.clone()).build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Underlying reqwest client, for adapters that need it directly.
    pub const fn inner(&self) -> &ReqwestClient {
        &self.client
    }

    /// Execute the provided request builder once.
    ///
    /// Non-2xx responses are returned as-is; only failures to obtain a
    /// response are errors.
    ///
    /// # Errors
    ///
    /// Returns the classified transport failure (timeouts and connection
    /// errors are [`UpworkError::Network`]).
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, UpworkError> {
        let request = builder.build().map_err(|err| UpworkError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                debug!(%method, %url, %status, "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// # Errors
    ///
    /// Returns [`UpworkError::Config`] if reqwest rejects the settings.
    pub fn build(self) -> Result<HttpClient, UpworkError> {
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).user_agent(self.user_agent).no_proxy();

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|err| UpworkError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}

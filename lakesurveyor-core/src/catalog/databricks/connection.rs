//! HTTP transport for the Databricks REST APIs.
//!
//! Every request carries the bearer token and goes through a bounded
//! retry loop. Only transient failures are retried: connect errors,
//! timeouts, HTTP 429 and HTTP 5xx.

use crate::config::{ConnectionConfig, RetryConfig};
use crate::error::{LakeSurveyorError, scrub_secret};
use crate::security::AccessToken;
use crate::Result;
use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Error body returned by the REST APIs.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(reqwest::Response),
    Transient(String),
}

/// Authenticated HTTP connection to one workspace.
pub(crate) struct ApiConnection {
    http: reqwest::Client,
    base_url: Url,
    token: AccessToken,
    retry: RetryConfig,
}

impl ApiConnection {
    /// Builds the HTTP client from the connection settings.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable host or an empty token
    pub(crate) fn new(config: &ConnectionConfig, token: AccessToken) -> Result<Self> {
        if token.is_empty() {
            return Err(LakeSurveyorError::configuration("access token cannot be empty"));
        }

        let base_url = Url::parse(&config.base_url())
            .map_err(|e| LakeSurveyorError::configuration(format!("invalid host: {}", e)))?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("lakesurveyor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LakeSurveyorError::connection_failed("failed to build HTTP client", e))?;

        Ok(Self {
            http,
            base_url,
            token,
            retry: config.retry.clone(),
        })
    }

    /// Resolves an API path made of literal segments.
    ///
    /// Segments are percent-encoded, so table names with special characters
    /// are safe to pass.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| LakeSurveyorError::configuration("host cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Resolves a server-supplied relative link such as a result chunk.
    pub(crate) fn link(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LakeSurveyorError::query_failed(format!("invalid result link: {}", e)))
    }

    /// `GET` with query parameters, decoding the JSON body.
    pub(crate) async fn get_json<T>(&self, url: Url, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::GET, url.clone(), query, None::<&()>)
            .await?;
        self.decode(url, response).await
    }

    /// `POST` with a JSON body, decoding the JSON response.
    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, url.clone(), &[], Some(body)).await?;
        self.decode(url, response).await
    }

    async fn decode<T>(&self, url: Url, response: reqwest::Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let bytes = response.bytes().await.map_err(|e| {
            LakeSurveyorError::connection_failed(format!("reading response from {}", url.path()), e)
        })?;
        serde_json::from_slice(&bytes).map_err(|e| LakeSurveyorError::Serialization {
            context: format!("decoding response from {}", url.path()),
            source: e,
        })
    }

    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let mut attempt = 0u32;
        loop {
            match self.attempt(method.clone(), url.clone(), query, body).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Transient(reason) => {
                    attempt += 1;
                    if attempt > self.retry.max_retries {
                        return Err(LakeSurveyorError::connection_refused(format!(
                            "{} {} failed after {} attempts: {}",
                            method,
                            url.path(),
                            attempt,
                            reason
                        )));
                    }
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} {} failed ({}), retrying in {:?} (attempt {}/{})",
                        method,
                        url.path(),
                        reason,
                        delay,
                        attempt,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt<B>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Attempt>
    where
        B: Serialize + ?Sized,
    {
        tracing::trace!("{} {}", method, url.path());

        let mut request = self
            .http
            .request(method, url.clone())
            .bearer_auth(self.token.expose());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Ok(Attempt::Transient(self.sanitize(&e.to_string())));
            }
            Err(e) => {
                return Err(LakeSurveyorError::connection_failed(
                    format!("request to {} failed", url.path()),
                    e.without_url(),
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(Attempt::Done(response));
        }

        let detail = self.error_detail(response).await;
        if is_transient(status) {
            return Ok(Attempt::Transient(format!("HTTP {}: {}", status, detail)));
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(LakeSurveyorError::connection_refused(format!(
                "HTTP {} from {}: {}",
                status,
                url.path(),
                detail
            )));
        }
        Err(LakeSurveyorError::query_failed(format!(
            "HTTP {} from {}: {}",
            status,
            url.path(),
            detail
        )))
    }

    async fn error_detail(&self, response: reqwest::Response) -> String {
        let text = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(ApiErrorBody {
                error_code: Some(code),
                message: Some(message),
            }) => format!("{}: {}", code, message),
            Ok(ApiErrorBody {
                message: Some(message),
                ..
            }) => message,
            _ => text.chars().take(200).collect(),
        };
        self.sanitize(&detail)
    }

    fn sanitize(&self, message: &str) -> String {
        scrub_secret(message, self.token.expose())
    }

    /// Backoff with up to 20% random jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.retry.backoff_for(attempt);
        let jitter_ms = (base.as_millis() as u64) / 5;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// HTTP statuses worth retrying.
pub(crate) fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

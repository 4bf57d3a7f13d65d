//! Azure Resource Manager HTTP client
//!
//! One [`ArmClient`] is built at provider configure time and shared by every
//! service client. Requests carry the `api-version` of the calling service,
//! retry transparently on transport errors and 429/5xx responses, and
//! long-running operations are polled to completion via the
//! `Azure-AsyncOperation`/`Location` response headers before the call
//! returns.

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::auth::Credential;
use super::error::{ApiError, CloudErrorBody};

#[derive(Clone)]
pub struct ArmClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    endpoint: String,
    subscription_id: String,
    credential: Credential,
    retry: RetryConfig,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout: Duration,
    /// Interval between long-running-operation status polls.
    pub lro_poll_interval: Duration,
    /// Upper bound on a single long-running operation.
    pub lro_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            request_timeout: Duration::from_secs(60),
            lro_poll_interval: Duration::from_secs(10),
            lro_timeout: Duration::from_secs(90 * 60),
        }
    }
}

/// Status body behind the Azure-AsyncOperation header.
#[derive(Debug, Deserialize)]
struct AsyncOperationStatus {
    status: String,
    error: Option<super::error::CloudError>,
}

impl ArmClient {
    pub fn new(endpoint: &str, subscription_id: &str, credential: Credential) -> Result<Self, ApiError> {
        Self::with_config(endpoint, subscription_id, credential, RetryConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        subscription_id: &str,
        credential: Credential,
        retry: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(retry.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                subscription_id: subscription_id.to_string(),
                credential,
                retry,
            }),
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.inner.subscription_id
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.inner.endpoint, path, api_version
        )
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T, ApiError> {
        let response = self
            .execute_with_retry(Method::GET, &self.url(path, api_version), None)
            .await?;
        parse_body(response).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute_with_retry(Method::PUT, &self.url(path, api_version), Some(&payload))
            .await?;
        parse_body(response).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute_with_retry(Method::PATCH, &self.url(path, api_version), Some(&payload))
            .await?;
        parse_body(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute_with_retry(Method::POST, &self.url(path, api_version), Some(&payload))
            .await?;
        parse_body(response).await
    }

    pub async fn delete(&self, path: &str, api_version: &str) -> Result<(), ApiError> {
        match self
            .execute_with_retry(Method::DELETE, &self.url(path, api_version), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// PUT followed by long-running-operation polling. A response without
    /// LRO headers completed synchronously and its body is returned as-is;
    /// otherwise the operation is polled and the resource read back.
    pub async fn put_and_wait<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute_with_retry(Method::PUT, &self.url(path, api_version), Some(&payload))
            .await?;

        if !response.has_lro_headers() {
            return parse_body(response).await;
        }

        self.wait_for_operation(&response).await?;
        self.get(path, api_version).await
    }

    /// PUT followed by long-running-operation polling, discarding the body.
    /// For sub-resources whose PUT response is not worth reading back.
    pub async fn put_and_poll<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute_with_retry(Method::PUT, &self.url(path, api_version), Some(&payload))
            .await?;

        self.wait_for_operation(&response).await
    }

    /// POST followed by long-running-operation polling.
    pub async fn post_and_wait<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let payload = encode_body(body)?;
        let response = self
            .execute_with_retry(Method::POST, &self.url(path, api_version), Some(&payload))
            .await?;

        self.wait_for_operation(&response).await
    }

    /// DELETE followed by long-running-operation polling; an absent resource
    /// is success.
    pub async fn delete_and_wait(&self, path: &str, api_version: &str) -> Result<(), ApiError> {
        let response = match self
            .execute_with_retry(Method::DELETE, &self.url(path, api_version), None)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        self.wait_for_operation(&response).await
    }

    /// Polls the operation referenced by the response headers until it
    /// reaches a terminal state. Responses without LRO headers are complete
    /// already.
    async fn wait_for_operation(&self, response: &CapturedResponse) -> Result<(), ApiError> {
        let async_operation = response.header("azure-asyncoperation");
        let location = response.header("location");

        let deadline = std::time::Instant::now() + self.inner.retry.lro_timeout;

        if let Some(status_url) = async_operation {
            loop {
                if std::time::Instant::now() >= deadline {
                    return Err(ApiError::OperationTimeout(self.inner.retry.lro_timeout));
                }

                let polled = self
                    .execute_with_retry(Method::GET, &status_url, None)
                    .await?;
                let status: AsyncOperationStatus = serde_json::from_str(&polled.body)
                    .map_err(|e| ApiError::Parse(format!("operation status: {}", e)))?;

                tracing::debug!(status = %status.status, "polled long-running operation");

                match status.status.as_str() {
                    "Succeeded" => return Ok(()),
                    "Failed" | "Canceled" => {
                        let message = status
                            .error
                            .and_then(|e| e.message)
                            .unwrap_or_else(|| "no error detail returned".to_string());
                        return Err(ApiError::OperationFailed {
                            status: status.status,
                            message,
                        });
                    }
                    _ => tokio::time::sleep(self.inner.retry.lro_poll_interval).await,
                }
            }
        }

        if let Some(location_url) = location {
            loop {
                if std::time::Instant::now() >= deadline {
                    return Err(ApiError::OperationTimeout(self.inner.retry.lro_timeout));
                }

                let polled = match self
                    .execute_with_retry(Method::GET, &location_url, None)
                    .await
                {
                    // gone after delete: done
                    Err(e) if e.is_not_found() => return Ok(()),
                    other => other?,
                };

                if polled.status != StatusCode::ACCEPTED {
                    return Ok(());
                }
                tokio::time::sleep(self.inner.retry.lro_poll_interval).await;
            }
        }

        Ok(())
    }

    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<CapturedResponse, ApiError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry.max_backoff_ms,
                );
                tracing::debug!(url, backoff_ms = backoff, attempt, "retrying request");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let token = self.inner.credential.token().await?;

            let mut request = self
                .inner
                .http
                .request(method.clone(), url)
                .header(AUTHORIZATION, format!("Bearer {}", token));
            if let Some(body) = body {
                request = request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body.to_string());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return CapturedResponse::from_response(response).await;
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ApiError::Auth(body));
                    }

                    if status == StatusCode::NOT_FOUND {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ApiError::NotFound(body));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        let message = serde_json::from_str::<CloudErrorBody>(&body)
                            .ok()
                            .and_then(|b| b.error)
                            .and_then(|e| e.message)
                            .unwrap_or(body);
                        return Err(ApiError::Api {
                            status: status.as_u16(),
                            message,
                        });
                    }
                }
                Err(e) => {
                    if e.is_timeout() || e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Parse(format!("request body: {}", e)))
}

/// Response with its body already drained, so it can be inspected more than
/// once during LRO handling.
pub(crate) struct CapturedResponse {
    pub status: StatusCode,
    pub headers: reqwest::header::HeaderMap,
    pub body: String,
}

impl CapturedResponse {
    async fn from_response(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }

    fn has_lro_headers(&self) -> bool {
        self.headers.contains_key("azure-asyncoperation") || self.headers.contains_key("location")
    }
}

async fn parse_body<T: DeserializeOwned>(response: CapturedResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| {
        tracing::error!(body = %response.body, "failed to deserialize response");
        ApiError::Parse(format!("failed to parse response: {}", e))
    })
}

use log::{debug, warn};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::auth::Token;
use crate::config::GitLabConfig;
use crate::error::{GitLabToolingError, Result};
use crate::providers::gitlab::cache::{cache_key, ResponseCache};
use crate::providers::gitlab::source::RepositoryReference;

const RETRY_DELAY_SECONDS: u64 = 10;
const MAX_RETRY_DELAY_SECONDS: u64 = 60;
const MAX_CONCURRENT_REQUESTS: usize = 16;
const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Fragments of transport errors that mean the host name did not resolve.
const HOST_RESOLUTION_MARKERS: [&str; 5] = [
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "err_name_not_resolved",
];

/// GitLab REST v4 client scoped to single-page project reads.
///
/// Every GET goes through the response cache when one is configured: a hit
/// skips the network entirely, a `200 OK` body that decodes is written back,
/// anything else is never cached.
pub struct GitLabClient {
    client: Client,
    token: Option<Token>,
    cache: Option<ResponseCache>,
    open_merge_requests_only: bool,
    rate_limit_retries: u32,
    semaphore: Arc<Semaphore>,
}

impl GitLabClient {
    /// Builds a client from the `[gitlab]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the request timeout is not a valid duration string
    /// or the HTTP client cannot be constructed.
    pub fn new(config: &GitLabConfig, cache: Option<ResponseCache>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gitlab-tooling/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout()?)
            .build()
            .map_err(|e| GitLabToolingError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: config.token(),
            cache,
            open_merge_requests_only: config.open_merge_requests_only,
            rate_limit_retries: config.rate_limit_retries,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        })
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    pub(super) fn open_merge_requests_only(&self) -> bool {
        self.open_merge_requests_only
    }

    /// Attaches the `PRIVATE-TOKEN` header when a token is configured.
    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.header(PRIVATE_TOKEN_HEADER, token.as_str())
        } else {
            request
        }
    }

    /// GET `endpoint` below the project URL and decode the body.
    ///
    /// Only a body that decodes into `T` is written to the cache. A cached
    /// entry that no longer decodes is dropped and fetched again.
    pub(super) async fn get<T>(&self, reference: &RepositoryReference, endpoint: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = endpoint_url(reference, endpoint);
        let key = self.cache.as_ref().map(|_| cache_key(&url));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(data) = cache.get(key) {
                match serde_json::from_value(data) {
                    Ok(decoded) => {
                        debug!("Serving '{url}' from cache");
                        return Ok(decoded);
                    }
                    Err(e) => {
                        warn!("Discarding undecodable cache entry for '{url}': {e}");
                        cache.remove(key);
                    }
                }
            }
        }

        let data = self.get_value(reference, &url).await?;
        let decoded = T::deserialize(&data).map_err(|source| GitLabToolingError::Decode {
            url: url.clone(),
            source,
        })?;

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.set(key, &data);
        }

        Ok(decoded)
    }

    /// POST to `endpoint` below the project URL. Never cached.
    pub(super) async fn post<T>(&self, reference: &RepositoryReference, endpoint: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = endpoint_url(reference, endpoint);
        let response = self.send(Method::POST, reference, &url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitLabToolingError::ApiError {
                url,
                status: status.as_u16(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| transport_error(reference, &url, e))?;
        serde_json::from_value(value).map_err(|source| GitLabToolingError::Decode { url, source })
    }

    /// Drops the cached response of `endpoint`, if any.
    pub(super) fn evict(&self, reference: &RepositoryReference, endpoint: &str) {
        if let Some(cache) = &self.cache {
            cache.remove(&cache_key(&endpoint_url(reference, endpoint)));
        }
    }

    /// Sends a GET and returns the JSON body of a `200 OK`.
    async fn get_value(&self, reference: &RepositoryReference, url: &str) -> Result<Value> {
        let response = self.send(Method::GET, reference, url).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GitLabToolingError::ApiError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| transport_error(reference, url, e))
    }

    /// Sends a request, waiting out `429 Too Many Requests` a bounded number of times.
    async fn send(
        &self,
        method: Method,
        reference: &RepositoryReference,
        url: &str,
    ) -> Result<Response> {
        // One permit per logical request, held across retries
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| GitLabToolingError::Config(format!("Request limiter closed: {e}")))?;

        let mut retry_count = 0;
        loop {
            let request = self.auth_request(
                self.client
                    .request(method.clone(), url)
                    .header(CONTENT_TYPE, "application/json"),
            );

            let response = request
                .send()
                .await
                .map_err(|e| transport_error(reference, url, e))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && retry_count < self.rate_limit_retries {
                let delay = retry_after(&response);
                warn!(
                    "GitLab rate limit hit for '{url}'. Waiting {}s before retry {}/{}...",
                    delay.as_secs(),
                    retry_count + 1,
                    self.rate_limit_retries
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            debug!("{method} {url} -> {status}");
            return Ok(response);
        }
    }
}

fn endpoint_url(reference: &RepositoryReference, endpoint: &str) -> String {
    if endpoint.is_empty() {
        reference.api_repo_url.clone()
    } else {
        format!("{}/{endpoint}", reference.api_repo_url)
    }
}

fn retry_after(response: &Response) -> Duration {
    let seconds = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(RETRY_DELAY_SECONDS)
        .min(MAX_RETRY_DELAY_SECONDS);
    Duration::from_secs(seconds)
}

fn transport_error(
    reference: &RepositoryReference,
    url: &str,
    error: reqwest::Error,
) -> GitLabToolingError {
    if error.is_timeout() {
        GitLabToolingError::Timeout(url.to_string())
    } else if is_host_resolution_failure(&error) {
        GitLabToolingError::HostUnreachable(reference.api_repo_url.clone())
    } else {
        GitLabToolingError::Network {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Walks the error chain looking for a DNS failure.
pub(crate) fn is_host_resolution_failure(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if HOST_RESOLUTION_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            return true;
        }
        current = err.source();
    }
    false
}

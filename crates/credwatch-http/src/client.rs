//! Dashboard REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use credwatch_core::error::ApiError;
use credwatch_core::traits::ApiCaller;
use credwatch_core::{AccessToken, Error, Result};

use crate::USER_AGENT;

/// Default dashboard backend.
pub const DEFAULT_BASE_URL: &str = "https://backend.aisensy.com";

/// Origin the dashboard backend expects browser requests to come from.
pub const DEFAULT_ORIGIN: &str = "https://www.app.aisensy.com";

/// Where and how to reach the dashboard backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme and host, endpoints are appended to it.
    pub base_url: String,
    /// Sent as `Origin`, and with a trailing slash as `Referer`.
    pub origin: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            origin: Some(DEFAULT_ORIGIN.to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

/// POSTs JSON payloads to the dashboard backend with a bearer token.
///
/// No retries happen here; the polling pipeline owns that policy.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiClient {
    /// Build a client for `config`.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(origin) = &config.origin {
            let origin = origin.trim_end_matches('/');
            headers.insert(ORIGIN, header_value(origin)?);
            headers.insert(REFERER, header_value(&format!("{origin}/"))?);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Configuration {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Create the authorization header for `token`.
    fn bearer(token: &AccessToken) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(
            |_| ApiError::Configuration {
                message: "token contains characters not allowed in a header".to_string(),
            },
        )?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Map a response to its JSON body or the matching error kind.
    async fn handle_response(&self, endpoint: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        trace!(%status, "Dashboard response");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::AuthFailed {
                endpoint: endpoint.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| transport(endpoint, &e))?;
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
            .into());
        }

        serde_json::from_slice(&body).map_err(|e| {
            ApiError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ApiCaller for HttpApiClient {
    #[instrument(skip(self, token, payload), fields(base = %self.base_url))]
    async fn call(&self, endpoint: &str, token: &AccessToken, payload: &Value) -> Result<Value> {
        let url = self.url(endpoint);
        debug!(%url, "Calling dashboard endpoint");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, Self::bearer(token)?)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport(endpoint, &e))?;

        self.handle_response(endpoint, response).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        ApiError::Configuration {
            message: format!("invalid header value `{value}`: {e}"),
        }
        .into()
    })
}

fn transport(endpoint: &str, err: &reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        message,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_joined_to_the_base_url() {
        let client = HttpApiClient::new(ApiConfig {
            base_url: "https://backend.example/".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();

        assert_eq!(client.base_url(), "https://backend.example");
        assert_eq!(
            client.url("/client/t1/api/get-wba-details"),
            "https://backend.example/client/t1/api/get-wba-details"
        );
        assert_eq!(client.url("health"), "https://backend.example/health");
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let value = HttpApiClient::bearer(&AccessToken::new("abc")).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer abc");
    }

    #[test]
    fn invalid_origin_is_a_configuration_error() {
        let err = HttpApiClient::new(ApiConfig {
            origin: Some("bad\norigin".to_string()),
            ..ApiConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), "api");
    }
}

use crate::application::ports::NetworkFetcher;
use crate::domain::entities::{InterceptedRequest, NetworkResponse};
use crate::shared::config::RemoteConfig;
use crate::shared::error::{AppError, InterceptError};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;

/// [`NetworkFetcher`] over a shared `reqwest::Client`. Relative URLs are
/// resolved against the configured origin.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    origin: String,
}

impl ReqwestFetcher {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            origin: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.origin)
        } else {
            format!("{}/{url}", self.origin)
        }
    }
}

pub(crate) fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name {name}: {e}"))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| format!("invalid header value: {e}"))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl NetworkFetcher for ReqwestFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<NetworkResponse, InterceptError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| InterceptError::InvalidRequest(e.to_string()))?;
        let headers = header_map(&request.headers).map_err(InterceptError::InvalidRequest)?;

        let mut builder = self
            .client
            .request(method, self.resolve(&request.url))
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InterceptError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| InterceptError::Network(e.to_string()))?;

        Ok(NetworkResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

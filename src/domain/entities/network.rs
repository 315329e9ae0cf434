use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    #[default]
    Other,
}

/// An outgoing request as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub mode: RequestMode,
}

impl InterceptedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
            mode: RequestMode::Other,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_write(&self) -> bool {
        !self.is_get() && !self.method.eq_ignore_ascii_case("HEAD")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Path component of the URL. Relative URLs are returned without their
    /// query string.
    pub fn path(&self) -> String {
        match reqwest::Url::parse(&self.url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Cache entries are keyed on the exact request line.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl NetworkResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ignores_origin_and_query() {
        let absolute = InterceptedRequest::get("https://app.example.com/api/clients?page=2");
        assert_eq!(absolute.path(), "/api/clients");
        let relative = InterceptedRequest::get("/api/clients?page=2");
        assert_eq!(relative.path(), "/api/clients");
    }

    #[test]
    fn write_detection() {
        assert!(!InterceptedRequest::get("/a").is_write());
        assert!(InterceptedRequest::get("/a").with_method("post").is_write());
        assert_eq!(
            InterceptedRequest::get("/a").with_method("delete").cache_key(),
            "DELETE /a"
        );
    }
}

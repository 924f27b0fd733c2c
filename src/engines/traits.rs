//! Engine traits and types

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::results::{Asset, AssetKind};
use async_trait::async_trait;
use std::collections::HashMap;

/// Parameters for building one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    /// Backend-native query string
    pub query: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Results per page
    pub page_size: u32,
    /// Asset subtype for company intelligence engines
    pub kind: Option<AssetKind>,
}

impl RequestParams {
    /// Create new request parameters
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            page_size: 10,
            kind: None,
        }
    }

    /// Set page and page size
    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page.max(1);
        self.page_size = page_size.max(1);
        self
    }

    /// Set the asset subtype
    pub fn kind(mut self, kind: AssetKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// HTTP request to be made by the engine
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// URL to request
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub params: HashMap<String, String>,
    /// JSON body
    pub json: Option<serde_json::Value>,
}

impl EngineRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            params: HashMap::new(),
            json: None,
        }
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Add JSON body
    pub fn json(mut self, data: serde_json::Value) -> Self {
        self.json = Some(data);
        self
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP response from engine request
#[derive(Debug)]
pub struct EngineResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub text: String,
}

impl EngineResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, EngineError> {
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Map a non-2xx status onto the matching [`EngineError`]
    pub fn error_for_status(&self) -> Result<(), EngineError> {
        if self.is_success() {
            return Ok(());
        }
        let message = snippet(&self.text);
        Err(match self.status {
            429 => EngineError::RateLimited(message),
            401 | 403 => EngineError::PermissionDenied(message),
            status => EngineError::Status { status, message },
        })
    }
}

fn snippet(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// A search provider: builds page requests and normalizes responses.
///
/// Engines never retry or throttle; the orchestrators own that.
pub trait Engine: Send + Sync {
    /// Engine name, used for rate limiter keying and query translation
    fn name(&self) -> &str;

    /// Asset subtypes served by a company intelligence engine.
    /// Empty for engines that search IP and domain targets.
    fn kinds(&self) -> Vec<AssetKind> {
        Vec::new()
    }

    /// Build the HTTP request for one page
    fn request(&self, params: &RequestParams) -> Result<EngineRequest, EngineError>;

    /// Parse the HTTP response into assets
    fn response(
        &self,
        params: &RequestParams,
        response: EngineResponse,
    ) -> Result<Vec<Asset>, EngineError>;

    /// Optional initialization from configuration (credentials, base URL)
    fn init(&mut self, _config: &EngineConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Optional validation of configuration
    fn validate(&self, _config: &EngineConfig) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One page of target search results from a backend
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch one page for an already translated query. An exhausted query
    /// yields an empty list rather than an error.
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Asset>, EngineError>;
}

/// One page of company intelligence results for one asset subtype
#[async_trait]
pub trait CompanyBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Subtypes this backend can be queried for
    fn kinds(&self) -> Vec<AssetKind>;

    async fn search_kind(
        &self,
        query: &str,
        kind: AssetKind,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Asset>, EngineError>;
}

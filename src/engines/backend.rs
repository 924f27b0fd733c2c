//! Couples an [`Engine`] with the shared HTTP client

use super::traits::*;
use crate::error::EngineError;
use crate::network::HttpClient;
use crate::results::{Asset, AssetKind};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A backend that runs an engine's requests over HTTP
#[derive(Clone)]
pub struct HttpBackend {
    engine: Arc<dyn Engine>,
    client: HttpClient,
    timeout: Option<Duration>,
}

impl HttpBackend {
    pub fn new(engine: Arc<dyn Engine>, client: HttpClient) -> Self {
        Self {
            engine,
            client,
            timeout: None,
        }
    }

    /// Override the client's default request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    async fn fetch(&self, params: RequestParams) -> Result<Vec<Asset>, EngineError> {
        let request = self.engine.request(&params)?;
        debug!(
            "{}: page {} ({} per page)",
            self.engine.name(),
            params.page,
            params.page_size
        );

        let response = match self.timeout {
            Some(timeout) => self.client.execute_with_timeout(request, timeout).await?,
            None => self.client.execute(request).await?,
        };
        self.engine.response(&params, response)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Asset>, EngineError> {
        self.fetch(RequestParams::new(query).page(page, page_size))
            .await
    }
}

#[async_trait]
impl CompanyBackend for HttpBackend {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn kinds(&self) -> Vec<AssetKind> {
        self.engine.kinds()
    }

    async fn search_kind(
        &self,
        query: &str,
        kind: AssetKind,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Asset>, EngineError> {
        self.fetch(RequestParams::new(query).page(page, page_size).kind(kind))
            .await
    }
}

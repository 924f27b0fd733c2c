//! FOFA engine implementation
//!
//! Uses the `/api/v1/search/all` endpoint. Results come back as rows of
//! strings in the order given by the `fields` parameter.

use super::traits::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::results::{join_location, Asset};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

const FIELDS: &str = "host,ip,port,protocol,title,icp,country,province,city";
const COLUMNS: usize = 9;

/// FOFA cyberspace search engine
pub struct Fofa {
    base_url: String,
    email: String,
    key: String,
}

impl Fofa {
    pub fn new() -> Self {
        Self {
            base_url: "https://fofa.info".to_string(),
            email: String::new(),
            key: String::new(),
        }
    }

    fn parse_row(&self, row: &[Value]) -> Option<Asset> {
        if row.len() < COLUMNS {
            return None;
        }
        let col = |i: usize| row[i].as_str().unwrap_or_default();

        let mut asset = Asset::new(self.name())
            .with_domain(col(0))
            .with_ip(col(1))
            .with_service(col(3))
            .with_title(col(4));
        asset.port = col(2).trim().parse().ok();
        asset.icp_org = crate::results::non_empty(col(5).to_string());
        asset.location = join_location([col(6), col(7), col(8)], " ");
        Some(asset)
    }
}

impl Default for Fofa {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Fofa {
    fn name(&self) -> &str {
        "fofa"
    }

    fn request(&self, params: &RequestParams) -> Result<EngineRequest, EngineError> {
        Ok(EngineRequest::get(format!("{}/api/v1/search/all", self.base_url))
            .param("email", &self.email)
            .param("key", &self.key)
            .param("qbase64", STANDARD.encode(params.query.as_bytes()))
            .param("page", params.page)
            .param("size", params.page_size)
            .param("fields", FIELDS))
    }

    fn response(
        &self,
        _params: &RequestParams,
        response: EngineResponse,
    ) -> Result<Vec<Asset>, EngineError> {
        response.error_for_status()?;
        let json: Value = response.json()?;

        if json.get("error").and_then(Value::as_bool).unwrap_or(false) {
            let message = json
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(EngineError::Api(message.to_string()));
        }

        let rows = json
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(rows
            .iter()
            .filter_map(Value::as_array)
            .filter_map(|row| self.parse_row(row))
            .collect())
    }

    fn init(&mut self, config: &EngineConfig) -> anyhow::Result<()> {
        if let Some(url) = &config.base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self.key = config.api_key().unwrap_or_default().to_string();
        self.email = config.email.clone().unwrap_or_default();
        Ok(())
    }

    fn validate(&self, _config: &EngineConfig) -> anyhow::Result<()> {
        if self.key.is_empty() || self.email.trim().is_empty() {
            anyhow::bail!("fofa requires both email and api_key");
        }
        Ok(())
    }
}

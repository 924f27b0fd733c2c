//! Quake (360) engine implementation

use super::fields::{string_at, u16_at};
use super::traits::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::results::{join_location, Asset};
use serde_json::{json, Value};

/// Quake service search engine
pub struct Quake {
    base_url: String,
    token: String,
}

impl Quake {
    pub fn new() -> Self {
        Self {
            base_url: "https://quake.360.net".to_string(),
            token: String::new(),
        }
    }

    fn parse_item(&self, item: &Value) -> Asset {
        let mut asset = Asset::new(self.name());
        asset.ip = string_at(item, "ip");
        asset.domain = string_at(item, "domain");
        asset.port = u16_at(item, "port");
        asset.updated_at = string_at(item, "time");

        if let Some(service) = item.get("service") {
            asset.service = string_at(service, "name");
            if let Some(http) = service.get("http") {
                asset.title = string_at(http, "title");
                asset.status_code = u16_at(http, "status_code");
            }
        }

        if let Some(location) = item.get("location") {
            let parts = ["country_cn", "province_cn", "city_cn"]
                .map(|key| location.get(key).and_then(Value::as_str).unwrap_or_default());
            asset.location = join_location(parts, " ");
        }
        asset
    }
}

impl Default for Quake {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Quake {
    fn name(&self) -> &str {
        "quake"
    }

    fn request(&self, params: &RequestParams) -> Result<EngineRequest, EngineError> {
        let start = params.page.saturating_sub(1).saturating_mul(params.page_size);
        Ok(
            EngineRequest::post(format!("{}/api/v3/search/quake_service", self.base_url))
                .header("X-QuakeToken", &self.token)
                .json(json!({
                    "query": params.query,
                    "start": start,
                    "size": params.page_size,
                })),
        )
    }

    fn response(
        &self,
        _params: &RequestParams,
        response: EngineResponse,
    ) -> Result<Vec<Asset>, EngineError> {
        response.error_for_status()?;
        let json: Value = response.json()?;

        // Error codes are numeric or strings such as "q3005"
        let code = json.get("code").cloned().unwrap_or(Value::from(0));
        if code != 0 {
            let code = code.as_str().map(str::to_string).unwrap_or_else(|| code.to_string());
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(EngineError::Api(format!("[{}] {}", code, message)));
        }

        let items = json
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter(|item| item.is_object())
            .map(|item| self.parse_item(item))
            .collect())
    }

    fn init(&mut self, config: &EngineConfig) -> anyhow::Result<()> {
        if let Some(url) = &config.base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self.token = config.api_key().unwrap_or_default().to_string();
        Ok(())
    }

    fn validate(&self, _config: &EngineConfig) -> anyhow::Result<()> {
        if self.token.is_empty() {
            anyhow::bail!("quake requires an api_key");
        }
        Ok(())
    }
}

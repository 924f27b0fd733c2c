//! Hunter (Qianxin) engine implementation

use super::fields::{string_at, u16_at};
use super::traits::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::results::{join_location, Asset};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde_json::Value;

/// Hunter cyberspace search engine
pub struct Hunter {
    base_url: String,
    api_key: String,
}

impl Hunter {
    pub fn new() -> Self {
        Self {
            base_url: "https://hunter.qianxin.com".to_string(),
            api_key: String::new(),
        }
    }

    fn parse_item(&self, item: &Value) -> Asset {
        let mut asset = Asset::new(self.name());
        asset.ip = string_at(item, "ip");
        asset.domain = string_at(item, "domain");
        asset.port = u16_at(item, "port");
        asset.service = string_at(item, "protocol");
        asset.title = string_at(item, "web_title");
        asset.status_code = u16_at(item, "status_code");
        asset.icp_org = item.get("icp").and_then(|icp| string_at(icp, "name"));
        asset.updated_at = string_at(item, "updated_at");

        let location = ["country", "province", "city"].map(|key| {
            item.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
        });
        asset.location = join_location(location, " ");
        asset
    }
}

impl Default for Hunter {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Hunter {
    fn name(&self) -> &str {
        "hunter"
    }

    fn request(&self, params: &RequestParams) -> Result<EngineRequest, EngineError> {
        Ok(EngineRequest::get(format!("{}/openApi/search", self.base_url))
            .param("api-key", &self.api_key)
            .param("search", URL_SAFE.encode(params.query.as_bytes()))
            .param("page", params.page)
            .param("page_size", params.page_size))
    }

    fn response(
        &self,
        _params: &RequestParams,
        response: EngineResponse,
    ) -> Result<Vec<Asset>, EngineError> {
        response.error_for_status()?;
        let json: Value = response.json()?;

        let code = json.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 200 {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(match code {
                401 | 403 => EngineError::PermissionDenied(message),
                429 => EngineError::RateLimited(message),
                _ => EngineError::Api(message),
            });
        }

        // `data.arr` is null when the query matched nothing
        let items = json
            .get("data")
            .and_then(|d| d.get("arr"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(items.iter().map(|item| self.parse_item(item)).collect())
    }

    fn init(&mut self, config: &EngineConfig) -> anyhow::Result<()> {
        if let Some(url) = &config.base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self.api_key = config.api_key().unwrap_or_default().to_string();
        Ok(())
    }

    fn validate(&self, _config: &EngineConfig) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("hunter requires an api_key");
        }
        Ok(())
    }
}

//! 0.zone company intelligence engine
//!
//! One endpoint per asset subtype (`/api/data/{type}`). Records are loosely
//! typed: `domain` and `company` may be a string or an array, and numbers
//! sometimes arrive as strings.

use super::fields::{str_at, string_at, text_at, u16_at};
use super::traits::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::ratelimit::{ErrorClass, ErrorClassifier};
use crate::results::{join_location, Asset, AssetKind};
use serde_json::{json, Value};

/// 0.zone engine
pub struct Zone {
    base_url: String,
    key: String,
    classifier: ErrorClassifier,
}

impl Zone {
    pub fn new() -> Self {
        Self {
            base_url: "https://0.zone".to_string(),
            key: String::new(),
            classifier: ErrorClassifier::default(),
        }
    }

    /// Data type name used in the endpoint path and request body
    fn data_type(kind: AssetKind) -> &'static str {
        match kind {
            AssetKind::App => "apk",
            other => other.as_str(),
        }
    }

    fn api_error(&self, message: String) -> EngineError {
        let err = EngineError::Api(message);
        match self.classifier.classify(&err) {
            ErrorClass::Permission => EngineError::PermissionDenied(err_message(err)),
            ErrorClass::RateLimit => EngineError::RateLimited(err_message(err)),
            _ => err,
        }
    }

    fn parse_item(&self, kind: AssetKind, item: &Value) -> Asset {
        let mut asset = Asset::new(self.name());
        asset.updated_at = string_at(item, "timestamp");
        asset.icp_org = string_at(item, "company");

        match kind {
            AssetKind::Site => {
                asset.ip = string_at(item, "ip");
                asset.port = u16_at(item, "port");
                asset.title = string_at(item, "title");
                asset.status_code = u16_at(item, "status_code");
                asset.service = join_location(
                    [
                        str_at(item, "service").unwrap_or_default(),
                        str_at(item, "component").unwrap_or_default(),
                    ],
                    "/",
                );
                asset.domain = str_at(item, "url")
                    .and_then(|u| url::Url::parse(u).ok())
                    .and_then(|u| u.host_str().map(str::to_string));
                asset.location = location(item);
            }
            AssetKind::Domain => {
                asset.domain = string_at(item, "domain");
                asset.registrar = string_at(item, "registrar");
                asset.register_time = string_at(item, "register_time");
                asset.expire_time = string_at(item, "expire_time");
                asset.status = text_at(item, "status");
                asset.location = location(item);
            }
            AssetKind::App => {
                asset.title = string_at(item, "name");
                asset.package = string_at(item, "package");
                asset.version = text_at(item, "version");
                asset.platform = string_at(item, "platform");
                asset.size = text_at(item, "size");
                asset.developer = string_at(item, "developer");
                asset.category = string_at(item, "category");
            }
            AssetKind::Email => {
                asset.email = string_at(item, "email");
                asset.url = string_at(item, "source");
            }
            AssetKind::Code => {
                asset.title = string_at(item, "title");
                asset.url = string_at(item, "url");
                asset.language = string_at(item, "language");
            }
            AssetKind::Member => {
                asset.name = string_at(item, "name");
                asset.position = string_at(item, "position");
                asset.department = string_at(item, "department");
            }
        }
        asset
    }
}

fn location(item: &Value) -> Option<String> {
    let parts = ["country", "province", "city"].map(|key| str_at(item, key).unwrap_or_default());
    join_location(parts, "/")
}

fn err_message(err: EngineError) -> String {
    match err {
        EngineError::Api(message) => message,
        other => other.to_string(),
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Zone {
    fn name(&self) -> &str {
        "zone"
    }

    fn kinds(&self) -> Vec<AssetKind> {
        AssetKind::ALL.to_vec()
    }

    fn request(&self, params: &RequestParams) -> Result<EngineRequest, EngineError> {
        let kind = params
            .kind
            .ok_or_else(|| EngineError::Config("zone queries need an asset kind".to_string()))?;
        let data_type = Self::data_type(kind);

        Ok(
            EngineRequest::post(format!("{}/api/data/{}", self.base_url, data_type)).json(json!({
                "query": params.query,
                "query_type": data_type,
                "page": params.page,
                "pagesize": params.page_size,
                "zone_key_id": self.key,
            })),
        )
    }

    fn response(
        &self,
        params: &RequestParams,
        response: EngineResponse,
    ) -> Result<Vec<Asset>, EngineError> {
        response.error_for_status()?;
        let json: Value = response.json()?;

        let code = json.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(self.api_error(message));
        }

        let kind = params.kind.unwrap_or(AssetKind::Site);
        let items = json
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(items
            .iter()
            .map(|item| self.parse_item(kind, item))
            .collect())
    }

    fn init(&mut self, config: &EngineConfig) -> anyhow::Result<()> {
        if let Some(url) = &config.base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self.key = config.api_key().unwrap_or_default().to_string();
        self.classifier = ErrorClassifier::default()
            .with_permission_patterns(config.permission_patterns.iter().cloned())
            .with_rate_limit_patterns(config.rate_limit_patterns.iter().cloned());
        Ok(())
    }

    fn validate(&self, _config: &EngineConfig) -> anyhow::Result<()> {
        if self.key.is_empty() {
            anyhow::bail!("zone requires an api_key");
        }
        Ok(())
    }
}

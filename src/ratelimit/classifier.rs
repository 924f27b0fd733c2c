//! Heuristic classification of backend errors

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// How a backend failure relates to throttling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The backend is throttling us
    RateLimit,
    /// Generic provider-side failure ("try later", malformed payload)
    Api,
    /// The key lacks entitlement for this data
    Permission,
    /// Anything else
    Unrelated,
}

impl ErrorClass {
    /// Whether the limiter should escalate its interval for this class
    pub fn triggers_backoff(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Api)
    }
}

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "too many requests",
    "429",
    "请求太多",
    "请求过于频繁",
];

const PERMISSION_PATTERNS: &[&str] = &["permission", "unauthorized", "无权限", "未授权"];

const API_PATTERNS: &[&str] = &[
    "api error",
    "api错误",
    "cannot unmarshal",
    "try again later",
    "稍后再试",
];

/// Pattern-based classifier.
///
/// Typed [`EngineError`] variants are classified first; the error text is
/// then matched case-insensitively against the pattern lists, checking
/// rate-limit patterns before permission patterns before API patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorClassifier {
    pub rate_limit: Vec<String>,
    pub permission: Vec<String>,
    pub api: Vec<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            rate_limit: to_owned(RATE_LIMIT_PATTERNS),
            permission: to_owned(PERMISSION_PATTERNS),
            api: to_owned(API_PATTERNS),
        }
    }
}

impl ErrorClassifier {
    /// Classifier with no patterns at all; only typed variants match
    pub fn empty() -> Self {
        Self {
            rate_limit: Vec::new(),
            permission: Vec::new(),
            api: Vec::new(),
        }
    }

    /// Add backend-specific throttle phrases
    pub fn with_rate_limit_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rate_limit.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add backend-specific permission phrases
    pub fn with_permission_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permission.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add backend-specific generic API failure phrases
    pub fn with_api_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Classify a backend error
    pub fn classify(&self, err: &EngineError) -> ErrorClass {
        match err {
            EngineError::RateLimited(_) | EngineError::Status { status: 429, .. } => {
                return ErrorClass::RateLimit
            }
            EngineError::PermissionDenied(_)
            | EngineError::Status {
                status: 401 | 403, ..
            } => return ErrorClass::Permission,
            _ => {}
        }

        let text = err.to_string().to_lowercase();
        if matches_any(&text, &self.rate_limit) {
            ErrorClass::RateLimit
        } else if matches_any(&text, &self.permission) {
            ErrorClass::Permission
        } else if matches!(err, EngineError::Api(_) | EngineError::Parse(_))
            || matches_any(&text, &self.api)
        {
            ErrorClass::Api
        } else {
            ErrorClass::Unrelated
        }
    }
}

fn matches_any(text: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| text.contains(&p.to_lowercase()))
}

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

//! Asset and target definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a search target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Ip,
    Domain,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical IP or domain to look up
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub value: String,
    pub kind: TargetKind,
}

impl Target {
    pub fn ip(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: TargetKind::Ip,
        }
    }

    pub fn domain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: TargetKind::Domain,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.kind)
    }
}

/// Asset subtype reported by company intelligence backends.
///
/// Ordering follows the report layout, so a `BTreeMap<AssetKind, _>`
/// iterates sites first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Site,
    Domain,
    App,
    Email,
    Code,
    Member,
}

impl AssetKind {
    pub const ALL: [AssetKind; 6] = [
        Self::Site,
        Self::Domain,
        Self::App,
        Self::Email,
        Self::Code,
        Self::Member,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Domain => "domain",
            Self::App => "app",
            Self::Email => "email",
            Self::Code => "code",
            Self::Member => "member",
        }
    }

    /// Whether a record of this kind carries enough data to be reported
    pub fn accepts(&self, asset: &Asset) -> bool {
        match self {
            Self::Site => asset.ip.is_some() || asset.domain.is_some() || asset.port.is_some(),
            Self::Domain => asset.domain.is_some(),
            Self::App => asset.package.is_some() || asset.title.is_some(),
            Self::Email => asset.email.is_some(),
            Self::Code => asset.url.is_some() || asset.title.is_some(),
            Self::Member => asset.name.is_some(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized discovery record.
///
/// Every field is optional; which ones are populated depends on the
/// backend and on the [`AssetKind`] of the query that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Service name or banner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// ICP filing organization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icp_org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Name of the backend that produced the record
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    // Domain records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    // App records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    // Email, code and member records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl Asset {
    /// Create an empty record attributed to `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = non_empty(ip.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = non_empty(domain.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(title.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = non_empty(service.into());
        self
    }

    /// Placeholder recorded when a company subtype could not be queried,
    /// so reports can tell "no permission" apart from "no data".
    pub fn access_restricted(source: &str, kind: AssetKind, reason: &str) -> Self {
        Self::new(source)
            .with_title(ACCESS_RESTRICTED_TITLE)
            .with_service(format!("no access to {} data: {}", kind, reason))
    }

    /// Whether this record is an access-restricted placeholder
    pub fn is_placeholder(&self) -> bool {
        self.title.as_deref() == Some(ACCESS_RESTRICTED_TITLE)
            && self.ip.is_none()
            && self.domain.is_none()
    }
}

/// Title carried by access-restricted placeholder records
pub const ACCESS_RESTRICTED_TITLE: &str = "API access restricted";

/// `Some(s)` for a non-blank string, `None` otherwise
pub fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

/// Join the non-empty location parts with `sep`
pub fn join_location<'a>(parts: impl IntoIterator<Item = &'a str>, sep: &str) -> Option<String> {
    let parts: Vec<&str> = parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(sep))
    }
}

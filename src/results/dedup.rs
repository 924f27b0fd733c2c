//! Stateless deduplication over a flattened asset list

use super::types::Asset;
use std::collections::HashSet;

/// Identity key of an asset: `ip:port` when both are known, the domain
/// otherwise, and the join of every populated core field as a last resort.
pub fn asset_key(asset: &Asset) -> String {
    if let (Some(ip), Some(port)) = (&asset.ip, asset.port) {
        return format!("{}:{}", ip, port);
    }
    if let Some(domain) = &asset.domain {
        return domain.clone();
    }

    let port = asset.port.map(|p| p.to_string());
    let status = asset.status_code.map(|s| s.to_string());
    [
        asset.ip.as_deref(),
        port.as_deref(),
        asset.service.as_deref(),
        asset.title.as_deref(),
        status.as_deref(),
        asset.icp_org.as_deref(),
        asset.location.as_deref(),
        asset.email.as_deref(),
        asset.name.as_deref(),
        asset.url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("|")
}

/// Drop later duplicates, keeping the first occurrence of every key
pub fn deduplicate(assets: Vec<Asset>) -> Vec<Asset> {
    let mut seen = HashSet::new();
    assets
        .into_iter()
        .filter(|asset| seen.insert(asset_key(asset)))
        .collect()
}

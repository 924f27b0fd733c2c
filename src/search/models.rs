//! Batch outcome types returned by the orchestrators

use crate::error::BatchError;
use crate::results::{Asset, AssetKind};
use std::collections::BTreeMap;

/// Everything a batch produced.
///
/// Partial failure never discards results: `results` holds whatever was
/// collected, `error` lists the targets (or companies) that produced
/// nothing, and `cancelled` tells whether the caller stopped the batch early.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome<T> {
    pub results: T,
    pub error: Option<BatchError>,
    pub cancelled: bool,
}

impl<T> BatchOutcome<T> {
    pub fn new(results: T, error: Option<BatchError>, cancelled: bool) -> Self {
        Self {
            results,
            error,
            cancelled,
        }
    }

    /// Whether every subject succeeded and the batch ran to completion
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.cancelled
    }
}

/// Company intelligence results grouped by asset subtype
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyResults {
    by_kind: BTreeMap<AssetKind, Vec<Asset>>,
}

impl CompanyResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append assets under `kind`
    pub fn extend(&mut self, kind: AssetKind, assets: impl IntoIterator<Item = Asset>) {
        let entry = self.by_kind.entry(kind).or_default();
        entry.extend(assets);
        if entry.is_empty() {
            self.by_kind.remove(&kind);
        }
    }

    /// Move every asset of `other` into `self`
    pub fn merge(&mut self, other: CompanyResults) {
        for (kind, assets) in other.by_kind {
            self.extend(kind, assets);
        }
    }

    /// Assets of one subtype (empty when none were found)
    pub fn get(&self, kind: AssetKind) -> &[Asset] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Subtypes with at least one asset, in report order
    pub fn kinds(&self) -> impl Iterator<Item = AssetKind> + '_ {
        self.by_kind.keys().copied()
    }

    /// Total number of assets over all subtypes
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(subtype, assets)` in report order
    pub fn iter(&self) -> impl Iterator<Item = (AssetKind, &[Asset])> {
        self.by_kind.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// All assets in subtype order
    pub fn flatten(self) -> Vec<Asset> {
        self.by_kind.into_values().flatten().collect()
    }
}

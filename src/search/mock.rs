//! Scripted backends for orchestrator tests

use crate::engines::{Backend, CompanyBackend};
use crate::error::EngineError;
use crate::results::{Asset, AssetKind};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted answer for one page number
#[derive(Debug, Clone)]
pub(crate) enum Page {
    Assets(usize),
    Fail(EngineError),
    /// Records carrying no usable field
    Incomplete(usize),
    /// The backend panics mid-request
    Panic,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub query: String,
    pub kind: Option<AssetKind>,
    pub page: u32,
}

/// Answers every query with the same page script; pages past the end of
/// the script are empty.
pub(crate) struct MockBackend {
    name: String,
    pages: Vec<Page>,
    kinds: Vec<AssetKind>,
    failing_kinds: Vec<AssetKind>,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn new(name: &str, pages: Vec<Page>) -> Self {
        Self {
            name: name.to_string(),
            pages,
            kinds: Vec::new(),
            failing_kinds: Vec::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_kinds(mut self, kinds: &[AssetKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Subtypes answered with a permission error
    pub fn with_failing_kinds(mut self, kinds: &[AssetKind]) -> Self {
        self.failing_kinds = kinds.to_vec();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        query: &str,
        kind: Option<AssetKind>,
        page: u32,
    ) -> Result<Vec<Asset>, EngineError> {
        self.calls.lock().unwrap().push(Call {
            query: query.to_string(),
            kind,
            page,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if kind.is_some_and(|k| self.failing_kinds.contains(&k)) {
            return Err(EngineError::PermissionDenied("无权限".to_string()));
        }

        match self.pages.get(page as usize - 1) {
            None => Ok(Vec::new()),
            Some(Page::Fail(err)) => Err(err.clone()),
            Some(Page::Incomplete(n)) => Ok(vec![Asset::new(&self.name); *n]),
            Some(Page::Panic) => panic!("{} crashed on page {}", self.name, page),
            Some(Page::Assets(n)) => Ok((0..*n)
                .map(|i| {
                    let mut asset = Asset::new(&self.name)
                        .with_domain(format!("{}#{}#{}", query, page, i));
                    if let Some(kind) = kind {
                        asset.email = Some(format!("{}@{}", i, kind));
                        asset.name = Some(kind.to_string());
                    }
                    asset
                })
                .collect()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        _page_size: u32,
    ) -> Result<Vec<Asset>, EngineError> {
        self.answer(query, None, page).await
    }
}

#[async_trait]
impl CompanyBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kinds(&self) -> Vec<AssetKind> {
        self.kinds.clone()
    }

    async fn search_kind(
        &self,
        query: &str,
        kind: AssetKind,
        page: u32,
        _page_size: u32,
    ) -> Result<Vec<Asset>, EngineError> {
        self.answer(query, Some(kind), page).await
    }
}

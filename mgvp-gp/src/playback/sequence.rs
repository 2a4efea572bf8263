//! Validated item sequences and the sequence provider
//!
//! A sequence is fetched once per scan and never re-fetched during playback.

use crate::error::{Error, Result};
use async_trait::async_trait;
use mgvp_common::api::{SequenceResponse, SequencedMediaItem};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Ordered, gap-free list of playable items
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    items: Vec<SequencedMediaItem>,
}

impl Sequence {
    /// Sort by `order` and validate
    ///
    /// Fails with [`Error::EmptySequence`] for no items and
    /// [`Error::InvalidSequence`] for duplicate or non-contiguous orders,
    /// repeated item ids or unusable durations. Ids must be unique because
    /// player feedback is matched to the current item by id alone.
    /// A playlist that repeats media must give each entry its own id.
    pub fn new(mut items: Vec<SequencedMediaItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::EmptySequence);
        }

        items.sort_by_key(|item| item.order);

        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(Error::InvalidSequence(format!(
                    "item {} appears more than once",
                    item.id
                )));
            }
            if !item.duration_seconds.is_finite() || item.duration_seconds < 0.0 {
                return Err(Error::InvalidSequence(format!(
                    "item {} has invalid duration {}",
                    item.id, item.duration_seconds
                )));
            }
        }

        for pair in items.windows(2) {
            if pair[1].order != pair[0].order + 1 {
                return Err(Error::InvalidSequence(format!(
                    "orders must be unique and contiguous (found {} then {})",
                    pair[0].order, pair[1].order
                )));
            }
        }

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SequencedMediaItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[SequencedMediaItem] {
        &self.items
    }
}

/// Source of sequences for a scanned token
#[async_trait]
pub trait SequenceProvider: Send + Sync {
    async fn fetch(&self, token: &str) -> Result<Vec<SequencedMediaItem>>;
}

/// Sequence provider over HTTP (`GET {base}/sequences/{token}`)
#[derive(Debug, Clone)]
pub struct HttpSequenceProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSequenceProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SequenceProvider for HttpSequenceProvider {
    async fn fetch(&self, token: &str) -> Result<Vec<SequencedMediaItem>> {
        let url = format!("{}/sequences/{}", self.base_url, token);
        debug!("Fetching sequence from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("no sequence for token {}", token)));
        }
        if !status.is_success() {
            return Err(Error::Network(format!(
                "sequence provider returned {}",
                status
            )));
        }

        let body: SequenceResponse = response.json().await?;
        info!("Sequence for token {} has {} items", token, body.items.len());
        Ok(body.items)
    }
}

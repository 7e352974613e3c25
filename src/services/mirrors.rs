// src/services/mirrors.rs

//! Mirror selection with ordered failover.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;

/// A feed document and the mirror that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    pub mirror: String,
    pub body: String,
}

/// Source of raw feed documents for an account.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the account's feed, or `None` when no source answered.
    async fn fetch(&self, account: &str) -> Option<FetchedFeed>;
}

/// Probes mirrors in configured order and keeps the first usable answer.
pub struct MirrorSelector {
    client: Client,
    mirrors: Vec<String>,
}

impl MirrorSelector {
    /// Create a selector over mirror base URLs, highest priority first.
    pub fn new(client: Client, mirrors: Vec<String>) -> Self {
        Self { client, mirrors }
    }

    /// Feed URL for an account on one mirror.
    pub fn feed_url(base: &str, account: &str) -> String {
        format!("{}/{}/rss", base.trim_end_matches('/'), account)
    }

    /// Try each mirror once, in order.
    ///
    /// Returns the first body that came with a success status and is not
    /// blank. Mirrors after that one are never contacted.
    pub async fn select(&self, account: &str) -> Option<FetchedFeed> {
        for mirror in &self.mirrors {
            let url = Self::feed_url(mirror, account);
            match self.probe(&url).await {
                Ok(Some(body)) => {
                    log::debug!("Fetched @{} from {}", account, mirror);
                    return Some(FetchedFeed {
                        mirror: mirror.clone(),
                        body,
                    });
                }
                Ok(None) => log::debug!("Mirror {} gave no usable feed for @{}", mirror, account),
                Err(e) => log::debug!("Mirror {} failed for @{}: {}", mirror, account, e),
            }
        }
        None
    }

    async fn probe(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            log::debug!("{} answered {}", url, response.status());
            return Ok(None);
        }
        let body = response.text().await?;
        Ok(Some(body).filter(|b| !b.trim().is_empty()))
    }
}

#[async_trait]
impl FeedFetcher for MirrorSelector {
    async fn fetch(&self, account: &str) -> Option<FetchedFeed> {
        self.select(account).await
    }
}

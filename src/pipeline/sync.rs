// src/pipeline/sync.rs

//! One sync pass over every tracked account.
//!
//! Per account: fetch → filter → deliver → advance. Delivery stops at the
//! first failure so the watermark only ever covers a contiguous run of
//! confirmed entries; the next pass retries from there.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::models::{CheckpointState, DeliveryOutcome, FirstRunPolicy};
use crate::pipeline::filter_new;
use crate::services::{FeedFetcher, Notifier, feed};
use crate::storage::CheckpointStore;

/// What happened to one account during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    /// No mirror answered, or the document held no entries
    Unreachable,
    /// Nothing newer than the watermark
    UpToDate,
    /// First sync under the baseline policy: nothing sent, starting point recorded
    Baselined { newest: u64 },
    /// Delivery was attempted
    Synced {
        deliveries: Vec<DeliveryOutcome>,
        /// Newest identifier confirmed delivered in this pass
        confirmed: Option<u64>,
    },
}

/// Per-account result handed back to the pass loop.
#[derive(Debug, Clone)]
pub struct AccountReport {
    pub account: String,
    pub previous: Option<u64>,
    pub outcome: AccountOutcome,
}

impl AccountReport {
    /// Identifier the watermark may move to.
    pub fn advance_to(&self) -> Option<u64> {
        match &self.outcome {
            AccountOutcome::Baselined { newest } => Some(*newest),
            AccountOutcome::Synced { confirmed, .. } => *confirmed,
            _ => None,
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub accounts: usize,
    pub unreachable: usize,
    pub up_to_date: usize,
    pub delivered: usize,
    pub failed: usize,
    pub checkpoints_saved: usize,
    pub checkpoint_errors: usize,
}

impl PassStats {
    fn new(accounts: usize) -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            accounts,
            unreachable: 0,
            up_to_date: 0,
            delivered: 0,
            failed: 0,
            checkpoints_saved: 0,
            checkpoint_errors: 0,
        }
    }
}

/// Drives fetch, filter, delivery and checkpointing.
pub struct SyncEngine {
    fetcher: Arc<dyn FeedFetcher>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn CheckpointStore>,
    first_run: FirstRunPolicy,
    max_concurrent: usize,
}

impl SyncEngine {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            store,
            first_run: FirstRunPolicy::default(),
            max_concurrent: 1,
        }
    }

    pub fn with_first_run(mut self, policy: FirstRunPolicy) -> Self {
        self.first_run = policy;
        self
    }

    /// Number of accounts worked on at the same time (at least 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Load the checkpoint this engine will advance.
    pub async fn load_state(&self) -> CheckpointState {
        self.store.load().await
    }

    /// Run one pass. `state` is updated in place and saved after every
    /// account whose watermark moved.
    ///
    /// A handle listed more than once is processed once.
    pub async fn run_pass(&self, accounts: &[String], state: &mut CheckpointState) -> PassStats {
        let mut seen = HashSet::new();
        let jobs: Vec<(String, Option<u64>)> = accounts
            .iter()
            .filter(|account| seen.insert(*account))
            .map(|account| (account.clone(), state.last_id(account)))
            .collect();
        if jobs.len() < accounts.len() {
            log::debug!("Skipping {} repeated handles", accounts.len() - jobs.len());
        }

        let mut stats = PassStats::new(jobs.len());

        if let Some(problem) = self.notifier.misconfiguration() {
            log::warn!("{}", problem);
        }

        let mut reports = stream::iter(jobs)
            .map(|(account, previous)| self.sync_account(account, previous))
            .buffer_unordered(self.max_concurrent);

        while let Some(report) = reports.next().await {
            match &report.outcome {
                AccountOutcome::Unreachable => stats.unreachable += 1,
                AccountOutcome::UpToDate => stats.up_to_date += 1,
                AccountOutcome::Baselined { .. } => {}
                AccountOutcome::Synced { deliveries, .. } => {
                    stats.delivered += deliveries.iter().filter(|d| d.delivered).count();
                    stats.failed += deliveries.iter().filter(|d| !d.delivered).count();
                }
            }

            let Some(id) = report.advance_to() else {
                continue;
            };
            if !state.advance(&report.account, id) {
                continue;
            }

            log::info!(
                "Watermark for @{}: {:?} -> {}",
                report.account,
                report.previous,
                id
            );
            match self.store.save(state).await {
                Ok(()) => stats.checkpoints_saved += 1,
                Err(e) => {
                    stats.checkpoint_errors += 1;
                    log::error!("Failed to save checkpoint after @{}: {}", report.account, e);
                }
            }
        }

        stats.end_time = Utc::now();
        log::info!(
            "Pass complete: {} accounts, {} delivered, {} failed, {} unreachable",
            stats.accounts,
            stats.delivered,
            stats.failed,
            stats.unreachable
        );
        stats
    }

    /// Process one account against its current watermark.
    pub async fn sync_account(&self, account: String, previous: Option<u64>) -> AccountReport {
        let report = |outcome: AccountOutcome| AccountReport {
            account: account.clone(),
            previous,
            outcome,
        };

        // Fetching
        let Some(fetched) = self.fetcher.fetch(&account).await else {
            log::info!("No items fetched for @{}", account);
            return report(AccountOutcome::Unreachable);
        };
        let entries = feed::normalize(&fetched.body);
        if entries.is_empty() {
            log::info!("No items in feed for @{} from {}", account, fetched.mirror);
            return report(AccountOutcome::Unreachable);
        }

        // Filtering
        let fresh = filter_new(entries, previous);
        let Some(newest) = fresh.last().map(|e| e.id) else {
            log::info!("No new posts for @{}", account);
            return report(AccountOutcome::UpToDate);
        };

        if previous.is_none() && self.first_run == FirstRunPolicy::Baseline {
            log::info!(
                "First sync for @{}: recording {} as baseline, {} posts skipped",
                account,
                newest,
                fresh.len()
            );
            return report(AccountOutcome::Baselined { newest });
        }

        // Delivering, stopping at the first failure
        let mut deliveries = Vec::with_capacity(fresh.len());
        let mut confirmed = None;
        for entry in &fresh {
            let delivered = self.notifier.deliver(&account, entry).await;
            deliveries.push(DeliveryOutcome {
                id: entry.id,
                delivered,
            });

            if !delivered {
                log::warn!("Push failed for @{} {}", account, entry.id);
                let remaining = fresh.len() - deliveries.len();
                if remaining > 0 {
                    log::info!("Deferring {} later posts for @{}", remaining, account);
                }
                break;
            }
            log::info!("Sent @{} {}", account, entry.id);
            confirmed = Some(entry.id);
        }

        // Advancing is decided by the pass loop
        report(AccountOutcome::Synced {
            deliveries,
            confirmed,
        })
    }
}

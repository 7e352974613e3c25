//! Service layer for the relay.
//!
//! This module contains the components each account passes through:
//! - Mirror selection with failover (`MirrorSelector`)
//! - Feed parsing and normalization (`feed`)
//! - Title translation (`Translator`)
//! - Notification delivery (`Dispatcher`)

mod dispatch;
pub mod feed;
mod mirrors;
mod translate;

pub use dispatch::{Channel, Dispatcher, Message, Notifier};
pub use mirrors::{FeedFetcher, FetchedFeed, MirrorSelector};
pub use translate::{Glossary, Translator};

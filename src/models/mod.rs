// src/models/mod.rs

//! Domain models for the relay.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod checkpoint;
mod config;
mod entry;

// Re-export all public types
pub use checkpoint::{CheckpointState, Watermark};
pub use config::{
    Config, FROM_ENV, FirstRunPolicy, HttpConfig, PushConfig, PushMethod, Replacement,
    TranslationConfig,
};
pub use entry::{DeliveryOutcome, Entry, FeedItem, NewEntry, parse_pub_date};

// src/lib.rs

//! tweetrelay library
//!
//! Polls Nitter RSS mirrors for tracked accounts and relays each new post
//! once to a notification channel, keeping a per-account watermark.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

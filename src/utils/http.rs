// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create the shared asynchronous HTTP client.
///
/// The timeout bounds every mirror probe and every delivery. TLS
/// verification is only relaxed when `accept_invalid_certs` is set.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    if config.accept_invalid_certs {
        log::warn!("TLS certificate verification is disabled (http.accept_invalid_certs)");
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;
    Ok(client)
}

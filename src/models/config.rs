//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Sentinel value meaning "read this secret from the environment".
pub const FROM_ENV: &str = "FROM_ENV";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account handles to relay
    #[serde(default, alias = "users")]
    pub accounts: Vec<String>,

    /// Mirror base URLs, tried in order
    #[serde(default = "defaults::mirrors", alias = "nitter_instances")]
    pub mirrors: Vec<String>,

    /// Seconds between passes in daemon mode
    #[serde(default = "defaults::interval", alias = "interval_seconds")]
    pub interval_secs: u64,

    /// Checkpoint file location
    #[serde(default = "defaults::state_file")]
    pub state_file: String,

    /// What to do with an account that has never been synced
    #[serde(default)]
    pub first_run: FirstRunPolicy,

    /// Accounts processed at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Notification channel settings
    #[serde(default)]
    pub push: PushConfig,

    /// Title translation settings
    #[serde(default)]
    pub translation: TranslationConfig,
}

impl Config {
    /// Load configuration from a TOML file, or JSON when the path ends in `.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.accounts.iter().all(|a| a.trim().is_empty()) {
            return Err(AppError::validation("No accounts configured"));
        }
        if self.mirrors.is_empty() {
            return Err(AppError::validation("No mirrors configured"));
        }
        for mirror in &self.mirrors {
            url::Url::parse(mirror).map_err(|e| AppError::url(mirror.as_str(), e))?;
        }
        if self.interval_secs == 0 {
            return Err(AppError::validation("interval_secs must be > 0"));
        }
        if self.max_concurrent == 0 {
            return Err(AppError::validation("max_concurrent must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if !self.push.link_template.contains("{id}") {
            return Err(AppError::validation(
                "push.link_template must contain {id}",
            ));
        }
        Ok(())
    }

    /// Configured accounts, trimmed, without blanks or repeats, in configured order.
    pub fn unique_accounts(&self) -> Vec<String> {
        let mut accounts: Vec<String> = Vec::with_capacity(self.accounts.len());
        for account in &self.accounts {
            let account = account.trim().trim_start_matches('@');
            if !account.is_empty() && !accounts.iter().any(|a| a == account) {
                accounts.push(account.to_string());
            }
        }
        accounts
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            mirrors: defaults::mirrors(),
            interval_secs: defaults::interval(),
            state_file: defaults::state_file(),
            first_run: FirstRunPolicy::default(),
            max_concurrent: defaults::max_concurrent(),
            http: HttpConfig::default(),
            push: PushConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

/// Handling of accounts without a watermark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstRunPolicy {
    /// Deliver every entry currently in the feed, oldest first.
    #[default]
    DeliverAll,
    /// Deliver nothing; record the newest identifier as the starting point.
    Baseline,
}

/// HTTP client settings shared by mirror probing and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate and hostname verification.
    ///
    /// Some community mirrors run with broken certificates. Turning this on
    /// also disables verification for the notification channel.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            accept_invalid_certs: false,
        }
    }
}

/// Supported notification channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushMethod {
    /// WeCom (WeChat Work) group robot webhook
    #[default]
    Wecom,
    /// ServerChan (sct.ftqq.com)
    Serverchan,
}

/// Notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub method: PushMethod,

    /// WeCom robot webhook URL
    #[serde(default)]
    pub wecom_webhook: Option<String>,

    /// ServerChan send key
    #[serde(default)]
    pub serverchan_sendkey: Option<String>,

    /// ServerChan API base URL
    #[serde(default = "defaults::serverchan_endpoint")]
    pub serverchan_endpoint: String,

    /// Canonical link, `{account}` and `{id}` are substituted
    #[serde(default = "defaults::link_template")]
    pub link_template: String,
}

impl PushConfig {
    /// Resolve the WeCom webhook from config or `WECOM_WEBHOOK`.
    pub fn wecom_webhook(&self) -> Result<Option<String>> {
        resolve_secret(self.wecom_webhook.as_deref(), "WECOM_WEBHOOK")
    }

    /// Resolve the ServerChan key from config or `SERVERCHAN_SENDKEY`.
    pub fn serverchan_sendkey(&self) -> Result<Option<String>> {
        resolve_secret(self.serverchan_sendkey.as_deref(), "SERVERCHAN_SENDKEY")
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            method: PushMethod::default(),
            wecom_webhook: None,
            serverchan_sendkey: None,
            serverchan_endpoint: defaults::serverchan_endpoint(),
            link_template: defaults::link_template(),
        }
    }
}

/// Pick a secret from config, falling back to the environment.
///
/// A configured value of [`FROM_ENV`] makes the environment variable mandatory.
fn resolve_secret(configured: Option<&str>, env_key: &str) -> Result<Option<String>> {
    let from_env = || {
        std::env::var(env_key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    match configured.map(str::trim).filter(|v| !v.is_empty()) {
        Some(FROM_ENV) => from_env().map(Some).ok_or_else(|| {
            AppError::config(format!("{env_key} environment variable not set"))
        }),
        Some(value) => Ok(Some(value.to_string())),
        None => Ok(from_env()),
    }
}

/// Title translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Glossary TOML; the built-in table is used when unset
    #[serde(default)]
    pub glossary_file: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            glossary_file: None,
        }
    }
}

/// A text replacement rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

mod defaults {
    pub fn mirrors() -> Vec<String> {
        vec![
            "https://nitter.net".into(),
            "https://nitter.poast.org".into(),
            "https://nitter.privacydev.net".into(),
            "https://n.ramle.be".into(),
        ]
    }
    pub fn interval() -> u64 {
        600
    }
    pub fn state_file() -> String {
        "state.json".into()
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/118.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        15
    }

    // Push defaults
    pub fn serverchan_endpoint() -> String {
        "https://sctapi.ftqq.com".into()
    }
    pub fn link_template() -> String {
        "https://x.com/{account}/status/{id}".into()
    }

    pub fn enabled() -> bool {
        true
    }
}

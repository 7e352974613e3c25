// src/services/dispatch.rs

//! Notification rendering and delivery.
//!
//! Every entry goes to exactly one channel. Failures of any kind are
//! reported as `false`; nothing propagates past [`Notifier::deliver`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::models::{NewEntry, PushConfig, PushMethod};
use crate::services::Translator;
use crate::utils::{canonical_link, truncate_graphemes};

/// WeCom rejects longer text messages.
const WECOM_MAX_CHARS: usize = 4096;

/// Sink for new entries.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one entry. `true` means the channel confirmed acceptance.
    async fn deliver(&self, account: &str, entry: &NewEntry) -> bool;

    /// Reason every delivery is going to fail, if one is known up front.
    fn misconfiguration(&self) -> Option<String> {
        None
    }
}

/// The configured notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// WeCom group robot webhook
    WeCom { webhook: String },
    /// ServerChan push
    ServerChan { endpoint: String, sendkey: String },
    /// Method selected but its credential is missing
    Unconfigured { method: PushMethod },
}

impl Channel {
    /// Resolve the channel and its credential from configuration.
    pub fn from_config(config: &PushConfig) -> Result<Self> {
        let channel = match config.method {
            PushMethod::Wecom => match config.wecom_webhook()? {
                Some(webhook) => Self::WeCom { webhook },
                None => Self::Unconfigured {
                    method: config.method,
                },
            },
            PushMethod::Serverchan => match config.serverchan_sendkey()? {
                Some(sendkey) => Self::ServerChan {
                    endpoint: config.serverchan_endpoint.trim_end_matches('/').to_string(),
                    sendkey,
                },
                None => Self::Unconfigured {
                    method: config.method,
                },
            },
        };
        Ok(channel)
    }

    /// Build the submission request, or `None` when there is nowhere to send.
    fn request(&self, client: &Client, account: &str, message: &Message) -> Option<RequestBuilder> {
        match self {
            Self::WeCom { webhook } => {
                let payload = json!({
                    "msgtype": "text",
                    "text": { "content": truncate_graphemes(&message.text, WECOM_MAX_CHARS) },
                });
                Some(client.post(webhook).json(&payload))
            }
            Self::ServerChan { endpoint, sendkey } => {
                let title = format!("@{account} 最新推文");
                let desp = format!("{}\n\n{}", message.text, message.link);
                let form = [("title", title.as_str()), ("desp", desp.as_str())];
                Some(client.post(format!("{endpoint}/{sendkey}.send")).form(&form))
            }
            Self::Unconfigured { .. } => None,
        }
    }

    /// Both the HTTP status and the provider's own result code must report success.
    fn accepted(&self, status: StatusCode, body: &str) -> bool {
        if !status.is_success() {
            return false;
        }
        match self {
            Self::WeCom { .. } => serde_json::from_str::<WeComReply>(body)
                .is_ok_and(|reply| reply.errcode == Some(0)),
            Self::ServerChan { .. } => serde_json::from_str::<ServerChanReply>(body)
                .is_ok_and(|reply| reply.code == Some(0)),
            Self::Unconfigured { .. } => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeComReply {
    errcode: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ServerChanReply {
    code: Option<i64>,
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    /// Canonical link to the origin service
    pub link: String,
}

/// Renders entries and submits them to the configured channel.
pub struct Dispatcher {
    client: Client,
    channel: Channel,
    translator: Translator,
    link_template: String,
}

impl Dispatcher {
    pub fn new(
        client: Client,
        channel: Channel,
        translator: Translator,
        link_template: impl Into<String>,
    ) -> Self {
        Self {
            client,
            channel,
            translator,
            link_template: link_template.into(),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Render the notification text for an entry.
    pub fn render(&self, account: &str, entry: &NewEntry) -> Message {
        let link = canonical_link(&self.link_template, account, entry.id);
        let title = &entry.entry.title;
        let translated = self.translator.translate(title);

        let text = if translated != *title && !translated.trim().is_empty() {
            format!("@{account}:\n{translated}\n\n原文: {title}\n{link}")
        } else {
            format!("@{account}: {title}\n{link}")
        };

        Message { text, link }
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    async fn deliver(&self, account: &str, entry: &NewEntry) -> bool {
        let message = self.render(account, entry);
        let Some(request) = self.channel.request(&self.client, account, &message) else {
            return false;
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Push for @{} {} failed: {}", account, entry.id, e);
                return false;
            }
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Push for @{} {} returned unreadable body: {}", account, entry.id, e);
                return false;
            }
        };

        let accepted = self.channel.accepted(status, &body);
        if !accepted {
            log::warn!(
                "Push for @{} {} rejected ({}): {}",
                account,
                entry.id,
                status,
                truncate_graphemes(&body, 200)
            );
        }
        accepted
    }

    fn misconfiguration(&self) -> Option<String> {
        match &self.channel {
            Channel::Unconfigured { method: PushMethod::Wecom } => {
                Some("WeCom webhook not configured; notifications will fail".to_string())
            }
            Channel::Unconfigured { method: PushMethod::Serverchan } => {
                Some("ServerChan sendkey not configured; notifications will fail".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::models::{Entry, HttpConfig};
    use crate::services::{Glossary, Translator};
    use crate::utils::http::create_client;

    const TEMPLATE: &str = "https://x.com/{account}/status/{id}";

    fn new_entry(id: u64, title: &str) -> NewEntry {
        NewEntry {
            id,
            entry: Entry {
                id: Some(id),
                title: title.to_string(),
                link: format!("https://nitter.example/jack/status/{id}#m"),
                published_at: String::new(),
                published: None,
            },
        }
    }

    fn dispatcher(channel: Channel, translator: Translator) -> Dispatcher {
        let client = create_client(&HttpConfig::default()).unwrap();
        Dispatcher::new(client, channel, translator, TEMPLATE)
    }

    #[test]
    fn test_render_untranslated_uses_canonical_link() {
        let d = dispatcher(
            Channel::Unconfigured {
                method: PushMethod::Wecom,
            },
            Translator::disabled(),
        );
        let message = d.render("jack", &new_entry(20, "just setting up my twttr"));
        assert_eq!(message.link, "https://x.com/jack/status/20");
        assert_eq!(
            message.text,
            "@jack: just setting up my twttr\nhttps://x.com/jack/status/20"
        );
    }

    #[test]
    fn test_render_translated_shows_both() {
        let translator = Translator::new(&Glossary::builtin().unwrap()).unwrap();
        let d = dispatcher(
            Channel::Unconfigured {
                method: PushMethod::Wecom,
            },
            translator,
        );
        let message = d.render("jack", &new_entry(7, "Big news today"));
        assert_eq!(
            message.text,
            "@jack:\n重大新闻 今天\n\n原文: Big news today\nhttps://x.com/jack/status/7"
        );
    }

    #[test]
    fn test_channel_from_config() {
        let config = PushConfig {
            method: PushMethod::Serverchan,
            serverchan_sendkey: Some("SCT1".into()),
            serverchan_endpoint: "https://sct.example/".into(),
            ..PushConfig::default()
        };
        assert_eq!(
            Channel::from_config(&config).unwrap(),
            Channel::ServerChan {
                endpoint: "https://sct.example".into(),
                sendkey: "SCT1".into()
            }
        );
    }

    #[test]
    fn test_accepted_requires_status_and_code() {
        let wecom = Channel::WeCom {
            webhook: "http://hook".into(),
        };
        assert!(wecom.accepted(StatusCode::OK, r#"{"errcode":0,"errmsg":"ok"}"#));
        assert!(!wecom.accepted(StatusCode::OK, r#"{"errcode":93000}"#));
        assert!(!wecom.accepted(StatusCode::OK, "not json"));
        assert!(!wecom.accepted(StatusCode::OK, "{}"));
        assert!(!wecom.accepted(StatusCode::BAD_GATEWAY, r#"{"errcode":0}"#));

        let sc = Channel::ServerChan {
            endpoint: "http://sc".into(),
            sendkey: "k".into(),
        };
        assert!(sc.accepted(StatusCode::OK, r#"{"code":0,"message":""}"#));
        assert!(!sc.accepted(StatusCode::OK, r#"{"code":40001}"#));
    }

    #[tokio::test]
    async fn test_wecom_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({ "msgtype": "text" })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errcode":0}"#))
            .expect(1)
            .mount(&server)
            .await;

        let d = dispatcher(
            Channel::WeCom {
                webhook: format!("{}/hook", server.uri()),
            },
            Translator::disabled(),
        );
        assert!(d.deliver("jack", &new_entry(20, "hello")).await);
    }

    #[tokio::test]
    async fn test_wecom_application_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"errcode":45009,"errmsg":"limit"}"#),
            )
            .mount(&server)
            .await;

        let d = dispatcher(
            Channel::WeCom {
                webhook: server.uri(),
            },
            Translator::disabled(),
        );
        assert!(!d.deliver("jack", &new_entry(20, "hello")).await);
    }

    #[tokio::test]
    async fn test_serverchan_delivery_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/SCTKEY.send"))
            .and(body_string_contains("title="))
            .and(body_string_contains("desp="))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code":0}"#))
            .expect(1)
            .mount(&server)
            .await;

        let d = dispatcher(
            Channel::ServerChan {
                endpoint: server.uri(),
                sendkey: "SCTKEY".into(),
            },
            Translator::disabled(),
        );
        assert!(d.deliver("jack", &new_entry(20, "hello")).await);
    }

    #[tokio::test]
    async fn test_unconfigured_never_delivers() {
        let d = dispatcher(
            Channel::Unconfigured {
                method: PushMethod::Serverchan,
            },
            Translator::disabled(),
        );
        assert!(d.misconfiguration().is_some());
        assert!(!d.deliver("jack", &new_entry(20, "hello")).await);
    }
}

//! End-to-end passes against mock mirrors and a mock WeCom webhook.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tweetrelay::models::{CheckpointState, FirstRunPolicy, HttpConfig};
use tweetrelay::pipeline::SyncEngine;
use tweetrelay::services::{Channel, Dispatcher, MirrorSelector, Translator};
use tweetrelay::storage::{CheckpointStore, LocalStorage};
use tweetrelay::utils::http::create_client;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>jack</title>
    <item>
      <title>third</title>
      <link>https://mirror.example/jack/status/300#m</link>
      <pubDate>Wed, 03 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>second</title>
      <link>https://mirror.example/jack/status/200#m</link>
      <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>first</title>
      <link>https://mirror.example/jack/status/100#m</link>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

struct Fixture {
    _dir: TempDir,
    store: Arc<LocalStorage>,
    engine: SyncEngine,
}

fn fixture(mirrors: Vec<String>, webhook: String) -> Fixture {
    let dir = TempDir::new().unwrap();
    let client = create_client(&HttpConfig {
        timeout_secs: 5,
        ..HttpConfig::default()
    })
    .unwrap();
    let store = Arc::new(LocalStorage::new(dir.path().join("state.json")));
    let fetcher = MirrorSelector::new(client.clone(), mirrors);
    let notifier = Dispatcher::new(
        client,
        Channel::WeCom { webhook },
        Translator::disabled(),
        "https://x.com/{account}/status/{id}",
    );
    let engine = SyncEngine::new(Arc::new(fetcher), Arc::new(notifier), store.clone())
        .with_first_run(FirstRunPolicy::DeliverAll);

    Fixture {
        _dir: dir,
        store,
        engine,
    }
}

async fn serving_mirror() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jack/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;
    server
}

async fn failing_mirror() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn delivers_new_posts_once_and_persists_watermark() {
    let down = failing_mirror().await;
    let up = serving_mirror().await;
    let wecom = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("https://x.com/jack/status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(3)
        .mount(&wecom)
        .await;

    let f = fixture(
        vec![down.uri(), up.uri()],
        format!("{}/hook", wecom.uri()),
    );
    let accounts = vec!["jack".to_string()];
    let mut state = f.engine.load_state().await;

    let first = f.engine.run_pass(&accounts, &mut state).await;
    assert_eq!(first.delivered, 3);

    let second = f.engine.run_pass(&accounts, &mut state).await;
    assert_eq!(second.delivered, 0);
    assert_eq!(second.up_to_date, 1);

    // A restarted process sees the same watermark.
    assert_eq!(f.store.load().await.last_id("jack"), Some(300));
}

#[tokio::test]
async fn rejected_push_holds_back_later_posts() {
    let up = serving_mirror().await;
    let wecom = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("status/200"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errcode": 45009, "errmsg": "limit"})),
        )
        .with_priority(1)
        .mount(&wecom)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .with_priority(5)
        .mount(&wecom)
        .await;

    let f = fixture(vec![up.uri()], wecom.uri());
    let accounts = vec!["jack".to_string()];
    let mut state = CheckpointState::default();

    let stats = f.engine.run_pass(&accounts, &mut state).await;
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(f.store.load().await.last_id("jack"), Some(100));

    let requests = wecom.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let bodies: Vec<String> = requests
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect();
    assert!(bodies[0].contains("status/100"));
    assert!(bodies[1].contains("status/200"));
}

#[tokio::test]
async fn unreachable_mirrors_leave_checkpoint_alone() {
    let down = failing_mirror().await;
    let wecom = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(0)
        .mount(&wecom)
        .await;

    let f = fixture(vec![down.uri()], wecom.uri());
    let mut state = CheckpointState::default();
    state.advance("jack", 42);
    f.store.save(&state).await.unwrap();

    let stats = f
        .engine
        .run_pass(&["jack".to_string()], &mut state)
        .await;
    assert_eq!(stats.unreachable, 1);
    assert_eq!(f.store.load().await.last_id("jack"), Some(42));
}

//! WsFeed against a local WebSocket server.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use config_reader::feed::{ChangeFeed, Subscription, WsFeed};
use config_reader::settings::ListenerSettings;
use config_reader::{ChangeKind, ConfigReader};

mod common;
use common::APP;

const DELETE_SITE_NAME: &str = r#"{
    "topic": "configuration.SERVICE-A.deleted",
    "event": {
        "changeType": 3,
        "applicationName": "SERVICE-A",
        "configurationName": "SiteName",
        "timestamp": "2024-05-01T10:00:00Z"
    }
}"#;

const FOREIGN_TOPIC: &str = r#"{
    "topic": "configuration.SERVICE-B.deleted",
    "event": {
        "changeType": 3,
        "applicationName": "SERVICE-B",
        "configurationName": "MaxItemCount",
        "timestamp": "2024-05-01T10:00:00Z"
    }
}"#;

/// Start a WebSocket server. Connection number `n` (from 0) receives
/// `script(n)` as text frames, then stays open until the client leaves.
/// Returns the address and the request URIs seen.
async fn start_ws_server<F>(script: F) -> (SocketAddr, Arc<Mutex<Vec<String>>>)
where
    F: Fn(usize) -> Option<Vec<&'static str>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let uris = Arc::new(Mutex::new(Vec::new()));
    let seen = uris.clone();
    let script = Arc::new(script);
    let count = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = seen.clone();
            let script = script.clone();
            let n = count.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    seen.lock().unwrap().push(req.uri().to_string());
                    Ok(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };
                // `None` drops the connection straight away.
                let Some(frames) = script(n) else {
                    let _ = ws.close(None).await;
                    return;
                };
                for frame in frames {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    (addr, uris)
}

fn listener_settings(addr: SocketAddr) -> ListenerSettings {
    ListenerSettings {
        enabled: true,
        namespace: common::NAMESPACE.to_string(),
        endpoint: format!("ws://{}/changes", addr),
        reconnect_base_ms: 10,
        reconnect_max_ms: 50,
    }
}

#[tokio::test]
async fn test_subscribe_receives_bound_events() {
    let (addr, uris) =
        start_ws_server(|_| Some(vec![FOREIGN_TOPIC, "not json", DELETE_SITE_NAME])).await;
    let feed = WsFeed::new(&listener_settings(addr)).unwrap();

    let subscription = feed.subscribe(APP).await.unwrap();
    let mut events = subscription.events;

    let first = events.recv().await.unwrap();
    assert!(first.is_err());
    let second = events.recv().await.unwrap().unwrap();
    assert_eq!(second.change_type, ChangeKind::Deleted);
    assert_eq!(second.configuration_name, "SiteName");
    assert!(feed.health_check().await);

    assert_eq!(
        uris.lock().unwrap()[0],
        "/changes?binding=configuration.SERVICE-A.*"
    );

    feed.unsubscribe(&subscription.id).await.unwrap();
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let (addr, _uris) = start_ws_server(|n| {
        if n == 0 {
            None
        } else {
            Some(vec![DELETE_SITE_NAME])
        }
    })
    .await;
    let feed = WsFeed::new(&listener_settings(addr)).unwrap();

    let Subscription { id, mut events } = feed.subscribe(APP).await.unwrap();
    let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(event.configuration_name, "SiteName");

    feed.unsubscribe(&id).await.unwrap();
}

#[tokio::test]
async fn test_reader_applies_ws_events() {
    let (addr, _uris) = start_ws_server(|_| Some(vec![DELETE_SITE_NAME])).await;
    let store = common::seeded_store();

    let mut settings = common::settings(true);
    settings.listener = listener_settings(addr);
    let feed: Arc<dyn ChangeFeed> = Arc::new(WsFeed::new(&settings.listener).unwrap());
    let reader = ConfigReader::start(settings, Arc::new(store.clone()), Some(feed))
        .await
        .unwrap();

    assert!(common::eventually(|| !reader.has_key("SiteName").unwrap_or(true)).await);
    assert!(reader.has_key("MaxItemCount").unwrap());

    reader.shutdown().await;
}

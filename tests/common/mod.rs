//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use config_reader::feed::{ChangeFeed, MemoryFeed};
use config_reader::settings::InitialLoad;
use config_reader::store::MemoryStore;
use config_reader::{ConfigAdmin, ConfigEntry, ConfigReader, ConfigType, ReaderSettings};

pub const APP: &str = "SERVICE-A";
pub const NAMESPACE: &str = "configuration";

/// Entries for `SERVICE-A` plus one foreign application entry.
pub fn seed_entries() -> Vec<ConfigEntry> {
    vec![
        ConfigEntry::new(APP, "SiteName", ConfigType::String, "soty.io"),
        ConfigEntry::new(APP, "IsBasketEnabled", ConfigType::Bool, "true"),
        ConfigEntry::new(APP, "MaxItemCount", ConfigType::Int, "50"),
        ConfigEntry::new(APP, "DiscountRate", ConfigType::Double, "0.15"),
        ConfigEntry::new(APP, "InactiveConfig", ConfigType::String, "hidden").with_active(false),
        ConfigEntry::new("SERVICE-B", "SiteName", ConfigType::String, "other.io"),
    ]
}

pub fn seeded_store() -> MemoryStore {
    MemoryStore::with_entries(seed_entries())
}

pub fn settings(listener: bool) -> ReaderSettings {
    let mut settings = ReaderSettings::for_application(APP);
    settings.listener.enabled = listener;
    settings.listener.namespace = NAMESPACE.to_string();
    settings
}

/// Reader over `store` without a change feed.
pub async fn start_reader(store: &MemoryStore) -> ConfigReader {
    ConfigReader::start(settings(false), Arc::new(store.clone()), None)
        .await
        .unwrap()
}

/// Reader over `store` subscribed to `feed`.
pub async fn start_listening_reader(store: &MemoryStore, feed: &MemoryFeed) -> ConfigReader {
    let feed: Arc<dyn ChangeFeed> = Arc::new(feed.clone());
    ConfigReader::start(settings(true), Arc::new(store.clone()), Some(feed))
        .await
        .unwrap()
}

/// Reader whose first load runs on the supervisor task.
pub async fn start_background_reader(store: &MemoryStore) -> ConfigReader {
    let mut settings = settings(false);
    settings.initial_load = InitialLoad::Background;
    ConfigReader::start(settings, Arc::new(store.clone()), None)
        .await
        .unwrap()
}

pub fn admin(store: &MemoryStore, feed: &MemoryFeed) -> ConfigAdmin {
    ConfigAdmin::new(Arc::new(store.clone()), Arc::new(feed.clone()))
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// A request as seen by the programmable backend.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Start a programmable HTTP/1.1 backend on an ephemeral port.
///
/// Every connection carries one request; the handler decides status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(Request { method, path, body })
}

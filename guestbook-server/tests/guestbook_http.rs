//! Request-level behavior of the guestbook routes against in-memory stores

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use guestbook_server::{build_router, AppState, ErrorPolicy, GuestbookError, ServerConfig, Terminator};
use guestbook_store::{ConnectionPool, ListStore, MemoryConnector, MemoryStore, PoolOptions};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

fn pool(store: &MemoryStore) -> ConnectionPool {
    ConnectionPool::new(MemoryConnector::new(store.clone()), PoolOptions::default())
}

/// One store behind both pools, so reads see writes immediately.
fn shared_app(store: &MemoryStore, policy: ErrorPolicy) -> Router {
    let state = AppState::new(pool(store), pool(store), policy);
    build_router(state, &ServerConfig::default())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

/// Log sink for asserting on emitted events
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn entries(body: &[u8]) -> Vec<String> {
    serde_json::from_slice(body).expect("body is a JSON array of strings")
}

#[tokio::test]
async fn push_then_read_scenario() {
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (status, content_type, body) = get(&app, "/rpush/greetings/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(entries(&body), vec!["hello"]);

    let (_, _, body) = get(&app, "/lrange/greetings").await;
    assert_eq!(entries(&body), vec!["hello"]);

    get(&app, "/rpush/greetings/world").await;
    let (_, _, body) = get(&app, "/lrange/greetings").await;
    assert_eq!(entries(&body), vec!["hello", "world"]);
}

#[tokio::test]
async fn list_body_is_indented_json() {
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (_, _, body) = get(&app, "/rpush/k/v").await;
    assert_eq!(String::from_utf8(body).unwrap(), "[\n  \"v\"\n]");
}

#[tokio::test]
async fn unknown_key_reads_as_empty_array() {
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (status, _, body) = get(&app, "/lrange/nosuchkey").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]".to_vec());
}

#[tokio::test]
async fn percent_encoded_segments_are_decoded_before_the_store() {
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (_, _, body) = get(&app, "/rpush/a%2Fb/hello%20world").await;
    assert_eq!(entries(&body), vec!["hello world"]);

    let direct = pool(&store);
    assert_eq!(
        ListStore::new(&direct).read_all("a/b").await.unwrap(),
        vec!["hello world"]
    );
}

#[tokio::test]
async fn empty_value_and_key_are_accepted() {
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (status, _, body) = get(&app, "/rpush/k/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries(&body), vec![""]);

    let (status, _, body) = get(&app, "/lrange/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(entries(&body).is_empty());
}

#[tokio::test]
async fn writes_go_to_primary_and_reads_to_replica() {
    let primary = MemoryStore::new();
    let replica = MemoryStore::new();
    let state = AppState::new(pool(&primary), pool(&replica), ErrorPolicy::Substitute);
    let app = build_router(state, &ServerConfig::default());

    // The replica has not caught up, so the echoed list is stale.
    let (_, _, body) = get(&app, "/rpush/k/v").await;
    assert!(entries(&body).is_empty());

    let direct = pool(&primary);
    assert_eq!(ListStore::new(&direct).read_all("k").await.unwrap(), vec!["v"]);
}

#[tokio::test]
async fn info_is_raw_primary_status() {
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);
    get(&app, "/rpush/k/v").await;

    let (status, content_type, body) = get(&app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("# Server"));
    assert!(text.contains("keys:1"));
}

#[tokio::test]
async fn env_dump_reproduces_environment() {
    std::env::set_var("GUESTBOOK_HTTP_ENV_TEST", "B=C");
    let store = MemoryStore::new();
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (status, content_type, body) = get(&app, "/env").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let env: BTreeMap<String, String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(env.get("GUESTBOOK_HTTP_ENV_TEST").map(String::as_str), Some("B=C"));
    for (name, value) in std::env::vars_os() {
        let (Some(name), Some(value)) = (name.to_str(), value.to_str()) else {
            continue;
        };
        assert_eq!(env.get(name).map(String::as_str), Some(value));
    }
}

#[tokio::test]
async fn substitute_policy_answers_200_when_store_is_down() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = MemoryStore::new();
    store.set_available(false);
    let app = shared_app(&store, ErrorPolicy::Substitute);

    let (status, _, body) = get(&app, "/rpush/k/v").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]".to_vec());

    let (status, _, body) = get(&app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let logs = logs.contents();
    assert!(logs.contains("substituting default value"));
    assert!(logs.contains("operation=\"rpush\""));
}

#[tokio::test]
async fn pass_through_policy_serves_lossy_entries() {
    let store = MemoryStore::new();
    store.apply(b"RPUSH", &[b"bin".to_vec(), b"ok".to_vec()]);
    store.apply(b"RPUSH", &[b"bin".to_vec(), vec![b'a', 0xff]]);

    let (_, _, body) = get(&shared_app(&store, ErrorPolicy::PassThrough), "/lrange/bin").await;
    assert_eq!(entries(&body), vec!["ok", "a\u{fffd}"]);

    let (_, _, body) = get(&shared_app(&store, ErrorPolicy::Substitute), "/lrange/bin").await;
    assert!(entries(&body).is_empty());
}

struct PanicTerminator;

impl Terminator for PanicTerminator {
    fn terminate(&self, error: &GuestbookError) -> ! {
        panic!("terminated: {error}")
    }
}

#[tokio::test]
#[should_panic(expected = "terminated")]
async fn abort_policy_terminates_without_response() {
    let store = MemoryStore::new();
    store.set_available(false);
    let state = AppState::with_terminator(pool(&store), pool(&store), ErrorPolicy::Abort, PanicTerminator);
    let app = build_router(state, &ServerConfig::default());

    get(&app, "/lrange/k").await;
}

#[tokio::test]
async fn abort_policy_is_quiet_when_nothing_fails() {
    let store = MemoryStore::new();
    let state = AppState::with_terminator(pool(&store), pool(&store), ErrorPolicy::Abort, PanicTerminator);
    let app = build_router(state, &ServerConfig::default());

    let (status, _, body) = get(&app, "/rpush/k/v").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries(&body), vec!["v"]);
}

//! Shared fixtures: a programmable mock GraphQL upstream and an app harness.
#![allow(dead_code, reason = "each test binary uses a subset of the fixtures")]

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::{Json, Response};
use axum::routing::post;
use axum::Router;
use http_body_util::BodyExt;
use lingo::github::{GithubClient, RetryConfig};
use lingo::leaderboard::Leaderboard;
use lingo::search::SearchCore;
use lingo::server::AppState;
use lingo::store::Store;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// One canned upstream response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Value,
    delay: Duration,
}

impl MockResponse {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Default)]
struct MockState {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
    queue: Arc<Mutex<VecDeque<MockResponse>>>,
}

/// A mock GitHub GraphQL endpoint on an ephemeral local port.
pub struct MockUpstream {
    pub url: String,
    state: MockState,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/graphql", post(mock_handler))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock upstream");
        });
        Self {
            url: format!("http://{addr}/graphql"),
            state,
        }
    }

    /// Queue the next response; responses are served in push order.
    pub fn push(&self, response: MockResponse) {
        self.state
            .queue
            .lock()
            .expect("queue lock")
            .push_back(response);
    }

    /// Number of requests the upstream has served.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Request bodies seen so far, oldest first.
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().expect("requests lock").clone()
    }

    /// Base URL of the mocked instance, as cache keys will record it.
    pub fn base_url(&self) -> String {
        self.url.trim_end_matches("/graphql").to_string()
    }
}

async fn mock_handler(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().expect("requests lock").push(body);

    let next = state.queue.lock().expect("queue lock").pop_front();
    let Some(canned) = next else {
        return Response::builder()
            .status(500)
            .body(Body::from("mock upstream exhausted"))
            .expect("response");
    };
    if canned.delay > Duration::ZERO {
        tokio::time::sleep(canned.delay).await;
    }
    let mut builder = Response::builder()
        .status(canned.status)
        .header("content-type", "application/json");
    for (name, value) in &canned.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(canned.body.to_string()))
        .expect("response")
}

/// Knobs for the application under test.
pub struct AppOptions {
    pub enable_cache: bool,
    pub ttl_seconds: i64,
    pub concurrency_limit: usize,
    /// Overrides the mock upstream endpoint when set.
    pub endpoint: Option<String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            enable_cache: true,
            ttl_seconds: 3600,
            concurrency_limit: 20,
            endpoint: None,
        }
    }
}

/// The application under test, wired to a mock upstream and an in-memory
/// store the test can inspect and seed.
pub struct TestApp {
    pub router: Router,
    pub core: SearchCore,
    pub store: Arc<Store>,
    pub mock: MockUpstream,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(AppOptions::default()).await
}

pub async fn spawn_app_with(options: AppOptions) -> TestApp {
    let mock = MockUpstream::start().await;
    let endpoint = options.endpoint.clone().unwrap_or_else(|| mock.url.clone());
    let retry = RetryConfig {
        attempts: 1,
        base_delay: Duration::from_millis(20),
        jitter: false,
        request_timeout: Duration::from_secs(5),
    };
    let client =
        GithubClient::with_endpoint_retry("test-token", endpoint, retry).expect("client");
    let store = Arc::new(Store::open(lingo::store::MEMORY_PATH).expect("store"));
    let core = SearchCore::new(
        client,
        Arc::clone(&store),
        options.enable_cache,
        options.ttl_seconds,
        options.concurrency_limit,
    );
    let state = AppState {
        search: core.clone(),
        leaderboard: Leaderboard::new(Arc::clone(&store)),
    };
    let router = lingo::server::build_router(state, &[]).expect("router");
    TestApp {
        router,
        core,
        store,
        mock,
    }
}

/// Drive one request through the router and decode the JSON body.
pub async fn get_json(router: &Router, uri: &str) -> (u16, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let status = response.status().as_u16();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Repository connection nodes: `(name, primary language, is fork)`.
pub fn repo_nodes(repos: &[(&str, Option<&str>, bool)]) -> Value {
    Value::Array(
        repos
            .iter()
            .map(|(name, language, is_fork)| {
                json!({
                    "name": name,
                    "isFork": is_fork,
                    "primaryLanguage": language.map(|lang| json!({ "name": lang })),
                })
            })
            .collect(),
    )
}

pub fn page_info(has_next: bool, cursor: Option<&str>) -> Value {
    json!({ "hasNextPage": has_next, "endCursor": cursor })
}

/// A complete single-page user response body.
pub fn user_body(repos: &[(&str, Option<&str>, bool)]) -> Value {
    user_body_paged(repos, page_info(false, None))
}

pub fn user_body_paged(repos: &[(&str, Option<&str>, bool)], page: Value) -> Value {
    json!({
        "data": {
            "user": {
                "id": "123",
                "name": "Test User",
                "email": "test@example.com",
                "avatarUrl": "https://avatars.githubusercontent.com/u/123",
                "createdAt": "2015-04-01T00:00:00Z",
                "followers": { "totalCount": 5 },
                "following": { "totalCount": 2 },
                "repositories": { "nodes": repo_nodes(repos), "pageInfo": page }
            },
            "organization": null
        }
    })
}

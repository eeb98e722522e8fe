//! In-process mock of the REST backend for integration tests.
//!
//! Every route answers with a canned reply that a test can override by name
//! before making calls. All requests are recorded for later assertions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::sync::Notify;

use polly_client::config::Timeouts;
use polly_client::storage::MemoryStorage;
use polly_client::{ApiClient, AuthService, ClientConfig, SessionStore};

// =============================================================================
// Replies
// =============================================================================

#[derive(Clone, Debug)]
pub enum Reply {
    Json(u16, Value),
    Text(u16, &'static str),
    Empty(u16),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = |code| StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self {
            Self::Json(code, body) => (status(code), axum::Json(body)).into_response(),
            Self::Text(code, body) => (status(code), body).into_response(),
            Self::Empty(code) => status(code).into_response(),
        }
    }
}

pub fn user_json(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "username": email.split('@').next().unwrap_or(email),
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z",
    })
}

pub fn auth_body(id: &str, email: &str, token: &str) -> Value {
    json!({ "user": user_json(id, email), "token": token })
}

pub fn poll_json(id: &str) -> Value {
    json!({
        "id": id,
        "title": "Favorite language?",
        "options": [
            { "id": "o1", "text": "Rust", "votes": 3, "pollId": id },
            { "id": "o2", "text": "Go", "votes": 1, "pollId": id },
        ],
        "createdBy": "1",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z",
        "isActive": true,
        "allowMultipleChoices": false,
        "requireAuth": true,
        "totalVotes": 4,
    })
}

fn default_replies() -> HashMap<&'static str, Reply> {
    HashMap::from([
        ("login", Reply::Json(200, auth_body("1", "jane@example.com", "abc"))),
        ("register", Reply::Json(201, auth_body("2", "new@example.com", "reg-token"))),
        ("logout", Reply::Json(200, json!({ "success": true }))),
        ("refresh", Reply::Json(200, auth_body("1", "jane@example.com", "fresh"))),
        ("me", Reply::Json(200, json!({ "user": user_json("1", "jane@example.com") }))),
        (
            "polls.list",
            Reply::Json(200, json!({
                "data": [poll_json("p1")],
                "pagination": {
                    "page": 1, "limit": 10, "total": 1,
                    "totalPages": 1, "hasNext": false, "hasPrev": false,
                },
            })),
        ),
        ("polls.get", Reply::Json(200, poll_json("p1"))),
        ("polls.create", Reply::Json(201, poll_json("p2"))),
        ("polls.update", Reply::Json(200, poll_json("p1"))),
        ("polls.delete", Reply::Empty(204)),
        (
            "polls.vote",
            Reply::Json(201, json!([{
                "id": "v1", "pollId": "p1", "optionId": "o1", "userId": "1",
                "createdAt": "2024-01-01T00:00:00Z",
            }])),
        ),
    ])
}

// =============================================================================
// Server
// =============================================================================

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    replies: Mutex<HashMap<&'static str, Reply>>,
    requests: Mutex<Vec<Recorded>>,
    bodies: Mutex<Vec<(&'static str, Value)>>,
    hold_login: AtomicBool,
    pub login_arrived: Notify,
    pub release_login: Notify,
}

impl MockState {
    fn reply(&self, route: &'static str) -> Reply {
        self.replies.lock().unwrap().get(route).cloned().unwrap_or(Reply::Empty(404))
    }

    fn record_body(&self, route: &'static str, body: Value) {
        self.bodies.lock().unwrap().push((route, body));
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            replies: Mutex::new(default_replies()),
            ..MockState::default()
        });

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route(
                "/auth/logout",
                post(|State(s): State<Arc<MockState>>| async move { s.reply("logout") }),
            )
            .route(
                "/auth/refresh",
                post(|State(s): State<Arc<MockState>>| async move { s.reply("refresh") }),
            )
            .route("/auth/me", get(|State(s): State<Arc<MockState>>| async move { s.reply("me") }))
            .route(
                "/polls",
                get(|State(s): State<Arc<MockState>>| async move { s.reply("polls.list") })
                    .post(create_poll),
            )
            .route(
                "/polls/{id}",
                get(|State(s): State<Arc<MockState>>| async move { s.reply("polls.get") })
                    .patch(update_poll)
                    .delete(|State(s): State<Arc<MockState>>| async move {
                        s.reply("polls.delete")
                    }),
            )
            .route("/polls/{id}/votes", post(vote));

        let app = Router::new()
            .nest("/api", api)
            .layer(middleware::from_fn_with_state(Arc::clone(&state), record))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        let timeouts = Timeouts { request_secs: 5, connect_secs: 2 };
        ClientConfig::new(&self.origin(), "/api", timeouts).unwrap()
    }

    pub fn set_reply(&self, route: &'static str, reply: Reply) {
        self.state.replies.lock().unwrap().insert(route, reply);
    }

    /// Make `/auth/login` wait for `release_login` before answering.
    pub fn hold_login(&self) {
        self.state.hold_login.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    pub fn bodies(&self, route: &str) -> Vec<Value> {
        self.state
            .bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == route)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn record(State(state): State<Arc<MockState>>, req: Request, next: Next) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        method: req.method().to_string(),
        path: req.uri().path().to_owned(),
        query: req.uri().query().map(str::to_owned),
        authorization: req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    });
    next.run(req).await
}

async fn login(State(state): State<Arc<MockState>>, axum::Json(body): axum::Json<Value>) -> Reply {
    state.record_body("login", body);
    if state.hold_login.load(Ordering::SeqCst) {
        state.login_arrived.notify_one();
        state.release_login.notified().await;
    }
    state.reply("login")
}

async fn register(
    State(state): State<Arc<MockState>>,
    axum::Json(body): axum::Json<Value>,
) -> Reply {
    state.record_body("register", body);
    state.reply("register")
}

async fn create_poll(
    State(state): State<Arc<MockState>>,
    axum::Json(body): axum::Json<Value>,
) -> Reply {
    state.record_body("polls.create", body);
    state.reply("polls.create")
}

async fn update_poll(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> Reply {
    state.record_body("polls.update", body);
    state.reply("polls.update")
}

async fn vote(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<String>,
    axum::Json(body): axum::Json<Value>,
) -> Reply {
    state.record_body("polls.vote", body);
    state.reply("polls.vote")
}

// =============================================================================
// Client wiring
// =============================================================================

pub fn memory_store() -> (Arc<MemoryStorage>, SessionStore) {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::from_arc(storage.clone());
    (storage, store)
}

pub fn auth_service(server: &MockServer, store: SessionStore) -> AuthService {
    AuthService::new(ApiClient::new(&server.config(), store).unwrap())
}

/// Collects every notification as the notified user's email.
pub fn email_recorder(
    auth: &AuthService,
) -> (Arc<Mutex<Vec<Option<String>>>>, polly_client::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = auth.subscribe(move |user| sink.lock().unwrap().push(user.map(|u| u.email.clone())));
    (seen, sub)
}

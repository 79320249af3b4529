//! Integration test support for the OptionsHouse client.
//!
//! [`FakeApi`] serves the `/m` and `/j` endpoints on a loopback port. It
//! decodes and records every envelope, issues tokens on `auth.login`, rejects
//! requests carrying a stale token with an `access` error, and otherwise
//! answers with queued replies or an echo of the request actions.

use axum::extract::{Form, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use optionshouse_client::ClientConfig;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Username accepted by the fake.
pub const USERNAME: &str = "trader";
/// Password accepted by the fake.
pub const PASSWORD: &str = "secret";

/// Canned reply for the next non-login request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a JSON body.
    Json(Value),
    /// Arbitrary status, content type, and body.
    Raw {
        /// HTTP status code.
        status: u16,
        /// Content-Type header value.
        content_type: String,
        /// Response body.
        body: String,
    },
}

impl Reply {
    /// Single-message reply carrying the given error entries.
    #[must_use]
    pub fn errors(action: &str, errors: Value) -> Self {
        Self::Json(json!({"EZMessage": {"action": action, "data": {}, "errors": errors}}))
    }

    /// Token rejection for a single-message request.
    #[must_use]
    pub fn access_denied(action: &str) -> Self {
        Self::errors(action, json!([{"access": "denied", "message": "session expired"}]))
    }
}

/// A request as seen by the fake.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Request path, `/m` or `/j`.
    pub path: String,
    /// Decoded `r` form field.
    pub envelope: Value,
    /// Arrival time.
    pub at: Instant,
}

impl Recorded {
    /// Messages of the envelope, whatever its shape.
    #[must_use]
    pub fn messages(&self) -> Vec<Value> {
        messages_of(&self.envelope)
    }

    /// Action of the first message.
    #[must_use]
    pub fn action(&self) -> String {
        self.messages()
            .first()
            .and_then(|m| m["action"].as_str())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Default)]
struct FakeState {
    requests: Mutex<Vec<Recorded>>,
    replies: Mutex<VecDeque<Reply>>,
    login_replies: Mutex<VecDeque<Reply>>,
    token: Mutex<Option<String>>,
    logins: Mutex<usize>,
}

/// In-process stand-in for the brokerage API.
pub struct FakeApi {
    addr: SocketAddr,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeApi {
    /// Binds a loopback port and starts serving.
    ///
    /// # Errors
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/m", post(handle))
            .route("/j", post(handle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL of the fake.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at the fake, with throttling off.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            remote_host: self.url(),
            fast_api: true,
            timeout: Duration::from_secs(5),
            ..ClientConfig::new(USERNAME, PASSWORD)
        }
    }

    /// Queues a reply for the next non-login request.
    pub fn enqueue(&self, reply: Reply) {
        self.state.replies.lock().push_back(reply);
    }

    /// Queues a reply for the next login.
    pub fn enqueue_login(&self, reply: Reply) {
        self.state.login_replies.lock().push_back(reply);
    }

    /// Invalidates the issued token server-side.
    pub fn expire_token(&self) {
        *self.state.token.lock() = None;
    }

    /// Token the fake currently accepts.
    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.state.token.lock().clone()
    }

    /// Number of successful logins.
    #[must_use]
    pub fn login_count(&self) -> usize {
        *self.state.logins.lock()
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().clone()
    }

    /// Requests other than logins.
    #[must_use]
    pub fn calls(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.action() != "auth.login")
            .collect()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn messages_of(envelope: &Value) -> Vec<Value> {
    if let Some(message) = envelope.get("EZMessage") {
        vec![message.clone()]
    } else if let Some(Value::Array(list)) = envelope.get("EZList") {
        list.clone()
    } else {
        Vec::new()
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    uri: Uri,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let envelope: Value = form
        .get("r")
        .and_then(|r| serde_json::from_str(r).ok())
        .unwrap_or(Value::Null);
    let recorded = Recorded {
        path: uri.path().to_string(),
        envelope,
        at: Instant::now(),
    };
    state.requests.lock().push(recorded.clone());

    let messages = recorded.messages();
    let reply = if recorded.action() == "auth.login" {
        login(&state, &messages)
    } else {
        call(&state, &recorded.envelope, &messages)
    };

    match reply {
        Reply::Json(body) => (StatusCode::OK, Json(body)).into_response(),
        Reply::Raw {
            status,
            content_type,
            body,
        } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(header::CONTENT_TYPE, content_type)],
            body,
        )
            .into_response(),
    }
}

fn login(state: &FakeState, messages: &[Value]) -> Reply {
    if let Some(reply) = state.login_replies.lock().pop_front() {
        return reply;
    }

    let data = messages.first().map(|m| &m["data"]);
    let valid = data.is_some_and(|d| d["userName"] == USERNAME && d["password"] == PASSWORD);
    if !valid {
        return Reply::errors(
            "auth.login",
            json!([{"access": "denied", "message": "invalid login"}]),
        );
    }

    let mut logins = state.logins.lock();
    *logins += 1;
    let token = format!("token-{}", *logins);
    *state.token.lock() = Some(token.clone());
    Reply::Json(json!({"EZMessage": {"action": "auth.login", "data": {"authToken": token}}}))
}

fn call(state: &FakeState, envelope: &Value, messages: &[Value]) -> Reply {
    let token = state.token.lock().clone();
    let signed = token.is_some_and(|token| {
        !messages.is_empty()
            && messages
                .iter()
                .all(|m| m["data"]["authToken"].as_str() == Some(token.as_str()))
    });
    if !signed {
        let action = messages
            .first()
            .and_then(|m| m["action"].as_str())
            .unwrap_or_default();
        return Reply::access_denied(action);
    }

    if let Some(reply) = state.replies.lock().pop_front() {
        return reply;
    }

    let echo: Vec<Value> = messages
        .iter()
        .map(|m| json!({"action": m["action"], "data": {"ok": true}}))
        .collect();
    if envelope.get("EZList").is_some() {
        Reply::Json(json!({ "EZList": echo }))
    } else {
        Reply::Json(json!({ "EZMessage": echo[0] }))
    }
}
